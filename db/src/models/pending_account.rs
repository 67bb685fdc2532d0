use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A local signup awaiting email verification.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct PendingAccount {
    pub id: Uuid,
    /// Address as submitted.
    pub email: String,
    /// Canonical form of `email`; pending accounts are looked up by this.
    pub email_key: String,
    pub first_name: String,
    pub last_name: String,
    pub postal_code: String,
    pub created_at: DateTime<Utc>,
    pub confirmed: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
}

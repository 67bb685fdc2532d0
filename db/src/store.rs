use std::sync::Arc;

use async_trait::async_trait;
use common::{email::Email, error::AppError};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dtos::pending_account::PendingAccountCreateRequest, models::pending_account::PendingAccount,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Pending account {0} is already confirmed")]
    AlreadyConfirmed(Uuid),

    #[error("Pending account {0} does not exist")]
    NotFound(Uuid),

    #[error(transparent)]
    Backend(#[from] AppError),
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::AlreadyConfirmed(_) => AppError::Conflict(error.to_string()),
            StoreError::NotFound(_) => AppError::NotFound(error.to_string()),
            StoreError::Backend(inner) => inner,
        }
    }
}

/// Result of [`PendingAccountStore::create_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(PendingAccount),
    /// An unconfirmed account for the same mailbox already existed.
    AlreadyPending(PendingAccount),
}

/// Storage for signups that have not clicked their verification link yet.
///
/// Accounts are matched by the canonical form of their email. When several
/// unconfirmed accounts exist for one mailbox the earliest created wins.
#[async_trait]
pub trait PendingAccountStore: Send + Sync {
    /// Atomic check-then-insert. Concurrent callers for the same mailbox
    /// converge on a single unconfirmed account.
    async fn create_if_absent(
        &self,
        request: PendingAccountCreateRequest,
    ) -> Result<CreateOutcome, StoreError>;

    async fn find_oldest_unconfirmed_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<PendingAccount>, StoreError>;

    /// Transitions `confirmed` from false to true, exactly once.
    async fn mark_confirmed(&self, id: Uuid) -> Result<PendingAccount, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PendingAccount>, StoreError>;
}

pub struct PgPendingAccountStore {
    pool: Arc<PgPool>,
}

impl PgPendingAccountStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingAccountStore for PgPendingAccountStore {
    async fn create_if_absent(
        &self,
        request: PendingAccountCreateRequest,
    ) -> Result<CreateOutcome, StoreError> {
        let pool: &PgPool = &self.pool;

        let inserted =
            crate::pending_account::insert_pending_account_if_absent(pool, &request).await?;
        if let Some(created) = inserted {
            return Ok(CreateOutcome::Created(created));
        }

        // lost the race to another signup, read back the winner
        let email_key = request.email.canonical();
        match crate::pending_account::get_oldest_unconfirmed_by_email_key(pool, &email_key).await? {
            Some(existing) => Ok(CreateOutcome::AlreadyPending(existing)),
            None => Err(AppError::Internal(format!(
                "Pending account for {} vanished after insert conflict",
                request.email
            ))
            .into()),
        }
    }

    async fn find_oldest_unconfirmed_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<PendingAccount>, StoreError> {
        let pool: &PgPool = &self.pool;
        let email_key = email.canonical();
        Ok(crate::pending_account::get_oldest_unconfirmed_by_email_key(pool, &email_key).await?)
    }

    async fn mark_confirmed(&self, id: Uuid) -> Result<PendingAccount, StoreError> {
        let pool: &PgPool = &self.pool;

        if let Some(confirmed) = crate::pending_account::confirm_pending_account(pool, id).await? {
            return Ok(confirmed);
        }

        match crate::pending_account::get_pending_account_by_id(pool, id).await? {
            Some(_) => Err(StoreError::AlreadyConfirmed(id)),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PendingAccount>, StoreError> {
        let pool: &PgPool = &self.pool;
        Ok(crate::pending_account::get_pending_account_by_id(pool, id).await?)
    }
}

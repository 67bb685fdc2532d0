use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use common::email::Email;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    dtos::pending_account::PendingAccountCreateRequest,
    models::pending_account::PendingAccount,
    store::{CreateOutcome, PendingAccountStore, StoreError},
};

/// Process-local [`PendingAccountStore`], used when no database is
/// configured and in tests.
#[derive(Default)]
pub struct InMemoryPendingAccountStore {
    accounts: Mutex<Vec<PendingAccount>>,
}

impl InMemoryPendingAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `account` as-is, bypassing the one-unconfirmed-per-mailbox
    /// guard. Reproduces the duplicate rows concurrent signups can leave
    /// behind in stores without a unique constraint.
    pub async fn insert_unchecked(&self, account: PendingAccount) {
        self.accounts.lock().await.push(account);
    }

    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    fn oldest_unconfirmed<'a>(
        accounts: &'a [PendingAccount],
        email_key: &str,
    ) -> Option<&'a PendingAccount> {
        accounts
            .iter()
            .filter(|a| !a.confirmed && a.email_key == email_key)
            .min_by_key(|a| a.created_at)
    }
}

#[async_trait]
impl PendingAccountStore for InMemoryPendingAccountStore {
    async fn create_if_absent(
        &self,
        request: PendingAccountCreateRequest,
    ) -> Result<CreateOutcome, StoreError> {
        let email_key = request.email.canonical();
        let mut accounts = self.accounts.lock().await;

        if let Some(existing) = Self::oldest_unconfirmed(&accounts, &email_key) {
            return Ok(CreateOutcome::AlreadyPending(existing.clone()));
        }

        let account = PendingAccount {
            id: Uuid::new_v4(),
            email: request.email.as_str().to_string(),
            email_key,
            first_name: request.first_name,
            last_name: request.last_name,
            postal_code: request.postal_code,
            // same precision as a timestamptz column
            created_at: Utc::now().trunc_subsecs(6),
            confirmed: false,
            confirmed_at: None,
        };
        accounts.push(account.clone());

        Ok(CreateOutcome::Created(account))
    }

    async fn find_oldest_unconfirmed_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<PendingAccount>, StoreError> {
        let accounts = self.accounts.lock().await;
        Ok(Self::oldest_unconfirmed(&accounts, &email.canonical()).cloned())
    }

    async fn mark_confirmed(&self, id: Uuid) -> Result<PendingAccount, StoreError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if account.confirmed {
            return Err(StoreError::AlreadyConfirmed(id));
        }

        account.confirmed = true;
        account.confirmed_at = Some(Utc::now().trunc_subsecs(6));
        Ok(account.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PendingAccount>, StoreError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }
}

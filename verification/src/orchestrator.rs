use std::sync::Arc;

use common::{
    email::Email,
    error::{AppError, Res},
};
use db::{
    CreateOutcome, PendingAccount, PendingAccountStore, StoreError,
    dtos::pending_account::PendingAccountCreateRequest,
};
use directory::{DirectoryError, SupporterDirectory, SupporterRecord, SupporterUpsert};
use uuid::Uuid;

use crate::{
    notify::{NotificationSink, VERIFICATION_SUBJECT, VerificationEmail},
    token::TokenService,
};

/// Validated signup form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignupOutcome {
    /// The human gate said bot. Nothing was looked up or stored.
    Rejected,
    DirectoryError(DirectoryError),
    AlreadyMember(SupporterRecord),
    /// A verification link was sent earlier and not used yet.
    AwaitingConfirmation(PendingAccount),
    SignupCreated(PendingAccount),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// Unknown account, wrong token, expired token or already used.
    InvalidLink,
    /// The account stays unconfirmed and the link keeps working.
    DirectoryError(DirectoryError),
    Confirmed(SupporterRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    NotAMember,
    DirectoryError(DirectoryError),
    Authenticated(SupporterRecord),
}

/// Decides whether a visitor is a list member, a pending signup or a
/// returning member.
///
/// Holds no per-visitor state: everything lives in the pending account
/// store and the supporter directory. Business outcomes are returned as
/// values; only local storage failures come back as `Err`.
pub struct VerificationOrchestrator {
    directory: Arc<dyn SupporterDirectory>,
    accounts: Arc<dyn PendingAccountStore>,
    tokens: TokenService,
    notifier: Arc<dyn NotificationSink>,
    public_base_url: String,
    resend_on_repeat: bool,
}

impl VerificationOrchestrator {
    pub fn new(
        directory: Arc<dyn SupporterDirectory>,
        accounts: Arc<dyn PendingAccountStore>,
        tokens: TokenService,
        notifier: Arc<dyn NotificationSink>,
        public_base_url: &str,
    ) -> Self {
        Self {
            directory,
            accounts,
            tokens,
            notifier,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            resend_on_repeat: false,
        }
    }

    /// Resend the verification email when a pending address signs up again.
    pub fn with_resend_on_repeat(mut self, resend_on_repeat: bool) -> Self {
        self.resend_on_repeat = resend_on_repeat;
        self
    }

    pub async fn signup(&self, request: SignupRequest, is_human: bool) -> Res<SignupOutcome> {
        if !is_human {
            log::info!("Signup for {} rejected by the human gate", request.email);
            return Ok(SignupOutcome::Rejected);
        }

        match self.directory.find_by_email(&request.email, false).await {
            Err(error) => {
                log::warn!(
                    "Directory lookup failed during signup for {}: {}",
                    request.email,
                    error
                );
                return Ok(SignupOutcome::DirectoryError(error));
            }
            Ok(Some(record)) => {
                log::info!("Signup for {} matched an existing supporter", request.email);
                return Ok(SignupOutcome::AlreadyMember(record));
            }
            Ok(None) => {}
        }

        if let Some(existing) = self
            .accounts
            .find_oldest_unconfirmed_by_email(&request.email)
            .await?
        {
            log::info!(
                "Signup for {} is already awaiting confirmation as {}",
                request.email,
                existing.id
            );
            if self.resend_on_repeat {
                self.send_verification(&existing).await;
            }
            return Ok(SignupOutcome::AwaitingConfirmation(existing));
        }

        let created = self
            .accounts
            .create_if_absent(PendingAccountCreateRequest {
                email: request.email,
                first_name: request.first_name,
                last_name: request.last_name,
                postal_code: request.postal_code,
            })
            .await?;

        match created {
            CreateOutcome::Created(account) => {
                log::info!("Created pending account {} for {}", account.id, account.email);
                self.send_verification(&account).await;
                Ok(SignupOutcome::SignupCreated(account))
            }
            CreateOutcome::AlreadyPending(account) => {
                log::info!(
                    "Concurrent signup for {} converged on {}",
                    account.email,
                    account.id
                );
                if self.resend_on_repeat {
                    self.send_verification(&account).await;
                }
                Ok(SignupOutcome::AwaitingConfirmation(account))
            }
        }
    }

    pub async fn confirm_link(&self, account_id: Uuid, token: &str) -> Res<ConfirmOutcome> {
        let Some(account) = self.accounts.find_by_id(account_id).await? else {
            log::info!("Verification link for unknown account {}", account_id);
            return Ok(ConfirmOutcome::InvalidLink);
        };

        if !self.tokens.verify(&account, token) {
            log::info!("Invalid or used verification link for account {}", account_id);
            return Ok(ConfirmOutcome::InvalidLink);
        }

        let email = Email::parse(&account.email).map_err(|e| {
            AppError::Internal(format!("Pending account {} has a bad email: {}", account.id, e))
        })?;
        let upsert = SupporterUpsert {
            email,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            postal_code: account.postal_code.clone(),
        };

        let record = match self.directory.upsert(&upsert).await {
            Ok(record) => record,
            Err(error) => {
                log::warn!(
                    "Directory upsert failed while confirming {} (retryable: {}): {}",
                    account.id,
                    error.is_retryable(),
                    error
                );
                return Ok(ConfirmOutcome::DirectoryError(error));
            }
        };

        match self.accounts.mark_confirmed(account.id).await {
            Ok(_) => {
                log::info!("Confirmed pending account {} for {}", account.id, account.email);
                Ok(ConfirmOutcome::Confirmed(record))
            }
            Err(StoreError::AlreadyConfirmed(_)) | Err(StoreError::NotFound(_)) => {
                // a concurrent click won the confirmation
                log::info!("Account {} was confirmed by another request", account.id);
                Ok(ConfirmOutcome::InvalidLink)
            }
            Err(error) => Err(error.into()),
        }
    }

    pub async fn login(&self, email: &Email) -> LoginOutcome {
        match self.directory.find_by_email(email, false).await {
            Ok(Some(record)) => {
                log::info!("Login for {} authenticated", email);
                LoginOutcome::Authenticated(record)
            }
            Ok(None) => {
                log::info!("Login for {} is not a list member", email);
                LoginOutcome::NotAMember
            }
            Err(error) => {
                log::warn!("Directory lookup failed during login for {}: {}", email, error);
                LoginOutcome::DirectoryError(error)
            }
        }
    }

    pub fn verification_link(&self, account: &PendingAccount) -> String {
        format!(
            "{}/verify/{}/{}",
            self.public_base_url,
            account.id,
            self.tokens.mint(account)
        )
    }

    /// Fire-and-forget: a failed send is logged and the signup still stands.
    async fn send_verification(&self, account: &PendingAccount) {
        let email = VerificationEmail {
            to: account.email.clone(),
            to_name: account.first_name.clone(),
            subject: VERIFICATION_SUBJECT.to_string(),
            link: self.verification_link(account),
        };

        if let Err(error) = self.notifier.send_verification(&email).await {
            log::error!(
                "Failed to send verification email for account {}: {}",
                account.id,
                error
            );
        }
    }
}

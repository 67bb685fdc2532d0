use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use common::{
    email::Email,
    env_config::{DirectoryConfig, DirectoryVendor},
};

mod error;
mod inmem;
pub mod mailchimp;
mod record;
pub mod salsa;

pub use error::DirectoryError;
pub use inmem::InMemorySupporterDirectory;
pub use mailchimp::MailchimpDirectory;
pub use record::{SubscriptionStatus, SupporterRecord, SupporterUpsert, select_match};
pub use salsa::SalsaDirectory;

/// The mailing-list platform supporters are verified against.
///
/// Implementations do no caching; every call reaches the vendor.
#[async_trait]
pub trait SupporterDirectory: Send + Sync {
    /// Looks up the supporter whose address canonicalizes to `email`.
    ///
    /// Records whose status does not grant membership are treated as absent
    /// unless `allow_invalid` is set.
    async fn find_by_email(
        &self,
        email: &Email,
        allow_invalid: bool,
    ) -> Result<Option<SupporterRecord>, DirectoryError>;

    /// Create-or-update, subscribing the supporter. Repeating the call with
    /// the same data leaves the directory unchanged.
    async fn upsert(&self, supporter: &SupporterUpsert) -> Result<SupporterRecord, DirectoryError>;
}

/// Builds the adapter for the configured vendor.
pub fn from_config(
    config: &DirectoryConfig,
) -> Result<Arc<dyn SupporterDirectory>, DirectoryError> {
    let timeout = Duration::from_secs(config.timeout_seconds);

    let directory: Arc<dyn SupporterDirectory> = match &config.vendor {
        DirectoryVendor::Mailchimp {
            list_id,
            api_key,
            server,
        } => Arc::new(MailchimpDirectory::new(list_id, api_key, server, timeout)?),
        DirectoryVendor::Salsa {
            api_token,
            hostname,
        } => Arc::new(SalsaDirectory::new(hostname, api_token, timeout)?),
        DirectoryVendor::Memory => {
            log::warn!("Using the in-memory supporter directory, nothing reaches a mailing list");
            Arc::new(InMemorySupporterDirectory::new())
        }
    };

    Ok(directory)
}

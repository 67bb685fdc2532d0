use std::collections::HashMap;

use async_trait::async_trait;
use common::email::{Email, canonicalize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    DirectoryError, SubscriptionStatus, SupporterDirectory, SupporterRecord, SupporterUpsert,
    select_match,
};

#[derive(Default)]
struct State {
    records: HashMap<String, SupporterRecord>,
    failure: Option<DirectoryError>,
    upserts: usize,
}

/// Process-local directory for development and tests.
///
/// A failure set with [`InMemorySupporterDirectory::fail_with`] is returned
/// by every call until [`InMemorySupporterDirectory::recover`].
#[derive(Default)]
pub struct InMemorySupporterDirectory {
    state: Mutex<State>,
}

impl InMemorySupporterDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: SupporterRecord) {
        let key = canonicalize(&record.email);
        self.state.lock().await.records.insert(key, record);
    }

    pub async fn fail_with(&self, error: DirectoryError) {
        self.state.lock().await.failure = Some(error);
    }

    pub async fn recover(&self) {
        self.state.lock().await.failure = None;
    }

    /// Number of successful upserts served so far.
    pub async fn upsert_count(&self) -> usize {
        self.state.lock().await.upserts
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }
}

#[async_trait]
impl SupporterDirectory for InMemorySupporterDirectory {
    async fn find_by_email(
        &self,
        email: &Email,
        allow_invalid: bool,
    ) -> Result<Option<SupporterRecord>, DirectoryError> {
        let state = self.state.lock().await;
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }

        let candidates = state.records.values().cloned().collect();
        Ok(select_match(email, candidates, allow_invalid))
    }

    async fn upsert(&self, supporter: &SupporterUpsert) -> Result<SupporterRecord, DirectoryError> {
        let mut state = self.state.lock().await;
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }

        let record = SupporterRecord {
            email: supporter.email.as_str().to_string(),
            display_name: Some(supporter.first_name.clone()).filter(|n| !n.is_empty()),
            subscription_status: SubscriptionStatus::Subscribed,
            raw_vendor_payload: json!({
                "email": supporter.email.as_str(),
                "first_name": supporter.first_name,
                "last_name": supporter.last_name,
                "postal_code": supporter.postal_code,
            }),
        };
        state.records.insert(supporter.email.canonical(), record.clone());
        state.upserts += 1;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn upsert_request() -> SupporterUpsert {
        SupporterUpsert {
            email: Email::parse("a@x.com").unwrap(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            postal_code: "60601".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_twice_keeps_one_record() {
        let directory = InMemorySupporterDirectory::new();

        let first = directory.upsert(&upsert_request()).await.unwrap();
        let second = directory.upsert(&upsert_request()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(directory.len().await, 1);
        assert_eq!(directory.upsert_count().await, 2);
    }

    #[tokio::test]
    async fn unsubscribed_hidden_unless_allowed() {
        let directory = InMemorySupporterDirectory::new();
        directory
            .insert(SupporterRecord {
                email: "gone@x.com".to_string(),
                display_name: Some("Gone".to_string()),
                subscription_status: SubscriptionStatus::Unsubscribed,
                raw_vendor_payload: json!({}),
            })
            .await;
        let email = Email::parse("gone@x.com").unwrap();

        assert_eq!(directory.find_by_email(&email, false).await.unwrap(), None);
        assert!(directory.find_by_email(&email, true).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn injected_failure_until_recovered() {
        let directory = InMemorySupporterDirectory::new();
        let email = Email::parse("a@x.com").unwrap();
        directory
            .fail_with(DirectoryError::Unavailable("down".to_string()))
            .await;

        assert!(directory.find_by_email(&email, false).await.is_err());
        assert!(directory.upsert(&upsert_request()).await.is_err());

        directory.recover().await;
        assert!(directory.upsert(&upsert_request()).await.is_ok());
    }
}

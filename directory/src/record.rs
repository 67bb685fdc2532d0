use common::email::Email;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Subscribed,
    Unsubscribed,
    Pending,
    Bounced,
}

impl SubscriptionStatus {
    /// Whether a supporter in this state counts as a list member.
    pub fn grants_membership(self) -> bool {
        !matches!(
            self,
            SubscriptionStatus::Unsubscribed | SubscriptionStatus::Bounced
        )
    }
}

/// A supporter as read from the mailing-list platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupporterRecord {
    pub email: String,
    pub display_name: Option<String>,
    pub subscription_status: SubscriptionStatus,
    /// Untouched vendor response for this supporter.
    pub raw_vendor_payload: serde_json::Value,
}

impl SupporterRecord {
    /// A record is valid for `query` when its status grants membership and
    /// both addresses canonicalize to the same mailbox.
    pub fn is_valid_for(&self, query: &Email) -> bool {
        self.subscription_status.grants_membership() && self.matches(query)
    }

    pub fn matches(&self, query: &Email) -> bool {
        query.is_equivalent_to(&self.email)
    }

    /// Name to greet the supporter with, falling back to their address.
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Attributes written to the directory when a signup is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupporterUpsert {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub postal_code: String,
}

/// Picks the record to return for `query` from vendor search results.
///
/// Candidates whose address does not canonicalize to the query are
/// discarded. Among the rest the first valid one wins; with `allow_invalid`
/// the first matching one wins regardless of status.
pub fn select_match(
    query: &Email,
    candidates: Vec<SupporterRecord>,
    allow_invalid: bool,
) -> Option<SupporterRecord> {
    let matching: Vec<SupporterRecord> = candidates
        .into_iter()
        .filter(|candidate| candidate.matches(query))
        .collect();

    if matching.len() > 1 {
        log::debug!(
            "{} directory records match {}, picking the first usable one",
            matching.len(),
            query
        );
    }

    if allow_invalid {
        return matching.into_iter().next();
    }

    matching
        .into_iter()
        .find(|candidate| candidate.is_valid_for(query))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn record(email: &str, status: SubscriptionStatus) -> SupporterRecord {
        SupporterRecord {
            email: email.to_string(),
            display_name: None,
            subscription_status: status,
            raw_vendor_payload: json!({}),
        }
    }

    #[test]
    fn normalization_sensitive_pair_matches() {
        let query = Email::parse("User+tag@Example.com").unwrap();
        let found = select_match(
            &query,
            vec![record("user@example.com", SubscriptionStatus::Subscribed)],
            false,
        );
        assert_eq!(found.map(|r| r.email), Some("user@example.com".to_string()));
    }

    #[test]
    fn distinct_address_never_matches() {
        let query = Email::parse("alice@example.com").unwrap();
        let found = select_match(
            &query,
            vec![record("alicia@example.com", SubscriptionStatus::Subscribed)],
            false,
        );
        assert_eq!(found, None);
    }

    #[test]
    fn unsubscribed_only_returned_with_allow_invalid() {
        let query = Email::parse("gone@example.com").unwrap();
        let candidates = vec![record("gone@example.com", SubscriptionStatus::Unsubscribed)];

        assert_eq!(select_match(&query, candidates.clone(), false), None);
        assert_eq!(
            select_match(&query, candidates, true).map(|r| r.subscription_status),
            Some(SubscriptionStatus::Unsubscribed)
        );
    }

    #[test]
    fn valid_duplicate_preferred_over_invalid_one() {
        let query = Email::parse("dup@example.com").unwrap();
        let found = select_match(
            &query,
            vec![
                record("DUP@example.com", SubscriptionStatus::Bounced),
                record("dup+x@example.com", SubscriptionStatus::Pending),
            ],
            false,
        );
        assert_eq!(
            found.map(|r| r.subscription_status),
            Some(SubscriptionStatus::Pending)
        );
    }

    #[test]
    fn greeting_falls_back_to_email() {
        let mut r = record("a@x.com", SubscriptionStatus::Subscribed);
        assert_eq!(r.greeting_name(), "a@x.com");
        r.display_name = Some("  ".to_string());
        assert_eq!(r.greeting_name(), "a@x.com");
        r.display_name = Some("Ada".to_string());
        assert_eq!(r.greeting_name(), "Ada");
    }
}

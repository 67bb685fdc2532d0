//! Mailchimp Marketing API adapter.
//!
//! <https://mailchimp.com/developer/marketing/api/list-members/>

use std::time::Duration;

use async_trait::async_trait;
use common::email::Email;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use crate::{
    DirectoryError, SubscriptionStatus, SupporterDirectory, SupporterRecord, SupporterUpsert,
    select_match,
};

pub struct MailchimpDirectory {
    client: Client,
    base_url: String,
    list_id: String,
    api_key: String,
}

impl MailchimpDirectory {
    pub fn new(
        list_id: &str,
        api_key: &str,
        server: &str,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let base_url = format!("https://{}.api.mailchimp.com/3.0", server);
        Self::with_base_url(&base_url, list_id, api_key, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        list_id: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            list_id: list_id.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn read_body(response: Response) -> Result<Value, DirectoryError> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            Ok(body)
        } else {
            Err(map_error_response(status, &body))
        }
    }
}

#[async_trait]
impl SupporterDirectory for MailchimpDirectory {
    async fn find_by_email(
        &self,
        email: &Email,
        allow_invalid: bool,
    ) -> Result<Option<SupporterRecord>, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/search-members", self.base_url))
            .basic_auth("supporter-gate", Some(&self.api_key))
            .query(&[("query", email.as_str()), ("list_id", self.list_id.as_str())])
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let candidates = parse_search_response(&body)?;
        Ok(select_match(email, candidates, allow_invalid))
    }

    async fn upsert(&self, supporter: &SupporterUpsert) -> Result<SupporterRecord, DirectoryError> {
        // the member endpoint accepts the address in place of its MD5 hash
        let member: String =
            url::form_urlencoded::byte_serialize(supporter.email.as_str().as_bytes()).collect();

        let response = self
            .client
            .put(format!(
                "{}/lists/{}/members/{}",
                self.base_url, self.list_id, member
            ))
            .basic_auth("supporter-gate", Some(&self.api_key))
            .json(&upsert_payload(supporter))
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        map_member(&body).ok_or_else(|| {
            DirectoryError::Unavailable("Mailchimp returned an unreadable member".to_string())
        })
    }
}

pub fn upsert_payload(supporter: &SupporterUpsert) -> Value {
    json!({
        "email_address": supporter.email.as_str(),
        "status_if_new": "subscribed",
        "status": "subscribed",
        "merge_fields": {
            "FNAME": supporter.first_name,
            "LNAME": supporter.last_name,
        }
    })
}

/// Candidates from a `search-members` response. Only exact matches count.
pub fn parse_search_response(body: &Value) -> Result<Vec<SupporterRecord>, DirectoryError> {
    let members = body["exact_matches"]["members"].as_array().ok_or_else(|| {
        DirectoryError::Unavailable("Mailchimp search response has no exact_matches".to_string())
    })?;

    Ok(members.iter().filter_map(map_member).collect())
}

/// Maps one list member object. Returns `None` when it has no address.
pub fn map_member(member: &Value) -> Option<SupporterRecord> {
    let email = member["email_address"].as_str()?;

    let display_name = member["merge_fields"]["FNAME"]
        .as_str()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Some(SupporterRecord {
        email: email.to_string(),
        display_name,
        subscription_status: map_status(member["status"].as_str().unwrap_or_default()),
        raw_vendor_payload: member.clone(),
    })
}

pub fn map_status(status: &str) -> SubscriptionStatus {
    match status {
        "subscribed" => SubscriptionStatus::Subscribed,
        "unsubscribed" | "archived" => SubscriptionStatus::Unsubscribed,
        "cleaned" => SubscriptionStatus::Bounced,
        // "pending", "transactional" and anything newer
        _ => SubscriptionStatus::Pending,
    }
}

/// Mailchimp answers rejected payloads with 400 and a problem document.
pub fn map_error_response(status: StatusCode, body: &Value) -> DirectoryError {
    if status != StatusCode::BAD_REQUEST {
        return DirectoryError::Unavailable(format!("Mailchimp returned {}", status));
    }

    let mut reasons: Vec<String> = body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| {
                    let message = e["message"].as_str()?;
                    Some(match e["field"].as_str() {
                        Some(field) if !field.is_empty() => format!("{}: {}", field, message),
                        _ => message.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if reasons.is_empty() {
        reasons.push(
            body["detail"]
                .as_str()
                .unwrap_or("Mailchimp rejected the supporter data")
                .to_string(),
        );
    }

    DirectoryError::ValidationRejected(reasons.join("; "))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn search_response_yields_exact_matches() {
        let body = json!({
            "exact_matches": {
                "members": [
                    {
                        "email_address": "user@example.com",
                        "status": "subscribed",
                        "merge_fields": { "FNAME": "Ada", "LNAME": "Lovelace" }
                    },
                    { "status": "subscribed" }
                ],
                "total_items": 2
            },
            "full_search": { "members": [], "total_items": 0 }
        });

        let records = parse_search_response(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email, "user@example.com");
        assert_eq!(records[0].display_name.as_deref(), Some("Ada"));
        assert_eq!(records[0].subscription_status, SubscriptionStatus::Subscribed);
    }

    #[test]
    fn missing_first_name_is_none() {
        let member = json!({
            "email_address": "a@x.com",
            "status": "cleaned",
            "merge_fields": { "FNAME": "" }
        });
        let record = map_member(&member).unwrap();
        assert_eq!(record.display_name, None);
        assert_eq!(record.subscription_status, SubscriptionStatus::Bounced);
    }

    #[test]
    fn malformed_search_response_is_unavailable() {
        assert!(matches!(
            parse_search_response(&json!({ "title": "oops" })),
            Err(DirectoryError::Unavailable(_))
        ));
    }

    #[test]
    fn bad_request_is_validation_rejected_with_field_reasons() {
        let body = json!({
            "title": "Invalid Resource",
            "detail": "Your merge fields were invalid.",
            "errors": [ { "field": "ZIP", "message": "Please enter a valid zip code" } ]
        });
        assert_eq!(
            map_error_response(StatusCode::BAD_REQUEST, &body),
            DirectoryError::ValidationRejected("ZIP: Please enter a valid zip code".to_string())
        );
    }

    #[test]
    fn bad_request_without_errors_uses_detail() {
        let body = json!({ "detail": "user@example.com looks fake or invalid" });
        assert_eq!(
            map_error_response(StatusCode::BAD_REQUEST, &body),
            DirectoryError::ValidationRejected("user@example.com looks fake or invalid".to_string())
        );
    }

    #[test]
    fn auth_and_server_failures_are_retryable() {
        assert!(map_error_response(StatusCode::UNAUTHORIZED, &Value::Null).is_retryable());
        assert!(map_error_response(StatusCode::BAD_GATEWAY, &Value::Null).is_retryable());
    }

    #[test]
    fn upsert_payload_subscribes_with_names() {
        let payload = upsert_payload(&SupporterUpsert {
            email: Email::parse("a@x.com").unwrap(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            postal_code: "60601".to_string(),
        });
        assert_eq!(payload["status_if_new"], "subscribed");
        assert_eq!(payload["merge_fields"]["FNAME"], "Ada");
        assert_eq!(payload["merge_fields"]["LNAME"], "Lovelace");
    }
}

//! Salsa Engage integration API adapter.
//!
//! <https://help.salsalabs.com/hc/en-us/articles/224470107-Engage-API-Supporter-Data>

use std::time::Duration;

use async_trait::async_trait;
use common::email::Email;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use crate::{
    DirectoryError, SubscriptionStatus, SupporterDirectory, SupporterRecord, SupporterUpsert,
    select_match,
};

pub struct SalsaDirectory {
    client: Client,
    base_url: String,
    api_token: String,
}

impl SalsaDirectory {
    pub fn new(hostname: &str, api_token: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!(
                "{}/api/integration/ext/v1",
                hostname.trim_end_matches('/')
            ),
            api_token: api_token.to_string(),
        })
    }

    async fn read_body(response: Response) -> Result<Value, DirectoryError> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            Ok(body)
        } else if status == StatusCode::BAD_REQUEST {
            Err(DirectoryError::ValidationRejected(
                collect_errors(&body).unwrap_or_else(|| "Salsa rejected the request".to_string()),
            ))
        } else {
            Err(DirectoryError::Unavailable(format!("Salsa returned {}", status)))
        }
    }
}

#[async_trait]
impl SupporterDirectory for SalsaDirectory {
    async fn find_by_email(
        &self,
        email: &Email,
        allow_invalid: bool,
    ) -> Result<Option<SupporterRecord>, DirectoryError> {
        let response = self
            .client
            .post(format!("{}/supporters/search", self.base_url))
            .header("authToken", &self.api_token)
            .json(&json!({
                "payload": {
                    "identifiers": [email.as_str()],
                    "identifierType": "EMAIL_ADDRESS"
                }
            }))
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let candidates = parse_search_response(&body)?;
        Ok(select_match(email, candidates, allow_invalid))
    }

    async fn upsert(&self, supporter: &SupporterUpsert) -> Result<SupporterRecord, DirectoryError> {
        let response = self
            .client
            .put(format!("{}/supporters", self.base_url))
            .header("authToken", &self.api_token)
            .json(&upsert_payload(supporter))
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        parse_upsert_response(&body)
    }
}

pub fn upsert_payload(supporter: &SupporterUpsert) -> Value {
    json!({
        "payload": {
            "supporters": [{
                "firstName": supporter.first_name,
                "lastName": supporter.last_name,
                "address": { "postalCode": supporter.postal_code },
                "contacts": [{
                    "type": "EMAIL",
                    "value": supporter.email.as_str(),
                    "status": "OPT_IN"
                }]
            }]
        }
    })
}

pub fn parse_search_response(body: &Value) -> Result<Vec<SupporterRecord>, DirectoryError> {
    let supporters = body["payload"]["supporters"].as_array().ok_or_else(|| {
        DirectoryError::Unavailable("Salsa search response has no supporters".to_string())
    })?;

    Ok(supporters
        .iter()
        .filter(|s| s["result"].as_str() == Some("FOUND"))
        .filter_map(map_supporter)
        .collect())
}

/// Interprets the decorated `result` of the single supporter sent.
pub fn parse_upsert_response(body: &Value) -> Result<SupporterRecord, DirectoryError> {
    let supporter = &body["payload"]["supporters"][0];

    match supporter["result"].as_str() {
        Some("ADDED") | Some("UPDATED") => map_supporter(supporter).ok_or_else(|| {
            DirectoryError::Unavailable("Salsa returned a supporter without email".to_string())
        }),
        Some("VALIDATION_ERROR") => Err(DirectoryError::ValidationRejected(
            collect_errors(supporter)
                .unwrap_or_else(|| "Salsa rejected the supporter data".to_string()),
        )),
        Some(other) => Err(DirectoryError::Unavailable(format!(
            "Salsa upsert finished with {}",
            other
        ))),
        None => Err(DirectoryError::Unavailable(
            "Salsa upsert response has no result".to_string(),
        )),
    }
}

pub fn map_supporter(supporter: &Value) -> Option<SupporterRecord> {
    let contact = supporter["contacts"]
        .as_array()?
        .iter()
        .find(|c| c["type"].as_str() == Some("EMAIL"))?;
    let email = contact["value"].as_str()?;

    let display_name = supporter["firstName"]
        .as_str()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Some(SupporterRecord {
        email: email.to_string(),
        display_name,
        subscription_status: map_contact_status(contact["status"].as_str().unwrap_or_default()),
        raw_vendor_payload: supporter.clone(),
    })
}

pub fn map_contact_status(status: &str) -> SubscriptionStatus {
    match status {
        "OPT_IN" => SubscriptionStatus::Subscribed,
        "OPT_OUT" => SubscriptionStatus::Unsubscribed,
        "HARD_BOUNCE" => SubscriptionStatus::Bounced,
        _ => SubscriptionStatus::Pending,
    }
}

/// Gathers `errors[].message` from a supporter and its contacts.
fn collect_errors(value: &Value) -> Option<String> {
    let mut messages = Vec::new();

    let mut push_from = |errors: &Value| {
        for error in errors.as_array().into_iter().flatten() {
            if let Some(message) = error["message"].as_str() {
                messages.push(match error["fieldName"].as_str() {
                    Some(field) => format!("{}: {}", field, message),
                    None => message.to_string(),
                });
            }
        }
    };

    push_from(&value["errors"]);
    for contact in value["contacts"].as_array().into_iter().flatten() {
        push_from(&contact["errors"]);
    }
    push_from(&value["address"]["errors"]);

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn supporter(result: &str, email: &str, status: &str) -> Value {
        json!({
            "result": result,
            "firstName": "Ada",
            "lastName": "Lovelace",
            "contacts": [
                { "type": "PHONE", "value": "555-0100" },
                { "type": "EMAIL", "value": email, "status": status }
            ]
        })
    }

    #[test]
    fn search_keeps_only_found_supporters() {
        let body = json!({
            "payload": {
                "supporters": [
                    supporter("FOUND", "a@x.com", "OPT_IN"),
                    { "result": "NOT_FOUND", "contacts": [] }
                ]
            }
        });

        let records = parse_search_response(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email, "a@x.com");
        assert_eq!(records[0].display_name.as_deref(), Some("Ada"));
        assert_eq!(records[0].subscription_status, SubscriptionStatus::Subscribed);
    }

    #[test]
    fn contact_statuses_map() {
        assert_eq!(map_contact_status("OPT_OUT"), SubscriptionStatus::Unsubscribed);
        assert_eq!(map_contact_status("HARD_BOUNCE"), SubscriptionStatus::Bounced);
        assert_eq!(map_contact_status("UNKNOWN"), SubscriptionStatus::Pending);
    }

    #[test]
    fn added_and_updated_are_success() {
        for result in ["ADDED", "UPDATED"] {
            let supporters = [supporter(result, "a@x.com", "OPT_IN")];
            let body = json!({ "payload": { "supporters": supporters } });
            assert_eq!(parse_upsert_response(&body).unwrap().email, "a@x.com");
        }
    }

    #[test]
    fn validation_error_surfaces_field_messages() {
        let mut rejected = supporter("VALIDATION_ERROR", "a@x.com", "OPT_IN");
        rejected["address"] = json!({
            "postalCode": "nope",
            "errors": [ { "fieldName": "postalCode", "message": "Invalid postal code" } ]
        });
        let body = json!({ "payload": { "supporters": [rejected] } });

        assert_eq!(
            parse_upsert_response(&body),
            Err(DirectoryError::ValidationRejected(
                "postalCode: Invalid postal code".to_string()
            ))
        );
    }

    #[test]
    fn system_error_is_retryable() {
        let body = json!({ "payload": { "supporters": [ { "result": "SYSTEM_ERROR" } ] } });
        assert!(parse_upsert_response(&body).unwrap_err().is_retryable());
    }

    #[test]
    fn upsert_payload_opts_in_email_contact() {
        let payload = upsert_payload(&SupporterUpsert {
            email: Email::parse("a@x.com").unwrap(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            postal_code: "60601".to_string(),
        });
        let sent = &payload["payload"]["supporters"][0];
        assert_eq!(sent["address"]["postalCode"], "60601");
        assert_eq!(sent["contacts"][0]["status"], "OPT_IN");
    }
}

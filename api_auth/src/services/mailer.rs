use std::time::Duration;

use async_trait::async_trait;
use common::{env_config::MailConfig, error::Res};
use reqwest::Client;
use serde::Serialize;
use verification::{NotificationSink, NotifyError, VerificationEmail};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: MailAddress,
    to: Vec<MailAddress>,
    subject: String,
    html_content: String,
    text_content: String,
}

/// Sends verification emails through a Brevo-compatible transactional API.
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
}

impl HttpMailer {
    pub fn new(config: &MailConfig, api_key: &str, timeout: Duration) -> Res<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_url: config.api_url.clone(),
            api_key: api_key.to_string(),
            sender_email: config.sender_email.clone(),
            sender_name: config.sender_name.clone(),
        })
    }

    fn body(&self, email: &VerificationEmail) -> SendEmailBody {
        SendEmailBody {
            sender: MailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![MailAddress {
                email: email.to.clone(),
                name: Some(email.to_name.clone()).filter(|n| !n.trim().is_empty()),
            }],
            subject: email.subject.clone(),
            html_content: email.html_body(),
            text_content: email.text_body(),
        }
    }
}

#[async_trait]
impl NotificationSink for HttpMailer {
    async fn send_verification(&self, email: &VerificationEmail) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&self.body(email))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            log::info!("Verification email sent to {}", email.to);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected(format!(
            "mail API answered {}: {}",
            status, body
        )))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use verification::notify::VERIFICATION_SUBJECT;

    use super::*;

    #[test]
    fn payload_shape() {
        let mailer = HttpMailer::new(
            &MailConfig {
                api_url: "http://127.0.0.1:9/v3/smtp/email".to_string(),
                api_key: Some("key".to_string()),
                sender_email: "no-reply@example.org".to_string(),
                sender_name: None,
            },
            "key",
            Duration::from_secs(1),
        )
        .unwrap();

        let email = VerificationEmail {
            to: "a@x.com".to_string(),
            to_name: "Ada".to_string(),
            subject: VERIFICATION_SUBJECT.to_string(),
            link: "http://localhost/verify/1/abc".to_string(),
        };

        let body = serde_json::to_value(mailer.body(&email)).unwrap();
        assert_eq!(body["sender"], json!({ "email": "no-reply@example.org" }));
        assert_eq!(body["to"], json!([{ "email": "a@x.com", "name": "Ada" }]));
        assert_eq!(body["subject"], json!("Activate Your Account"));
        assert!(
            body["textContent"]
                .as_str()
                .unwrap()
                .contains("http://localhost/verify/1/abc")
        );
    }
}

use async_trait::async_trait;
use thiserror::Error;

pub const VERIFICATION_SUBJECT: &str = "Activate Your Account";

/// The verification email for one pending account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEmail {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub link: String,
}

impl VerificationEmail {
    pub fn text_body(&self) -> String {
        format!(
            "Hi {},\n\nPlease click the link below to confirm your email address and activate your account:\n\n{}\n\nIf you did not sign up, you can ignore this message.\n",
            self.to_name, self.link
        )
    }

    pub fn html_body(&self) -> String {
        format!(
            "<p>Hi {},</p><p>Please click the link below to confirm your email address and activate your account:</p><p><a href=\"{}\">{}</a></p><p>If you did not sign up, you can ignore this message.</p>",
            escape_html(&self.to_name),
            self.link,
            self.link
        )
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail provider rejected the message: {0}")]
    Rejected(String),
}

/// Outbound delivery of verification emails.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_verification(&self, email: &VerificationEmail) -> Result<(), NotifyError>;
}

/// Writes the link to the log instead of sending mail.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send_verification(&self, email: &VerificationEmail) -> Result<(), NotifyError> {
        log::warn!(
            "Mail delivery is not configured; verification link for {}: {}",
            email.to,
            email.link
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_body_escapes_name() {
        let email = VerificationEmail {
            to: "a@x.com".to_string(),
            to_name: "<b>Ada</b>".to_string(),
            subject: VERIFICATION_SUBJECT.to_string(),
            link: "http://localhost/verify/1/abc".to_string(),
        };
        let html = email.html_body();
        assert!(html.contains("&lt;b&gt;Ada&lt;/b&gt;"));
        assert!(html.contains("href=\"http://localhost/verify/1/abc\""));
        assert!(email.text_body().contains("http://localhost/verify/1/abc"));
    }
}

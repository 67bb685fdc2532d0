//! Visitor-facing wording.

use chrono::{DateTime, Utc};
use directory::DirectoryError;

use crate::dtos::form::FlashMessage;

pub const HUMAN_CHECK_FAILED: &str = "We could not confirm that you are human. Please try again.";

pub fn welcome_back(name: &str) -> FlashMessage {
    FlashMessage::info(None, format!("Welcome back, {}!", name))
}

pub fn signup_thanks() -> FlashMessage {
    FlashMessage::info(
        Some("Thanks for signing up!"),
        "Please check your email for an activation link.",
    )
}

pub fn awaiting_confirmation(email: &str, sent_at: DateTime<Utc>) -> FlashMessage {
    FlashMessage::info(
        Some("Verify your email address"),
        format!(
            "We sent an activation link to {} on {}. Please check your inbox and spam folder, then click the link to continue.",
            email,
            sent_at.format("%B %d, %Y")
        ),
    )
}

pub fn logged_in() -> FlashMessage {
    FlashMessage::info(
        None,
        "We've logged you in so you can continue using the database.",
    )
}

pub fn invalid_link(support_html: &str) -> FlashMessage {
    FlashMessage::error(format!(
        "You clicked an invalid activation link. If you need help, {}",
        support_html
    ))
}

pub fn activation_retry(support_html: &str) -> FlashMessage {
    FlashMessage::error(format!(
        "Something went wrong while activating your account. Please try to use the activation link again. If the problem persists, {}",
        support_html
    ))
}

/// Outages ask for another click; rejections carry the vendor's reason.
pub fn activation_failed(error: &DirectoryError, support_html: &str) -> FlashMessage {
    match error {
        DirectoryError::Unavailable(_) => activation_retry(support_html),
        DirectoryError::ValidationRejected(_) => {
            FlashMessage::error(directory_error(error, support_html))
        }
    }
}

pub fn not_a_member(email: &str) -> String {
    format!(
        "{} is not subscribed to the mailing list. Please sign up to access this tool.",
        email
    )
}

pub fn retry(support_html: &str) -> String {
    format!(
        "Something went wrong, please try again. If the problem persists, {}",
        support_html
    )
}

pub fn directory_error(error: &DirectoryError, support_html: &str) -> String {
    match error {
        DirectoryError::Unavailable(_) => retry(support_html),
        DirectoryError::ValidationRejected(reason) => format!(
            "The mailing list did not accept your details ({}). If this looks wrong, {}",
            reason, support_html
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn awaiting_confirmation_names_the_day() {
        let sent_at = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        let message = awaiting_confirmation("a@x.com", sent_at);
        assert!(message.body.contains("a@x.com on March 07, 2026"));
    }

    #[test]
    fn vendor_rejection_keeps_reason() {
        let message = directory_error(
            &DirectoryError::ValidationRejected("postalCode: invalid".to_string()),
            "contact us.",
        );
        assert!(message.contains("postalCode: invalid"));
        assert!(message.ends_with("contact us."));
    }

    #[test]
    fn activation_failure_only_suggests_retry_on_outage() {
        let outage = activation_failed(
            &DirectoryError::Unavailable("timeout".to_string()),
            "contact us.",
        );
        assert!(outage.body.contains("use the activation link again"));

        let rejected = activation_failed(
            &DirectoryError::ValidationRejected("postalCode: invalid".to_string()),
            "contact us.",
        );
        assert!(rejected.body.contains("postalCode: invalid"));
        assert!(!rejected.body.contains("activation link again"));
    }
}

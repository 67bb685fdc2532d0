use common::email::Email;
use url::Url;
use verification::SignupRequest;

use crate::dtos::form::{FieldErrors, LoginForm, SignupForm};

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const HONEYPOT: &str = "Invalid value for hidden field";

/// Turns a raw signup form into a request the orchestrator accepts.
pub fn validate_signup(form: &SignupForm) -> Result<SignupRequest, FieldErrors> {
    let mut errors = FieldErrors::new();

    check_honeypot(&mut errors, &form.address);
    let email = check_email(&mut errors, &form.email);
    let first_name = required(&mut errors, "first_name", &form.first_name);
    let last_name = required(&mut errors, "last_name", &form.last_name);
    let postal_code = required(&mut errors, "zip_code", &form.zip_code);

    match email {
        Some(email) if errors.is_empty() => Ok(SignupRequest {
            email,
            first_name,
            last_name,
            postal_code,
        }),
        _ => Err(errors),
    }
}

pub fn validate_login(form: &LoginForm) -> Result<Email, FieldErrors> {
    let mut errors = FieldErrors::new();

    check_honeypot(&mut errors, &form.address);
    let email = check_email(&mut errors, &form.email);

    match email {
        Some(email) if errors.is_empty() => Ok(email),
        _ => Err(errors),
    }
}

/// Where to send the visitor after a successful form post.
///
/// Relative paths and URLs on the same origin as `default` are kept;
/// anything else falls back to `default`.
pub fn safe_next(next: Option<&str>, default: &str) -> String {
    let Some(next) = next.map(str::trim).filter(|n| !n.is_empty()) else {
        return default.to_string();
    };

    // browsers read `/\host` like `//host`; joining applies the same rules
    let allowed = Url::parse(default);
    let candidate = allowed.as_ref().ok().map(|base| base.join(next));

    match (candidate, allowed) {
        (Some(Ok(candidate)), Ok(allowed)) if candidate.origin() == allowed.origin() => {
            next.to_string()
        }
        _ => {
            log::warn!("Ignoring off-site redirect target {}", next);
            default.to_string()
        }
    }
}

fn add_error(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn required(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        add_error(errors, field, REQUIRED);
    }
    value.to_string()
}

fn check_email(errors: &mut FieldErrors, raw: &str) -> Option<Email> {
    if raw.trim().is_empty() {
        add_error(errors, "email", REQUIRED);
        return None;
    }
    match Email::parse(raw) {
        Ok(email) => Some(email),
        Err(_) => {
            add_error(errors, "email", INVALID_EMAIL);
            None
        }
    }
}

fn check_honeypot(errors: &mut FieldErrors, value: &str) {
    if !value.is_empty() {
        log::info!("Honeypot field filled in, refusing form");
        add_error(errors, "address", HONEYPOT);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn signup_form() -> SignupForm {
        SignupForm {
            email: " Ada@Example.com ".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            zip_code: "60601".to_string(),
            recaptcha_token: "token".to_string(),
            next: None,
            address: String::new(),
        }
    }

    #[test]
    fn valid_signup_is_trimmed() {
        let request = validate_signup(&signup_form()).unwrap();
        assert_eq!(request.email.as_str(), "Ada@Example.com");
        assert_eq!(request.postal_code, "60601");
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let form = SignupForm {
            email: "not-an-email".to_string(),
            first_name: "  ".to_string(),
            zip_code: String::new(),
            ..signup_form()
        };

        let errors = validate_signup(&form).unwrap_err();
        assert_eq!(
            errors.keys().cloned().collect::<Vec<_>>(),
            vec!["email", "first_name", "zip_code"]
        );
        assert_eq!(errors["email"], vec![INVALID_EMAIL.to_string()]);
    }

    #[test]
    fn honeypot_rejects_login() {
        let form = LoginForm {
            email: "a@x.com".to_string(),
            next: None,
            address: "1 Main St".to_string(),
        };
        let errors = validate_login(&form).unwrap_err();
        assert_eq!(errors["address"], vec![HONEYPOT.to_string()]);
    }

    #[test]
    fn next_stays_on_site() {
        let default = "https://tool.example.org/app";

        assert_eq!(safe_next(None, default), default);
        assert_eq!(safe_next(Some(""), default), default);
        assert_eq!(safe_next(Some("/search?q=1"), default), "/search?q=1");
        assert_eq!(
            safe_next(Some("https://tool.example.org/other"), default),
            "https://tool.example.org/other"
        );
        assert_eq!(safe_next(Some("//evil.test/"), default), default);
        assert_eq!(safe_next(Some("/\\evil.test/"), default), default);
        assert_eq!(safe_next(Some("\\\\evil.test/"), default), default);
        assert_eq!(safe_next(Some("javascript:alert(1)"), default), default);
        assert_eq!(safe_next(Some("https://evil.test/"), default), default);
    }
}

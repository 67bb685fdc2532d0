use std::collections::BTreeMap;

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

/// Form-wide errors are reported under this key.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default, rename = "g-recaptcha-response")]
    pub recaptcha_token: String,
    pub next: Option<String>,
    /// Honeypot. Hidden from people, filled in by naive bots.
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    pub next: Option<String>,
    #[serde(default)]
    pub address: String,
}

/// JSON answer to a form post.
///
/// The embedding page follows `redirect_url` when set and otherwise renders
/// `errors` next to the matching fields.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormResponse {
    pub redirect_url: Option<String>,
    pub errors: FieldErrors,
}

impl FormResponse {
    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            redirect_url: Some(url.into()),
            errors: FieldErrors::new(),
        }
    }

    pub fn invalid(errors: FieldErrors) -> Self {
        Self {
            redirect_url: None,
            errors,
        }
    }

    pub fn error(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::invalid(errors)
    }

    pub fn into_response(self) -> HttpResponse {
        if self.errors.is_empty() {
            HttpResponse::Ok().json(self)
        } else {
            HttpResponse::BadRequest().json(self)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Error,
}

/// Notice shown to the visitor on the next page they land on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
}

impl FlashMessage {
    pub fn info(title: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            title: title.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            title: None,
            body: body.into(),
        }
    }
}

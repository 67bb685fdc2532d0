use actix_session::Session;
use actix_web::cookie::{Cookie, SameSite, time::Duration};
use common::{
    env_config::AuthCookieConfig,
    error::{AppError, Res},
};
use serde::{Deserialize, Serialize};

use crate::dtos::form::FlashMessage;

const FLASH_KEY: &str = "flash";
const VERIFIED_KEY: &str = "verified_supporter";

/// A supporter the directory vouched for, waiting for `/authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedSupporter {
    pub email: String,
    pub next: Option<String>,
}

pub fn push_flash(session: &Session, message: FlashMessage) -> Res<()> {
    let mut messages = session
        .get::<Vec<FlashMessage>>(FLASH_KEY)
        .map_err(|_| AppError::BadRequest("Session flash error".to_string()))?
        .unwrap_or_default();
    messages.push(message);
    session
        .insert(FLASH_KEY, messages)
        .map_err(|_| AppError::Internal("Failed to store flash message".to_string()))
}

/// Removes and returns every pending flash message.
pub fn take_flash(session: &Session) -> Res<Vec<FlashMessage>> {
    let messages = session
        .remove_as::<Vec<FlashMessage>>(FLASH_KEY)
        .transpose()
        .map_err(|_| AppError::BadRequest("Session flash error".to_string()))?
        .unwrap_or_default();
    Ok(messages)
}

pub fn mark_verified(session: &Session, email: &str, next: Option<String>) -> Res<()> {
    session
        .insert(
            VERIFIED_KEY,
            VerifiedSupporter {
                email: email.to_string(),
                next,
            },
        )
        .map_err(|_| AppError::Internal("Failed to store verified supporter".to_string()))
}

/// The verified marker is single use.
pub fn take_verified(session: &Session) -> Res<Option<VerifiedSupporter>> {
    session
        .remove_as::<VerifiedSupporter>(VERIFIED_KEY)
        .transpose()
        .map_err(|_| AppError::BadRequest("Session verified marker error".to_string()))
}

/// Cookie the protected application checks before serving the tool.
pub fn trust_cookie(config: &AuthCookieConfig, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build(config.name.clone(), "true")
        .path("/")
        .max_age(Duration::weeks(config.max_age_weeks))
        .same_site(SameSite::Lax)
        .secure(secure)
        .finish();

    if let Some(domain) = &config.domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn trust_cookie_attributes() {
        let cookie = trust_cookie(
            &AuthCookieConfig {
                name: "supporter_ok".to_string(),
                domain: Some(".example.org".to_string()),
                max_age_weeks: 52,
            },
            true,
        );

        assert_eq!(cookie.name(), "supporter_ok");
        assert_eq!(cookie.value(), "true");
        assert_eq!(cookie.domain(), Some("example.org"));
        assert_eq!(cookie.max_age(), Some(Duration::weeks(52)));
        assert_eq!(cookie.secure(), Some(true));
    }
}

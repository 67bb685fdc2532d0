use actix_session::Session;
use actix_web::{HttpResponse, get, http::header::LOCATION, web};
use common::{env_config::Config, error::Res, http::Redirect};
use std::sync::Arc;

use crate::services::{messages, session};

/// Issues the trust cookie for a supporter verified earlier in this session.
///
/// Always redirects. Without a verified supporter in the session no cookie
/// is set.
#[get("/authenticate")]
pub async fn get_authenticate(
    config: web::Data<Arc<Config>>,
    session: Session,
) -> Res<HttpResponse> {
    let Some(verified) = session::take_verified(&session)? else {
        return Ok(Redirect::found(&config.auth_redirect_location));
    };

    log::info!("Issuing trust cookie for {}", verified.email);
    session::push_flash(&session, messages::logged_in())?;

    let location = verified
        .next
        .unwrap_or_else(|| config.auth_redirect_location.clone());
    let cookie = session::trust_cookie(&config.auth_cookie, config.is_production());

    Ok(HttpResponse::Found()
        .cookie(cookie)
        .append_header((LOCATION, location))
        .finish())
}

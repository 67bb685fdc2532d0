use actix_session::Session;
use actix_web::{HttpResponse, get, web};
use common::{env_config::Config, error::Res, http::Redirect};
use std::sync::Arc;
use uuid::Uuid;
use verification::{ConfirmOutcome, VerificationOrchestrator};

use crate::services::{messages, session};

/// Target of the activation link sent by email.
///
/// # Output
/// - Valid link: the supporter is added to the mailing list and redirected
///   to `/authenticate`
/// - Anything else: redirect to the landing page with an error message.
///   Unknown, used and forged links look the same.
#[get("/verify/{account_id}/{token}")]
pub async fn get_verify(
    path: web::Path<(String, String)>,
    orchestrator: web::Data<VerificationOrchestrator>,
    config: web::Data<Arc<Config>>,
    session: Session,
) -> Res<HttpResponse> {
    let (account_id, token) = path.into_inner();

    let outcome = match Uuid::parse_str(&account_id) {
        Ok(account_id) => orchestrator.confirm_link(account_id, &token).await?,
        Err(_) => ConfirmOutcome::InvalidLink,
    };

    match outcome {
        ConfirmOutcome::Confirmed(record) => {
            session::push_flash(&session, messages::welcome_back(record.greeting_name()))?;
            session::mark_verified(&session, &record.email, None)?;
            Ok(Redirect::found("/authenticate"))
        }
        ConfirmOutcome::DirectoryError(error) => {
            let message = messages::activation_failed(&error, &config.support_contact_html);
            session::push_flash(&session, message)?;
            Ok(Redirect::found(&config.auth_redirect_location))
        }
        ConfirmOutcome::InvalidLink => {
            let message = messages::invalid_link(&config.support_contact_html);
            session::push_flash(&session, message)?;
            Ok(Redirect::found(&config.auth_redirect_location))
        }
    }
}

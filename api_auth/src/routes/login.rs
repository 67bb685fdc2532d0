use actix_session::Session;
use actix_web::{HttpResponse, post, web};
use common::{env_config::Config, error::Res};
use std::sync::Arc;
use verification::{LoginOutcome, VerificationOrchestrator};

use crate::dtos::form::{FormResponse, LoginForm};
use crate::services::{messages, session, validation};

/// Lets a returning list member back in by email address.
///
/// # Input
/// - `form`: urlencoded `email`, optional `next` and the empty honeypot `address`
///
/// # Output
/// - Member: redirect to `/authenticate`
/// - Not a member or directory trouble: 400 with an error on `email`
#[post("/login")]
pub async fn post_login(
    form: web::Form<LoginForm>,
    orchestrator: web::Data<VerificationOrchestrator>,
    config: web::Data<Arc<Config>>,
    session: Session,
) -> Res<HttpResponse> {
    let form = form.into_inner();
    let email = match validation::validate_login(&form) {
        Ok(email) => email,
        Err(errors) => return Ok(FormResponse::invalid(errors).into_response()),
    };

    let response = match orchestrator.login(&email).await {
        LoginOutcome::NotAMember => {
            FormResponse::error("email", messages::not_a_member(email.as_str()))
        }
        LoginOutcome::DirectoryError(error) => FormResponse::error(
            "email",
            messages::directory_error(&error, &config.support_contact_html),
        ),
        LoginOutcome::Authenticated(record) => {
            let next = validation::safe_next(form.next.as_deref(), &config.auth_redirect_location);
            session::push_flash(&session, messages::welcome_back(record.greeting_name()))?;
            session::mark_verified(&session, &record.email, Some(next))?;
            FormResponse::redirect("/authenticate")
        }
    };

    Ok(response.into_response())
}

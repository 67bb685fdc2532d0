use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, post, web};
use common::{env_config::Config, error::Res};
use std::sync::Arc;
use verification::{SignupOutcome, VerificationOrchestrator};

use crate::dtos::form::{FormResponse, NON_FIELD_ERRORS, SignupForm};
use crate::services::{
    captcha::{HumanGate, HumanVerdict},
    messages, session, validation,
};

/// Signs a visitor up for the mailing list.
///
/// # Input
/// - `form`: urlencoded `email`, `first_name`, `last_name`, `zip_code`,
///   `g-recaptcha-response`, optional `next` and the empty honeypot `address`
///
/// # Output
/// - Known member: redirect to `/authenticate`
/// - New or pending signup: redirect to `next`, a flash message explains the
///   activation email
/// - Otherwise 400 with `errors`
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/signup', {
///   method: 'POST',
///   credentials: 'include',
///   body: new URLSearchParams(new FormData(form))
/// });
/// const { redirect_url, errors } = await response.json();
/// if (redirect_url) window.location.href = redirect_url;
/// ```
#[post("/signup")]
pub async fn post_signup(
    req: HttpRequest,
    form: web::Form<SignupForm>,
    orchestrator: web::Data<VerificationOrchestrator>,
    gate: web::Data<dyn HumanGate>,
    config: web::Data<Arc<Config>>,
    session: Session,
) -> Res<HttpResponse> {
    let form = form.into_inner();
    let request = match validation::validate_signup(&form) {
        Ok(request) => request,
        Err(errors) => return Ok(FormResponse::invalid(errors).into_response()),
    };

    let remote_ip = req
        .connection_info()
        .realip_remote_addr()
        .map(str::to_string);
    let verdict = gate.check(&form.recaptcha_token, remote_ip.as_deref()).await;
    if verdict == HumanVerdict::Unavailable {
        let message = messages::retry(&config.support_contact_html);
        return Ok(FormResponse::error(NON_FIELD_ERRORS, message).into_response());
    }

    let next = validation::safe_next(form.next.as_deref(), &config.auth_redirect_location);

    let response = match orchestrator.signup(request, verdict.is_human()).await? {
        SignupOutcome::Rejected => {
            FormResponse::error(NON_FIELD_ERRORS, messages::HUMAN_CHECK_FAILED)
        }
        SignupOutcome::DirectoryError(error) => FormResponse::error(
            NON_FIELD_ERRORS,
            messages::directory_error(&error, &config.support_contact_html),
        ),
        SignupOutcome::AlreadyMember(record) => {
            session::push_flash(&session, messages::welcome_back(record.greeting_name()))?;
            session::mark_verified(&session, &record.email, Some(next))?;
            FormResponse::redirect("/authenticate")
        }
        SignupOutcome::AwaitingConfirmation(account) => {
            session::push_flash(
                &session,
                messages::awaiting_confirmation(&account.email, account.created_at),
            )?;
            FormResponse::redirect(next)
        }
        SignupOutcome::SignupCreated(_) => {
            session::push_flash(&session, messages::signup_thanks())?;
            FormResponse::redirect(next)
        }
    };

    Ok(response.into_response())
}

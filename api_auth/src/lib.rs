use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{
    cookie::{Key, SameSite},
    web,
};

pub mod routes {
    pub mod authenticate;
    pub mod login;
    pub mod messages;
    pub mod signup;
    pub mod verify;
}
pub mod services {
    pub mod captcha;
    pub mod mailer;
    pub mod messages;
    pub mod session;
    pub mod validation;
}
pub mod dtos {
    pub mod form;
}

/// Signup, login, verification link and trust cookie endpoints.
///
/// Expects `web::Data<VerificationOrchestrator>`, `web::Data<dyn HumanGate>`
/// and `web::Data<Arc<Config>>` on the app, and the session middleware.
pub fn mount_auth() -> actix_web::Scope {
    web::scope("")
        .service(routes::signup::post_signup)
        .service(routes::login::post_login)
        .service(routes::verify::get_verify)
        .service(routes::authenticate::get_authenticate)
        .service(routes::messages::get_messages)
}

/// Signed cookie session carrying flash messages and the verified marker.
///
/// `secret` must be at least 64 bytes.
pub fn session_middleware(
    cookie_secure: bool,
    secret: &[u8],
) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::from(secret))
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_same_site(SameSite::Lax)
        .build()
}

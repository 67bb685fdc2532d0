pub mod notify;
pub mod orchestrator;
pub mod token;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use notify::{LogNotificationSink, NotificationSink, NotifyError, VerificationEmail};
pub use orchestrator::{
    ConfirmOutcome, LoginOutcome, SignupOutcome, SignupRequest, VerificationOrchestrator,
};
pub use token::TokenService;

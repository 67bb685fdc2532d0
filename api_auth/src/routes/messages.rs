use actix_session::Session;
use actix_web::{Responder, get};
use common::{error::Res, http::Success};

use crate::services::session;

/// Returns and clears the notices queued for this visitor.
///
/// # Frontend Example
/// ```javascript
/// const messages = await (await fetch('/messages', { credentials: 'include' })).json();
/// messages.forEach(({ level, title, body }) => showNotice(level, title, body));
/// ```
#[get("/messages")]
pub async fn get_messages(session: Session) -> Res<impl Responder> {
    Success::ok(session::take_flash(&session)?)
}

use actix_web::{HttpResponse, Responder, http::header::LOCATION};
use serde::Serialize;

use super::error::Res;

pub struct Success;
impl Success {
    pub fn ok<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Ok().json(body))
    }
}

pub struct Redirect;
impl Redirect {
    /// 302 to `location`.
    pub fn found(location: &str) -> HttpResponse {
        HttpResponse::Found()
            .append_header((LOCATION, location))
            .finish()
    }
}

use crate::core::AppError;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// Header carrying the authenticated customer id, set by the upstream auth layer
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the authenticated administrator id
pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";

/// Authenticated customer making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Authenticated administrator making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminId(pub String);

fn header_identity(req: &HttpRequest, header: &str) -> Result<String, AppError> {
    req.headers()
        .get(header)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthorized(format!("Missing {} header", header)))
}

impl FromRequest for UserId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(header_identity(req, USER_ID_HEADER).map(UserId))
    }
}

impl FromRequest for AdminId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(header_identity(req, ADMIN_ID_HEADER).map(AdminId))
    }
}

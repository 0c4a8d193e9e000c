//! Caller identity extraction.
//!
//! The auth collaborator in front of this service authenticates every
//! request and installs the caller's identity as headers. This
//! middleware parses them into a [`CallerIdentity`] extension; requests
//! without a well-formed identity are rejected with 401.

use adasim_model::{CallerIdentity, Role, UserId};
use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::str::FromStr;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn identity_from_headers(headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
    let id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing caller identity"))?;
    let id = UserId::from_str(id)
        .map_err(|_| AppError::unauthorized("malformed caller id"))?;

    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing caller role"))?;
    let role = Role::from_str(role)
        .map_err(|_| AppError::unauthorized("unknown caller role"))?;

    Ok(CallerIdentity::new(id, role))
}

pub async fn require_identity(
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = identity_from_headers(request.headers())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

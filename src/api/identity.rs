//! Caller identity extraction
//!
//! The authentication gateway in front of the service sets `x-user-id`
//! for signed-in users. A missing or blank header means anonymous.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use crate::models::Caller;

pub const USER_ID_HEADER: &str = "x-user-id";

pub struct CallerIdentity(pub Caller);

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Caller::user)
            .unwrap_or_else(Caller::anonymous);

        Ok(CallerIdentity(caller))
    }
}

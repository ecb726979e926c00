use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, models::UserId};

/// Header carrying the authenticated user id, set by the upstream gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request
///
/// Token verification happens before requests reach this service; the gateway
/// forwards the resolved user id in [`USER_ID_HEADER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("{} header is required", USER_ID_HEADER)))?;

        let id = raw
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| AppError::Unauthorized(format!("invalid {} header", USER_ID_HEADER)))?;

        UserId::new(id)
            .map(Caller)
            .map_err(|_| AppError::Unauthorized(format!("invalid {} header", USER_ID_HEADER)))
    }
}

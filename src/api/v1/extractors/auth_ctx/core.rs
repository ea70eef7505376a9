use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::Principal;

use super::AuthCtx;

/// Extractor for the `AuthCtx` the gate stored in request extensions.
///
/// A missing context means the gate is not installed on this route, which is a
/// wiring bug rather than an anonymous caller.
pub struct AuthCtxExtractor(pub AuthCtx);

impl<S> FromRequestParts<S> for AuthCtxExtractor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthCtx>()
            .cloned()
            .map(AuthCtxExtractor)
            .ok_or_else(|| {
                tracing::error!("AuthCtx missing from request; authorization gate not installed");
                AppError::Internal
            })
    }
}

/// Extractor for handlers that require an authenticated caller.
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthCtxExtractor(ctx) = AuthCtxExtractor::from_request_parts(parts, state).await?;

        ctx.current()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| AppError::access_denied("authentication required"))
    }
}

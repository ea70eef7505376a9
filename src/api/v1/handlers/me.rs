use axum::Json;

use crate::api::v1::dto::identity::PrincipalResponse;
use crate::api::v1::extractors::CurrentPrincipal;

/// GET /api/v1/auth/me
pub async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> Json<PrincipalResponse> {
    Json(PrincipalResponse::from(&principal))
}

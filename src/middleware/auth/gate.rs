//! Authorization gate: bearer token → principal → `AuthCtx` in request extensions.
//!
//! Per request:
//! - no token: continue anonymously
//! - invalid or expired token: 401, the request never reaches the next stage
//! - valid token with an empty subject or an unknown user: continue anonymously
//! - valid token for an active user: continue with the principal set
//! - identity store down: 503, the request never reaches the next stage
//!
//! Log lines carry the subject and the outcome, never the token itself.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::{Principal, PrincipalResolver, ResolveError, TokenCodec, TokenError};
use crate::state::AppState;

/// Install the gate on every route of `router`.
///
/// ```ignore
/// let app = middleware::auth::gate::apply(api_routes, state.clone()).with_state(state);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, gate_middleware))
}

/// Terminal result of the gate for one request.
pub enum GateDecision {
    Continue(Request<Body>),
    Reject(Response),
}

/// Why a request continues without a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousReason {
    NoToken,
    EmptySubject,
    UnknownPrincipal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    Anonymous(AnonymousReason),
}

/// Conditions that stop the request inside the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("invalid bearer token")]
    InvalidToken,
    #[error("expired bearer token")]
    ExpiredToken,
    #[error("identity store unavailable")]
    IdentityStoreUnavailable,
}

impl From<GateRejection> for AppError {
    fn from(rejection: GateRejection) -> Self {
        match rejection {
            GateRejection::InvalidToken | GateRejection::ExpiredToken => AppError::Unauthorized,
            GateRejection::IdentityStoreUnavailable => AppError::ServiceUnavailable,
        }
    }
}

/// Run the token state machine against the request headers.
pub async fn authenticate(
    codec: &TokenCodec,
    resolver: &PrincipalResolver,
    headers: &HeaderMap,
) -> Result<AuthOutcome, GateRejection> {
    let Some(token) = TokenCodec::extract(headers) else {
        tracing::debug!("no bearer token; continuing anonymously");
        return Ok(AuthOutcome::Anonymous(AnonymousReason::NoToken));
    };
    tracing::debug!(token_len = token.len(), "bearer token extracted");

    match codec.validate(token) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("bearer token rejected: bad structure or signature");
            return Err(GateRejection::InvalidToken);
        }
        Err(TokenError::Expired) => {
            tracing::warn!("bearer token expired");
            return Err(GateRejection::ExpiredToken);
        }
        Err(err) => {
            tracing::warn!(error = %err, "bearer token rejected");
            return Err(GateRejection::InvalidToken);
        }
    }

    let claims = match codec.decode_claims(token) {
        Ok(claims) => claims,
        Err(TokenError::Expired) => {
            tracing::warn!("bearer token expired");
            return Err(GateRejection::ExpiredToken);
        }
        Err(err) => {
            tracing::error!(error = %err, "validated bearer token could not be decoded");
            return Err(GateRejection::InvalidToken);
        }
    };

    let Some(subject) = claims.subject() else {
        tracing::warn!("token subject is empty; continuing anonymously");
        return Ok(AuthOutcome::Anonymous(AnonymousReason::EmptySubject));
    };
    tracing::debug!(subject = %subject, exp = claims.exp, "token claims extracted");

    match resolver.resolve(subject).await {
        Ok(principal) => {
            tracing::info!(
                subject = %subject,
                authorities = ?principal.authority_labels(),
                "request authenticated"
            );
            Ok(AuthOutcome::Authenticated(principal))
        }
        Err(ResolveError::UnknownPrincipal) => {
            tracing::warn!(
                subject = %subject,
                "no identity for token subject; continuing anonymously"
            );
            Ok(AuthOutcome::Anonymous(AnonymousReason::UnknownPrincipal))
        }
        Err(ResolveError::StoreUnavailable(err)) => {
            tracing::error!(subject = %subject, error = %err, "identity store unavailable");
            Err(GateRejection::IdentityStoreUnavailable)
        }
    }
}

/// Decide what happens to `req`: forward it with a fresh `AuthCtx`, or answer it here.
pub async fn inspect(state: &AppState, mut req: Request<Body>) -> GateDecision {
    // Whatever context arrived with the request is reset before anything else.
    let mut ctx = req.extensions_mut().remove::<AuthCtx>().unwrap_or_default();
    ctx.clear();

    match authenticate(&state.codec, &state.resolver, req.headers()).await {
        Ok(AuthOutcome::Authenticated(principal)) => ctx.set(principal),
        Ok(AuthOutcome::Anonymous(_)) => {}
        Err(rejection) => return GateDecision::Reject(AppError::from(rejection).into_response()),
    }

    req.extensions_mut().insert(ctx);
    GateDecision::Continue(req)
}

async fn gate_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match inspect(&state, req).await {
        GateDecision::Continue(req) => next.run(req).await,
        GateDecision::Reject(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::{StatusCode, header};
    use axum::routing::get;
    use chrono::Duration;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use super::*;
    use crate::api::v1::extractors::AuthCtxExtractor;
    use crate::repos::identity_repo::IdentityRecord;
    use crate::repos::memory::MemoryIdentityStore;
    use crate::services::auth::{Authority, ClaimSet};

    const SECRET: &[u8] = b"gate-test-secret-0123456789abcdef";

    fn codec() -> TokenCodec {
        TokenCodec::from_secret(SECRET, 0).unwrap()
    }

    fn token_for(subject: &str, ttl: Duration) -> String {
        codec().encode(&ClaimSet::expiring_in(subject, ttl)).unwrap()
    }

    fn store() -> Arc<MemoryIdentityStore> {
        let mut alice = IdentityRecord::new("alice");
        alice.is_hub_manager = true;
        let mut gone = IdentityRecord::new("gone");
        gone.is_delete = true;
        Arc::new(MemoryIdentityStore::with_records([alice, gone]))
    }

    /// Router with a `/whoami` route that reports who the gate let through.
    fn gated_app(store: Arc<MemoryIdentityStore>) -> (Router, Arc<AtomicUsize>) {
        let state = AppState::new(codec(), store);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        let routes = Router::new().route(
            "/whoami",
            get(move |AuthCtxExtractor(ctx): AuthCtxExtractor| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    match ctx.current() {
                        Some(p) => format!("{}|{}", p.username(), p.authority_labels().join(",")),
                        None => "anonymous".to_string(),
                    }
                }
            }),
        );

        (apply(routes, state.clone()).with_state(state), hits)
    }

    fn request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn no_header_continues_anonymously() {
        let (app, hits) = gated_app(store());

        let response = app.oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_bearer_is_treated_as_missing() {
        let (app, hits) = gated_app(store());

        let response = app.oneshot(request(Some("Bearer "))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn valid_token_for_known_user_populates_context() {
        let (app, hits) = gated_app(store());
        let token = token_for("alice", Duration::minutes(10));

        let response = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "alice|ROLE_USER,ROLE_HUB_MANAGER"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn expired_token_is_rejected_before_the_handler() {
        let (app, hits) = gated_app(store());
        let token = token_for("alice", Duration::hours(-1));

        let response = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(logs_contain("bearer token expired"));
        assert!(!logs_contain("bad structure or signature"));
    }

    #[tokio::test]
    #[traced_test]
    async fn forged_token_is_rejected_before_the_handler() {
        let (app, hits) = gated_app(store());
        let forged = TokenCodec::from_secret(b"attacker-controlled-secret-000000", 0)
            .unwrap()
            .encode(&ClaimSet::expiring_in("alice", Duration::minutes(10)))
            .unwrap();

        let response = app
            .oneshot(request(Some(&format!("Bearer {forged}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(logs_contain("bad structure or signature"));
        assert!(!logs_contain("bearer token expired"));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let (app, hits) = gated_app(store());

        let response = app
            .oneshot(request(Some("Bearer not.a.token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(body_string(response).await.contains("UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn unknown_user_continues_anonymously() {
        let (app, hits) = gated_app(store());
        let token = token_for("ghost", Duration::minutes(10));

        let response = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deleted_user_continues_anonymously() {
        let (app, _) = gated_app(store());
        let token = token_for("gone", Duration::minutes(10));

        let response = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
    }

    #[tokio::test]
    async fn empty_subject_continues_anonymously_without_lookup() {
        let store = store();
        let (app, hits) = gated_app(store.clone());
        let exp = (chrono::Utc::now() + Duration::minutes(10)).timestamp() as u64;
        let token = codec().encode(&ClaimSet::new("  ", exp)).unwrap();

        let response = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn store_outage_is_not_silently_anonymous() {
        let (app, hits) = gated_app(Arc::new(MemoryIdentityStore::unavailable()));
        let token = token_for("alice", Duration::minutes(10));

        let response = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn context_does_not_leak_between_requests() {
        let (app, hits) = gated_app(store());
        let token = token_for("alice", Duration::minutes(10));

        let first = app
            .clone()
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert!(body_string(first).await.starts_with("alice|"));

        let second = app.oneshot(request(None)).await.unwrap();
        assert_eq!(body_string(second).await, "anonymous");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn preexisting_context_is_cleared() {
        let state = AppState::new(codec(), store());
        let mut req = request(None);
        let mut planted = AuthCtx::anonymous();
        planted.set(Principal::new("mallory", [Authority::Master]));
        req.extensions_mut().insert(planted);

        let GateDecision::Continue(req) = inspect(&state, req).await else {
            panic!("request without a token must continue");
        };
        let ctx = req.extensions().get::<AuthCtx>().unwrap();
        assert!(ctx.current().is_none());
    }

    #[tokio::test]
    async fn authenticate_reports_each_outcome() {
        let codec = codec();
        let resolver = PrincipalResolver::new(store());
        let bearer = |token: &str| {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::AUTHORIZATION,
                format!("Bearer {token}").parse().unwrap(),
            );
            headers
        };

        assert_eq!(
            authenticate(&codec, &resolver, &HeaderMap::new()).await,
            Ok(AuthOutcome::Anonymous(AnonymousReason::NoToken))
        );
        let ghost = bearer(&token_for("ghost", Duration::minutes(5)));
        assert_eq!(
            authenticate(&codec, &resolver, &ghost).await,
            Ok(AuthOutcome::Anonymous(AnonymousReason::UnknownPrincipal))
        );
        let stale = bearer(&token_for("alice", Duration::minutes(-5)));
        assert_eq!(
            authenticate(&codec, &resolver, &stale).await,
            Err(GateRejection::ExpiredToken)
        );
        assert_eq!(
            authenticate(&codec, &resolver, &bearer("x.y.z")).await,
            Err(GateRejection::InvalidToken)
        );

        let alice = bearer(&token_for("alice", Duration::minutes(5)));
        let Ok(AuthOutcome::Authenticated(principal)) =
            authenticate(&codec, &resolver, &alice).await
        else {
            panic!("alice should authenticate");
        };
        assert_eq!(principal.username(), "alice");
        assert_eq!(
            principal.authorities().iter().copied().collect::<Vec<_>>(),
            vec![Authority::User, Authority::HubManager]
        );
    }

    fn sign_raw(payload: serde_json::Value) -> String {
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &payload,
            &jsonwebtoken::EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn future_exp() -> u64 {
        (chrono::Utc::now() + Duration::minutes(10)).timestamp() as u64
    }

    #[tokio::test]
    async fn null_subject_is_an_empty_subject_not_a_bad_token() {
        let store = store();
        let resolver = PrincipalResolver::new(store.clone());
        let token = sign_raw(serde_json::json!({ "sub": null, "exp": future_exp() }));
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );

        assert_eq!(
            authenticate(&codec(), &resolver, &headers).await,
            Ok(AuthOutcome::Anonymous(AnonymousReason::EmptySubject))
        );

        let (app, hits) = gated_app(store.clone());
        let response = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "anonymous");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn unusual_informational_claims_do_not_reject_the_token() {
        let (app, hits) = gated_app(store());
        let token = sign_raw(serde_json::json!({
            "sub": "alice",
            "exp": future_exp(),
            "iat": 1700000000.25,
            "auth": ["ROLE_USER"],
        }));

        let response = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "alice|ROLE_USER,ROLE_HUB_MANAGER"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}

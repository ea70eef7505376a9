/*
 * Responsibility
 * - shared context attached to the Router (AppState)
 *   - token codec, principal resolver, identity store
 * - cheap to Clone (Arc inside)
 */
use std::sync::Arc;

use crate::repos::identity_repo::IdentityStore;
use crate::services::auth::{PrincipalResolver, TokenCodec};

#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub resolver: PrincipalResolver,
    pub identity_store: Arc<dyn IdentityStore>,
}

impl AppState {
    pub fn new(codec: TokenCodec, identity_store: Arc<dyn IdentityStore>) -> Self {
        let resolver = PrincipalResolver::new(identity_store.clone());
        Self {
            codec: Arc::new(codec),
            resolver,
            identity_store,
        }
    }
}

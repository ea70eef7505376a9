use std::sync::Arc;

use thiserror::Error;

use crate::repos::error::RepoError;
use crate::repos::identity_repo::IdentityStore;
use crate::services::auth::principal::Principal;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no active identity for subject")]
    UnknownPrincipal,
    #[error("identity store unavailable: {0}")]
    StoreUnavailable(#[source] RepoError),
}

/// Resolves a token subject into a `Principal`.
///
/// Nothing is cached: every call goes to the store, so role changes apply to
/// the very next request.
#[derive(Clone)]
pub struct PrincipalResolver {
    store: Arc<dyn IdentityStore>,
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver").finish_non_exhaustive()
    }
}

impl PrincipalResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, subject: &str) -> Result<Principal, ResolveError> {
        let record = self
            .store
            .load_by_username(subject)
            .await
            .map_err(ResolveError::StoreUnavailable)?;

        record
            .as_ref()
            .and_then(Principal::from_record)
            .ok_or(ResolveError::UnknownPrincipal)
    }
}

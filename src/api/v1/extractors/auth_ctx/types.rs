/*
 * Responsibility
 * - the authentication context handlers see for one request
 * - the gate creates it, populates it at most once and stores it in request
 *   extensions; it is dropped together with the request
 *
 * Notes
 * - token checks and identity lookups live in middleware/services
 * - nothing here is global or thread-bound
 */
use crate::services::auth::Principal;

/// Per-request authentication context. Empty means anonymous.
#[derive(Debug, Clone, Default)]
pub struct AuthCtx {
    principal: Option<Principal>,
}

impl AuthCtx {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.principal = None;
    }

    pub fn set(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub fn current(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

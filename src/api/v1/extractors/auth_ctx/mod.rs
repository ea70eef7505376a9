/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - hand the per-request AuthCtx (and the principal inside it) to handlers
 * - axum glue lives in core, the plain type in types
 *
 * Public API:
 * - AuthCtx
 * - AuthCtxExtractor
 * - CurrentPrincipal
 */

mod core;
mod types;

pub use self::core::{AuthCtxExtractor, CurrentPrincipal};
pub use self::types::AuthCtx;

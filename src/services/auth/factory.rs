//! Factory: build the `TokenCodec` from application `Config`.
use crate::config::Config;
use crate::services::auth::token_codec::{KeyMaterialError, TokenCodec};

pub fn build_token_codec(config: &Config) -> Result<TokenCodec, KeyMaterialError> {
    TokenCodec::from_base64_secret(&config.jwt_secret_key, config.access_token_leeway_seconds)
        .inspect_err(|e| tracing::error!(error = %e, "invalid JWT_SECRET_KEY"))
}

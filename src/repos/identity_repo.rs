/*
 * Responsibility
 * - Identity store seen by the principal resolver (`IdentityStore`)
 * - Postgres implementation over the platform's `p_users` table
 * - Deleted users are filtered here and again in `Principal::from_record`
 */
use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::{RepoError, RepoResult};
use crate::services::auth::principal::Authority;

#[derive(Debug, Clone, FromRow)]
pub struct IdentityRecord {
    pub user_id: Uuid,
    pub username: String,
    pub is_delete: bool,
    pub is_delivery_manager: bool,
    pub is_hub_manager: bool,
    pub is_master: bool,
}

impl IdentityRecord {
    /// Active record with no elevated roles.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            username: username.into(),
            is_delete: false,
            is_delivery_manager: false,
            is_hub_manager: false,
            is_master: false,
        }
    }

    pub fn authorities(&self) -> BTreeSet<Authority> {
        let mut authorities = BTreeSet::from([Authority::User]);
        if self.is_delivery_manager {
            authorities.insert(Authority::DeliveryManager);
        }
        if self.is_hub_manager {
            authorities.insert(Authority::HubManager);
        }
        if self.is_master {
            authorities.insert(Authority::Master);
        }
        authorities
    }
}

/// Lookup of identities by username.
///
/// `Ok(None)` means "no such active user"; `Err(_)` means the store could not
/// answer, which callers must not confuse with an unknown user.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn load_by_username(&self, username: &str) -> RepoResult<Option<IdentityRecord>>;
}

#[derive(Clone, Debug)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn load_by_username(&self, username: &str) -> RepoResult<Option<IdentityRecord>> {
        let row = sqlx::query_as::<_, IdentityRecord>(
            r#"
            SELECT
                user_id,
                username,
                is_delete,
                is_delivery_manager,
                is_hub_manager,
                is_master
            FROM p_users
            WHERE username = $1 AND is_delete = false
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::Db)?;

        Ok(row)
    }
}

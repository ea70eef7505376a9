/*
 * Responsibility
 * - response DTOs for the identity endpoints
 * - authorities are exposed as their labels (ROLE_*)
 */
use serde::Serialize;
use uuid::Uuid;

use crate::repos::identity_repo::IdentityRecord;
use crate::services::auth::Principal;

#[derive(Debug, Serialize)]
pub struct PrincipalResponse {
    pub username: String,
    pub authorities: Vec<&'static str>,
}

impl From<&Principal> for PrincipalResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            username: principal.username().to_string(),
            authorities: principal.authority_labels(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub username: String,
    pub authorities: Vec<&'static str>,
}

impl From<IdentityRecord> for UserResponse {
    fn from(record: IdentityRecord) -> Self {
        let authorities = record.authorities().iter().map(|a| a.label()).collect();
        Self {
            user_id: record.user_id,
            username: record.username,
            authorities,
        }
    }
}

//! In-memory identity store for tests.
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::repos::error::{RepoError, RepoResult};
use crate::repos::identity_repo::{IdentityRecord, IdentityStore};

#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    records: RwLock<HashMap<String, IdentityRecord>>,
    unavailable: bool,
    lookups: AtomicUsize,
}

impl MemoryIdentityStore {
    pub fn with_records(records: impl IntoIterator<Item = IdentityRecord>) -> Self {
        let store = Self::default();
        for record in records {
            store.upsert(record);
        }
        store
    }

    /// A store whose every lookup fails as if the database were down.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn upsert(&self, record: IdentityRecord) {
        self.records
            .write()
            .unwrap()
            .insert(record.username.clone(), record);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load_by_username(&self, username: &str) -> RepoResult<Option<IdentityRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(RepoError::Db(sqlx::Error::PoolTimedOut));
        }

        let records = self.records.read().unwrap();
        Ok(records
            .get(username)
            .filter(|record| !record.is_delete)
            .cloned())
    }
}

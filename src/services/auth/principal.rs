use std::collections::BTreeSet;
use std::fmt;

use crate::repos::identity_repo::IdentityRecord;

/// Granted authority. Every resolved principal holds `User`; the others follow
/// the role flags of the identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Authority {
    User,
    DeliveryManager,
    HubManager,
    Master,
}

impl Authority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "ROLE_USER",
            Self::DeliveryManager => "ROLE_DELIVERY_MANAGER",
            Self::HubManager => "ROLE_HUB_MANAGER",
            Self::Master => "ROLE_MASTER",
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Authenticated identity of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    username: String,
    authorities: BTreeSet<Authority>,
}

impl Principal {
    pub fn new(
        username: impl Into<String>,
        authorities: impl IntoIterator<Item = Authority>,
    ) -> Self {
        Self {
            username: username.into(),
            authorities: authorities.into_iter().collect(),
        }
    }

    /// `None` for a deleted record: deleted identities never become principals.
    pub fn from_record(record: &IdentityRecord) -> Option<Self> {
        if record.is_delete {
            return None;
        }
        Some(Self::new(record.username.clone(), record.authorities()))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn authorities(&self) -> &BTreeSet<Authority> {
        &self.authorities
    }

    pub fn has_authority(&self, authority: Authority) -> bool {
        self.authorities.contains(&authority)
    }

    pub fn authority_labels(&self) -> Vec<&'static str> {
        self.authorities.iter().map(|a| a.label()).collect()
    }
}

//! Caller identity and role capabilities.
//!
//! Every connection-manager operation receives an explicit [`Profile`]
//! instead of reading a shared "current user" global. Bearer tokens are
//! resolved once at the command boundary by a [`TokenResolver`], and the
//! role capability check happens there too, not scattered per operation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ZapError;

/// The three role tiers of the platform, as a closed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Superadmin,
    AdminTenant,
    Agent,
}

impl Role {
    /// Whether this role may manage its own WhatsApp instance.
    /// Currently every tier may; the gate exists so the policy lives in
    /// exactly one place.
    pub fn can_manage_instance(&self) -> bool {
        match self {
            Role::Superadmin | Role::AdminTenant | Role::Agent => true,
        }
    }
}

/// Resolved caller identity, passed explicitly into every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Maps a bearer token to a caller profile.
pub trait TokenResolver: Send + Sync {
    fn resolve(&self, bearer: &str) -> Result<Profile, ZapError>;
}

/// Resolver backed by a static token table from the config file.
/// The hosted deployment resolves tokens against the auth provider; the
/// CLI carries its own table.
pub struct StaticTokenResolver {
    profiles: HashMap<String, Profile>,
}

impl StaticTokenResolver {
    pub fn new(entries: impl IntoIterator<Item = (String, Profile)>) -> Self {
        Self {
            profiles: entries.into_iter().collect(),
        }
    }
}

impl TokenResolver for StaticTokenResolver {
    fn resolve(&self, bearer: &str) -> Result<Profile, ZapError> {
        if bearer.trim().is_empty() {
            return Err(ZapError::Unauthorized);
        }
        self.profiles
            .get(bearer)
            .cloned()
            .ok_or(ZapError::Unauthorized)
    }
}

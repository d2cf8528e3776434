use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-profile WhatsApp instance record. One per owning profile.
///
/// Invariant: `instance_id` and `instance_token` are both present or both
/// absent. A record with only one of the pair is corrupt and never
/// produced by the connection manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub profile_id: Uuid,
    pub instance_id: Option<String>,
    pub instance_token: Option<String>,
    pub instance_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl InstanceRecord {
    /// Empty record for a profile that has never created an instance.
    pub fn empty(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            instance_id: None,
            instance_token: None,
            instance_name: None,
            updated_at: Utc::now(),
        }
    }

    /// True when the id/token pair is present.
    pub fn has_instance(&self) -> bool {
        self.instance_id.is_some() && self.instance_token.is_some()
    }

    /// Clear credentials after a provider disconnect. The name survives;
    /// only delete resets it.
    pub fn clear_credentials(&mut self) {
        self.instance_id = None;
        self.instance_token = None;
        self.updated_at = Utc::now();
    }

    /// Reset the record to its pre-creation state.
    pub fn clear_all(&mut self) {
        self.instance_id = None;
        self.instance_token = None;
        self.instance_name = None;
        self.updated_at = Utc::now();
    }
}

/// Derive the human-traceable instance name from the owner's e-mail.
///
/// Local-part of the address, lower-cased with non-alphanumerics stripped,
/// followed by the low-order six decimal digits of the millisecond
/// timestamp. Generated once at creation and stable until delete.
pub fn derive_instance_name(email: &str, now: DateTime<Utc>) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let base: String = local
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    let millis = now.timestamp_millis().unsigned_abs();
    let suffix = millis % 1_000_000;
    format!("{base}{suffix:06}")
}

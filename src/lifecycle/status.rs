use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Internal connection-status vocabulary for a WhatsApp instance.
///
/// The provider speaks its own vocabulary; [`from_provider`] maps it into
/// this closed set. Anything the provider says that we do not recognize
/// (including saying nothing) lands on `Created`.
///
/// [`from_provider`]: InstanceStatus::from_provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Connected,
    Disconnected,
    WaitingQr,
    WaitingPair,
    Created,
    NoInstance,
}

impl InstanceStatus {
    /// Map the provider's status string into the internal vocabulary.
    ///
    /// | provider       | internal      |
    /// |----------------|---------------|
    /// | `connected`    | `Connected`   |
    /// | `disconnected` | `Disconnected`|
    /// | `qrcode`       | `WaitingQr`   |
    /// | `pairing`      | `WaitingPair` |
    /// | anything else  | `Created`     |
    pub fn from_provider(raw: Option<&str>) -> Self {
        match raw {
            Some("connected") => InstanceStatus::Connected,
            Some("disconnected") => InstanceStatus::Disconnected,
            Some("qrcode") => InstanceStatus::WaitingQr,
            Some("pairing") => InstanceStatus::WaitingPair,
            _ => InstanceStatus::Created,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstanceStatus::Connected => "connected",
            InstanceStatus::Disconnected => "disconnected",
            InstanceStatus::WaitingQr => "waiting_qr",
            InstanceStatus::WaitingPair => "waiting_pair",
            InstanceStatus::Created => "created",
            InstanceStatus::NoInstance => "no_instance",
        };
        write!(f, "{s}")
    }
}

/// Tri-state result of the status operation.
///
/// `{hasInstance:false, status:"no_instance"}` when the caller owns no
/// instance; otherwise the mapped status plus the raw provider payload
/// and the record's last-mutation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(rename = "hasInstance")]
    pub has_instance: bool,
    pub status: InstanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatusReport {
    pub fn no_instance() -> Self {
        Self {
            has_instance: false,
            status: InstanceStatus::NoInstance,
            raw: None,
            updated_at: None,
        }
    }
}

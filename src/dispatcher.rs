//! Client-side action dispatch with per-action busy flags.
//!
//! Each wrapped call acquires its action's busy flag (RAII guard, so the
//! flag is released exactly once on every exit path), invokes the
//! connection manager, emits transient notifications, and triggers a
//! status refresh on success. Failures never propagate: they become an
//! Error notification and the call resolves to `None`, so callers must
//! null-check the return value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::auth::Profile;
use crate::manager::{AckResponse, ConnectionManager, CreateResponse};

/// Actions with independent busy flags, so the UI can disable one button
/// without blocking the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// Transient user-visible notification (a toast, in the hosted UI).
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
}

/// RAII acquisition of a busy flag; released on drop, on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ActionDispatcher {
    manager: Arc<ConnectionManager>,
    profile: Profile,
    busy_create: AtomicBool,
    busy_connect: AtomicBool,
    busy_disconnect: AtomicBool,
    notifications: UnboundedSender<Notification>,
    refresh: Arc<Notify>,
}

impl ActionDispatcher {
    /// Build a dispatcher plus the receiving end of its notification
    /// stream. `refresh` is the poller's trigger (see
    /// [`PollerHandle::refresh_trigger`](crate::poller::PollerHandle::refresh_trigger)).
    pub fn new(
        manager: Arc<ConnectionManager>,
        profile: Profile,
        refresh: Arc<Notify>,
    ) -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                manager,
                profile,
                busy_create: AtomicBool::new(false),
                busy_connect: AtomicBool::new(false),
                busy_disconnect: AtomicBool::new(false),
                notifications: tx,
                refresh,
            },
            rx,
        )
    }

    pub fn is_busy(&self, action: ActionKind) -> bool {
        self.flag(action).load(Ordering::SeqCst)
    }

    pub async fn create(&self) -> Option<CreateResponse> {
        let Some(_guard) = BusyGuard::acquire(&self.busy_create) else {
            return None;
        };
        self.notify(NotificationKind::Info, "Creating WhatsApp instance...");
        match self.manager.create(&self.profile).await {
            Ok(resp) => {
                self.notify(NotificationKind::Success, "Instance created");
                self.refresh.notify_one();
                Some(resp)
            }
            Err(e) => {
                self.notify(NotificationKind::Error, format!("Create failed: {e}"));
                None
            }
        }
    }

    /// Returns the raw provider payload so the caller can render the QR
    /// image or pairing code. `None` on failure or when already busy.
    pub async fn connect(&self, phone: Option<String>) -> Option<Value> {
        let Some(_guard) = BusyGuard::acquire(&self.busy_connect) else {
            return None;
        };
        self.notify(NotificationKind::Info, "Requesting connection...");
        let req = crate::gateway::ConnectRequest { phone };
        match self.manager.connect(&self.profile, &req).await {
            Ok(raw) => {
                self.notify(NotificationKind::Success, "Connection flow started");
                self.refresh.notify_one();
                Some(raw)
            }
            Err(e) => {
                self.notify(NotificationKind::Error, format!("Connect failed: {e}"));
                None
            }
        }
    }

    pub async fn disconnect(&self) -> Option<AckResponse> {
        let Some(_guard) = BusyGuard::acquire(&self.busy_disconnect) else {
            return None;
        };
        self.notify(NotificationKind::Info, "Disconnecting instance...");
        match self.manager.disconnect(&self.profile).await {
            Ok(ack) => {
                self.notify(NotificationKind::Success, "Instance disconnected");
                self.refresh.notify_one();
                Some(ack)
            }
            Err(e) => {
                self.notify(NotificationKind::Error, format!("Disconnect failed: {e}"));
                None
            }
        }
    }

    fn flag(&self, action: ActionKind) -> &AtomicBool {
        match action {
            ActionKind::Create => &self.busy_create,
            ActionKind::Connect => &self.busy_connect,
            ActionKind::Disconnect => &self.busy_disconnect,
        }
    }

    fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        // The receiver may be gone (view unmounted); dropping the toast
        // is the correct behavior then.
        let _ = self.notifications.send(Notification {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
        });
    }
}

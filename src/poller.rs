//! Fixed-interval status polling.
//!
//! The poller issues one status fetch immediately, then one per interval
//! (60s by default), publishing Loading/Loaded/Error over a `watch`
//! channel. Polls are never coalesced: each tick spawns an independent
//! fetch, so under a slow network several may be in flight and the last
//! one to RESOLVE wins — there is no sequencing token. Stopping the
//! poller halts the timer; in-flight fetches are not aborted, their
//! results are simply discarded (no update after stop).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::auth::Profile;
use crate::error::ZapError;
use crate::lifecycle::StatusReport;
use crate::manager::ConnectionManager;

/// Externally visible poller state.
#[derive(Debug, Clone)]
pub enum PollState {
    Idle,
    Loading,
    Loaded(StatusReport),
    Error(String),
}

/// Seam between the poller and the connection manager, so tests can
/// script fetch timing and outcomes.
pub trait StatusSource: Send + Sync {
    fn fetch_status(
        &self,
    ) -> impl std::future::Future<Output = Result<StatusReport, ZapError>> + Send;
}

/// Binds a manager and a caller profile into a [`StatusSource`].
pub struct ProfileStatusSource {
    manager: Arc<ConnectionManager>,
    profile: Profile,
}

impl ProfileStatusSource {
    pub fn new(manager: Arc<ConnectionManager>, profile: Profile) -> Self {
        Self { manager, profile }
    }
}

impl StatusSource for ProfileStatusSource {
    async fn fetch_status(&self) -> Result<StatusReport, ZapError> {
        self.manager.status(&self.profile).await
    }
}

pub struct StatusPoller;

impl StatusPoller {
    /// Start polling. The first fetch happens immediately.
    pub fn spawn<S: StatusSource + 'static>(source: Arc<S>, interval: Duration) -> PollerHandle {
        let (tx, rx) = watch::channel(PollState::Idle);
        let stopped = Arc::new(AtomicBool::new(false));
        let refresh = Arc::new(Notify::new());

        let task = tokio::spawn(poll_loop(
            source,
            interval,
            tx,
            stopped.clone(),
            refresh.clone(),
        ));

        PollerHandle {
            rx,
            stopped,
            refresh,
            task,
        }
    }
}

async fn poll_loop<S: StatusSource + 'static>(
    source: Arc<S>,
    interval: Duration,
    tx: watch::Sender<PollState>,
    stopped: Arc<AtomicBool>,
    refresh: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh.notified() => {}
        }
        if stopped.load(Ordering::SeqCst) {
            break;
        }

        let _ = tx.send(PollState::Loading);

        // Independent fetch task: a slow poll never delays the next tick.
        let source = source.clone();
        let tx = tx.clone();
        let stopped = stopped.clone();
        tokio::spawn(async move {
            let result = source.fetch_status().await;
            // Discard results that resolve after stop.
            if stopped.load(Ordering::SeqCst) {
                return;
            }
            let state = match result {
                Ok(report) => PollState::Loaded(report),
                Err(e) => PollState::Error(e.to_string()),
            };
            let _ = tx.send(state);
        });
    }
}

/// Handle owned by the consuming view. Dropping it (or calling
/// [`stop`](PollerHandle::stop)) clears the recurring timer.
pub struct PollerHandle {
    rx: watch::Receiver<PollState>,
    stopped: Arc<AtomicBool>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Snapshot of the latest published state.
    #[allow(dead_code)]
    pub fn state(&self) -> PollState {
        self.rx.borrow().clone()
    }

    /// Receiver for views that want to await state changes.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.rx.clone()
    }

    /// Trigger an immediate out-of-cycle poll. Used by the action
    /// dispatcher after a successful mutation.
    #[allow(dead_code)]
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Shared trigger for wiring the action dispatcher to this poller.
    #[allow(dead_code)]
    pub fn refresh_trigger(&self) -> Arc<Notify> {
        self.refresh.clone()
    }

    /// Stop polling. In-flight fetches keep running but their results
    /// are discarded.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Scripted source: the nth call sleeps for its scripted delay and
    /// then resolves with a report tagged with the call sequence number,
    /// or with an error.
    struct ScriptedSource {
        calls: AtomicUsize,
        script: Vec<(Duration, bool)>,
    }

    impl ScriptedSource {
        fn new(script: Vec<(Duration, bool)>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                script,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self) -> Result<StatusReport, ZapError> {
            let seq = self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, ok) = self
                .script
                .get(seq)
                .copied()
                .unwrap_or((Duration::ZERO, true));
            tokio::time::sleep(delay).await;
            if ok {
                Ok(StatusReport {
                    has_instance: true,
                    status: crate::lifecycle::InstanceStatus::Connected,
                    raw: Some(serde_json::json!({"seq": seq})),
                    updated_at: None,
                })
            } else {
                Err(ZapError::Validation(format!("poll {seq} failed")))
            }
        }
    }

    fn loaded_seq(state: &PollState) -> Option<u64> {
        match state {
            PollState::Loaded(report) => report
                .raw
                .as_ref()
                .and_then(|raw| raw.get("seq"))
                .and_then(|v| v.as_u64()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn polls_immediately_on_spawn() {
        let source = Arc::new(ScriptedSource::new(vec![(Duration::ZERO, true)]));
        let handle = StatusPoller::spawn(source.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.call_count(), 1);
        assert_eq!(loaded_seq(&handle.state()), Some(0));
    }

    #[tokio::test]
    async fn fetch_failure_publishes_error_state() {
        let source = Arc::new(ScriptedSource::new(vec![(Duration::ZERO, false)]));
        let handle = StatusPoller::spawn(source, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(50)).await;
        match handle.state() {
            PollState::Error(msg) => assert!(msg.contains("poll 0 failed")),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn keeps_polling_on_interval() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let handle = StatusPoller::spawn(source.clone(), Duration::from_millis(30));

        tokio::time::sleep(Duration::from_millis(110)).await;
        assert!(source.call_count() >= 3, "calls: {}", source.call_count());
        drop(handle);
    }

    #[tokio::test]
    async fn refresh_triggers_out_of_cycle_poll() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let handle = StatusPoller::spawn(source.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(source.call_count(), 1);

        handle.refresh();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn last_resolved_wins_over_issue_order() {
        // First poll is slow, second (forced by refresh) is instant. The
        // slow one resolves last and overwrites the fresher response.
        let source = Arc::new(ScriptedSource::new(vec![
            (Duration::from_millis(80), true),
            (Duration::ZERO, true),
        ]));
        let handle = StatusPoller::spawn(source.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.refresh();
        tokio::time::sleep(Duration::from_millis(20)).await;
        // The fast second poll has resolved; the slow first one has not.
        assert_eq!(loaded_seq(&handle.state()), Some(1));

        tokio::time::sleep(Duration::from_millis(80)).await;
        // The stale first poll resolved later and won.
        assert_eq!(loaded_seq(&handle.state()), Some(0));
    }

    #[tokio::test]
    async fn no_state_update_after_stop() {
        let source = Arc::new(ScriptedSource::new(vec![(Duration::from_millis(60), true)]));
        let handle = StatusPoller::spawn(source.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(handle.state(), PollState::Loading));
        assert_eq!(source.call_count(), 1);

        handle.stop();
        tokio::time::sleep(Duration::from_millis(80)).await;
        // The in-flight fetch resolved after stop; its result was discarded.
        assert!(matches!(handle.state(), PollState::Loading));
    }
}

#![forbid(unsafe_code)]

use crate::error::SessionError;
use crate::flags::PermissionProbe;
use crate::session::AppSession;
use lt_storage::{KeyValueStore, LIST_KEY, SETTINGS_KEY, StorageChange};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Longest countdown a debouncer will run.
pub const MAX_WINDOW: Duration = Duration::from_secs(3_600);

/// Timer-coalescing queue: every push restarts the countdown, and the payload is
/// released once the countdown elapses with no newer push.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// `window` is capped at [`MAX_WINDOW`].
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.min(MAX_WINDOW),
            pending: None,
        }
    }

    /// Replaces any pending payload.
    pub fn push(&mut self, payload: T, now: Instant) {
        self.push_with(now, |_| payload);
    }

    /// Folds a new event into the pending payload.
    pub fn push_with(&mut self, now: Instant, fold: impl FnOnce(Option<T>) -> T) {
        let previous = self.pending.take().map(|(payload, _)| payload);
        let deadline = now.checked_add(self.window).unwrap_or(now);
        self.pending = Some((fold(previous), deadline));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.pending.take().map(|(payload, _)| payload),
            _ => None,
        }
    }

    /// Releases the pending payload without waiting.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(payload, _)| payload)
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

/// Latest observed value per key. `Some(None)` records that the key was removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingSync {
    pub list: Option<Option<Value>>,
    pub settings: Option<Option<Value>>,
}

impl PendingSync {
    pub fn is_empty(&self) -> bool {
        self.list.is_none() && self.settings.is_none()
    }
}

/// Absorbs writes made by other devices into a session, once per burst.
#[derive(Debug)]
pub struct SyncReconciler {
    debouncer: Debouncer<PendingSync>,
    passes: u64,
    ignored: u64,
}

impl SyncReconciler {
    pub fn new(window: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(window),
            passes: 0,
            ignored: 0,
        }
    }

    /// Queues `change` if it touches the list or settings key. Returns whether it did.
    pub fn observe(&mut self, change: StorageChange, now: Instant) -> bool {
        let at = change.at();
        let StorageChange {
            key,
            new_value,
            origin,
            ..
        } = change;
        let is_list = match key.as_str() {
            LIST_KEY => true,
            SETTINGS_KEY => false,
            _ => {
                self.ignored += 1;
                debug!(key = %key, origin = %origin, "ignoring change to unrelated key");
                return false;
            }
        };

        debug!(key = %key, origin = %origin, at = %at, "external change queued");
        self.debouncer.push_with(now, |previous| {
            let mut pending = previous.unwrap_or_default();
            if is_list {
                pending.list = Some(new_value);
            } else {
                pending.settings = Some(new_value);
            }
            pending
        });
        true
    }

    pub fn observe_all(&mut self, changes: impl IntoIterator<Item = StorageChange>, now: Instant) -> usize {
        changes
            .into_iter()
            .map(|change| self.observe(change, now))
            .filter(|queued| *queued)
            .count()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Applies the queued burst if its countdown has elapsed.
    pub fn poll<S, P>(&mut self, session: &mut AppSession<S, P>, now: Instant) -> Result<bool, SessionError>
    where
        S: KeyValueStore,
        P: PermissionProbe,
    {
        match self.debouncer.poll(now) {
            Some(pending) => self.apply(session, pending),
            None => Ok(false),
        }
    }

    /// Applies the queued burst immediately.
    pub fn flush<S, P>(&mut self, session: &mut AppSession<S, P>) -> Result<bool, SessionError>
    where
        S: KeyValueStore,
        P: PermissionProbe,
    {
        match self.debouncer.flush() {
            Some(pending) => self.apply(session, pending),
            None => Ok(false),
        }
    }

    /// One turn of the event loop: drain the change feed, then apply if due.
    pub fn pump<S, P>(&mut self, session: &mut AppSession<S, P>, now: Instant) -> Result<bool, SessionError>
    where
        S: KeyValueStore,
        P: PermissionProbe,
    {
        let changes = session.poll_storage()?;
        self.observe_all(changes, now);
        self.poll(session, now)
    }

    /// How long the event loop may sleep before the next `pump`.
    pub fn next_wake(&self, now: Instant, poll_interval: Duration) -> Duration {
        match self.deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(poll_interval),
            None => poll_interval,
        }
    }

    /// Completed reconciliation passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    fn apply<S, P>(&mut self, session: &mut AppSession<S, P>, pending: PendingSync) -> Result<bool, SessionError>
    where
        S: KeyValueStore,
        P: PermissionProbe,
    {
        if pending.is_empty() {
            return Ok(false);
        }
        session.apply_external(pending)?;
        self.passes += 1;
        info!(passes = self.passes, records = session.records().len(), "reconciled external changes");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WINDOW: Duration = Duration::from_millis(50);

    fn change(key: &str, value: Value) -> StorageChange {
        StorageChange {
            key: key.to_string(),
            old_value: None,
            new_value: Some(value),
            origin: "phone".to_string(),
            ts_ms: 0,
        }
    }

    #[test]
    fn debouncer_waits_for_quiet_window() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.push(1, t0);
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(49)), None);
        assert_eq!(debouncer.poll(t0 + WINDOW), Some(1));
        assert_eq!(debouncer.poll(t0 + WINDOW * 2), None);
    }

    #[test]
    fn newer_push_resets_countdown_and_wins() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.push("first", t0);
        debouncer.push("second", t0 + Duration::from_millis(40));
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(60)), None);
        assert_eq!(debouncer.deadline(), Some(t0 + Duration::from_millis(90)));
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(90)), Some("second"));
    }

    #[test]
    fn oversized_window_is_capped() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(Duration::MAX);
        debouncer.push("late", t0);
        assert_eq!(debouncer.deadline(), Some(t0 + MAX_WINDOW));
        assert_eq!(debouncer.poll(t0 + Duration::from_secs(60)), None);
        assert_eq!(debouncer.poll(t0 + MAX_WINDOW), Some("late"));
    }

    #[test]
    fn cancel_drops_pending_payload() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.push((), t0);
        assert!(debouncer.cancel());
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(t0 + WINDOW), None);
    }

    #[test]
    fn keys_coalesce_independently() {
        let t0 = Instant::now();
        let mut reconciler = SyncReconciler::new(WINDOW);
        assert!(reconciler.observe(change(LIST_KEY, json!([1])), t0));
        assert!(reconciler.observe(change(SETTINGS_KEY, json!({ "theme": "dark" })), t0));
        assert!(reconciler.observe(change(LIST_KEY, json!([2])), t0));
        assert!(!reconciler.observe(change("unrelated", json!(0)), t0));

        let pending = reconciler.debouncer.flush().unwrap();
        assert_eq!(pending.list, Some(Some(json!([2]))));
        assert_eq!(pending.settings, Some(Some(json!({ "theme": "dark" }))));
        assert_eq!(reconciler.ignored(), 1);
    }

    #[test]
    fn next_wake_is_capped_by_poll_interval() {
        let t0 = Instant::now();
        let mut reconciler = SyncReconciler::new(WINDOW);
        let poll = Duration::from_millis(200);
        assert_eq!(reconciler.next_wake(t0, poll), poll);
        reconciler.observe(change(LIST_KEY, json!([])), t0);
        assert_eq!(reconciler.next_wake(t0, poll), WINDOW);
        assert_eq!(reconciler.next_wake(t0 + WINDOW * 2, poll), Duration::ZERO);
    }
}

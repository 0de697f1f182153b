use crate::config::NotificationConfig;
use crate::store::{ObservableStore, Unsubscribe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
            NotificationKind::Success => "success",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown notification kind `{0}`")]
pub struct UnknownKind(pub String);

impl FromStr for NotificationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(NotificationKind::Info),
            "warning" | "warn" => Ok(NotificationKind::Warning),
            "error" => Ok(NotificationKind::Error),
            "success" => Ok(NotificationKind::Success),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// A single message held by a [`NotificationStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    /// Auto-dismiss delay; `None` means the entry stays until dismissed.
    pub duration: Option<Duration>,
}

struct Inner {
    store: ObservableStore<Vec<Notification>>,
    next_id: AtomicU64,
    timers: Mutex<HashMap<u64, AbortHandle>>,
    runtime: Option<Handle>,
    config: NotificationConfig,
}

impl Inner {
    fn timers(&self) -> MutexGuard<'_, HashMap<u64, AbortHandle>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64) -> bool {
        self.store.update_if(|list| match list.iter().position(|n| n.id == id) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        })
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, timer) in timers.drain() {
            timer.abort();
        }
    }
}

/// Ordered collection of timed, dismissible messages.
///
/// Ids are handed out from a per-store counter starting at 1, so they are
/// strictly increasing for the lifetime of the store. Auto-dismiss timers
/// run on the tokio runtime that was current when the store was built;
/// they only hold a weak reference, and dropping the last handle to the
/// store cancels all of them.
///
/// # Examples
///
/// ```
/// use uistore::{NotificationKind, NotificationStore};
///
/// let notifications = NotificationStore::new();
/// let id = notifications.show_for("Profile saved", NotificationKind::Success, 0);
/// assert_eq!(notifications.list()[0].id, id);
///
/// notifications.dismiss(id);
/// notifications.dismiss(id);
/// assert!(notifications.is_empty());
/// ```
#[derive(Clone)]
pub struct NotificationStore {
    inner: Arc<Inner>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::with_config(NotificationConfig::default())
    }

    pub fn with_config(config: NotificationConfig) -> Self {
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            log::debug!(
                "notification store created outside a tokio runtime, auto-dismiss disabled"
            );
        }
        Self {
            inner: Arc::new(Inner {
                store: ObservableStore::new(Vec::new()),
                next_id: AtomicU64::new(1),
                timers: Mutex::new(HashMap::new()),
                runtime,
                config,
            }),
        }
    }

    /// Show a message for the configured default duration.
    pub fn show(&self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        self.show_for(message, kind, self.inner.config.default_duration_ms)
    }

    /// Show a message that dismisses itself after `duration_ms`.
    ///
    /// A zero or negative duration keeps the message until it is dismissed
    /// by hand. The id is returned right away so the caller can dismiss
    /// early.
    pub fn show_for(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        duration_ms: i64,
    ) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let duration = u64::try_from(duration_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        let notification = Notification {
            id,
            message: message.into(),
            kind,
            created_at: Utc::now(),
            duration,
        };
        self.inner.store.update(|list| list.push(notification));

        if let Some(duration) = duration {
            self.schedule_dismiss(id, duration);
        }
        id
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Info)
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Success)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Warning)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Error)
    }

    /// Remove a notification. Unknown ids are ignored, which covers a
    /// manual dismiss racing the auto-dismiss timer.
    pub fn dismiss(&self, id: u64) {
        if let Some(timer) = self.inner.timers().remove(&id) {
            timer.abort();
        }
        self.inner.remove(id);
    }

    pub fn clear_all(&self) {
        for (_, timer) in self.inner.timers().drain() {
            timer.abort();
        }
        self.inner.store.update_if(|list| {
            if list.is_empty() {
                return false;
            }
            list.clear();
            true
        });
    }

    /// Snapshot of the current notifications, oldest first.
    pub fn list(&self) -> Vec<Notification> {
        self.inner.store.get_state()
    }

    pub fn get(&self, id: u64) -> Option<Notification> {
        self.inner
            .store
            .read(|list| list.iter().find(|n| n.id == id).cloned())
    }

    pub fn len(&self) -> usize {
        self.inner.store.read(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Listen for changes to the notification list.
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&[Notification]) + Send + Sync + 'static,
    {
        self.inner
            .store
            .subscribe(move |list: &Vec<Notification>| listener(list.as_slice()))
    }

    fn schedule_dismiss(&self, id: u64, duration: Duration) {
        let Some(runtime) = self.inner.runtime.as_ref() else {
            log::warn!("no tokio runtime, notification {id} will not auto-dismiss");
            return;
        };

        let weak = Arc::downgrade(&self.inner);
        // Held across the spawn so the task cannot remove its entry before
        // it is inserted.
        let mut timers = self.inner.timers();
        let task = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                inner.timers().remove(&id);
                if inner.remove(id) {
                    log::debug!("notification {id} auto-dismissed");
                }
            }
        });
        timers.insert(id, task.abort_handle());
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationStore")
            .field("notifications", &self.list())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn ids_are_strictly_increasing() {
        let store = NotificationStore::new();
        let ids: Vec<u64> = (0..5)
            .map(|i| store.show_for(format!("message {i}"), NotificationKind::Info, 0))
            .collect();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(ids[0], 1);
    }

    #[test]
    fn ids_are_not_reused_after_dismiss() {
        let store = NotificationStore::new();
        let first = store.show_for("a", NotificationKind::Info, 0);
        store.dismiss(first);
        let second = store.show_for("b", NotificationKind::Info, 0);
        assert!(second > first);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = NotificationStore::new();
        store.show_for("first", NotificationKind::Info, 0);
        store.show_for("second", NotificationKind::Warning, 0);
        store.show_for("third", NotificationKind::Error, 0);

        let messages: Vec<String> = store.list().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn dismiss_twice_is_a_no_op() {
        let store = NotificationStore::new();
        let keep = store.show_for("keep", NotificationKind::Info, 0);
        let gone = store.show_for("gone", NotificationKind::Info, 0);

        store.dismiss(gone);
        let after_first = store.list();
        store.dismiss(gone);

        assert_eq!(store.list(), after_first);
        assert_eq!(store.len(), 1);
        assert!(store.get(keep).is_some());
    }

    #[test]
    fn dismiss_unknown_id_does_not_notify() {
        let store = NotificationStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        store.subscribe({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.dismiss(42);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clear_all_empties_the_list() {
        let store = NotificationStore::new();
        for i in 0..3 {
            store.show_for(format!("n{i}"), NotificationKind::Success, 0);
        }

        store.clear_all();
        assert!(store.list().is_empty());

        store.clear_all();
        assert!(store.is_empty());
    }

    #[test]
    fn subscribers_receive_the_new_list() {
        let store = NotificationStore::new();
        let lengths = Arc::new(Mutex::new(Vec::new()));
        store.subscribe({
            let lengths = lengths.clone();
            move |list: &[Notification]| lengths.lock().unwrap().push(list.len())
        });

        let id = store.show_for("hello", NotificationKind::Info, 0);
        store.show_for("world", NotificationKind::Info, 0);
        store.dismiss(id);
        store.clear_all();

        assert_eq!(*lengths.lock().unwrap(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn negative_duration_disables_auto_dismiss() {
        let store = NotificationStore::new();
        let id = store.show_for("sticky", NotificationKind::Warning, -1);
        assert_eq!(store.get(id).and_then(|n| n.duration), None);
    }

    #[test]
    fn timed_notification_outside_a_runtime_is_kept() {
        let store = NotificationStore::new();
        let id = store.show_for("x", NotificationKind::Info, 100);

        let shown = store.get(id).expect("notification should be kept");
        assert_eq!(shown.duration, Some(Duration::from_millis(100)));
        assert_eq!(store.len(), 1);

        store.dismiss(id);
        assert!(store.is_empty());
    }

    #[test]
    fn convenience_methods_set_kind() {
        let store = NotificationStore::with_config(NotificationConfig {
            default_duration_ms: 0,
        });
        store.info("i");
        store.success("s");
        store.warning("w");
        store.error("e");

        let kinds: Vec<NotificationKind> = store.list().into_iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::Info,
                NotificationKind::Success,
                NotificationKind::Warning,
                NotificationKind::Error,
            ]
        );
    }

    #[test]
    fn kind_parses_from_labels() {
        assert_eq!("success".parse::<NotificationKind>(), Ok(NotificationKind::Success));
        assert_eq!("warn".parse::<NotificationKind>(), Ok(NotificationKind::Warning));
        assert_eq!(" Error ".parse::<NotificationKind>(), Ok(NotificationKind::Error));
        assert!("fatal".parse::<NotificationKind>().is_err());
        assert_eq!(NotificationKind::default(), NotificationKind::Info);
        assert_eq!(NotificationKind::Warning.to_string(), "warning");
    }

    #[tokio::test(start_paused = true)]
    async fn notification_expires_after_its_duration() {
        let store = NotificationStore::new();
        store.show_for("Saved", NotificationKind::Success, 100);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.len(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn default_duration_is_five_seconds() {
        let store = NotificationStore::new();
        store.info("hello");

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(store.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_dismiss_cancels_timer() {
        let store = NotificationStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let id = store.show_for("bye", NotificationKind::Info, 100);
        store.subscribe({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.dismiss(id);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.inner.timers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_store_cancels_timers() {
        let store = NotificationStore::new();
        store.show_for("pending", NotificationKind::Info, 100);
        let weak = Arc::downgrade(&store.inner);

        drop(store);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(weak.upgrade().is_none());
    }
}

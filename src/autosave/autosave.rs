use super::draft::DraftStore;
use crate::config::AutoSaveConfig;
use crate::error::{Error, Result};
use crate::store::{ObservableStore, Unsubscribe};
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

type SaveFn<D> = Arc<dyn Fn(D) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
type ErrorSink = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;
type Drafts<D> = Arc<dyn DraftStore<D>>;

/// Observable progress of an [`AutoSaveController`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoSaveState {
    pub is_saving: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub has_unsaved_changes: bool,
}

struct Pending<D> {
    generation: u64,
    data: D,
    timer: AbortHandle,
}

struct Shared<D> {
    save: SaveFn<D>,
    state: ObservableStore<AutoSaveState>,
    pending: Mutex<Option<Pending<D>>>,
    generation: AtomicU64,
    // Only one call to `save` runs at a time.
    gate: tokio::sync::Mutex<()>,
    error_sink: Mutex<Option<ErrorSink>>,
    drafts: Mutex<Option<Drafts<D>>>,
}

// Clears `is_saving` however `run` is left, including a dropped future or a
// panicking save function.
struct SavingFlag<'a>(&'a ObservableStore<AutoSaveState>);

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        self.0.update_if(|state| std::mem::replace(&mut state.is_saving, false));
    }
}

impl<D> Shared<D>
where
    D: Send + 'static,
{
    fn pending(&self) -> MutexGuard<'_, Option<Pending<D>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the pending data if it still belongs to `generation`.
    fn take_if_current(&self, generation: u64) -> Option<D> {
        let mut pending = self.pending();
        let current = pending
            .as_ref()
            .is_some_and(|entry| entry.generation == generation);
        if current {
            pending.take().map(|entry| entry.data)
        } else {
            None
        }
    }

    fn take_any(&self) -> Option<Pending<D>> {
        let pending = self.pending().take();
        if let Some(entry) = pending.as_ref() {
            entry.timer.abort();
        }
        pending
    }

    async fn run(&self, data: D) -> anyhow::Result<()> {
        let _turn = self.gate.lock().await;
        self.state.update(|state| state.is_saving = true);
        let _saving = SavingFlag(&self.state);

        let result = (self.save)(data).await;

        let still_pending = self.pending().is_some();
        self.state.update(|state| {
            state.is_saving = false;
            if result.is_ok() {
                state.last_saved_at = Some(Utc::now());
                state.has_unsaved_changes = still_pending;
            }
        });
        if result.is_ok() && !still_pending {
            self.clear_draft();
        }
        result
    }

    fn drafts(&self) -> Option<Drafts<D>> {
        self.drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear_draft(&self) {
        if let Some(drafts) = self.drafts() {
            if let Err(err) = drafts.clear() {
                log::warn!("could not clear the local draft: {err:#}");
            }
        }
    }

    fn report(&self, err: &anyhow::Error) {
        log::error!("auto-save failed: {err:#}");
        let sink = self
            .error_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink(err);
        }
    }
}

/// Debounced wrapper around an async save function.
///
/// [`trigger_save`](Self::trigger_save) is fire-and-forget: it marks the
/// state dirty at once and restarts a quiet-period timer, and only the data
/// from the last call before the timer fires is saved. Failures on that
/// path are logged and handed to the error sink, never to the caller.
/// [`force_save`](Self::force_save) and [`flush`](Self::flush) save
/// immediately and return the outcome.
///
/// Saves never overlap: a forced save issued while a debounced save is in
/// flight waits for it to finish first. Dropping the controller cancels
/// the pending timer.
///
/// # Examples
///
/// ```
/// use uistore::AutoSaveController;
/// use std::sync::{Arc, Mutex};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> uistore::Result<()> {
/// let saved = Arc::new(Mutex::new(Vec::new()));
/// let autosave = AutoSaveController::new({
///     let saved = saved.clone();
///     move |draft: String| {
///         saved.lock().unwrap().push(draft);
///         async { Ok::<(), anyhow::Error>(()) }
///     }
/// })?;
///
/// autosave.trigger_save("first draft".to_string());
/// assert!(autosave.state().has_unsaved_changes);
///
/// autosave.force_save("final".to_string()).await?;
/// assert_eq!(*saved.lock().unwrap(), vec!["final".to_string()]);
/// assert!(!autosave.state().has_unsaved_changes);
/// # Ok(())
/// # }
/// ```
pub struct AutoSaveController<D> {
    shared: Arc<Shared<D>>,
    runtime: Handle,
    delay: Duration,
}

impl<D> AutoSaveController<D>
where
    D: Send + 'static,
{
    /// Create a controller with the default 2 s debounce delay.
    ///
    /// # Errors
    /// Returns [`Error::NoRuntime`] when called outside a tokio runtime.
    pub fn new<F, Fut>(save: F) -> Result<Self>
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::with_config(AutoSaveConfig::default(), save)
    }

    pub fn with_config<F, Fut>(config: AutoSaveConfig, save: F) -> Result<Self>
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let runtime = Handle::try_current()?;
        let save: SaveFn<D> = Arc::new(move |data| save(data).boxed());

        Ok(Self {
            shared: Arc::new(Shared {
                save,
                state: ObservableStore::new(AutoSaveState::default()),
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
                gate: tokio::sync::Mutex::new(()),
                error_sink: Mutex::new(None),
                drafts: Mutex::new(None),
            }),
            runtime,
            delay: config.delay(),
        })
    }

    /// Receive every failure of the debounced path, e.g. to raise a
    /// notification.
    pub fn with_error_sink<F>(self, sink: F) -> Self
    where
        F: Fn(&anyhow::Error) + Send + Sync + 'static,
    {
        *self
            .shared
            .error_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(sink));
        self
    }

    /// Keep a local copy of every triggered value until a save succeeds.
    pub fn with_draft_store<S>(self, drafts: S) -> Self
    where
        S: DraftStore<D> + 'static,
    {
        *self
            .shared
            .drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(drafts));
        self
    }

    /// The draft left behind by an edit that never reached the save
    /// function, e.g. before a crash or restart.
    ///
    /// Returns `Ok(None)` when no draft store is configured. Restoring does
    /// not schedule a save; feed the draft back through
    /// [`trigger_save`](Self::trigger_save) once the caller has merged it.
    ///
    /// # Errors
    /// Returns [`Error::Draft`] if the stored draft cannot be read back.
    pub fn restore_draft(&self) -> Result<Option<D>> {
        match self.shared.drafts() {
            Some(drafts) => drafts.restore().map_err(Error::Draft),
            None => Ok(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a save of `data` once no newer call arrives for `delay`.
    pub fn trigger_save(&self, data: D) {
        self.shared.state.update_if(|state| {
            if state.has_unsaved_changes {
                return false;
            }
            state.has_unsaved_changes = true;
            true
        });
        if let Some(drafts) = self.shared.drafts() {
            if let Err(err) = drafts.stash(&data) {
                log::warn!("could not stash the local draft: {err:#}");
            }
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.shared);
        let delay = self.delay;

        let mut pending = self.shared.pending();
        if let Some(previous) = pending.take() {
            previous.timer.abort();
        }
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(data) = shared.take_if_current(generation) else {
                return;
            };
            if let Err(err) = shared.run(data).await {
                shared.report(&err);
            }
        });
        *pending = Some(Pending {
            generation,
            data,
            timer: task.abort_handle(),
        });
    }

    /// Cancel any pending debounced save and save `data` now.
    ///
    /// # Errors
    /// Returns [`Error::Save`] if the save function fails; the unsaved flag
    /// is left as it was so the caller can retry.
    pub async fn force_save(&self, data: D) -> Result<()> {
        if self.shared.take_any().is_some() {
            log::debug!("force_save superseded a pending auto-save");
        }
        self.shared.run(data).await.map_err(Error::Save)
    }

    /// Save the pending debounced data right away, if there is any.
    ///
    /// Meant for moments where waiting out the delay is not an option,
    /// such as the user navigating away.
    pub async fn flush(&self) -> Result<()> {
        match self.shared.take_any() {
            Some(pending) => self.shared.run(pending.data).await.map_err(Error::Save),
            None => Ok(()),
        }
    }

    /// Drop the pending debounced data without saving it.
    ///
    /// Returns `true` if something was discarded.
    pub fn cancel(&self) -> bool {
        self.shared.take_any().is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.shared.pending().is_some()
    }

    pub fn state(&self) -> AutoSaveState {
        self.shared.state.get_state()
    }

    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&AutoSaveState) + Send + Sync + 'static,
    {
        self.shared.state.subscribe(listener)
    }
}

impl<D> Drop for AutoSaveController<D> {
    fn drop(&mut self) {
        let pending = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pending) = pending {
            pending.timer.abort();
            log::debug!("auto-save controller dropped with a pending save, cancelled");
        }
    }
}

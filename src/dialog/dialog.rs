use crate::store::{ObservableStore, Unsubscribe};
use serde::{Deserialize, Serialize};

/// What a dialog host renders: whether the dialog is showing and with
/// which payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogState<C> {
    pub is_open: bool,
    pub config: Option<C>,
}

impl<C> Default for DialogState<C> {
    fn default() -> Self {
        Self {
            is_open: false,
            config: None,
        }
    }
}

/// Holds at most one active modal.
///
/// Opening replaces whatever was there: there is no queue and no merge.
/// Closing keeps the payload so an exit animation can still render it.
///
/// # Examples
///
/// ```
/// use uistore::DialogStore;
///
/// let dialogs = DialogStore::new();
/// dialogs.open("confirm-delete");
/// dialogs.open("confirm-logout");
/// dialogs.close();
///
/// let state = dialogs.get_config();
/// assert!(!state.is_open);
/// assert_eq!(state.config, Some("confirm-logout"));
/// ```
pub struct DialogStore<C> {
    store: ObservableStore<DialogState<C>>,
}

impl<C> DialogStore<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            store: ObservableStore::new(DialogState::default()),
        }
    }

    /// Show `config`, discarding any previous payload.
    pub fn open(&self, config: C) {
        self.store.set_state(DialogState {
            is_open: true,
            config: Some(config),
        });
    }

    /// Hide the dialog. The last payload stays readable.
    ///
    /// Closing a dialog that is already closed notifies no one.
    pub fn close(&self) {
        self.store.update_if(|state| std::mem::replace(&mut state.is_open, false));
    }

    /// Hide the dialog and drop its payload.
    pub fn reset(&self) {
        self.store.set_state(DialogState::default());
    }

    pub fn get_config(&self) -> DialogState<C> {
        self.store.get_state()
    }

    pub fn is_open(&self) -> bool {
        self.store.read(|state| state.is_open)
    }

    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&DialogState<C>) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }
}

impl<C> Clone for DialogStore<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<C> Default for DialogStore<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

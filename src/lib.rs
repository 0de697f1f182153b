//! # uistore
//!
//! Small publish-subscribe state layer for interactive front ends.
//!
//! ## Store (the primitive)
//!
//! - `ObservableStore<S>` - Shared state whose mutations synchronously notify
//!   listeners, in subscription order, with a snapshot of the new state
//!
//! ## Domain stores
//!
//! Built on top of `ObservableStore`:
//! - `NotificationStore` - Timed, dismissible messages with monotonic ids
//! - `DialogStore<C>` - A single active modal, last write wins
//! - `AutoSaveController<D>` - Debounced async persistence with force-flush
//!   and cancellation on drop, plus an optional local draft that survives a
//!   restart
//!
//! Every instance is created and owned by the caller; there is no global
//! state. Timers run on the tokio runtime that is current at construction.

pub mod autosave;
pub mod config;
pub mod dialog;
mod error;
pub mod notification;
pub mod store;

// Re-export main types for convenience
pub use autosave::{
    AutoSaveController, AutoSaveState, DraftStore, FileDraftStore, MemoryDraftStore,
};
pub use config::Config;
pub use dialog::{DialogState, DialogStore};
pub use error::{Error, Result};
pub use notification::{Notification, NotificationKind, NotificationStore};
pub use store::{ObservableStore, SubscriptionGuard, SubscriptionId, Unsubscribe};

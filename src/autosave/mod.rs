//! Debounced persistence of in-progress edits.

mod autosave;
mod draft;

pub use autosave::{AutoSaveController, AutoSaveState};
pub use draft::{DraftStore, FileDraftStore, MemoryDraftStore};

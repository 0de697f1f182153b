//! Single active modal dialog state.

mod dialog;

pub use dialog::{DialogState, DialogStore};

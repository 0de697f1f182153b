//! Timed, dismissible user-facing messages.

mod notification;

pub use notification::{Notification, NotificationKind, NotificationStore, UnknownKind};

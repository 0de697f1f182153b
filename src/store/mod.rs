//! Observable state containers.
//!
//! [`ObservableStore`] is the publish-subscribe primitive every other store
//! in the crate is built on: a shared piece of state plus an ordered list of
//! listeners that are called synchronously after each mutation.

mod store;

pub use store::{ObservableStore, SubscriptionGuard, SubscriptionId, Unsubscribe};

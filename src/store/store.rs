use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// Identity of one registration on a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Listeners<S> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener<S>)>,
}

// Pending snapshots for re-entrant mutations made from inside a listener.
struct Dispatch<S> {
    active: bool,
    queue: VecDeque<S>,
}

/// Anything an [`Unsubscribe`] handle can detach itself from.
trait Detach {
    fn detach(&self, id: SubscriptionId) -> bool;
}

impl<S> Detach for RwLock<Listeners<S>> {
    fn detach(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry_id, _)| *entry_id != id);
        listeners.entries.len() != before
    }
}

/// An observable state container.
///
/// Every mutation synchronously notifies the registered listeners, in
/// subscription order, with a snapshot of the new state. Listeners never
/// see the live state, so the only way to change it is through the store.
///
/// # Examples
///
/// ```
/// use uistore::ObservableStore;
/// use std::sync::{Arc, Mutex};
///
/// let store = ObservableStore::new(0);
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let handle = store.subscribe({
///     let seen = seen.clone();
///     move |value: &i32| seen.lock().unwrap().push(*value)
/// });
///
/// store.set_state(1);
/// store.update(|value| *value += 1);
/// handle.unsubscribe();
/// store.set_state(10);
///
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
pub struct ObservableStore<S> {
    state: Arc<RwLock<S>>,
    listeners: Arc<RwLock<Listeners<S>>>,
    dispatch: Arc<Mutex<Dispatch<S>>>,
}

impl<S> ObservableStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Create a new store with the given initial state.
    pub fn new(initial: S) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            listeners: Arc::new(RwLock::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
            dispatch: Arc::new(Mutex::new(Dispatch {
                active: false,
                queue: VecDeque::new(),
            })),
        }
    }

    /// Get a snapshot of the current state.
    pub fn get_state(&self) -> S {
        self.read_state().clone()
    }

    /// Read state without cloning and without notifying anyone.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        f(&*self.read_state())
    }

    /// Replace the state and notify listeners.
    pub fn set_state(&self, new_state: S) {
        let snapshot = {
            let mut state = self.write_state();
            *state = new_state;
            state.clone()
        };
        self.notify(snapshot);
    }

    /// Mutate the state in place and notify listeners.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut S),
    {
        self.update_if(|state| {
            f(state);
            true
        });
    }

    /// Mutate the state in place, notifying listeners only when `f`
    /// reports that it changed something.
    ///
    /// Returns what `f` returned.
    pub fn update_if<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut S) -> bool,
    {
        let snapshot = {
            let mut state = self.write_state();
            if !f(&mut *state) {
                return false;
            }
            state.clone()
        };
        self.notify(snapshot);
        true
    }

    /// Subscribe to state changes.
    ///
    /// The listener is called after every mutation, never at registration
    /// time. The returned handle removes exactly this listener.
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let listener: Listener<S> = Arc::new(listener);
        let id = {
            let mut listeners = self
                .listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let id = SubscriptionId(listeners.next_id);
            listeners.next_id += 1;
            listeners.entries.push((id, listener));
            id
        };
        let registry: Weak<RwLock<Listeners<S>>> = Arc::downgrade(&self.listeners);
        Unsubscribe { id, registry }
    }

    /// Subscribe to one slice of the state.
    ///
    /// `select` is evaluated after every mutation and `listener` receives
    /// `(current, previous)` only when the selected value differs from the
    /// last one seen. The baseline is taken at registration time.
    pub fn subscribe_with_selector<T, Sel, F>(&self, select: Sel, listener: F) -> Unsubscribe
    where
        T: PartialEq + Clone + Send + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let last = Mutex::new(self.read(&select));
        self.subscribe(move |state: &S| {
            let current = select(state);
            let previous = {
                let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
                if *last == current {
                    return;
                }
                std::mem::replace(&mut *last, current.clone())
            };
            listener(&current, &previous);
        })
    }

    /// Number of currently registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Deliver a snapshot to every listener.
    ///
    /// A mutation made by a listener while a fan-out is running is queued
    /// and delivered once the current fan-out is over, so two notification
    /// sequences never interleave.
    fn notify(&self, snapshot: S) {
        {
            let mut dispatch = self.lock_dispatch();
            dispatch.queue.push_back(snapshot);
            if dispatch.active {
                return;
            }
            dispatch.active = true;
        }

        loop {
            let next = {
                let mut dispatch = self.lock_dispatch();
                match dispatch.queue.pop_front() {
                    Some(next) => next,
                    None => {
                        dispatch.active = false;
                        return;
                    }
                }
            };
            self.fan_out(&next);
        }
    }

    fn fan_out(&self, snapshot: &S) {
        // Copy the list first: listeners may (un)subscribe while we iterate.
        let listeners: Vec<(SubscriptionId, Listener<S>)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(snapshot))) {
                log::error!(
                    "store listener {:?} panicked: {}",
                    id,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, S> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, S> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_dispatch(&self) -> MutexGuard<'_, Dispatch<S>> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> Clone for ObservableStore<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            listeners: Arc::clone(&self.listeners),
            dispatch: Arc::clone(&self.dispatch),
        }
    }
}

impl<S> Default for ObservableStore<S>
where
    S: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: fmt::Debug> fmt::Debug for ObservableStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ObservableStore")
            .field("state", &*state)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping it leaves the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) or convert it with
/// [`into_guard`](Self::into_guard) for scope-bound registration.
pub struct Unsubscribe {
    id: SubscriptionId,
    registry: Weak<dyn Detach + Send + Sync>,
}

impl Unsubscribe {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the listener. Calling this more than once, or after the
    /// store is gone, does nothing.
    ///
    /// Returns `true` if this call removed the listener.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.detach(self.id),
            None => false,
        }
    }

    /// Tie the registration to a value's lifetime.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { handle: self }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe").field("id", &self.id).finish()
    }
}

/// RAII guard that unsubscribes its listener when dropped.
#[derive(Debug)]
pub struct SubscriptionGuard {
    handle: Unsubscribe,
}

impl SubscriptionGuard {
    pub fn id(&self) -> SubscriptionId {
        self.handle.id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}

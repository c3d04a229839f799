//! Copy-on-write collections of live sessions and listeners.
//!
//! Writers build a new backing slice under the mutex and swap it in;
//! readers clone the current `Arc` and iterate without holding the lock.
//! Mutations are rare (connect, disconnect) while iteration happens on
//! every broadcast.

use std::sync::{Arc, Mutex, PoisonError};

use crate::session::ClientSession;

/// Immutable view of a [`SnapshotSet`] at one point in time.
pub type Snapshot<T> = Arc<[Arc<T>]>;

/// A set of shared values, identified by `Arc` pointer.
pub(crate) struct SnapshotSet<T: ?Sized> {
    items: Mutex<Snapshot<T>>,
}

impl<T: ?Sized> SnapshotSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(Arc::from(Vec::new())),
        }
    }

    fn with_items<R>(&self, f: impl FnOnce(&mut Snapshot<T>) -> R) -> R {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut items)
    }

    /// Insert `item` unless the same allocation is already present.
    pub(crate) fn insert(&self, item: Arc<T>) -> bool {
        self.with_items(|items| {
            if items.iter().any(|i| same(i, &item)) {
                return false;
            }
            let mut next: Vec<Arc<T>> = items.to_vec();
            next.push(item);
            *items = Arc::from(next);
            true
        })
    }

    pub(crate) fn remove(&self, item: &Arc<T>) -> bool {
        self.with_items(|items| {
            if !items.iter().any(|i| same(i, item)) {
                return false;
            }
            let next: Vec<Arc<T>> = items.iter().filter(|i| !same(i, item)).cloned().collect();
            *items = Arc::from(next);
            true
        })
    }

    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.with_items(|items| items.clone())
    }

    /// Swap in an empty set and return what was there.
    pub(crate) fn take_all(&self) -> Snapshot<T> {
        self.with_items(|items| std::mem::replace(items, Arc::from(Vec::new())))
    }

    pub(crate) fn len(&self) -> usize {
        self.with_items(|items| items.len())
    }
}

/// Pointer identity, ignoring trait-object metadata.
fn same<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// ---------------------------------------------------------------------------
// Connection registry
// ---------------------------------------------------------------------------

/// Thread-safe set of live client sessions.
///
/// Cloning yields another handle to the same set.
#[derive(Clone)]
pub struct ConnectionRegistry {
    sessions: Arc<SnapshotSet<ClientSession>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(SnapshotSet::new()),
        }
    }

    /// Register a session. Returns `false` if it was already present.
    pub fn add(&self, session: &Arc<ClientSession>) -> bool {
        self.sessions.insert(Arc::clone(session))
    }

    /// Returns `false` if the session was not registered.
    pub fn remove(&self, session: &Arc<ClientSession>) -> bool {
        self.sessions.remove(session)
    }

    pub fn snapshot(&self) -> Snapshot<ClientSession> {
        self.sessions.snapshot()
    }

    /// Remove every session at once, returning them.
    pub fn take_all(&self) -> Snapshot<ClientSession> {
        self.sessions.take_all()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

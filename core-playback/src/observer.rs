//! Player observers and their weak registry.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::location::ChapterLocation;

/// Receives player notifications. Every method defaults to a no-op.
///
/// Callbacks run on whichever task processed the engine event and must not
/// block.
pub trait PlayerObserver: Send + Sync {
    fn did_begin_playback(&self, _location: &ChapterLocation) {}

    fn did_stop_playback(&self, _location: &ChapterLocation) {}

    fn did_fail_playback(&self, _location: &ChapterLocation, _error: Option<&str>) {}

    fn did_complete(&self, _location: &ChapterLocation) {}

    fn did_unload(&self) {}
}

/// Observers held by weak reference.
///
/// The registry never keeps an observer alive. Dropped observers are pruned
/// lazily, and notification iterates a snapshot taken outside the lock, so a
/// callback may register or remove observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Weak<dyn PlayerObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer`. Registering the same observer twice is a no-op.
    pub fn register<O: PlayerObserver + 'static>(&self, observer: &Arc<O>) {
        let mut observers = self.observers.lock();
        observers.retain(|weak| weak.strong_count() > 0);
        if !observers.iter().any(|weak| same_observer(weak, observer)) {
            let weak: Weak<O> = Arc::downgrade(observer);
            observers.push(weak);
        }
    }

    /// Remove `observer`. Removing an unknown observer is a no-op.
    pub fn remove<O: PlayerObserver + 'static>(&self, observer: &Arc<O>) {
        self.observers
            .lock()
            .retain(|weak| weak.strong_count() > 0 && !same_observer(weak, observer));
    }

    pub fn clear(&self) {
        self.observers.lock().clear();
    }

    /// Number of live observers.
    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strong handles to the live observers, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn PlayerObserver>> {
        let mut observers = self.observers.lock();
        observers.retain(|weak| weak.strong_count() > 0);
        observers.iter().filter_map(Weak::upgrade).collect()
    }
}

fn same_observer<O: PlayerObserver>(weak: &Weak<dyn PlayerObserver>, observer: &Arc<O>) -> bool {
    weak.as_ptr() as *const () == Arc::as_ptr(observer) as *const ()
}

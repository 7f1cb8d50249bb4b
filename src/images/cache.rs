//! Single-flight cache
//!
//! One slot per key. Concurrent async requests for the same key wait on the same
//! initialization; blocking requests serialize on the slot's gate. Failed
//! initializations leave the slot empty so a later call can try again.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;

#[derive(Debug)]
struct Slot<V> {
    cell: OnceCell<V>,
    gate: Mutex<()>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
            gate: Mutex::new(()),
        }
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

#[derive(Debug)]
pub struct SingleFlightCache<K, V> {
    slots: Mutex<HashMap<K, Arc<Slot<V>>>>,
}

impl<K, V> Default for SingleFlightCache<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

// A panic while holding a lock cannot leave the map or the gate inconsistent.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &K) -> Arc<Slot<V>> {
        lock(&self.slots).entry(key.clone()).or_default().clone()
    }

    /// Number of keys holding a value.
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|s| s.cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocking single-flight lookup. A failed `init` leaves the key empty.
    pub fn get_or_try_init<E, F>(&self, key: &K, init: F) -> Result<(V, Lookup), E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot(key);
        let _gate = lock(&slot.gate);
        if let Some(v) = slot.cell.get() {
            return Ok((v.clone(), Lookup::Hit));
        }
        let value = init()?;
        // An async initializer may have won the race; keep its value.
        let _ = slot.cell.set(value.clone());
        Ok((slot.cell.get().cloned().unwrap_or(value), Lookup::Miss))
    }

    /// Async single-flight lookup; concurrent callers await the same `init`.
    pub async fn get_or_try_init_async<E, F, Fut>(&self, key: &K, init: F) -> Result<(V, Lookup), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        let ran = AtomicBool::new(false);
        let value = slot
            .cell
            .get_or_try_init(|| {
                ran.store(true, Ordering::Relaxed);
                init()
            })
            .await?
            .clone();
        let lookup = if ran.load(Ordering::Relaxed) {
            Lookup::Miss
        } else {
            Lookup::Hit
        };
        Ok((value, lookup))
    }
}

//! Interner: the shared table and the lookup path.

use crate::config::{InternerConfig, Retention};
use crate::error::ConfigError;
use crate::interned::Interned;
use crate::reclaim;
use crate::reentrancy::{DebugReentrancy, ReentrancyGuard};
use crate::table::{Keyed, SlotId, Table};
use crate::tokens::{AtomicCount, Count};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use parking_lot::lock_api::{Mutex, MutexGuard, RawMutex};
use std::collections::hash_map::RandomState;
use std::sync::Arc;

/// State shared by an interner and every entry it created.
pub(crate) struct Shared<T, S, R: RawMutex> {
    table: Mutex<R, Table<Entry<T, S, R>, S>>,
    reentrancy: DebugReentrancy,
    _owns: PhantomData<T>,
}

impl<T, S, R: RawMutex> Shared<T, S, R> {
    /// Lock the table. Panics in debug builds if this thread already holds
    /// it, rather than deadlocking.
    pub(crate) fn lock(&self) -> Locked<'_, T, S, R> {
        let reentrancy = self.reentrancy.enter();
        Locked {
            table: self.table.lock(),
            _reentrancy: reentrancy,
        }
    }
}

/// The locked table. The mutex is released before the reentrancy marker.
pub(crate) struct Locked<'a, T, S, R: RawMutex> {
    table: MutexGuard<'a, R, Table<Entry<T, S, R>, S>>,
    _reentrancy: ReentrancyGuard,
}

impl<T, S, R: RawMutex> Deref for Locked<'_, T, S, R> {
    type Target = Table<Entry<T, S, R>, S>;

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

impl<T, S, R: RawMutex> DerefMut for Locked<'_, T, S, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.table
    }
}

/// Heap entry behind a handle. Address-stable from insertion until it is
/// reclaimed.
pub(crate) struct Entry<T, S, R: RawMutex> {
    pub(crate) value: T,
    pub(crate) count: AtomicCount,
    pub(crate) slot: SlotId,
    // Lets the last handle reach the table even after the interner is gone.
    pub(crate) shared: Arc<Shared<T, S, R>>,
}

impl<T, S, R: RawMutex> Entry<T, S, R> {
    fn alloc(value: T, slot: SlotId, shared: Arc<Shared<T, S, R>>) -> NonNull<Self> {
        NonNull::from(Box::leak(Box::new(Self {
            value,
            count: AtomicCount::new(0),
            slot,
            shared,
        })))
    }
}

impl<T: Eq + Hash, S, R: RawMutex> Keyed for Entry<T, S, R> {
    type Key = T;

    fn key(&self) -> &T {
        &self.value
    }
}

/// A table that hands out one [`Interned`] handle per distinct value.
///
/// Equal values interned through the same `Interner` yield handles that
/// compare equal by pointer; the entry is freed as soon as the last handle
/// drops (unless the interner was built with [`Retention::Pinned`]).
///
/// The lock type `R` is injectable; it defaults to `parking_lot`'s mutex.
pub struct Interner<T, S = RandomState, R: RawMutex = parking_lot::RawMutex> {
    shared: Arc<Shared<T, S, R>>,
    retention: Retention,
}

impl<T> Interner<T>
where
    T: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_config(InternerConfig::default())
    }

    pub fn with_config(config: InternerConfig) -> Self {
        Self::with_config_and_hasher(config, RandomState::new())
    }

    /// Build an interner whose retention comes from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::with_config(InternerConfig::from_env()?))
    }
}

impl<T> Default for Interner<T>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, R> Interner<T, S, R>
where
    T: Eq + Hash,
    S: BuildHasher,
    R: RawMutex,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config_and_hasher(InternerConfig::default(), hasher)
    }

    pub fn with_config_and_hasher(config: InternerConfig, hasher: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(Table::with_hasher(hasher)),
                reentrancy: DebugReentrancy::new(),
                _owns: PhantomData,
            }),
            retention: config.retention,
        }
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// Number of values currently interned.
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shared.lock().contains(q)
    }

    /// Return the handle for `value`, creating it if this is the first
    /// live occurrence.
    ///
    /// `T`'s `Hash` and `Eq` run while the table lock is held, so they must
    /// not call back into this interner (intern, find, len, or dropping one
    /// of its handles). Doing so panics in debug builds and deadlocks in
    /// release builds. The same applies to `ToOwned` in
    /// [`intern_ref`](Self::intern_ref).
    pub fn intern(&self, value: T) -> Interned<T, S, R> {
        let mut table = self.shared.lock();
        let hash = table.hash_one(&value);
        if let Some(entry) = table.find(hash, &value) {
            // SAFETY: found under the lock, so the count cannot reach zero
            // before the new token is minted.
            let handle = unsafe { Interned::acquire(entry) };
            // Unlock before `value` drops; it may own handles of this interner.
            drop(table);
            return handle;
        }
        self.insert_locked(&mut table, hash, value)
    }

    /// Like [`intern`](Self::intern), but only builds the owned value on a
    /// miss.
    pub fn intern_ref<Q>(&self, q: &Q) -> Interned<T, S, R>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = T>,
    {
        let mut table = self.shared.lock();
        let hash = table.hash_one(q);
        if let Some(entry) = table.find(hash, q) {
            // SAFETY: as in `intern`.
            return unsafe { Interned::acquire(entry) };
        }
        self.insert_locked(&mut table, hash, q.to_owned())
    }

    /// Return the existing handle for `q` without inserting.
    pub fn find<Q>(&self, q: &Q) -> Option<Interned<T, S, R>>
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let table = self.shared.lock();
        let entry = table.find(table.hash_one(q), q)?;
        // SAFETY: as in `intern`.
        Some(unsafe { Interned::acquire(entry) })
    }

    fn insert_locked(
        &self,
        table: &mut Table<Entry<T, S, R>, S>,
        hash: u64,
        value: T,
    ) -> Interned<T, S, R> {
        let shared = Arc::clone(&self.shared);
        let entry = table.insert_unique(hash, |slot| Entry::alloc(value, slot, shared));
        // SAFETY: just inserted and the lock is still held.
        let e = unsafe { entry.as_ref() };
        if self.retention == Retention::Pinned {
            if let Err(t) = table.pin(e.slot, e.count.get()) {
                e.count.put(t);
            }
        }
        tracing::trace!(slot = ?e.slot, "interned new value");
        // SAFETY: as above.
        unsafe { Interned::acquire(entry) }
    }
}

impl<T, S, R: RawMutex> Drop for Interner<T, S, R> {
    fn drop(&mut self) {
        if self.retention == Retention::Pinned {
            reclaim::release_pins(&self.shared);
        }
    }
}

impl<T, S, R: RawMutex> fmt::Debug for Interner<T, S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.shared.lock().len())
            .field("retention", &self.retention)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_reuses_entry_and_counts() {
        let i: Interner<String> = Interner::new();
        let a = i.intern("a".to_string());
        let b = i.intern_ref("a");
        assert!(Interned::ptr_eq(&a, &b));
        assert_eq!(a.ref_count(), 2);
        drop(b);
        assert_eq!(a.ref_count(), 1);
        assert_eq!(i.len(), 1);
    }

    #[test]
    fn pinned_entry_holds_extra_count() {
        let i: Interner<u32> = Interner::with_config(InternerConfig::new(Retention::Pinned));
        let a = i.intern(7);
        assert_eq!(a.ref_count(), 2);
        drop(a);
        assert_eq!(i.len(), 1);
        let again = i.find(&7u32).expect("pinned entry survives");
        assert_eq!(again.ref_count(), 2);
    }

    #[test]
    fn debug_reports_len() {
        let i: Interner<&'static str> = Interner::new();
        let _a = i.intern("x");
        let s = format!("{:?}", i);
        assert!(s.contains("len: 1"), "{s}");
        assert!(s.contains("Reclaim"), "{s}");
    }
}

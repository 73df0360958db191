//! Table: structural index from values to entry slots.
//!
//! The table never owns entries. Each slot holds a raw pointer to an
//! entry allocated elsewhere, the hash computed when it was inserted, and
//! (for pinned retention) the pin token. Callers guarantee that every
//! pointer stored here refers to a live entry: an entry is removed from the
//! table before it is freed, and both happen under the owning lock.

use crate::tokens::{AtomicCount, Token};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::ptr::NonNull;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};

/// Stable, generational id of a table slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct SlotId(DefaultKey);

/// Items stored behind table pointers expose the key they are indexed by.
pub(crate) trait Keyed {
    type Key: Eq + Hash;

    fn key(&self) -> &Self::Key;
}

struct Slot<E> {
    hash: u64,
    entry: NonNull<E>,
    pin: Option<Token<'static, AtomicCount>>,
}

pub(crate) struct Table<E, S> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Slot<E>>,
}

// SAFETY: the table only dereferences entry pointers to compare keys, and
// every access goes through the owning interner's lock. The interner's own
// Send/Sync bounds cover the entry contents.
unsafe impl<E, S: Send> Send for Table<E, S> {}

impl<E, S> Table<E, S> {
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            slots: SlotMap::with_key(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Insert a slot for a value known to be absent.
    ///
    /// `make` receives the new slot's id and returns the entry pointer to
    /// store. Never calls into user code; the index is rehashed from the
    /// stored hashes.
    pub(crate) fn insert_unique<F>(&mut self, hash: u64, make: F) -> NonNull<E>
    where
        F: FnOnce(SlotId) -> NonNull<E>,
    {
        let k = self.slots.insert_with_key(|k| Slot {
            hash,
            entry: make(SlotId(k)),
            pin: None,
        });
        let slots = &self.slots;
        self.index.insert_unique(hash, k, |&kk| {
            slots.get(kk).map(|s| s.hash).unwrap_or(0)
        });
        self.slots[k].entry
    }

    /// Attach a pin token to a slot. Returns the token if the slot is gone.
    pub(crate) fn pin(
        &mut self,
        id: SlotId,
        token: Token<'static, AtomicCount>,
    ) -> Result<(), Token<'static, AtomicCount>> {
        match self.slots.get_mut(id.0) {
            Some(slot) => {
                debug_assert!(slot.pin.is_none(), "slot pinned twice");
                slot.pin = Some(token);
                Ok(())
            }
            None => Err(token),
        }
    }

    /// Detach every pin token, yielding each with its slot and entry.
    pub(crate) fn take_pins(&mut self) -> Vec<(SlotId, NonNull<E>, Token<'static, AtomicCount>)> {
        self.slots
            .iter_mut()
            .filter_map(|(k, slot)| slot.pin.take().map(|t| (SlotId(k), slot.entry, t)))
            .collect()
    }

    /// Unlink a slot. The entry itself is left for the caller to free.
    pub(crate) fn remove(&mut self, id: SlotId) -> Option<NonNull<E>> {
        let k = id.0;
        let slot = self.slots.remove(k)?;
        debug_assert!(slot.pin.is_none(), "pinned slot removed");
        if let Ok(occupied) = self.index.find_entry(slot.hash, |&kk| kk == k) {
            occupied.remove();
        } else {
            debug_assert!(false, "slot missing from index");
        }
        Some(slot.entry)
    }
}

impl<E, S> Table<E, S>
where
    E: Keyed,
    S: BuildHasher,
{
    pub(crate) fn hash_one<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub(crate) fn find<Q>(&self, hash: u64, q: &Q) -> Option<NonNull<E>>
    where
        E::Key: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let slots = &self.slots;
        let k = self.index.find(hash, |&k| {
            slots
                .get(k)
                // SAFETY: pointers in the table refer to live entries.
                .map(|s| s.hash == hash && unsafe { s.entry.as_ref() }.key().borrow() == q)
                .unwrap_or(false)
        })?;
        slots.get(*k).map(|s| s.entry)
    }

    pub(crate) fn contains<Q>(&self, q: &Q) -> bool
    where
        E::Key: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(self.hash_one(q), q).is_some()
    }
}

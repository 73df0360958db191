//! Reclaimer: settles the last reference to an entry under the table lock.
//!
//! Dropping a handle that is not the last one only decrements the count.
//! The last one takes the table lock and decrements there; a lookup that
//! found the entry in between has already bumped the count, so the entry
//! stays. Only a count that reaches zero under the lock removes the slot,
//! and the entry is freed after the lock is released so that its value's
//! destructor may drop other handles of the same interner.

use crate::interner::{Entry, Shared};
use crate::tokens::{AtomicCount, Count, Token};
use core::ptr::NonNull;
use parking_lot::lock_api::RawMutex;

/// Return a handle's token and reclaim the entry if nothing else holds it.
///
/// # Safety
/// `entry` must point to a live entry and `token` must have been minted by
/// that entry's count.
pub(crate) unsafe fn release<T, S, R: RawMutex>(
    entry: NonNull<Entry<T, S, R>>,
    token: Token<'static, AtomicCount>,
) {
    // SAFETY: the caller's token keeps the entry alive until it is returned.
    let e = unsafe { entry.as_ref() };
    let token = match e.count.try_put(token) {
        Ok(()) => return,
        Err(t) => t,
    };
    {
        let mut table = e.shared.lock();
        if !e.count.put(token) {
            tracing::debug!(slot = ?e.slot, "entry revived before reclamation; keeping it");
            return;
        }
        let removed = table.remove(e.slot);
        debug_assert_eq!(removed, Some(entry), "reclaimed entry missing from its slot");
        tracing::trace!(slot = ?e.slot, "reclaimed interned value");
    }
    // SAFETY: the count is zero and the slot is gone; nothing can reach it.
    unsafe { free(entry) };
}

/// Return every pin held by a pinned interner, freeing unreferenced entries.
pub(crate) fn release_pins<T, S, R: RawMutex>(shared: &Shared<T, S, R>) {
    let mut freed = Vec::new();
    {
        let mut table = shared.lock();
        for (slot, entry, token) in table.take_pins() {
            // SAFETY: a pinned entry stays live until its pin is returned.
            let e = unsafe { entry.as_ref() };
            if e.count.put(token) {
                let removed = table.remove(slot);
                debug_assert_eq!(removed, Some(entry));
                freed.push(entry);
            }
        }
    }
    tracing::debug!(freed = freed.len(), "released pinned entries");
    for entry in freed {
        // SAFETY: unlinked above with a zero count.
        unsafe { free(entry) };
    }
}

unsafe fn free<T, S, R: RawMutex>(entry: NonNull<Entry<T, S, R>>) {
    // SAFETY: entries are allocated with `Box` in `Entry::alloc`.
    drop(unsafe { Box::from_raw(entry.as_ptr()) });
}

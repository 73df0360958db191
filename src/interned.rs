//! Interned: the handle returned by lookups.

use crate::interner::Entry;
use crate::reclaim;
use crate::tokens::{AtomicCount, Count, Token};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem::ManuallyDrop;
use core::ops::Deref;
use core::ptr::NonNull;
use parking_lot::lock_api::RawMutex;
use std::collections::hash_map::RandomState;

/// A handle to an interned value. One pointer wide.
///
/// Equality and hashing are by identity: two handles from the same
/// interner are equal iff their values are equal. Handles from different
/// interners never compare equal. Clone increments the entry's count;
/// dropping the last handle reclaims the entry.
pub struct Interned<T, S = RandomState, R: RawMutex = parking_lot::RawMutex> {
    entry: NonNull<Entry<T, S, R>>,
    token: ManuallyDrop<Token<'static, AtomicCount>>,
}

// SAFETY: the value is shared by reference across threads (`T: Sync`) and
// may be dropped by whichever thread releases the last handle (`T: Send`).
// All table access goes through the lock.
unsafe impl<T: Send + Sync, S: Send, R: RawMutex + Send + Sync> Send for Interned<T, S, R> {}
unsafe impl<T: Send + Sync, S: Send, R: RawMutex + Send + Sync> Sync for Interned<T, S, R> {}

impl<T, S, R: RawMutex> Interned<T, S, R> {
    /// Mint a new handle for `entry`.
    ///
    /// # Safety
    /// The entry must be live, and its count must not be able to reach zero
    /// concurrently: the table lock or another handle must be held.
    pub(crate) unsafe fn acquire(entry: NonNull<Entry<T, S, R>>) -> Self {
        let token = unsafe { entry.as_ref() }.count.get();
        Self {
            entry,
            token: ManuallyDrop::new(token),
        }
    }

    #[inline]
    fn entry(&self) -> &Entry<T, S, R> {
        // SAFETY: our token keeps the entry alive.
        unsafe { self.entry.as_ref() }
    }

    /// The interned value.
    #[inline]
    pub fn value(&self) -> &T {
        &self.entry().value
    }

    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.entry == b.entry
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        &self.entry().value
    }

    #[cfg(test)]
    pub(crate) fn ref_count(&self) -> usize {
        self.entry().count.load()
    }
}

impl<T, S, R: RawMutex> Clone for Interned<T, S, R> {
    fn clone(&self) -> Self {
        // SAFETY: `self` holds a token, so the count stays positive.
        unsafe { Self::acquire(self.entry) }
    }
}

impl<T, S, R: RawMutex> Drop for Interned<T, S, R> {
    fn drop(&mut self) {
        // SAFETY: the token is taken exactly once, here in drop; the field
        // is never read again.
        let token = unsafe { ManuallyDrop::take(&mut self.token) };
        // SAFETY: the token was minted by this entry's count.
        unsafe { reclaim::release(self.entry, token) };
    }
}

impl<T, S, R: RawMutex> Deref for Interned<T, S, R> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.value()
    }
}

impl<T, S, R: RawMutex> AsRef<T> for Interned<T, S, R> {
    fn as_ref(&self) -> &T {
        self.value()
    }
}

impl<T, S, R: RawMutex> PartialEq for Interned<T, S, R> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T, S, R: RawMutex> Eq for Interned<T, S, R> {}

impl<T, S, R: RawMutex> Hash for Interned<T, S, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.entry.as_ptr() as usize).hash(state);
    }
}

impl<T: fmt::Debug, S, R: RawMutex> fmt::Debug for Interned<T, S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Interned").field(self.value()).finish()
    }
}

impl<T: fmt::Display, S, R: RawMutex> fmt::Display for Interned<T, S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.value(), f)
    }
}

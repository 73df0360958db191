//! Lifetime-tied linear tokens and counting traits.
//!
//! Tokens are zero-sized proofs that a unit was acquired from a
//! particular counter instance. Dropping a token panics; the only valid
//! way to dispose of it is to return it to the originating counter via
//! `Count::put` (or `AtomicCount::try_put`).

use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Counts above this are treated as overflow, as `Arc` does.
const MAX_COUNT: usize = isize::MAX as usize;

/// Zero-sized, linear token tied to its originating counter via lifetime.
pub struct Token<'a, C: ?Sized> {
    _lt: PhantomData<&'a ()>,
    // fn-pointer phantom keeps the token Send + Sync regardless of `C`.
    _ctr: PhantomData<fn(&C)>,
}

impl<'a, C: ?Sized> Token<'a, C> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            _lt: PhantomData,
            _ctr: PhantomData,
        }
    }
}

impl<'a, C: ?Sized> Drop for Token<'a, C> {
    fn drop(&mut self) {
        // Intentional fail-fast on misuse: token must be consumed by Count::put.
        panic!("Token dropped without Count::put");
    }
}

/// A source of counted references, enforced by linear Token flow.
pub trait Count {
    /// The token type minted by this counter.
    type Token<'a>: Sized
    where
        Self: 'a;

    /// Acquire one counted reference and return a linear token for it.
    fn get(&self) -> Self::Token<'static>;

    /// Return (consume) a previously acquired token.
    /// Returns true if the count is now zero.
    fn put<'a>(&'a self, t: Self::Token<'a>) -> bool;
}

/// Thread-safe per-entry reference counter.
///
/// Increments may happen anywhere a token is already held (or under the
/// owning table's lock). The transition to zero is reserved for `put`,
/// which callers only invoke while holding that lock; `try_put` refuses to
/// release the last unit so the lock-free path can never reach zero.
#[derive(Debug)]
pub struct AtomicCount {
    count: AtomicUsize,
}

impl AtomicCount {
    pub fn new(initial: usize) -> Self {
        Self {
            count: AtomicUsize::new(initial),
        }
    }

    /// Current value. Only meaningful under the owning lock or in tests.
    pub fn load(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Return a token without taking the lock, unless it is the last one.
    ///
    /// On `Err` the token is handed back and the caller must settle it
    /// through `put` under the lock.
    #[inline]
    pub fn try_put<'a>(&'a self, t: Token<'a, Self>) -> Result<(), Token<'a, Self>> {
        let mut cur = self.count.load(Ordering::Relaxed);
        loop {
            if cur <= 1 {
                return Err(t);
            }
            match self.count.compare_exchange_weak(
                cur,
                cur - 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    core::mem::forget(t);
                    return Ok(());
                }
                Err(actual) => cur = actual,
            }
        }
    }
}

impl Count for AtomicCount {
    type Token<'a>
        = Token<'a, Self>
    where
        Self: 'a;

    #[inline]
    fn get(&self) -> Self::Token<'static> {
        let prev = self.count.fetch_add(1, Ordering::Relaxed);
        if prev >= MAX_COUNT {
            // Follow Arc semantics: abort on overflow rather than continue unsafely.
            std::process::abort();
        }
        Token::<'static, Self>::new()
    }

    #[inline]
    fn put<'a>(&'a self, t: Self::Token<'a>) -> bool {
        let prev = self.count.fetch_sub(1, Ordering::AcqRel);
        assert!(prev > 0, "AtomicCount underflow");
        core::mem::forget(t);
        prev == 1
    }
}

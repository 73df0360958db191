// Injected lock types.
//
// Verifies: every table access goes through the injected `RawMutex`, and
// only last-handle drops take the lock.
use parking_lot::lock_api::GuardSend;
use rc_intern::{Interner, RawMutex};
use std::collections::hash_map::RandomState;
use std::sync::atomic::{AtomicUsize, Ordering};

static LOCKS: AtomicUsize = AtomicUsize::new(0);

struct CountingRawMutex(parking_lot::RawMutex);

unsafe impl RawMutex for CountingRawMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = CountingRawMutex(<parking_lot::RawMutex as RawMutex>::INIT);

    type GuardMarker = GuardSend;

    fn lock(&self) {
        LOCKS.fetch_add(1, Ordering::SeqCst);
        self.0.lock();
    }

    fn try_lock(&self) -> bool {
        self.0.try_lock()
    }

    unsafe fn unlock(&self) {
        unsafe { self.0.unlock() }
    }
}

fn locks() -> usize {
    LOCKS.load(Ordering::SeqCst)
}

#[test]
fn injected_lock_guards_lookups_and_last_drops() {
    let i: Interner<String, RandomState, CountingRawMutex> =
        Interner::with_hasher(RandomState::new());
    assert_eq!(locks(), 0);

    let a1 = i.intern_ref("a");
    let a2 = i.intern_ref("a");
    let b = i.intern_ref("b");
    assert_eq!(locks(), 3);
    assert_eq!(a1, a2);

    // Not the last handle: lock-free.
    drop(a1);
    assert_eq!(locks(), 3);

    // Last handles settle under the lock.
    drop(a2);
    drop(b);
    assert_eq!(locks(), 5);

    assert!(i.is_empty());
    assert_eq!(locks(), 6);
}

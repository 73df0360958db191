//! Debug-only reentrancy guard.
//!
//! Detects a thread entering an interner's critical section while it is
//! already inside it, e.g. from `T: Hash`/`Eq`/`ToOwned` during a lookup.
//! The interner's mutex is not reentrant, so that would deadlock; in debug
//! builds it panics instead. In release builds this compiles to a
//! zero-cost no-op.

use core::marker::PhantomData;

#[cfg(debug_assertions)]
std::thread_local! {
    // Addresses of the interners whose lock this thread currently holds.
    static HELD: core::cell::RefCell<Vec<usize>> = const { core::cell::RefCell::new(Vec::new()) };
}

/// Per-instance reentrancy tracker. Embed this in the shared state and
/// enter it before taking the lock.
#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    // Gives each instance a distinct address.
    #[cfg(debug_assertions)]
    anchor: u8,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            anchor: 0,
        }
    }

    /// Enter a guarded section. In debug builds, panics if this thread is
    /// already inside it.
    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard {
        #[cfg(debug_assertions)]
        {
            let addr = &self.anchor as *const u8 as usize;
            // Unchecked during thread-local teardown.
            let _ = HELD.try_with(|held| {
                let mut held = held.borrow_mut();
                assert!(
                    !held.contains(&addr),
                    "reentrancy detected: interner used from inside its own critical section"
                );
                held.push(addr);
            });
            ReentrancyGuard {
                addr,
                _nosend: PhantomData,
            }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard {
                _nosend: PhantomData,
            }
        }
    }
}

/// RAII guard returned by `DebugReentrancy::enter`. Must be dropped on the
/// thread that created it.
pub(crate) struct ReentrancyGuard {
    #[cfg(debug_assertions)]
    addr: usize,
    _nosend: PhantomData<*mut ()>,
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        let _ = HELD.try_with(|held| {
            let mut held = held.borrow_mut();
            let pos = held.iter().rposition(|&a| a == self.addr);
            debug_assert!(pos.is_some());
            if let Some(pos) = pos {
                held.swap_remove(pos);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn enter_and_exit_is_ok() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter();
        }
        let _g = r.enter();
    }

    #[test]
    fn distinct_instances_nest() {
        let a = DebugReentrancy::new();
        let b = DebugReentrancy::new();
        let _ga = a.enter();
        let _gb = b.enter();
    }

    #[test]
    fn other_threads_are_independent() {
        let r = DebugReentrancy::new();
        let _g = r.enter();
        std::thread::scope(|s| {
            s.spawn(|| {
                let _g = r.enter();
            });
        });
    }

    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g1 = r.enter();
            // Re-entering should panic in debug builds
            let _g2 = r.enter();
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
        // The outer guard was released during unwinding.
        let _g = r.enter();
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn reentrancy_noop_in_release() {
        let r = DebugReentrancy::new();
        let _g1 = r.enter();
        let _g2 = r.enter();
    }
}

#![deny(unsafe_op_in_unsafe_fn)]
//! rc-intern: thread-safe interning with handles that are reclaimed when
//! the last reference drops.
//!
//! `Interner::intern(v)` returns an [`Interned`] handle. Handles for equal
//! values from the same interner are the same pointer, so identity
//! comparison and hashing replace deep comparison of the value. A handle is
//! one pointer wide.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an interning table that returns one handle per distinct value,
//!   never retains an entry after its last handle is gone, and never lets
//!   a lookup and a concurrent last-drop produce two live handles for one
//!   value.
//! - Layers:
//!   - `tokens`: a thread-safe per-entry count with zero-sized linear
//!     tokens. Every handle owns exactly one token.
//!   - `table::Table<E, S>`: structural index (hashbrown `HashTable` over
//!     a slotmap) from values to non-owning entry pointers. Stores each
//!     entry's hash so `T: Hash` never runs after insertion.
//!   - `Interner<T, S, R>`: owns the table behind a single lock and
//!     implements lookup (`intern`, `intern_ref`, `find`).
//!   - `reclaim`: the drop path of the last handle.
//!
//! Reclamation protocol
//! - Clones and non-final drops change the count without the lock.
//! - The count may only reach zero under the table lock: a drop that would
//!   release the last unit takes the lock first. Lookups increment the
//!   count under the same lock.
//! - So when the last handle starts dropping and a lookup finds the entry
//!   before the drop gets the lock, the lookup wins: the drop sees a
//!   non-zero count and leaves the entry in place. Otherwise the drop
//!   removes the slot, and later lookups insert a fresh entry.
//! - Entries are unlinked under the lock and freed after it is released,
//!   so a value's destructor may drop handles of the same interner.
//! - `T: Hash`/`Eq` run under the lock and must not re-enter the same
//!   interner; `reentrancy` turns that deadlock into a panic in debug
//!   builds.
//!
//! Retention
//! - `Retention::Reclaim` (default) frees entries on last drop.
//! - `Retention::Pinned` keeps an extra pin per entry until the interner is
//!   dropped ("safe but leaky"); selectable through
//!   `RC_INTERN_SAFE_BUT_LEAKY`.
//!
//! Notes and non-goals
//! - No capacity limits, expiry, or LRU behaviour.
//! - Values are interned as opaque wholes; nested values are not
//!   interned recursively.
//! - Handles may outlive their interner; the table is kept alive by the
//!   entries that still point into it.
//! - Count overflow aborts, matching `Arc`.

mod config;
mod error;
mod interned;
mod interner;
mod reclaim;
mod reentrancy;
mod table;
pub mod tokens;

// Public surface
pub use config::{InternerConfig, Retention, SAFE_BUT_LEAKY_ENV};
pub use error::ConfigError;
pub use interned::Interned;
pub use interner::Interner;
pub use parking_lot::lock_api::RawMutex;

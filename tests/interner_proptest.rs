// Interner property tests.
//
// Property 1: entry presence matches outstanding handles per key.
//  - Model: per-key list of live handles (Vec of Interned per key).
//  - Invariant: contains(key) == !live[k].is_empty();
//               len() == count(keys with !live[k].is_empty());
//               every live handle for a key is the same entry.
//  - Operations: intern, find, clone, drop-one, drop-all.
//
// Property 2: pinned retention never forgets a key.
//  - Model: set of keys ever interned.
//  - Invariant: contains(key) == interned.contains(k) regardless of drops.
use proptest::prelude::*;
use rc_intern::{Interned, Interner, InternerConfig, Retention};
use std::collections::BTreeSet;

fn key(k: usize) -> String {
    format!("k{}", k)
}

// Property 1: liveness equals outstanding handles per key.
proptest! {
    #[test]
    fn prop_interner_liveness(keys in 1usize..=5, ops in proptest::collection::vec((0u8..=4u8, 0usize..100usize), 1..200)) {
        let m: Interner<String> = Interner::new();
        let mut live: Vec<Vec<Interned<String>>> = std::iter::repeat_with(Vec::new).take(keys).collect();

        for (op, raw_k) in ops {
            let k = raw_k % keys;
            let name = key(k);
            match op {
                // Intern always yields a handle whose value matches.
                0 => {
                    let h = m.intern(name.clone());
                    prop_assert_eq!(h.value(), &name);
                    live[k].push(h);
                }
                // Find succeeds exactly when some handle is outstanding.
                1 => {
                    match m.find(name.as_str()) {
                        Some(h) => {
                            prop_assert!(!live[k].is_empty());
                            live[k].push(h);
                        }
                        None => prop_assert!(live[k].is_empty()),
                    }
                }
                // Clone one existing handle for this key.
                2 => {
                    if let Some(existing) = live[k].last() {
                        let cloned = existing.clone();
                        live[k].push(cloned);
                    }
                }
                // Drop one existing handle for this key.
                3 => {
                    if let Some(h) = live[k].pop() { drop(h); }
                }
                // Drop all handles for this key.
                _ => {
                    live[k].clear();
                }
            }

            let mut expected_len = 0;
            for (i, handles) in live.iter().enumerate() {
                let present = m.contains(key(i).as_str());
                prop_assert_eq!(present, !handles.is_empty());
                if let Some(first) = handles.first() {
                    expected_len += 1;
                    prop_assert!(handles.iter().all(|h| Interned::ptr_eq(h, first)));
                }
            }
            prop_assert_eq!(m.len(), expected_len);
        }

        drop(live);
        prop_assert!(m.is_empty());
    }
}

// Property 2: pinned entries persist for the interner's lifetime.
proptest! {
    #[test]
    fn prop_pinned_never_forgets(keys in 1usize..=5, ops in proptest::collection::vec((any::<bool>(), 0usize..100usize), 1..100)) {
        let m: Interner<String> = Interner::with_config(InternerConfig::new(Retention::Pinned));
        let mut interned = BTreeSet::new();
        let mut held: Vec<Interned<String>> = Vec::new();

        for (keep, raw_k) in ops {
            let k = raw_k % keys;
            let h = m.intern(key(k));
            interned.insert(k);
            if keep {
                held.push(h);
            } else {
                drop(h);
            }
            for i in 0..keys {
                prop_assert_eq!(m.contains(key(i).as_str()), interned.contains(&i));
            }
            prop_assert_eq!(m.len(), interned.len());
        }
    }
}

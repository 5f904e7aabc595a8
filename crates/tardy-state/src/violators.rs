//! Violator set: chat id → email of everyone currently late.
//!
//! Lifecycle:
//! - [`ViolatorSet::install`] replaces the whole set with a freshly joined
//!   map and returns a new [`Generation`]
//! - [`ViolatorSet::take`] removes one entry the first time its user is
//!   addressed (consume-once)
//! - [`ViolatorSet::expire`] empties the set when the nag window armed for a
//!   given generation elapses; it is a no-op if a newer install happened since

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tardy_core::{ChatId, ExternalId};

/// Map installed by a rebuild.
pub type ViolatorMap = HashMap<ChatId, ExternalId>;

/// Identifies one installed violator set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Table {
    generation: u64,
    entries: ViolatorMap,
}

impl Table {
    fn swap_in(&mut self, entries: ViolatorMap) -> (Generation, ViolatorMap) {
        self.generation += 1;
        let previous = std::mem::replace(&mut self.entries, entries);
        (Generation(self.generation), previous)
    }
}

/// The live violator set. Only one exists per bot.
#[derive(Debug, Default)]
pub struct ViolatorSet {
    inner: Mutex<Table>,
}

impl ViolatorSet {
    /// Create an empty set at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the whole set. Every previous entry is invalidated.
    pub fn install(&self, entries: ViolatorMap) -> Generation {
        let count = entries.len();
        let (generation, previous) = self.inner.lock().swap_in(entries);
        drop(previous);
        tracing::debug!(%generation, count, "violator set installed");
        generation
    }

    /// Remove and return the entry for `chat_id`, if present.
    ///
    /// Classification and removal are one critical section, so two racing
    /// messages from the same user cannot both be treated as violations.
    pub fn take(&self, chat_id: &ChatId) -> Option<ExternalId> {
        self.inner.lock().entries.remove(chat_id)
    }

    /// Whether `chat_id` is currently flagged.
    pub fn contains(&self, chat_id: &ChatId) -> bool {
        self.inner.lock().entries.contains_key(chat_id)
    }

    /// Empty the set if `generation` is still the live one.
    ///
    /// Returns `true` when this call cleared the set. Clearing bumps the
    /// generation, so each armed expiry clears at most once.
    pub fn expire(&self, generation: Generation) -> bool {
        let mut table = self.inner.lock();
        if table.generation != generation.0 {
            return false;
        }
        let (_, previous) = table.swap_in(ViolatorMap::new());
        drop(table);
        tracing::debug!(%generation, dropped = previous.len(), "violator set expired");
        true
    }

    /// Unconditionally empty the set.
    pub fn clear(&self) -> Generation {
        self.install(ViolatorMap::new())
    }

    /// Generation of the live set.
    pub fn generation(&self) -> Generation {
        Generation(self.inner.lock().generation)
    }

    /// Copy of the live entries.
    pub fn snapshot(&self) -> ViolatorMap {
        self.inner.lock().entries.clone()
    }

    /// Number of flagged users.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether nobody is flagged.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> ViolatorMap {
        pairs
            .iter()
            .map(|(c, e)| (ChatId::from(*c), ExternalId::from(*e)))
            .collect()
    }

    #[test]
    fn starts_empty_at_generation_zero() {
        let set = ViolatorSet::new();
        assert!(set.is_empty());
        assert_eq!(set.generation().get(), 0);
    }

    #[test]
    fn install_bumps_generation() {
        let set = ViolatorSet::new();
        let g1 = set.install(entries(&[("U1", "a@x.org")]));
        let g2 = set.install(entries(&[("U2", "b@x.org")]));
        assert!(g2 > g1);
        assert!(!set.contains(&ChatId::from("U1")));
        assert!(set.contains(&ChatId::from("U2")));
    }

    #[test]
    fn take_consumes_exactly_one_entry() {
        let set = ViolatorSet::new();
        let _ = set.install(entries(&[("U1", "a@x.org"), ("U2", "b@x.org")]));

        assert_eq!(set.take(&ChatId::from("U1")), Some(ExternalId::from("a@x.org")));
        assert_eq!(set.take(&ChatId::from("U1")), None);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&ChatId::from("U2")));
    }

    #[test]
    fn expire_clears_once_regardless_of_consumption() {
        let set = ViolatorSet::new();
        let generation = set.install(entries(&[("U1", "a@x.org"), ("U2", "b@x.org")]));
        let _ = set.take(&ChatId::from("U1"));

        assert!(set.expire(generation));
        assert!(set.is_empty());
        assert!(!set.expire(generation));
    }

    #[test]
    fn expire_of_stale_generation_keeps_newer_set() {
        let set = ViolatorSet::new();
        let old = set.install(entries(&[("U1", "a@x.org")]));
        let _new = set.install(entries(&[("U2", "b@x.org")]));

        assert!(!set.expire(old));
        assert!(set.contains(&ChatId::from("U2")));
    }

    #[test]
    fn clear_empties_and_invalidates_pending_expiry() {
        let set = ViolatorSet::new();
        let generation = set.install(entries(&[("U1", "a@x.org")]));
        let _ = set.clear();
        assert!(set.is_empty());
        assert!(!set.expire(generation));
    }

    #[test]
    fn racing_takes_yield_single_winner() {
        let set = Arc::new(ViolatorSet::new());
        let _ = set.install(entries(&[("U1", "a@x.org")]));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let set = Arc::clone(&set);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if set.take(&ChatId::from("U1")).is_some() {
                        let _ = winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn readers_never_observe_partial_install() {
        let small = entries(&[("U1", "a@x.org")]);
        let large: ViolatorMap = (0..50)
            .map(|i| (ChatId::from(format!("W{i}")), ExternalId::from(format!("w{i}@x.org"))))
            .collect();
        let set = Arc::new(ViolatorSet::new());
        let _ = set.install(small.clone());

        let writer = {
            let set = Arc::clone(&set);
            let large = large.clone();
            let small = small.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    let _ = set.install(if i % 2 == 0 { large.clone() } else { small.clone() });
                }
            })
        };

        for _ in 0..2_000 {
            let snap = set.snapshot();
            assert!(snap == small || snap == large, "partial set of {}", snap.len());
        }
        writer.join().unwrap();
    }
}

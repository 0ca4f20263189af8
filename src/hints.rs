//! Hints table & iterator: per-zone nameserver addresses with an adaptively
//! demoted/recovered priority, driving a random-rotating iterator.
//!
//! No repo in the example pack has anything resembling this; it is built
//! fresh from §4.5/§5/§9, following the crate's own idiom elsewhere
//! (relaxed atomics for the per-address shared state, an injected
//! `RandomSource` exactly as the design notes ask for the RNG hook, and the
//! restartable state-passing shape used by [`crate::search`]).
//!
//! The SOA linked-list insertion bug flagged in the design notes
//! (`H->head = soa->next` instead of `soa->next = H->head; H->head = soa`,
//! which loses the newly-inserted entry) has no analogue here: zone entries
//! live in a `Vec`, appended with `Vec::push`, so there is no hand-rolled
//! link to get backwards.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;

use crate::clock::ClockSource;

/// Supplies the random starting index for the hints iterator's tie-break walk.
/// Modeled as a resolver-instance configuration option rather than a
/// process-wide singleton, per the design notes.
pub trait RandomSource: Send + Sync {
    /// Returns a value in `[0, upper)`. `upper` is always `> 0`.
    fn gen_range(&self, upper: usize) -> usize;
}

/// The default random source, backed by `rand::thread_rng`.
#[derive(Debug, Default)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn gen_range(&self, upper: usize) -> usize {
        use rand::Rng;
        rand::thread_rng().gen_range(0..upper)
    }
}

#[derive(Debug)]
struct Hint {
    addr: SocketAddr,
    saved_priority: u32,
    effective_priority: AtomicU32,
    penalty_until: AtomicU64,
    nlost: AtomicU32,
}

impl Hint {
    fn new(addr: SocketAddr, priority: u32) -> Hint {
        Hint {
            addr,
            saved_priority: priority,
            effective_priority: AtomicU32::new(priority),
            penalty_until: AtomicU64::new(0),
            nlost: AtomicU32::new(0),
        }
    }

    /// Reads the current effective priority, lazily restoring it to
    /// `saved_priority` if the penalty TTL has elapsed.
    fn effective_priority_now(&self, now: u64) -> u32 {
        let ep = self.effective_priority.load(Ordering::Relaxed);
        if ep == 0 {
            let until = self.penalty_until.load(Ordering::Relaxed);
            if until != 0 && until <= now {
                self.effective_priority
                    .store(self.saved_priority, Ordering::Relaxed);
                self.penalty_until.store(0, Ordering::Relaxed);
                return self.saved_priority;
            }
        }
        ep
    }
}

const MAX_HINTS_PER_ZONE: usize = 16;

#[derive(Debug, Default)]
struct ZoneHints {
    entries: Vec<Hint>,
    insert_count: u32,
}

/// Maps zone names (case-insensitive) to their nameserver hint lists.
pub struct HintsTable<R: RandomSource, C: ClockSource> {
    zones: RwLock<HashMap<String, ZoneHints>>,
    random: R,
    clock: C,
}

impl<R: RandomSource, C: ClockSource> HintsTable<R, C> {
    pub fn new(random: R, clock: C) -> HintsTable<R, C> {
        HintsTable {
            zones: RwLock::new(HashMap::new()),
            random,
            clock,
        }
    }

    /// Exposes the configured clock source, mainly so tests can advance a
    /// [`crate::clock::ManualClock`] between calls.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Creates or fetches the per-zone entry (up to 16 addresses; beyond
    /// that, newest overwrites slot `count % 16`, and `count` does not grow
    /// further). `saved_priority` and `effective_priority` are both set to
    /// `max(1, priority)`.
    pub fn insert(&self, zone: &str, addr: SocketAddr, priority: u32) {
        let key = zone.to_ascii_lowercase();
        let mut zones = self.zones.write().expect("hints table lock poisoned");
        let zh = zones.entry(key).or_insert_with(ZoneHints::default);
        let hint = Hint::new(addr, priority.max(1));
        if zh.entries.len() < MAX_HINTS_PER_ZONE {
            zh.entries.push(hint);
        } else {
            let slot = (zh.insert_count as usize) % MAX_HINTS_PER_ZONE;
            zh.entries[slot] = hint;
        }
        zh.insert_count = zh.insert_count.wrapping_add(1);
    }

    /// `nice < 0`: demotes the address (penalty box). `nice > 0`: restores it
    /// to `saved_priority` immediately and clears the loss counter. `nice ==
    /// 0` is a no-op. A missing zone or address is also a no-op.
    pub fn update(&self, zone: &str, addr: SocketAddr, nice: i32) {
        let key = zone.to_ascii_lowercase();
        let zones = self.zones.read().expect("hints table lock poisoned");
        let Some(zh) = zones.get(&key) else {
            return;
        };
        let now = self.clock.now();
        for h in &zh.entries {
            if h.addr != addr {
                continue;
            }
            if nice < 0 {
                let nlost = h.nlost.fetch_add(1, Ordering::Relaxed) + 1;
                h.effective_priority.store(0, Ordering::Relaxed);
                let penalty = (3u64.saturating_mul(nlost as u64)).min(60);
                h.penalty_until.store(now + penalty, Ordering::Relaxed);
                tracing::debug!(zone, %addr, nlost, penalty, "hint penalized");
            } else if nice > 0 {
                h.nlost.store(0, Ordering::Relaxed);
                h.effective_priority
                    .store(h.saved_priority, Ordering::Relaxed);
                h.penalty_until.store(0, Ordering::Relaxed);
                tracing::debug!(zone, %addr, "hint restored");
            }
            return;
        }
    }

    /// Advances a [`HintsIterState`] by one address. Yields addresses in
    /// ascending `effective_priority` order, ties broken by a random walk
    /// starting index reused across priority bands within this iteration
    /// (see `DESIGN.md`), skipping penalized (`effective_priority == 0`)
    /// entries until their TTL elapses. A missing or empty zone yields no
    /// candidates.
    pub fn next(&self, zone: &str, mut state: HintsIterState) -> (Option<SocketAddr>, HintsIterState) {
        if state.done {
            return (None, state);
        }
        let key = zone.to_ascii_lowercase();
        let zones = self.zones.read().expect("hints table lock poisoned");
        let zh = match zones.get(&key) {
            Some(zh) => zh,
            None => {
                state.done = true;
                return (None, state);
            }
        };
        let count = zh.entries.len();
        if count == 0 {
            state.done = true;
            return (None, state);
        }
        let now = self.clock.now();

        if !state.started {
            match smallest_priority_at_least(&zh.entries, now, 1) {
                None => {
                    state.done = true;
                    return (None, state);
                }
                Some(target) => {
                    state.target_priority = target;
                    state.start = self.random.gen_range(count);
                    state.cursor = 0;
                    state.started = true;
                }
            }
        }

        loop {
            if state.cursor >= count {
                match smallest_priority_greater_than(&zh.entries, now, state.target_priority) {
                    None => {
                        state.done = true;
                        return (None, state);
                    }
                    Some(target) => {
                        state.target_priority = target;
                        state.start = self.random.gen_range(count);
                        state.cursor = 0;
                        continue;
                    }
                }
            }
            let idx = (state.start + state.cursor) % count;
            state.cursor += 1;
            let h = &zh.entries[idx];
            if h.effective_priority_now(now) == state.target_priority {
                return (Some(h.addr), state);
            }
        }
    }
}

fn smallest_priority_at_least(entries: &[Hint], now: u64, floor: u32) -> Option<u32> {
    entries
        .iter()
        .filter_map(|h| {
            let p = h.effective_priority_now(now);
            if p >= floor {
                Some(p)
            } else {
                None
            }
        })
        .min()
}

fn smallest_priority_greater_than(entries: &[Hint], now: u64, current: u32) -> Option<u32> {
    entries
        .iter()
        .filter_map(|h| {
            let p = h.effective_priority_now(now);
            if p > current {
                Some(p)
            } else {
                None
            }
        })
        .min()
}

/// Restartable state for [`HintsTable::next`]. Zero-initializable:
/// `HintsIterState::default()` starts a fresh iteration over whatever zone
/// the caller passes to the next call.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct HintsIterState {
    started: bool,
    done: bool,
    target_priority: u32,
    start: usize,
    cursor: usize,
}

impl HintsIterState {
    pub fn new() -> HintsIterState {
        HintsIterState::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::net::{IpAddr, Ipv4Addr};

    struct FixedSource(usize);
    impl RandomSource for FixedSource {
        fn gen_range(&self, upper: usize) -> usize {
            self.0 % upper
        }
    }

    fn addr(last: u8) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, last)), 53)
    }

    #[test]
    fn ordering_and_penalty_recovery() {
        let table = HintsTable::new(FixedSource(0), ManualClock::new(1_000));
        let a = addr(1);
        let b = addr(2);
        table.insert("example.com.", a, 1);
        table.insert("example.com.", b, 2);

        table.update("example.com.", a, -1);
        let (first, state) = table.next("example.com.", HintsIterState::new());
        assert_eq!(first, Some(b));
        let (second, _state) = table.next("example.com.", state);
        assert_eq!(second, None);
    }

    #[test]
    fn penalty_expires_and_priority_one_wins_again() {
        let table = HintsTable::new(FixedSource(0), ManualClock::new(1_000));
        let a = addr(1);
        let b = addr(2);
        table.insert("example.com.", a, 1);
        table.insert("example.com.", b, 2);
        table.update("example.com.", a, -1);

        let (first, _) = table.next("example.com.", HintsIterState::new());
        assert_eq!(first, Some(b));

        // penalty window is min(60, 3*1) == 3 seconds
        table.clock().advance(5);
        let (second, _) = table.next("example.com.", HintsIterState::new());
        assert_eq!(second, Some(a));
    }
}

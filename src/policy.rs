use std::fmt::Debug;

use crate::cache::{CacheLine, CacheSet};
use crate::config::Policy;

/// Logical time shared by every set of a cache.
///
/// Only the relative order of the stamps it hands out is meaningful.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    now: u64,
}

impl Clock {
    pub fn tick(&mut self) -> u64 {
        let stamp = self.now;
        self.now += 1;
        stamp
    }

    pub fn now(&self) -> u64 {
        self.now
    }
}

/// Replacement strategy of a cache.
///
/// Implementations keep no state of their own, all bookkeeping lives in the
/// lines' stamps and the session's [`Clock`].
pub trait EvictionPolicy: Debug {
    /// A tag was just written into `line`, either into an empty way or over a victim.
    fn on_insert(&self, line: &mut CacheLine, clock: &mut Clock);

    fn on_hit(&self, line: &mut CacheLine, clock: &mut Clock);

    /// Way to overwrite in a full set.
    fn select_victim(&self, set: &CacheSet) -> usize;
}

/// Evicts the line inserted earliest, hits don't matter.
#[derive(Debug, Default, Copy, Clone)]
pub struct Fifo;

impl EvictionPolicy for Fifo {
    fn on_insert(&self, line: &mut CacheLine, clock: &mut Clock) {
        line.insertion_stamp = clock.tick();
    }

    fn on_hit(&self, _line: &mut CacheLine, _clock: &mut Clock) {}

    fn select_victim(&self, set: &CacheSet) -> usize {
        set.oldest_by(|line| line.insertion_stamp).unwrap_or(0)
    }
}

/// Evicts the line touched least recently, by insertion or hit.
#[derive(Debug, Default, Copy, Clone)]
pub struct Lru;

impl EvictionPolicy for Lru {
    fn on_insert(&self, line: &mut CacheLine, clock: &mut Clock) {
        line.recency_stamp = clock.tick();
    }

    fn on_hit(&self, line: &mut CacheLine, clock: &mut Clock) {
        line.recency_stamp = clock.tick();
    }

    fn select_victim(&self, set: &CacheSet) -> usize {
        set.oldest_by(|line| line.recency_stamp).unwrap_or(0)
    }
}

impl Policy {
    pub fn strategy(self) -> &'static dyn EvictionPolicy {
        match self {
            Policy::Fifo => &Fifo,
            Policy::Lru => &Lru,
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cache::Cache;

    /// Fills every way of a single set, in way order, through `policy`.
    fn filled(policy: &dyn EvictionPolicy, ways: usize, clock: &mut Clock) -> Cache {
        let mut cache = Cache::new(1, ways);
        for way in 0..ways {
            let line = cache.set_mut(0).line_mut(way);
            line.occupied = true;
            line.tag = way as u64;
            policy.on_insert(line, clock);
        }
        cache
    }

    #[test]
    fn clock_is_monotonic() {
        let mut clock = Clock::default();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn fifo_ignores_hits() {
        let mut clock = Clock::default();
        let mut cache = filled(&Fifo, 3, &mut clock);

        Fifo.on_hit(cache.set_mut(0).line_mut(0), &mut clock);
        assert_eq!(clock.now(), 3);
        assert_eq!(Fifo.select_victim(cache.set(0)), 0);
    }

    #[test]
    fn lru_refreshes_on_hit() {
        let mut clock = Clock::default();
        let mut cache = filled(&Lru, 3, &mut clock);

        Lru.on_hit(cache.set_mut(0).line_mut(0), &mut clock);
        assert_eq!(Lru.select_victim(cache.set(0)), 1);

        Lru.on_hit(cache.set_mut(0).line_mut(1), &mut clock);
        assert_eq!(Lru.select_victim(cache.set(0)), 2);
    }

    #[test]
    fn each_policy_touches_only_its_stamp() {
        let mut clock = Clock::default();
        let fifo = filled(&Fifo, 1, &mut clock);
        let lru = filled(&Lru, 1, &mut clock);

        assert_eq!(fifo.set(0).lines()[0].recency_stamp, crate::cache::NEVER);
        assert_eq!(fifo.set(0).lines()[0].insertion_stamp, 0);
        assert_eq!(lru.set(0).lines()[0].insertion_stamp, crate::cache::NEVER);
        assert_eq!(lru.set(0).lines()[0].recency_stamp, 1);
    }

    #[test]
    fn strategy_matches_policy() {
        let mut clock = Clock::default();
        let mut cache = filled(Policy::Lru.strategy(), 2, &mut clock);
        Policy::Lru
            .strategy()
            .on_hit(cache.set_mut(0).line_mut(0), &mut clock);
        assert_eq!(Policy::Lru.strategy().select_victim(cache.set(0)), 1);
    }
}

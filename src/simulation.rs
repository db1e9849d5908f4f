use std::fmt;

use crate::address::AddressLayout;
use crate::cache::Cache;
use crate::config::Config;
use crate::policy::{Clock, EvictionPolicy};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CacheHit {
    Hit,
    /// `evicted` holds the tag a full set gave up for the new block.
    Miss { evicted: Option<u64> },
}

impl fmt::Display for CacheHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheHit::Hit => f.write_str("hit"),
            CacheHit::Miss { evicted: None } => f.write_str("miss"),
            CacheHit::Miss { evicted: Some(_) } => f.write_str("miss eviction"),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Statistics {
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Statistics {
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        if self.accesses() == 0 {
            return 0.0;
        }
        100.0 * self.hits as f64 / self.accesses() as f64
    }

    fn record(&mut self, outcome: CacheHit) {
        match outcome {
            CacheHit::Hit => self.hits += 1,
            CacheHit::Miss { evicted } => {
                self.misses += 1;
                if evicted.is_some() {
                    self.evictions += 1;
                }
            }
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits:{} misses:{} evictions:{}",
            self.hits, self.misses, self.evictions
        )
    }
}

/// One cache simulation run: the cache, the policy's logical clock and the
/// counters, all owned here and dropped together.
#[derive(Debug)]
pub struct Simulation {
    config: Config,
    layout: AddressLayout,
    cache: Cache,
    policy: &'static dyn EvictionPolicy,
    clock: Clock,
    statistics: Statistics,
}

impl Simulation {
    pub fn new(config: Config) -> Self {
        let layout = AddressLayout::new(&config);
        log::debug!(
            "{config} | {} tag bits | {} set bits | {} offset bits |",
            layout.tag_bits(),
            layout.set_bits(),
            layout.block_bits()
        );

        Self {
            config,
            layout,
            cache: Cache::new(config.set_count(), config.associativity()),
            policy: config.policy().strategy(),
            clock: Clock::default(),
            statistics: Statistics::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Looks up the block holding `address`, filling it on a miss.
    pub fn access(&mut self, address: u64) -> CacheHit {
        let decoded = self.layout.decode(address);
        let set = self.cache.set_mut(decoded.set_index);

        let outcome = if let Some(way) = set.find(decoded.tag) {
            self.policy.on_hit(set.line_mut(way), &mut self.clock);
            CacheHit::Hit
        } else {
            let (way, evicted) = match set.find_empty() {
                Some(way) => (way, None),
                None => {
                    let victim = self.policy.select_victim(set);
                    (victim, Some(set.line_mut(victim).tag))
                }
            };

            let line = set.line_mut(way);
            line.occupied = true;
            line.tag = decoded.tag;
            self.policy.on_insert(line, &mut self.clock);

            CacheHit::Miss { evicted }
        };

        log::trace!(
            "{address:#x} set={} tag={:#x}: {outcome}",
            decoded.set_index,
            decoded.tag
        );
        self.statistics.record(outcome);
        outcome
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    use super::*;
    use crate::config::Policy;

    const MISS: CacheHit = CacheHit::Miss { evicted: None };

    fn simulation(sets: usize, ways: usize, block_size: usize, policy: Policy) -> Simulation {
        Simulation::new(Config::new(sets, ways, block_size, Some(policy)).unwrap())
    }

    fn evicted(tag: u64) -> CacheHit {
        CacheHit::Miss { evicted: Some(tag) }
    }

    #[rstest]
    fn single_line_cache_evicts_on_every_new_tag(
        #[values(Policy::Fifo, Policy::Lru)] policy: Policy,
    ) {
        let mut sim = simulation(1, 1, 1, policy);

        assert_eq!(sim.access(0), MISS);
        assert_eq!(sim.access(1), evicted(0));
        assert_eq!(sim.access(0), evicted(1));
        assert_eq!(
            sim.statistics(),
            Statistics {
                hits: 0,
                misses: 3,
                evictions: 2
            }
        );
    }

    #[rstest]
    #[case(Policy::Lru, evicted(0xB), CacheHit::Hit)]
    #[case(Policy::Fifo, evicted(0xA), evicted(0xB))]
    fn hit_protects_a_line_only_under_lru(
        #[case] policy: Policy,
        #[case] on_d: CacheHit,
        #[case] on_a_again: CacheHit,
    ) {
        // one set, 3 ways, one byte per block: every address is its own tag
        let mut sim = simulation(1, 3, 1, policy);

        assert_eq!(sim.access(0xA), MISS);
        assert_eq!(sim.access(0xB), MISS);
        assert_eq!(sim.access(0xC), MISS);
        assert_eq!(sim.access(0xA), CacheHit::Hit);

        assert_eq!(sim.access(0xD), on_d);
        assert_eq!(sim.access(0xA), on_a_again);
    }

    #[rstest]
    #[case(Policy::Lru, evicted(0xB))]
    #[case(Policy::Fifo, evicted(0xA))]
    fn two_way_victim_after_hit(#[case] policy: Policy, #[case] on_c: CacheHit) {
        let mut sim = simulation(1, 2, 1, policy);

        assert_eq!(sim.access(0xA), MISS);
        assert_eq!(sim.access(0xB), MISS);
        assert_eq!(sim.access(0xA), CacheHit::Hit);
        assert_eq!(sim.access(0xC), on_c);
    }

    #[test]
    fn sets_are_independent() {
        // 2 sets, direct mapped, 4 byte blocks
        let mut sim = simulation(2, 1, 4, Policy::Lru);

        assert_eq!(sim.access(0x0), MISS);
        assert_eq!(sim.access(0x4), MISS);
        assert_eq!(sim.access(0x3), CacheHit::Hit);
        assert_eq!(sim.access(0x7), CacheHit::Hit);
        assert_eq!(sim.access(0x8), evicted(0));
        assert_eq!(sim.access(0x5), CacheHit::Hit);
        assert_eq!(sim.cache().occupied_lines(), 2);
    }

    #[rstest]
    fn fully_associative_holds_exactly_its_ways(
        #[values(Policy::Fifo, Policy::Lru)] policy: Policy,
        #[values(1, 2, 5, 8)] ways: usize,
    ) {
        let mut sim = simulation(1, ways, 1, policy);
        for address in 0..ways as u64 {
            assert_eq!(sim.access(address), MISS);
        }
        assert_eq!(sim.access(0), CacheHit::Hit);

        let mut sim = simulation(1, ways, 1, policy);
        for address in 0..=ways as u64 {
            let _ = sim.access(address);
        }
        assert!(matches!(sim.access(0), CacheHit::Miss { evicted: Some(_) }));
    }

    #[rstest]
    fn random_accesses_keep_counters_consistent(
        #[values(Policy::Fifo, Policy::Lru)] policy: Policy,
    ) {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sim = simulation(8, 3, 16, policy);
        let layout = AddressLayout::new(sim.config());

        for _ in 0..10_000 {
            let address = rng.random_range(0..4096);
            let set_index = layout.decode(address).set_index;
            let set_was_full = sim.cache().set(set_index).find_empty().is_none();

            let outcome = sim.access(address);
            let evicted = matches!(outcome, CacheHit::Miss { evicted: Some(_) });
            // exactly the misses into a full set evict
            assert_eq!(evicted, set_was_full && outcome != CacheHit::Hit, "{address:#x}");

            let stats = sim.statistics();
            assert!(stats.evictions() <= stats.misses());
        }

        let stats = sim.statistics();
        assert_eq!(stats.accesses(), 10_000);
        assert!(sim.cache().occupied_lines() <= 8 * 3);
        assert_eq!(
            stats.misses() - stats.evictions(),
            sim.cache().occupied_lines() as u64
        );
    }

    #[test]
    fn statistics_summary() {
        let stats = Statistics {
            hits: 3,
            misses: 1,
            evictions: 1,
        };
        assert_eq!(stats.to_string(), "hits:3 misses:1 evictions:1");
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(Statistics::default().hit_rate(), 0.0);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(CacheHit::Hit.to_string(), "hit");
        assert_eq!(MISS.to_string(), "miss");
        assert_eq!(evicted(3).to_string(), "miss eviction");
    }
}

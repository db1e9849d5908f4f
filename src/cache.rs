/// Stamp of a line that has never been touched by the eviction policy.
pub const NEVER: u64 = u64::MAX;

/// One way of a set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheLine {
    pub occupied: bool,
    pub tag: u64,
    /// Logical time of the last insertion or hit (LRU).
    pub recency_stamp: u64,
    /// Logical time of the last insertion (FIFO).
    pub insertion_stamp: u64,
}

impl CacheLine {
    pub const INVALID: Self = Self {
        occupied: false,
        tag: 0,
        recency_stamp: NEVER,
        insertion_stamp: NEVER,
    };

    fn holds(&self, tag: u64) -> bool {
        self.occupied && self.tag == tag
    }
}

#[derive(Debug, Clone)]
pub struct CacheSet {
    lines: Box<[CacheLine]>,
}

impl CacheSet {
    fn new(ways: usize) -> Self {
        Self {
            lines: vec![CacheLine::INVALID; ways].into_boxed_slice(),
        }
    }

    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }

    /// Way holding `tag`, lowest way first.
    pub fn find(&self, tag: u64) -> Option<usize> {
        self.lines.iter().position(|line| line.holds(tag))
    }

    /// First unoccupied way, lowest way first.
    pub fn find_empty(&self) -> Option<usize> {
        self.lines.iter().position(|line| !line.occupied)
    }

    /// Occupied way with the smallest `stamp`; ties go to the lowest way.
    pub fn oldest_by(&self, stamp: impl Fn(&CacheLine) -> u64) -> Option<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.occupied)
            .min_by_key(|(_, line)| stamp(line))
            .map(|(way, _)| way)
    }

    pub fn line_mut(&mut self, way: usize) -> &mut CacheLine {
        &mut self.lines[way]
    }
}

/// `sets` sets of `ways` lines each, all invalid after construction.
///
/// Lines are never invalidated again: a miss on a full set overwrites its
/// victim in place.
#[derive(Debug, Clone)]
pub struct Cache {
    sets: Box<[CacheSet]>,
    ways: usize,
}

impl Cache {
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            sets: (0..sets).map(|_| CacheSet::new(ways)).collect(),
            ways,
        }
    }

    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn ways(&self) -> usize {
        self.ways
    }

    pub fn set(&self, set_index: usize) -> &CacheSet {
        &self.sets[set_index]
    }

    pub fn set_mut(&mut self, set_index: usize) -> &mut CacheSet {
        &mut self.sets[set_index]
    }

    pub fn find(&self, set_index: usize, tag: u64) -> Option<usize> {
        self.set(set_index).find(tag)
    }

    pub fn find_empty(&self, set_index: usize) -> Option<usize> {
        self.set(set_index).find_empty()
    }

    pub fn occupied_lines(&self) -> usize {
        self.sets
            .iter()
            .flat_map(|set| set.lines().iter())
            .filter(|line| line.occupied)
            .count()
    }
}

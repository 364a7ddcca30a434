//! Cache line storage.
//!
//! A cache owns one `LineStore`: a flat `num_sets × ways` array of `CacheLine`
//! records. The store only holds tags and states; every decision about them is made
//! by the owning `Cache`, its coherence protocol and its replacement policy.

use std::fmt;

/// Coherence state of a cache line.
///
/// The union of the states used by the supported protocols. MSI-family protocols
/// never produce `Exclusive`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LineState {
    /// No valid data; the tag is meaningless.
    #[default]
    Invalid,
    /// Clean copy that other caches may also hold.
    Shared,
    /// Clean copy held by this cache only.
    Exclusive,
    /// Dirty copy held by this cache only; memory is stale.
    Modified,
}

impl LineState {
    /// All states, in statistics order.
    pub const ALL: [Self; 4] = [Self::Invalid, Self::Shared, Self::Exclusive, Self::Modified];

    /// Returns `true` for every state except `Invalid`.
    #[inline]
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Returns the position of this state in [`LineState::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::Invalid => 0,
            Self::Shared => 1,
            Self::Exclusive => 2,
            Self::Modified => 3,
        }
    }

    /// Single-letter abbreviation (`I`, `S`, `E`, `M`).
    pub const fn letter(self) -> char {
        match self {
            Self::Invalid => 'I',
            Self::Shared => 'S',
            Self::Exclusive => 'E',
            Self::Modified => 'M',
        }
    }
}

impl fmt::Display for LineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Invalid => "Invalid",
            Self::Shared => "Shared",
            Self::Exclusive => "Exclusive",
            Self::Modified => "Modified",
        })
    }
}

/// One (set, way) slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheLine {
    /// Address tag; only meaningful while `state` is valid.
    pub tag: u64,
    /// Coherence state.
    pub state: LineState,
}

impl CacheLine {
    /// Returns `true` if this slot holds a valid copy of the line tagged `tag`.
    #[inline]
    pub const fn holds(&self, tag: u64) -> bool {
        self.state.is_valid() && self.tag == tag
    }
}

/// Fixed `num_sets × ways` array of cache lines, stored set-major.
#[derive(Clone, Debug)]
pub struct LineStore {
    lines: Vec<CacheLine>,
    num_sets: usize,
    ways: usize,
}

impl LineStore {
    /// Creates a store with every line Invalid.
    /// `num_sets * ways` must fit in `usize`; `CacheConfig::validate` bounds it.
    pub fn new(num_sets: usize, ways: usize) -> Self {
        Self {
            lines: vec![CacheLine::default(); num_sets * ways],
            num_sets,
            ways,
        }
    }

    /// Searches `set` for a valid line tagged `tag` and returns its way.
    pub fn find(&self, set: usize, tag: u64) -> Option<usize> {
        self.set(set).iter().position(|line| line.holds(tag))
    }

    /// Returns the line at (`set`, `way`), or `None` outside the geometry.
    pub fn get(&self, set: usize, way: usize) -> Option<&CacheLine> {
        if set >= self.num_sets || way >= self.ways {
            return None;
        }
        self.lines.get(set * self.ways + way)
    }

    /// Returns the lines of one set.
    ///
    /// # Panics
    ///
    /// Panics if `set` is outside the geometry; callers derive it from an `AddressLayout`.
    pub fn set(&self, set: usize) -> &[CacheLine] {
        let base = set * self.ways;
        &self.lines[base..base + self.ways]
    }

    /// Mutable access to the line at (`set`, `way`).
    ///
    /// # Panics
    ///
    /// Panics if the slot is outside the geometry; callers derive `set` from an
    /// `AddressLayout` and `way` from a replacement policy or a lookup.
    pub fn line_mut(&mut self, set: usize, way: usize) -> &mut CacheLine {
        debug_assert!(way < self.ways, "way {way} out of range");
        &mut self.lines[set * self.ways + way]
    }

    /// Iterates over every slot as `(set, way, line)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &CacheLine)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .map(move |(i, line)| (i / self.ways, i % self.ways, line))
    }
}

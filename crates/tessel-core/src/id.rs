//! Strongly-typed identifiers and the [`Coord`] type alias.

use smallvec::SmallVec;
use std::fmt;

/// Identifies one cooperating process of a distributed run.
///
/// Ranks are dense: a run of `n` processes uses ranks `0..n`. Rank 0 is
/// the coordinator that hosts the registry directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(pub u32);

impl Rank {
    /// The coordinator rank.
    pub const ROOT: Rank = Rank(0);

    /// The rank as a `usize` index into per-process tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is the coordinator rank.
    pub fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing tick counter.
///
/// Incremented each time the scheduler completes one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl TickId {
    /// The tick that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// A coordinate in field space, axis 0 first.
///
/// Uses `SmallVec<[i32; 4]>` to avoid heap allocation for fields
/// up to 4 dimensions. Higher-dimensional fields spill to the heap
/// transparently.
pub type Coord = SmallVec<[i32; 4]>;

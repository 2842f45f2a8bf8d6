//! The transport trait.

use std::fmt;
use std::time::Duration;

use tessel_core::Rank;

use crate::error::CommError;

/// Message tag. Messages match on `(source, tag)`; within one pair,
/// delivery order equals send order.
///
/// Tags at or above [`Tag::RESERVED`] belong to the collective
/// operations of [`Communicator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub u32);

impl Tag {
    /// First tag reserved for collectives.
    pub const RESERVED: Tag = Tag(0xFFFF_0000);
    /// Barrier arrival, non-root to root.
    pub const BARRIER_ARRIVE: Tag = Tag(0xFFFF_0001);
    /// Barrier release, root to non-root.
    pub const BARRIER_RELEASE: Tag = Tag(0xFFFF_0002);
    /// Broadcast payload.
    pub const BROADCAST: Tag = Tag(0xFFFF_0003);
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u32> for Tag {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Point-to-point messaging between the ranks of one run.
///
/// Sends are buffered and never block on the receiver. Every receive is
/// bounded by a timeout so a missing peer surfaces as
/// [`CommError::Timeout`] instead of a hang.
pub trait Communicator: Send {
    /// This process's rank.
    fn rank(&self) -> Rank;

    /// Number of processes.
    fn size(&self) -> usize;

    /// Queue `payload` for `dest` under `tag`.
    fn send(&mut self, dest: Rank, tag: Tag, payload: Vec<u8>) -> Result<(), CommError>;

    /// Wait up to `timeout` for the next message from `source` with
    /// `tag`. Messages with other `(source, tag)` pairs that arrive
    /// meanwhile are kept for later receives.
    fn recv(&mut self, source: Rank, tag: Tag, timeout: Duration) -> Result<Vec<u8>, CommError>;

    /// Block until every rank has entered the barrier.
    ///
    /// Ranks report to rank 0, which releases everyone once all have
    /// arrived. Each wait is bounded by `timeout`.
    fn barrier(&mut self, timeout: Duration) -> Result<(), CommError> {
        let root = Rank::ROOT;
        if self.rank() == root {
            for r in 1..self.size() {
                self.recv(Rank(r as u32), Tag::BARRIER_ARRIVE, timeout)?;
            }
            for r in 1..self.size() {
                self.send(Rank(r as u32), Tag::BARRIER_RELEASE, Vec::new())?;
            }
        } else {
            self.send(root, Tag::BARRIER_ARRIVE, Vec::new())?;
            self.recv(root, Tag::BARRIER_RELEASE, timeout)?;
        }
        Ok(())
    }

    /// Distribute `payload` from `root` to every rank.
    ///
    /// On `root` the argument is sent and returned; elsewhere it is
    /// ignored and the root's payload is returned.
    fn broadcast(
        &mut self,
        root: Rank,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, CommError> {
        if root.index() >= self.size() {
            return Err(CommError::UnknownRank {
                rank: root,
                size: self.size(),
            });
        }
        if self.rank() == root {
            for r in (0..self.size()).filter(|&r| r != root.index()) {
                self.send(Rank(r as u32), Tag::BROADCAST, payload.clone())?;
            }
            Ok(payload)
        } else {
            self.recv(root, Tag::BROADCAST, timeout)
        }
    }
}

//! Halo exchange: the per-partition transfer plan and one exchange round.
//!
//! For a sender `p`, a receiver `q` and each periodic image shift `s`,
//! the cells `p` owns that appear in `q`'s halo are
//!
//! ```text
//! src = local(p) ∩ (halo(q) + s)      (in p's storage)
//! dst = src - s                        (in q's storage)
//! ```
//!
//! Fragments for one pair are grouped, in order, into batches whose
//! source rectangles are pairwise disjoint; one batch is one message.
//! Both ends derive the same batches from the shared [`Partition`], so
//! payloads carry no coordinates. A process whose own cells wrap into
//! its own halo copies them locally instead of messaging itself.

use std::time::{Duration, Instant};

use smallvec::SmallVec;
use tessel_comm::{Communicator, Tag};
use tessel_core::{Coord, IntRect, Rank, TickId};
use tessel_grid::{FieldStorage, TransferDescriptor};
use tessel_partition::Partition;
use tracing::{debug, warn};

use crate::error::{EngineError, SyncError};
use crate::metrics::SyncMetrics;

/// Tag carrying halo batches.
pub const HALO_TAG: Tag = Tag(0x0100);

/// Source cells on the sender and where they land on the receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    /// Rectangle in the sender's coordinates (inside its local region).
    pub src: IntRect,
    /// Same-shaped rectangle in the receiver's halo coordinates.
    pub dst: IntRect,
}

/// The ordered fragments `from` owes `to`.
///
/// Empty unless `to` is a neighbour of `from` or, on a toroidal field,
/// `from` itself. A process never owes itself the zero shift.
pub fn fragments(partition: &Partition, from: Rank, to: Rank) -> Result<Vec<Fragment>, EngineError> {
    let local = partition.local_region(from)?;
    let halo = partition.halo_region(to)?;
    let mut out = Vec::new();
    for shift in partition.wrap_shifts() {
        if from == to && shift.iter().all(|&v| v == 0) {
            continue;
        }
        let image = halo.shift(&shift);
        if let Some(src) = local.intersect(&image) {
            let back: Coord = shift.iter().map(|&v| -v).collect();
            let dst = src.shift(&back);
            out.push(Fragment { src, dst });
        }
    }
    Ok(out)
}

/// Group fragments, in order, into batches with pairwise-disjoint
/// source rectangles. Each fragment joins the first batch it does not
/// overlap.
pub fn batch(fragments: Vec<Fragment>) -> Vec<Vec<Fragment>> {
    let mut batches: Vec<Vec<Fragment>> = Vec::new();
    for fragment in fragments {
        let slot = batches
            .iter()
            .position(|b| b.iter().all(|f| !f.src.intersects(&fragment.src)));
        match slot {
            Some(i) => batches[i].push(fragment),
            None => batches.push(vec![fragment]),
        }
    }
    batches
}

/// One batch exchanged with a peer, described over local storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerBatch {
    /// The other process.
    pub peer: Rank,
    /// Cells to pack (send side) or overwrite (receive side).
    pub descriptor: TransferDescriptor,
}

/// Everything one process does in a halo round, precomputed.
///
/// Built once per partition and storage layout; rebuilt after a
/// rebalance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HaloPlan {
    rank: Rank,
    sends: Vec<PeerBatch>,
    recvs: Vec<PeerBatch>,
    local_copies: Vec<Fragment>,
}

impl HaloPlan {
    /// Plan the halo round of `rank` over `storage`, which must cover
    /// the rank's halo region.
    pub fn build(
        partition: &Partition,
        rank: Rank,
        storage: &FieldStorage,
    ) -> Result<Self, EngineError> {
        let neighbours = partition.neighbours_of(rank)?;
        let mut sends = Vec::new();
        let mut recvs = Vec::new();
        for &peer in neighbours {
            for group in batch(fragments(partition, rank, peer)?) {
                let rects: Vec<IntRect> = group.into_iter().map(|f| f.src).collect();
                sends.push(PeerBatch {
                    peer,
                    descriptor: storage.descriptor(&rects)?,
                });
            }
            for group in batch(fragments(partition, peer, rank)?) {
                let rects: Vec<IntRect> = group.into_iter().map(|f| f.dst).collect();
                recvs.push(PeerBatch {
                    peer,
                    descriptor: storage.descriptor(&rects)?,
                });
            }
        }
        let local_copies = fragments(partition, rank, rank)?;
        let bytes: usize = sends.iter().map(|b| b.descriptor.pack_size_bytes()).sum();
        debug!(
            %rank,
            neighbours = neighbours.len(),
            sends = sends.len(),
            recvs = recvs.len(),
            local_copies = local_copies.len(),
            bytes,
            "halo plan built"
        );
        Ok(Self {
            rank,
            sends,
            recvs,
            local_copies,
        })
    }

    /// The process this plan belongs to.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Outgoing batches in send order.
    pub fn sends(&self) -> &[PeerBatch] {
        &self.sends
    }

    /// Incoming batches in receive order.
    pub fn recvs(&self) -> &[PeerBatch] {
        &self.recvs
    }

    /// Self-image copies applied locally.
    pub fn local_copies(&self) -> &[Fragment] {
        &self.local_copies
    }

    /// Distinct peers this process exchanges with.
    pub fn peers(&self) -> impl Iterator<Item = Rank> + '_ {
        let mut seen: SmallVec<[Rank; 8]> = SmallVec::new();
        self.sends
            .iter()
            .chain(&self.recvs)
            .map(|b| b.peer)
            .filter(move |p| {
                if seen.contains(p) {
                    false
                } else {
                    seen.push(*p);
                    true
                }
            })
    }

    /// Run one halo round.
    ///
    /// Every send is issued before any receive is awaited; each receive
    /// waits at most `timeout`. Only halo cells are written. Returns once
    /// every expected batch has been unpacked.
    pub fn exchange(
        &self,
        storage: &mut FieldStorage,
        comm: &mut dyn Communicator,
        tick: TickId,
        timeout: Duration,
    ) -> Result<SyncMetrics, SyncError> {
        let start = Instant::now();
        let mut metrics = SyncMetrics {
            tick,
            ..SyncMetrics::default()
        };

        for batch in &self.sends {
            let payload = storage.pack(&batch.descriptor)?;
            metrics.bytes_sent += payload.len();
            metrics.messages_sent += 1;
            comm.send(batch.peer, HALO_TAG, payload)
                .map_err(|e| SyncError::from_comm(e, tick))?;
        }

        for copy in &self.local_copies {
            storage.copy_rect(&copy.src, &copy.dst)?;
        }
        metrics.local_copies = self.local_copies.len();

        let recv_start = Instant::now();
        for batch in &self.recvs {
            let payload = comm.recv(batch.peer, HALO_TAG, timeout).map_err(|e| {
                let e = SyncError::from_comm(e, tick);
                warn!(rank = %self.rank, peer = %batch.peer, error = %e, "halo receive failed");
                e
            })?;
            metrics.bytes_received += payload.len();
            metrics.messages_received += 1;
            storage.unpack(&batch.descriptor, &payload)?;
        }
        metrics.recv_us = recv_start.elapsed().as_micros() as u64;
        metrics.total_us = start.elapsed().as_micros() as u64;

        debug!(
            rank = %self.rank,
            %tick,
            messages = metrics.messages_sent,
            bytes = metrics.bytes_sent,
            us = metrics.total_us,
            "halo round"
        );
        Ok(metrics)
    }
}

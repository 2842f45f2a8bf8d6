//! Moving owned cells between partitions.
//!
//! After a rebalance every process ships `old_local(p) ∩ new_local(q)`
//! to each new owner `q` and keeps the part it still owns. Both ends
//! compute the same intersection, so payloads are bare cell data.

use std::time::Duration;

use tessel_comm::{Communicator, Tag};
use tessel_core::{Rank, TickId};
use tessel_grid::FieldStorage;
use tessel_partition::Partition;
use tracing::debug;

use crate::error::{EngineError, SyncError};
use crate::metrics::RebalanceMetrics;

/// Tag carrying redistributed cells.
pub const REDISTRIBUTE_TAG: Tag = Tag(0x0200);

/// Copy this process's owned cells from `old_storage` (laid out for
/// `old`) into `new_storage` (laid out for `new`), exchanging with every
/// process whose ownership changed.
///
/// Halo cells of `new_storage` are left untouched; run a halo round
/// afterwards. The returned metrics carry no sync data yet.
pub fn redistribute(
    old: &Partition,
    new: &Partition,
    old_storage: &FieldStorage,
    new_storage: &mut FieldStorage,
    comm: &mut dyn Communicator,
    tick: TickId,
    timeout: Duration,
) -> Result<RebalanceMetrics, EngineError> {
    let me = comm.rank();
    let size = comm.size();
    let old_local = old.local_region(me)?;
    let new_local = new.local_region(me)?;
    let mut metrics = RebalanceMetrics::default();

    for q in (0..size).map(|q| Rank(q as u32)) {
        let Some(moving) = old_local.intersect(new.local_region(q)?) else {
            continue;
        };
        if q == me {
            metrics.cells_kept += new_storage.copy_region_from(old_storage, &moving)?;
            continue;
        }
        let descriptor = old_storage.descriptor(std::slice::from_ref(&moving))?;
        let payload = old_storage.pack(&descriptor)?;
        comm.send(q, REDISTRIBUTE_TAG, payload)
            .map_err(|e| SyncError::from_comm(e, tick))?;
        metrics.cells_sent += moving.area();
    }

    for q in (0..size).map(|q| Rank(q as u32)).filter(|&q| q != me) {
        let Some(arriving) = old.local_region(q)?.intersect(new_local) else {
            continue;
        };
        let payload = comm
            .recv(q, REDISTRIBUTE_TAG, timeout)
            .map_err(|e| SyncError::from_comm(e, tick))?;
        let descriptor = new_storage.descriptor(std::slice::from_ref(&arriving))?;
        new_storage
            .unpack(&descriptor, &payload)
            .map_err(SyncError::from)?;
        metrics.cells_received += arriving.area();
    }

    debug!(
        rank = %me,
        kept = metrics.cells_kept,
        sent = metrics.cells_sent,
        received = metrics.cells_received,
        "redistributed"
    );
    Ok(metrics)
}

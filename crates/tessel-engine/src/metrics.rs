//! Per-round metrics for halo exchange and rebalance.
//!
//! [`SyncMetrics`] captures traffic and timing for one halo round;
//! [`RebalanceMetrics`] adds the cells moved by a redistribution.

use tessel_core::TickId;

/// Traffic and timing of one halo round on one process.
///
/// Durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncMetrics {
    /// Tick the round ran in.
    pub tick: TickId,
    /// Messages sent to neighbours.
    pub messages_sent: usize,
    /// Messages received from neighbours.
    pub messages_received: usize,
    /// Payload bytes sent.
    pub bytes_sent: usize,
    /// Payload bytes received.
    pub bytes_received: usize,
    /// Wrap images of this process's own cells, copied locally.
    pub local_copies: usize,
    /// Wall-clock time for the whole round, in microseconds.
    pub total_us: u64,
    /// Time spent waiting on and unpacking receives, in microseconds.
    pub recv_us: u64,
}

/// Outcome of a rebalance on one process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RebalanceMetrics {
    /// Owned cells that stayed on this process.
    pub cells_kept: usize,
    /// Owned cells shipped to their new owners.
    pub cells_sent: usize,
    /// Cells received from their previous owners.
    pub cells_received: usize,
    /// The full halo round that followed.
    pub sync: SyncMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = RebalanceMetrics::default();
        assert_eq!(m.cells_kept + m.cells_sent + m.cells_received, 0);
        assert_eq!(m.sync.tick, TickId(0));
        assert_eq!(m.sync.bytes_sent, 0);
        assert_eq!(m.sync.total_us, 0);
    }
}

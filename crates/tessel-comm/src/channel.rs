//! In-process communicator over crossbeam channels.

use std::time::Duration;

use crossbeam_channel::Sender;
use tessel_core::Rank;
use tracing::trace;

use crate::communicator::{Communicator, Tag};
use crate::error::CommError;
use crate::mailbox::{Envelope, Mailbox};

/// Factory for a fully connected set of in-process ranks.
pub struct ChannelCluster;

impl ChannelCluster {
    /// Create `size` connected endpoints, indexed by rank. Move each onto
    /// its own thread.
    ///
    /// ```
    /// use std::time::Duration;
    /// use tessel_comm::{ChannelCluster, Communicator, Tag};
    /// use tessel_core::Rank;
    ///
    /// let mut comms = ChannelCluster::new(2);
    /// let mut b = comms.pop().unwrap();
    /// let mut a = comms.pop().unwrap();
    /// a.send(Rank(1), Tag(7), b"hi".to_vec()).unwrap();
    /// let got = b.recv(Rank(0), Tag(7), Duration::from_secs(1)).unwrap();
    /// assert_eq!(got, b"hi");
    /// ```
    #[allow(clippy::new_ret_no_self)]
    pub fn new(size: usize) -> Vec<ChannelComm> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| crossbeam_channel::unbounded()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(r, inbox)| ChannelComm {
                rank: Rank(r as u32),
                peers: senders.clone(),
                mailbox: Mailbox::new(inbox),
            })
            .collect()
    }
}

/// One rank's endpoint of a [`ChannelCluster`].
///
/// Messages that arrive while waiting for a different `(source, tag)`
/// are parked in arrival order and served first by later receives.
pub struct ChannelComm {
    rank: Rank,
    peers: Vec<Sender<Envelope>>,
    mailbox: Mailbox,
}

impl ChannelComm {
    /// Messages received but not yet matched.
    pub fn pending_len(&self) -> usize {
        self.mailbox.pending_len()
    }
}

impl Communicator for ChannelComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&mut self, dest: Rank, tag: Tag, payload: Vec<u8>) -> Result<(), CommError> {
        let peer = self.peers.get(dest.index()).ok_or(CommError::UnknownRank {
            rank: dest,
            size: self.peers.len(),
        })?;
        trace!(from = %self.rank, to = %dest, %tag, bytes = payload.len(), "send");
        peer.send(Envelope {
            source: self.rank,
            tag,
            payload,
        })
        .map_err(|_| CommError::Disconnected { peer: dest })
    }

    fn recv(&mut self, source: Rank, tag: Tag, timeout: Duration) -> Result<Vec<u8>, CommError> {
        if source.index() >= self.peers.len() {
            return Err(CommError::UnknownRank {
                rank: source,
                size: self.peers.len(),
            });
        }
        self.mailbox.take(source, tag, timeout)
    }
}

// Compile-time assertion: endpoints move onto worker threads.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<ChannelComm>();
};

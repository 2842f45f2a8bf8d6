//! Receive-side matching shared by the communicators.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tessel_core::Rank;

use crate::communicator::Tag;
use crate::error::CommError;

pub(crate) struct Envelope {
    pub(crate) source: Rank,
    pub(crate) tag: Tag,
    pub(crate) payload: Vec<u8>,
}

/// An inbox plus the messages that arrived while a receive was waiting
/// for a different `(source, tag)`. Parked messages keep arrival order,
/// so delivery within one pair follows send order.
pub(crate) struct Mailbox {
    inbox: Receiver<Envelope>,
    pending: VecDeque<Envelope>,
}

impl Mailbox {
    pub(crate) fn new(inbox: Receiver<Envelope>) -> Self {
        Self {
            inbox,
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn take(
        &mut self,
        source: Rank,
        tag: Tag,
        timeout: Duration,
    ) -> Result<Vec<u8>, CommError> {
        if let Some(pos) = self
            .pending
            .iter()
            .position(|e| e.source == source && e.tag == tag)
        {
            if let Some(envelope) = self.pending.remove(pos) {
                return Ok(envelope.payload);
            }
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbox.recv_timeout(remaining) {
                Ok(envelope) if envelope.source == source && envelope.tag == tag => {
                    return Ok(envelope.payload);
                }
                Ok(envelope) => self.pending.push_back(envelope),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CommError::Timeout {
                        source,
                        tag,
                        waited: timeout,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CommError::Disconnected { peer: source });
                }
            }
        }
    }
}

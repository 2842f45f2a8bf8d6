//! Transport error types.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use tessel_core::Rank;

use crate::communicator::Tag;

/// Errors from sending or receiving messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// No matching message arrived within the wait bound.
    Timeout {
        /// Rank the message was expected from.
        source: Rank,
        /// Tag the message was expected with.
        tag: Tag,
        /// How long the receiver waited.
        waited: Duration,
    },
    /// The peer's endpoint is gone.
    Disconnected {
        /// The unreachable rank.
        peer: Rank,
    },
    /// A rank outside the communicator.
    UnknownRank {
        /// The rank addressed.
        rank: Rank,
        /// Processes in the communicator.
        size: usize,
    },
    /// A message arrived that the protocol did not expect.
    Protocol {
        /// What was wrong with it.
        detail: String,
    },
    /// Connecting the ranks of a run failed.
    Setup {
        /// Why the transport could not be built.
        reason: String,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout {
                source,
                tag,
                waited,
            } => write!(
                f,
                "timed out after {waited:?} waiting for tag {tag} from rank {source}"
            ),
            Self::Disconnected { peer } => write!(f, "rank {peer} disconnected"),
            Self::UnknownRank { rank, size } => {
                write!(f, "rank {rank} outside communicator of {size}")
            }
            Self::Protocol { detail } => write!(f, "protocol error: {detail}"),
            Self::Setup { reason } => write!(f, "transport setup failed: {reason}"),
        }
    }
}

impl Error for CommError {}

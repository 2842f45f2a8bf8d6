//! Message passing between the cooperating processes of a Tessel run.
//!
//! [`Communicator`] is the seam every distributed component talks
//! through: point-to-point tagged messages with bounded waits, plus
//! barrier and broadcast built on top. [`ChannelCluster`] implements it
//! in-process over crossbeam channels, one thread per rank, for tests and
//! benchmarks. [`TcpComm`] connects ranks running as separate OS
//! processes, on one host or many.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod communicator;
pub mod error;
mod mailbox;
pub mod tcp;

pub use channel::{ChannelCluster, ChannelComm};
pub use communicator::{Communicator, Tag};
pub use error::CommError;
pub use tcp::{TcpComm, PEERS_VAR, RANK_VAR};

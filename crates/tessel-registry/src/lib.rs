//! Distributed name registry for Tessel agents.
//!
//! Agents move between processes as the simulation runs, yet other
//! agents still need to reach them by name. This crate provides:
//!
//! - a [`DirectoryServer`] hosted by the coordinator (rank 0) that maps
//!   names to [`RemoteHandle`]s, first writer wins;
//! - an [`ObjectServer`] on every process that dispatches invocations to
//!   locally exported [`Remote`] objects;
//! - the process-scoped [`Registry`] that ties both together and tracks
//!   which exported names migrated away during the current tick.
//!
//! # Wire format
//!
//! ```text
//! [len u32] [VERSION u8] [tag u8] [fields...]
//! ```
//!
//! All integers are little-endian; strings and byte arrays carry a
//! `u32` length prefix. One request, one response, per frame pair.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod directory;
pub mod error;
pub mod export;
pub mod handle;
pub mod protocol;
pub mod registry;
mod server;

pub use config::RegistryConfig;
pub use directory::{DirectoryClient, DirectoryServer};
pub use error::{RegistryError, RemoteError};
pub use export::ObjectServer;
pub use handle::{Remote, RemoteHandle};
pub use protocol::{Request, Response};
pub use registry::Registry;

/// Current wire format version.
pub const FORMAT_VERSION: u8 = 1;

/// Largest frame body either side accepts.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

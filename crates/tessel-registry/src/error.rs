//! Error types for the registry.

use std::fmt;
use std::io;
use std::time::Duration;

use tessel_comm::CommError;

/// Errors from registry operations, the directory protocol, or remote
/// invocation.
#[derive(Debug)]
pub enum RegistryError {
    /// No binding exists for the name.
    NotFound {
        /// The name looked up.
        name: String,
    },
    /// An I/O error on a registry connection.
    Io(io::Error),
    /// A peer did not answer within the configured timeout.
    Timeout {
        /// How long the caller waited.
        waited: Duration,
    },
    /// A frame could not be decoded (truncated, oversized, or corrupt).
    MalformedFrame {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The peer speaks a different wire format version.
    UnsupportedVersion {
        /// The version found in the frame.
        found: u8,
    },
    /// The peer answered with a response that does not fit the request.
    UnexpectedResponse {
        /// The request that was sent.
        request: &'static str,
        /// The response kind received.
        response: &'static str,
    },
    /// A remote object rejected or failed an invocation.
    Remote {
        /// The handle's registered name.
        name: String,
        /// Failure reported by the owning process.
        reason: String,
    },
    /// A network address could not be parsed.
    Address {
        /// The address text.
        addr: String,
    },
    /// Bootstrap communication with the other ranks failed.
    Comm(CommError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "name '{name}' is not bound"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Timeout { waited } => write!(f, "registry peer silent for {waited:?}"),
            Self::MalformedFrame { detail } => write!(f, "malformed frame: {detail}"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported wire format version {found}")
            }
            Self::UnexpectedResponse { request, response } => {
                write!(f, "unexpected {response} response to {request} request")
            }
            Self::Remote { name, reason } => write!(f, "remote call on '{name}' failed: {reason}"),
            Self::Address { addr } => write!(f, "invalid address '{addr}'"),
            Self::Comm(e) => write!(f, "bootstrap: {e}"),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Comm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RegistryError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CommError> for RegistryError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

/// Failure reported by a [`Remote`](crate::Remote) implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteError {
    /// The object has no method of this name.
    UnknownMethod {
        /// The method requested.
        method: String,
    },
    /// The arguments could not be decoded.
    BadArguments {
        /// What was wrong.
        reason: String,
    },
    /// The method ran and failed.
    Failed {
        /// What went wrong.
        reason: String,
    },
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod { method } => write!(f, "unknown method '{method}'"),
            Self::BadArguments { reason } => write!(f, "bad arguments: {reason}"),
            Self::Failed { reason } => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for RemoteError {}

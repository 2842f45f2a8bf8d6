//! Remote object handles and the trait exported objects implement.

use std::fmt;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use tessel_core::Rank;
use tracing::trace;

use crate::codec::{
    io_error, read_frame, read_length_prefixed_str, read_u32_le, read_u64_le, write_frame,
    write_length_prefixed_str, write_u32_le, write_u64_le,
};
use crate::error::{RegistryError, RemoteError};
use crate::protocol::{Request, Response};

/// An object that other processes may call by name.
///
/// Arguments and results are opaque bytes; the caller and the object
/// agree on their encoding.
pub trait Remote: Send + Sync {
    /// Run `method` with `args` and return its encoded result.
    fn invoke(&self, method: &str, args: &[u8]) -> Result<Vec<u8>, RemoteError>;
}

/// Location-transparent reference to an exported object.
///
/// A handle is plain data: it can be stored, copied between processes
/// through the directory, and invoked from any of them. Calls are
/// synchronous and travel to the owning process's
/// [`ObjectServer`](crate::ObjectServer).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RemoteHandle {
    /// Name the object was registered under.
    pub name: String,
    /// Rank of the process that exported the object.
    pub owner: Rank,
    /// Address of the owner's object server.
    pub endpoint: SocketAddr,
    /// Identifier of the object within its owner's server.
    pub object_id: u64,
}

impl RemoteHandle {
    /// Call `method` on the remote object, waiting at most `timeout` for
    /// the connection and each read or write.
    pub fn invoke(
        &self,
        method: &str,
        args: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, RegistryError> {
        trace!(name = %self.name, owner = %self.owner, method, "invoke");
        let mut stream = TcpStream::connect_timeout(&self.endpoint, timeout)
            .map_err(|e| with_wait(io_error(e), timeout))?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let request = Request::Invoke {
            object_id: self.object_id,
            method: method.to_owned(),
            args: args.to_vec(),
        };
        write_frame(&mut stream, &request.encode()?)?;
        let body = read_frame(&mut stream)
            .map_err(|e| with_wait(e, timeout))?
            .ok_or_else(|| RegistryError::MalformedFrame {
                detail: "connection closed before reply".into(),
            })?;
        match Response::decode(&body)? {
            Response::Returned(bytes) => Ok(bytes),
            Response::Failed { reason } => Err(RegistryError::Remote {
                name: self.name.clone(),
                reason,
            }),
            other => Err(RegistryError::UnexpectedResponse {
                request: "invoke",
                response: other.kind(),
            }),
        }
    }

    pub(crate) fn write_to(&self, w: &mut dyn Write) -> Result<(), RegistryError> {
        write_length_prefixed_str(w, &self.name)?;
        write_u32_le(w, self.owner.0)?;
        write_length_prefixed_str(w, &self.endpoint.to_string())?;
        write_u64_le(w, self.object_id)
    }

    pub(crate) fn read_from(r: &mut dyn Read) -> Result<Self, RegistryError> {
        let name = read_length_prefixed_str(r)?;
        let owner = Rank(read_u32_le(r)?);
        let addr = read_length_prefixed_str(r)?;
        let endpoint = addr
            .parse()
            .map_err(|_| RegistryError::Address { addr })?;
        let object_id = read_u64_le(r)?;
        Ok(Self {
            name,
            owner,
            endpoint,
            object_id,
        })
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}#{} (rank {})",
            self.name, self.endpoint, self.object_id, self.owner
        )
    }
}

/// Attach the configured wait to a timeout raised by a socket read.
pub(crate) fn with_wait(e: RegistryError, waited: Duration) -> RegistryError {
    match e {
        RegistryError::Timeout { .. } => RegistryError::Timeout { waited },
        other => other,
    }
}

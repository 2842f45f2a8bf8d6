//! The name directory hosted by the coordinating process.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use indexmap::IndexMap;
use tessel_core::Rank;
use tracing::{debug, warn};

use crate::codec::{io_error, read_frame, write_frame};
use crate::error::RegistryError;
use crate::handle::{with_wait, RemoteHandle};
use crate::protocol::{Request, Response};
use crate::server::FrameServer;

type Bindings = Arc<Mutex<IndexMap<String, RemoteHandle>>>;

/// Authoritative name → handle table, served over TCP.
///
/// The first bind of a name wins; later binds are refused with the
/// current owner. Only the owner may unbind. Requests from different
/// clients are serialised on one lock, so the table is linearisable.
pub struct DirectoryServer {
    bindings: Bindings,
    server: FrameServer,
}

impl DirectoryServer {
    /// Start serving on `addr` (use port 0 for an ephemeral port).
    pub fn start(addr: impl ToSocketAddrs) -> Result<Self, RegistryError> {
        let bindings: Bindings = Arc::default();
        let table = Arc::clone(&bindings);
        let server = FrameServer::start(
            addr,
            "directory",
            Arc::new(move |request| handle_request(&table, request)),
        )?;
        Ok(Self { bindings, server })
    }

    /// Address clients connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no name is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop serving and close every client connection.
    pub fn shutdown(mut self) {
        self.server.stop();
    }
}

fn handle_request(bindings: &Mutex<IndexMap<String, RemoteHandle>>, request: Request) -> Response {
    let mut table = bindings.lock().unwrap_or_else(PoisonError::into_inner);
    match request {
        Request::Bind { handle } => match table.get(&handle.name) {
            Some(existing) => {
                warn!(name = %handle.name, owner = %existing.owner, by = %handle.owner, "bind refused");
                Response::AlreadyBound {
                    owner: existing.owner,
                }
            }
            None => {
                debug!(%handle, "bound");
                table.insert(handle.name.clone(), handle);
                Response::Bound
            }
        },
        Request::Lookup { name } => match table.get(&name) {
            Some(handle) => Response::Found(handle.clone()),
            None => Response::NotFound,
        },
        Request::Unbind { name, owner } => match table.get(&name).map(|h| h.owner) {
            None => Response::NotFound,
            Some(bound) if bound != owner => Response::NotOwner { owner: bound },
            Some(_) => {
                // shift_remove keeps the remaining names in binding order.
                table.shift_remove(&name);
                debug!(%name, %owner, "unbound");
                Response::Unbound
            }
        },
        Request::List => Response::Names(table.keys().cloned().collect()),
        Request::Invoke { .. } => Response::Failed {
            reason: "directory does not host objects".into(),
        },
    }
}

/// A process's connection to the [`DirectoryServer`].
///
/// Requests go over one persistent connection; each call blocks until
/// the reply arrives or `timeout` passes.
pub struct DirectoryClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    timeout: Duration,
}

impl DirectoryClient {
    /// Connect to the directory at `addr`.
    pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, RegistryError> {
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| with_wait(io_error(e), timeout))?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
            timeout,
        })
    }

    /// Bind `handle.name`. Returns `false` if the name was already bound,
    /// in which case the existing binding is unchanged.
    pub fn bind(&mut self, handle: &RemoteHandle) -> Result<bool, RegistryError> {
        match self.call(&Request::Bind {
            handle: handle.clone(),
        })? {
            Response::Bound => Ok(true),
            Response::AlreadyBound { .. } => Ok(false),
            other => Err(unexpected("bind", &other)),
        }
    }

    /// Resolve `name`.
    pub fn lookup(&mut self, name: &str) -> Result<RemoteHandle, RegistryError> {
        match self.call(&Request::Lookup { name: name.into() })? {
            Response::Found(handle) => Ok(handle),
            Response::NotFound => Err(RegistryError::NotFound { name: name.into() }),
            other => Err(unexpected("lookup", &other)),
        }
    }

    /// Remove `name` if `owner` holds it. Returns `false` if the name is
    /// unbound or held by another rank.
    pub fn unbind(&mut self, name: &str, owner: Rank) -> Result<bool, RegistryError> {
        match self.call(&Request::Unbind {
            name: name.into(),
            owner,
        })? {
            Response::Unbound => Ok(true),
            Response::NotFound | Response::NotOwner { .. } => Ok(false),
            other => Err(unexpected("unbind", &other)),
        }
    }

    /// Every bound name, in binding order.
    pub fn names(&mut self) -> Result<Vec<String>, RegistryError> {
        match self.call(&Request::List)? {
            Response::Names(names) => Ok(names),
            other => Err(unexpected("list", &other)),
        }
    }

    fn call(&mut self, request: &Request) -> Result<Response, RegistryError> {
        write_frame(&mut self.writer, &request.encode()?)?;
        let body = read_frame(&mut self.reader)
            .map_err(|e| with_wait(e, self.timeout))?
            .ok_or_else(|| RegistryError::MalformedFrame {
                detail: "directory closed the connection".into(),
            })?;
        Response::decode(&body)
    }
}

fn unexpected(request: &'static str, response: &Response) -> RegistryError {
    RegistryError::UnexpectedResponse {
        request,
        response: response.kind(),
    }
}

//! Threaded TCP server for request/response frames.
//!
//! One acceptor thread polls a non-blocking listener and hands each
//! connection to its own thread, which answers frames until the peer
//! hangs up and then forgets its connection. Shutdown sets a flag, closes
//! live connections, and joins every thread.

use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::codec::{read_frame, write_frame};
use crate::error::RegistryError;
use crate::protocol::{Request, Response};

/// How often the acceptor re-checks the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(5);

pub(crate) type Handler = Arc<dyn Fn(Request) -> Response + Send + Sync>;

/// Live connections by id. A connection thread removes its own entry when
/// the peer hangs up.
type Connections = IndexMap<u64, (TcpStream, JoinHandle<()>)>;

pub(crate) struct FrameServer {
    addr: SocketAddr,
    shutdown_flag: Arc<AtomicBool>,
    connections: Arc<Mutex<Connections>>,
    acceptor: Option<JoinHandle<()>>,
}

impl FrameServer {
    /// Bind `addr` and start answering frames with `handler`.
    pub(crate) fn start(
        addr: impl ToSocketAddrs,
        label: &str,
        handler: Handler,
    ) -> Result<Self, RegistryError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let connections = Arc::new(Mutex::new(Connections::new()));

        let flag = Arc::clone(&shutdown_flag);
        let conns = Arc::clone(&connections);
        let name = format!("tessel-{label}");
        let acceptor = thread::Builder::new()
            .name(name.clone())
            .spawn(move || accept_loop(listener, flag, conns, handler, name))?;
        debug!(%addr, label, "server listening");

        Ok(Self {
            addr,
            shutdown_flag,
            connections,
            acceptor: Some(acceptor),
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Connections whose peer has not hung up yet.
    pub(crate) fn open_connections(&self) -> usize {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stop accepting, close live connections, and join all threads.
    /// Idempotent.
    pub(crate) fn stop(&mut self) {
        let Some(acceptor) = self.acceptor.take() else {
            return;
        };
        self.shutdown_flag.store(true, Ordering::Release);
        let _ = acceptor.join();
        let conns = std::mem::take(
            &mut *self
                .connections
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for (stream, _) in conns.values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        for (_, (_, handle)) in conns {
            let _ = handle.join();
        }
        debug!(addr = %self.addr, "server stopped");
    }
}

impl Drop for FrameServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    shutdown_flag: Arc<AtomicBool>,
    connections: Arc<Mutex<Connections>>,
    handler: Handler,
    name: String,
) {
    let mut next_conn = 0u64;
    while !shutdown_flag.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = register(&stream, &connections, &handler, &name, next_conn) {
                    warn!(%peer, error = %e, "dropping connection");
                }
                next_conn += 1;
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(error = %e, "accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn register(
    stream: &TcpStream,
    connections: &Arc<Mutex<Connections>>,
    handler: &Handler,
    name: &str,
    id: u64,
) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    let tracked = stream.try_clone()?;
    let mut worker = stream.try_clone()?;
    let handler = Arc::clone(handler);
    let table = Arc::clone(connections);
    // Held until the entry is inserted, so the thread cannot remove it first.
    let mut conns = connections.lock().unwrap_or_else(PoisonError::into_inner);
    let thread = thread::Builder::new()
        .name(format!("{name}-conn-{id}"))
        .spawn(move || {
            serve(&mut worker, &handler);
            table
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .swap_remove(&id);
        })?;
    conns.insert(id, (tracked, thread));
    Ok(())
}

fn serve(stream: &mut TcpStream, handler: &Handler) {
    loop {
        let body = match read_frame(stream) {
            Ok(Some(body)) => body,
            Ok(None) => return,
            Err(e) => {
                trace!(error = %e, "connection closed");
                return;
            }
        };
        let response = match Request::decode(&body) {
            Ok(request) => {
                trace!(kind = request.kind(), "request");
                handler(request)
            }
            Err(e) => Response::Failed {
                reason: e.to_string(),
            },
        };
        let sent = response
            .encode()
            .and_then(|bytes| write_frame(stream, &bytes));
        if let Err(e) = sent {
            trace!(error = %e, "reply failed");
            return;
        }
    }
}

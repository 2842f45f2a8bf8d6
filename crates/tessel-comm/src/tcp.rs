//! Communicator over TCP, for ranks that live in separate OS processes.
//!
//! Every pair of ranks shares one connection: the higher rank dials the
//! lower one and opens with its rank number. Each connection carries
//! frames of `[tag: u32 LE][len: u32 LE][payload]` and has a reader
//! thread that feeds a single inbox, so receives match on
//! `(source, tag)` exactly like [`ChannelComm`](crate::ChannelComm).

use std::env;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tessel_core::Rank;
use tracing::{debug, trace};

use crate::communicator::{Communicator, Tag};
use crate::error::CommError;
use crate::mailbox::{Envelope, Mailbox};

/// Environment variable holding this process's rank.
pub const RANK_VAR: &str = "TESSEL_RANK";

/// Environment variable holding every rank's listen address, comma
/// separated and indexed by rank.
pub const PEERS_VAR: &str = "TESSEL_PEERS";

/// Pause between attempts while a lower rank is not listening yet, and
/// between accept polls.
const RETRY: Duration = Duration::from_millis(10);

/// One rank's endpoint of a TCP mesh.
///
/// ```no_run
/// use std::time::Duration;
/// use tessel_comm::{Communicator, TcpComm};
///
/// // TESSEL_RANK=1 TESSEL_PEERS=10.0.0.1:7000,10.0.0.2:7000
/// let mut comm = TcpComm::from_env(Duration::from_secs(30)).unwrap();
/// comm.barrier(Duration::from_secs(30)).unwrap();
/// ```
pub struct TcpComm {
    rank: Rank,
    /// Outgoing half per rank; `None` at this rank's own index.
    links: Vec<Option<TcpStream>>,
    loopback: Sender<Envelope>,
    mailbox: Mailbox,
    readers: Vec<JoinHandle<()>>,
}

impl TcpComm {
    /// Read [`RANK_VAR`] and [`PEERS_VAR`], listen on this rank's address,
    /// and connect to every other rank within `timeout`.
    pub fn from_env(timeout: Duration) -> Result<Self, CommError> {
        let rank = env::var(RANK_VAR)
            .map_err(|e| setup(format!("{RANK_VAR}: {e}")))?
            .trim()
            .parse::<u32>()
            .map_err(|e| setup(format!("{RANK_VAR}: {e}")))?;
        let peers = env::var(PEERS_VAR)
            .map_err(|e| setup(format!("{PEERS_VAR}: {e}")))?
            .split(',')
            .map(|a| a.trim().parse::<SocketAddr>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| setup(format!("{PEERS_VAR}: {e}")))?;
        Self::connect(Rank(rank), &peers, timeout)
    }

    /// Listen on `peers[rank]` and connect to every other rank within
    /// `timeout`.
    pub fn connect(rank: Rank, peers: &[SocketAddr], timeout: Duration) -> Result<Self, CommError> {
        let addr = peers.get(rank.index()).ok_or(CommError::UnknownRank {
            rank,
            size: peers.len(),
        })?;
        let listener =
            TcpListener::bind(addr).map_err(|e| setup(format!("cannot listen on {addr}: {e}")))?;
        Self::with_listener(rank, listener, peers, timeout)
    }

    /// Build the mesh on an already bound `listener`. `peers[r]` is the
    /// address rank `r` listens on; this rank's own entry is not dialled.
    ///
    /// Lower ranks are dialled (retrying until they listen) and higher
    /// ranks are accepted. Fails with [`CommError::Setup`] if the mesh is
    /// not complete within `timeout`.
    pub fn with_listener(
        rank: Rank,
        listener: TcpListener,
        peers: &[SocketAddr],
        timeout: Duration,
    ) -> Result<Self, CommError> {
        let size = peers.len();
        if rank.index() >= size {
            return Err(CommError::UnknownRank { rank, size });
        }
        let deadline = Instant::now() + timeout;
        let mut links: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();

        for (r, addr) in peers.iter().enumerate().take(rank.index()) {
            let mut stream = dial(*addr, deadline)?;
            stream
                .write_all(&rank.0.to_le_bytes())
                .map_err(|e| setup(format!("handshake with rank {r}: {e}")))?;
            links[r] = Some(stream);
        }
        accept_higher(rank, &listener, &mut links, deadline)?;

        let (loopback, inbox) = crossbeam_channel::unbounded();
        let mut readers = Vec::with_capacity(size.saturating_sub(1));
        for (r, link) in links.iter().enumerate() {
            let Some(stream) = link else { continue };
            stream
                .set_nodelay(true)
                .map_err(|e| setup(format!("rank {r}: {e}")))?;
            let reader = stream
                .try_clone()
                .map_err(|e| setup(format!("rank {r}: {e}")))?;
            let tx = loopback.clone();
            let peer = Rank(r as u32);
            let handle = thread::Builder::new()
                .name(format!("tessel-comm-{rank}-from-{peer}"))
                .spawn(move || read_frames(reader, peer, &tx))
                .map_err(|e| setup(format!("reader thread: {e}")))?;
            readers.push(handle);
        }
        debug!(%rank, size, "tcp mesh connected");

        Ok(Self {
            rank,
            links,
            loopback,
            mailbox: Mailbox::new(inbox),
            readers,
        })
    }

    /// Messages received but not yet matched.
    pub fn pending_len(&self) -> usize {
        self.mailbox.pending_len()
    }
}

impl Communicator for TcpComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.links.len()
    }

    fn send(&mut self, dest: Rank, tag: Tag, payload: Vec<u8>) -> Result<(), CommError> {
        let size = self.links.len();
        let link = self
            .links
            .get_mut(dest.index())
            .ok_or(CommError::UnknownRank { rank: dest, size })?;
        trace!(from = %self.rank, to = %dest, %tag, bytes = payload.len(), "send");
        let Some(stream) = link else {
            return self
                .loopback
                .send(Envelope {
                    source: self.rank,
                    tag,
                    payload,
                })
                .map_err(|_| CommError::Disconnected { peer: dest });
        };
        let len = u32::try_from(payload.len()).map_err(|_| CommError::Protocol {
            detail: format!("{} byte payload does not fit a frame", payload.len()),
        })?;
        let mut frame = Vec::with_capacity(8 + payload.len());
        frame.extend_from_slice(&tag.0.to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        stream
            .write_all(&frame)
            .map_err(|_| CommError::Disconnected { peer: dest })
    }

    fn recv(&mut self, source: Rank, tag: Tag, timeout: Duration) -> Result<Vec<u8>, CommError> {
        if source.index() >= self.links.len() {
            return Err(CommError::UnknownRank {
                rank: source,
                size: self.links.len(),
            });
        }
        self.mailbox.take(source, tag, timeout)
    }
}

impl Drop for TcpComm {
    fn drop(&mut self) {
        for stream in self.links.iter().flatten() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        for handle in self.readers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn setup(reason: String) -> CommError {
    CommError::Setup { reason }
}

/// Connect to `addr`, retrying while nobody listens there yet.
fn dial(addr: SocketAddr, deadline: Instant) -> Result<TcpStream, CommError> {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(setup(format!("no listener at {addr}")));
        }
        match TcpStream::connect_timeout(&addr, remaining) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                trace!(%addr, error = %e, "dial retry");
                thread::sleep(RETRY.min(remaining));
            }
        }
    }
}

/// Accept one connection from every rank above `rank`.
fn accept_higher(
    rank: Rank,
    listener: &TcpListener,
    links: &mut [Option<TcpStream>],
    deadline: Instant,
) -> Result<(), CommError> {
    let size = links.len();
    let mut missing = size - rank.index() - 1;
    listener
        .set_nonblocking(true)
        .map_err(|e| setup(format!("listener: {e}")))?;
    while missing > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(setup(format!("{missing} higher ranks never connected")));
        }
        let mut stream = match listener.accept() {
            Ok((stream, _)) => stream,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                thread::sleep(RETRY.min(remaining));
                continue;
            }
            Err(e) => return Err(setup(format!("accept: {e}"))),
        };
        let greeting =
            read_greeting(&mut stream, remaining).map_err(|e| setup(format!("handshake: {e}")))?;
        let peer = greeting as usize;
        if peer <= rank.index() || peer >= size || links[peer].is_some() {
            return Err(setup(format!("unexpected handshake from rank {greeting}")));
        }
        links[peer] = Some(stream);
        missing -= 1;
    }
    Ok(())
}

/// The rank a freshly accepted connection announces.
fn read_greeting(stream: &mut TcpStream, wait: Duration) -> io::Result<u32> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(wait))?;
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf)?;
    stream.set_read_timeout(None)?;
    Ok(u32::from_le_bytes(buf))
}

/// Forward frames from `peer` into the inbox until the connection closes.
fn read_frames(mut stream: TcpStream, peer: Rank, inbox: &Sender<Envelope>) {
    let mut header = [0u8; 8];
    loop {
        if let Err(e) = stream.read_exact(&mut header) {
            trace!(%peer, error = %e, "link closed");
            return;
        }
        let tag = Tag(u32::from_le_bytes([header[0], header[1], header[2], header[3]]));
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let mut payload = vec![0u8; len];
        if let Err(e) = stream.read_exact(&mut payload) {
            trace!(%peer, error = %e, "link closed mid-frame");
            return;
        }
        let envelope = Envelope {
            source: peer,
            tag,
            payload,
        };
        if inbox.send(envelope).is_err() {
            return;
        }
    }
}

// Compile-time assertion: endpoints move onto worker threads.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<TcpComm>();
};

//! The process-scoped registry.
//!
//! Lifecycle of a name on its owning process:
//!
//! ```text
//! unregistered --register--> exported --mark_migrated--> migrated-out
//!      ^                        |                            |
//!      +------unregister--------+                            |
//!      +---------------withdraw_migrated---------------------+
//! ```

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tessel_comm::Communicator;
use tessel_core::Rank;
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::directory::{DirectoryClient, DirectoryServer};
use crate::error::RegistryError;
use crate::export::ObjectServer;
use crate::handle::{Remote, RemoteHandle};

struct Export {
    object: Arc<dyn Remote>,
    handle: RemoteHandle,
}

/// One process's view of the distributed name registry.
///
/// Holds the connection to the directory, this process's object server,
/// and the table of names it exported. Rank 0 additionally hosts the
/// [`DirectoryServer`]. Everything is torn down on drop; call
/// [`close`](Self::close) to do so in step with the other ranks.
pub struct Registry {
    rank: Rank,
    timeout: Duration,
    client: DirectoryClient,
    objects: ObjectServer,
    directory_addr: SocketAddr,
    exports: IndexMap<String, Export>,
    /// Object identity (data pointer) → exported name.
    names_by_object: HashMap<usize, String>,
    migrated: Vec<String>,
    // Declared last so the directory outlives this process's client.
    directory: Option<DirectoryServer>,
}

impl Registry {
    /// Collective startup over `comm`.
    ///
    /// Rank 0 starts the directory and broadcasts its address; every
    /// rank connects to it, starts its object server, and waits at a
    /// barrier so no rank registers before all are connected.
    pub fn bootstrap(
        comm: &mut dyn Communicator,
        config: &RegistryConfig,
    ) -> Result<Self, RegistryError> {
        let timeout = config.timeout();
        let directory = if comm.rank().is_root() {
            Some(DirectoryServer::start(config.directory_addr.as_str())?)
        } else {
            None
        };
        let announced = directory
            .as_ref()
            .map(|d| advertised(d.local_addr()).to_string().into_bytes())
            .unwrap_or_default();
        let payload = comm.broadcast(Rank::ROOT, announced, timeout)?;
        let text = String::from_utf8(payload).map_err(|e| RegistryError::Address {
            addr: String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })?;
        let directory_addr: SocketAddr = text
            .parse()
            .map_err(|_| RegistryError::Address { addr: text.clone() })?;

        let mut registry = Self::connect(comm.rank(), directory_addr, config)?;
        registry.directory = directory;
        comm.barrier(timeout)?;
        info!(
            rank = %registry.rank,
            directory = %directory_addr,
            objects = %registry.objects.local_addr(),
            "registry ready"
        );
        Ok(registry)
    }

    /// Join an already running directory at `directory_addr` without any
    /// collective step.
    pub fn connect(
        rank: Rank,
        directory_addr: SocketAddr,
        config: &RegistryConfig,
    ) -> Result<Self, RegistryError> {
        let timeout = config.timeout();
        let client = DirectoryClient::connect(directory_addr, timeout)?;
        let objects = ObjectServer::start(config.object_addr.as_str())?;
        Ok(Self {
            rank,
            timeout,
            client,
            objects,
            directory_addr,
            exports: IndexMap::new(),
            names_by_object: HashMap::new(),
            migrated: Vec::new(),
            directory: None,
        })
    }

    /// Rank of the owning process.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Address of the directory this registry talks to.
    pub fn directory_addr(&self) -> SocketAddr {
        self.directory_addr
    }

    /// Address remote callers use to reach this process's objects.
    pub fn object_addr(&self) -> SocketAddr {
        advertised(self.objects.local_addr())
    }

    /// Whether this process hosts the directory.
    pub fn hosts_directory(&self) -> bool {
        self.directory.is_some()
    }

    /// Bound on directory requests and remote calls.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Export `object` and bind it under `name`.
    ///
    /// Returns `Ok(false)` without side effects when this process already
    /// exports `name` or `object`, or when another process holds the
    /// name.
    pub fn register(&mut self, name: &str, object: Arc<dyn Remote>) -> Result<bool, RegistryError> {
        let key = object_key(object.as_ref());
        if self.exports.contains_key(name) || self.names_by_object.contains_key(&key) {
            debug!(name, "already exported locally");
            return Ok(false);
        }
        let object_id = self.objects.export(Arc::clone(&object));
        let handle = RemoteHandle {
            name: name.to_owned(),
            owner: self.rank,
            endpoint: self.object_addr(),
            object_id,
        };
        match self.client.bind(&handle) {
            Ok(true) => {}
            Ok(false) => {
                self.objects.unexport(object_id);
                warn!(name, rank = %self.rank, "name already bound elsewhere");
                return Ok(false);
            }
            Err(e) => {
                self.objects.unexport(object_id);
                return Err(e);
            }
        }
        debug!(%handle, "registered");
        self.names_by_object.insert(key, name.to_owned());
        self.exports.insert(name.to_owned(), Export { object, handle });
        Ok(true)
    }

    /// Resolve `name` through the directory.
    ///
    /// Names exported by this process resolve from the local table
    /// without a round trip.
    pub fn lookup(&mut self, name: &str) -> Result<RemoteHandle, RegistryError> {
        if let Some(export) = self.exports.get(name) {
            return Ok(export.handle.clone());
        }
        let handle = self.client.lookup(name)?;
        debug!(%handle, "resolved");
        Ok(handle)
    }

    /// Local object exported under `name`, if this process owns it.
    pub fn local_object(&self, name: &str) -> Option<&Arc<dyn Remote>> {
        self.exports.get(name).map(|e| &e.object)
    }

    /// Unbind and unexport `name`. Returns `Ok(false)` if this process
    /// does not export it.
    pub fn unregister(&mut self, name: &str) -> Result<bool, RegistryError> {
        if !self.exports.contains_key(name) {
            return Ok(false);
        }
        if !self.client.unbind(name, self.rank)? {
            warn!(name, rank = %self.rank, "exported name was not bound to this rank");
        }
        self.retire(name);
        debug!(name, "unregistered");
        Ok(true)
    }

    /// Record that `object` left this process. Returns its exported name,
    /// or `None` if it is not exported here.
    ///
    /// The name stays bound until [`withdraw_migrated`](Self::withdraw_migrated).
    pub fn mark_migrated(&mut self, object: &dyn Remote) -> Option<String> {
        let name = self.names_by_object.get(&object_key(object))?.clone();
        if !self.migrated.contains(&name) {
            self.migrated.push(name.clone());
        }
        Some(name)
    }

    /// Names marked as migrated since the last
    /// [`clear_migrated_names`](Self::clear_migrated_names), in marking
    /// order.
    pub fn migrated_names(&self) -> &[String] {
        &self.migrated
    }

    /// Unbind and unexport every migrated name so its new owner can
    /// register it. Returns the withdrawn objects; names already
    /// withdrawn are skipped.
    pub fn withdraw_migrated(&mut self) -> Result<Vec<(String, Arc<dyn Remote>)>, RegistryError> {
        let mut withdrawn = Vec::new();
        let names = self.migrated.clone();
        for name in &names {
            if !self.exports.contains_key(name) {
                continue;
            }
            // Local state goes only once the directory has let go of the
            // name, so a failed unbind can be retried.
            if !self.client.unbind(name, self.rank)? {
                warn!(name = %name, rank = %self.rank, "migrated name was not bound to this rank");
            }
            if let Some(object) = self.retire(name) {
                withdrawn.push((name.clone(), object));
            }
        }
        if !withdrawn.is_empty() {
            debug!(count = withdrawn.len(), rank = %self.rank, "withdrew migrated names");
        }
        Ok(withdrawn)
    }

    /// Forget the migrated-names list. Called once per tick.
    pub fn clear_migrated_names(&mut self) {
        self.migrated.clear();
    }

    /// Whether `object` is exported by this process.
    pub fn is_exported(&self, object: &dyn Remote) -> bool {
        self.names_by_object.contains_key(&object_key(object))
    }

    /// Name `object` is exported under on this process.
    pub fn local_exported_name(&self, object: &dyn Remote) -> Option<&str> {
        self.names_by_object
            .get(&object_key(object))
            .map(String::as_str)
    }

    /// Names exported by this process, in registration order.
    pub fn exported_names(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    /// Every name bound in the directory, across all processes.
    pub fn directory_names(&mut self) -> Result<Vec<String>, RegistryError> {
        self.client.names()
    }

    /// Wait for every rank, then tear down. Rank 0 stops the directory
    /// only after all ranks are done with it.
    pub fn close(self, comm: &mut dyn Communicator) -> Result<(), RegistryError> {
        comm.barrier(self.timeout)?;
        drop(self);
        Ok(())
    }

    /// Drop the local export of `name` after its directory entry is gone.
    fn retire(&mut self, name: &str) -> Option<Arc<dyn Remote>> {
        let export = self.exports.shift_remove(name)?;
        self.names_by_object
            .remove(&object_key(export.object.as_ref()));
        self.objects.unexport(export.handle.object_id);
        Some(export.object)
    }
}

/// Identity of an exported object: the address of its data.
fn object_key(object: &dyn Remote) -> usize {
    object as *const dyn Remote as *const () as usize
}

/// Address peers can reach: an unspecified host becomes loopback.
fn advertised(addr: SocketAddr) -> SocketAddr {
    if addr.ip().is_unspecified() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
    } else {
        addr
    }
}

// Compile-time assertion: a registry moves with its process's worker.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<Registry>();
};

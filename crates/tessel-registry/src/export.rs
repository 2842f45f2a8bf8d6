//! Per-process server for exported objects.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::trace;

use crate::error::RegistryError;
use crate::handle::Remote;
use crate::protocol::{Request, Response};
use crate::server::FrameServer;

type Objects = Arc<RwLock<IndexMap<u64, Arc<dyn Remote>>>>;

/// Dispatches [`Request::Invoke`] frames to locally exported objects.
///
/// Invocations on one object may run concurrently from different
/// connections; implementations synchronise their own state.
pub struct ObjectServer {
    objects: Objects,
    next_id: AtomicU64,
    server: FrameServer,
}

impl ObjectServer {
    /// Start serving on `addr` (use port 0 for an ephemeral port).
    pub fn start(addr: impl ToSocketAddrs) -> Result<Self, RegistryError> {
        let objects: Objects = Arc::default();
        let table = Arc::clone(&objects);
        let server = FrameServer::start(
            addr,
            "objects",
            Arc::new(move |request| dispatch(&table, request)),
        )?;
        Ok(Self {
            objects,
            next_id: AtomicU64::new(1),
            server,
        })
    }

    /// Address remote callers connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Make `object` callable and return its identifier.
    pub fn export(&self, object: Arc<dyn Remote>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, object);
        id
    }

    /// Stop serving object `id`. Returns the object if it was exported.
    pub fn unexport(&self, id: u64) -> Option<Arc<dyn Remote>> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(&id)
    }

    /// Number of exported objects.
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is exported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Caller connections still being served. Each [`RemoteHandle::invoke`]
    /// opens one and closes it when the reply arrives.
    ///
    /// [`RemoteHandle::invoke`]: crate::RemoteHandle::invoke
    pub fn open_connections(&self) -> usize {
        self.server.open_connections()
    }
}

fn dispatch(objects: &RwLock<IndexMap<u64, Arc<dyn Remote>>>, request: Request) -> Response {
    let (object_id, method, args) = match request {
        Request::Invoke {
            object_id,
            method,
            args,
        } => (object_id, method, args),
        other => {
            return Response::Failed {
                reason: format!("object server cannot answer {} requests", other.kind()),
            }
        }
    };
    // Clone out of the lock so a long call does not block exports.
    let object = objects
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&object_id)
        .cloned();
    let Some(object) = object else {
        return Response::NotFound;
    };
    trace!(object_id, %method, "dispatch");
    match object.invoke(&method, &args) {
        Ok(bytes) => Response::Returned(bytes),
        Err(e) => Response::Failed {
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::handle::RemoteHandle;
    use std::sync::atomic::AtomicI64;
    use std::time::{Duration, Instant};
    use tessel_core::Rank;

    const WAIT: Duration = Duration::from_secs(5);

    struct Counter(AtomicI64);

    impl Remote for Counter {
        fn invoke(&self, method: &str, args: &[u8]) -> Result<Vec<u8>, RemoteError> {
            match method {
                "add" => {
                    let bytes: [u8; 8] =
                        args.try_into().map_err(|_| RemoteError::BadArguments {
                            reason: format!("expected 8 bytes, got {}", args.len()),
                        })?;
                    let v = self.0.fetch_add(i64::from_le_bytes(bytes), Ordering::SeqCst);
                    Ok((v + i64::from_le_bytes(bytes)).to_le_bytes().to_vec())
                }
                _ => Err(RemoteError::UnknownMethod {
                    method: method.into(),
                }),
            }
        }
    }

    fn handle_for(server: &ObjectServer, id: u64) -> RemoteHandle {
        RemoteHandle {
            name: "counter".into(),
            owner: Rank(0),
            endpoint: server.local_addr(),
            object_id: id,
        }
    }

    #[test]
    fn invoke_reaches_exported_object() {
        let server = ObjectServer::start("127.0.0.1:0").unwrap();
        let id = server.export(Arc::new(Counter(AtomicI64::new(10))));
        let h = handle_for(&server, id);
        let out = h.invoke("add", &5i64.to_le_bytes(), WAIT).unwrap();
        assert_eq!(out, 15i64.to_le_bytes());
        let out = h.invoke("add", &(-3i64).to_le_bytes(), WAIT).unwrap();
        assert_eq!(out, 12i64.to_le_bytes());
    }

    #[test]
    fn object_errors_travel_back() {
        let server = ObjectServer::start("127.0.0.1:0").unwrap();
        let h = handle_for(&server, server.export(Arc::new(Counter(AtomicI64::new(0)))));
        match h.invoke("mul", &[], WAIT) {
            Err(RegistryError::Remote { name, reason }) => {
                assert_eq!(name, "counter");
                assert!(reason.contains("mul"));
            }
            other => panic!("expected remote failure, got {other:?}"),
        }
        assert!(matches!(
            h.invoke("add", &[1, 2], WAIT),
            Err(RegistryError::Remote { .. })
        ));
    }

    #[test]
    fn finished_calls_release_their_connections() {
        let server = ObjectServer::start("127.0.0.1:0").unwrap();
        let h = handle_for(&server, server.export(Arc::new(Counter(AtomicI64::new(0)))));
        for _ in 0..64 {
            h.invoke("add", &1i64.to_le_bytes(), WAIT).unwrap();
        }
        let deadline = Instant::now() + WAIT;
        while server.open_connections() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(server.open_connections(), 0);
        let out = h.invoke("add", &0i64.to_le_bytes(), WAIT).unwrap();
        assert_eq!(out, 64i64.to_le_bytes());
    }

    #[test]
    fn unexported_object_is_gone() {
        let server = ObjectServer::start("127.0.0.1:0").unwrap();
        let id = server.export(Arc::new(Counter(AtomicI64::new(0))));
        assert!(server.unexport(id).is_some());
        assert!(server.is_empty());
        assert!(matches!(
            handle_for(&server, id).invoke("add", &0i64.to_le_bytes(), WAIT),
            Err(RegistryError::UnexpectedResponse {
                response: "not-found",
                ..
            })
        ));
    }
}

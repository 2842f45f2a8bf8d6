//! Request and response messages of the directory and object servers.
//!
//! Each message body is `[VERSION u8] [tag u8] [fields...]`. Decoding
//! rejects unknown tags, other versions, and trailing bytes.

use std::io::{Read, Write};

use tessel_core::Rank;

use crate::codec::{
    read_length_prefixed_bytes, read_length_prefixed_str, read_u32_le, read_u64_le, read_u8,
    write_length_prefixed_bytes, write_length_prefixed_str, write_u32_le, write_u64_le, write_u8,
};
use crate::error::RegistryError;
use crate::handle::RemoteHandle;
use crate::FORMAT_VERSION;

const REQ_BIND: u8 = 1;
const REQ_LOOKUP: u8 = 2;
const REQ_UNBIND: u8 = 3;
const REQ_LIST: u8 = 4;
const REQ_INVOKE: u8 = 5;

const RESP_BOUND: u8 = 1;
const RESP_ALREADY_BOUND: u8 = 2;
const RESP_FOUND: u8 = 3;
const RESP_NOT_FOUND: u8 = 4;
const RESP_UNBOUND: u8 = 5;
const RESP_NOT_OWNER: u8 = 6;
const RESP_NAMES: u8 = 7;
const RESP_RETURNED: u8 = 8;
const RESP_FAILED: u8 = 9;

/// A request to a directory or object server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Bind `handle.name` to `handle` unless already bound.
    Bind {
        /// The handle to publish.
        handle: RemoteHandle,
    },
    /// Resolve a name.
    Lookup {
        /// The name to resolve.
        name: String,
    },
    /// Remove a binding held by `owner`.
    Unbind {
        /// The name to remove.
        name: String,
        /// Rank asking for the removal.
        owner: Rank,
    },
    /// List every bound name.
    List,
    /// Call a method on an exported object.
    Invoke {
        /// Object identifier within the target server.
        object_id: u64,
        /// Method name.
        method: String,
        /// Encoded arguments.
        args: Vec<u8>,
    },
}

/// A server's reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// The binding was created.
    Bound,
    /// The name was already bound; the existing binding is kept.
    AlreadyBound {
        /// Owner of the existing binding.
        owner: Rank,
    },
    /// The name resolved to this handle.
    Found(RemoteHandle),
    /// No binding (or no object) for the request.
    NotFound,
    /// The binding was removed.
    Unbound,
    /// The binding belongs to another rank and was kept.
    NotOwner {
        /// Owner of the binding.
        owner: Rank,
    },
    /// Every bound name, in binding order.
    Names(Vec<String>),
    /// An invocation's result.
    Returned(Vec<u8>),
    /// An invocation failed.
    Failed {
        /// What went wrong.
        reason: String,
    },
}

impl Request {
    /// Encode as a frame body.
    pub fn encode(&self) -> Result<Vec<u8>, RegistryError> {
        let mut buf = vec![FORMAT_VERSION];
        let w: &mut dyn Write = &mut buf;
        match self {
            Self::Bind { handle } => {
                write_u8(w, REQ_BIND)?;
                handle.write_to(w)?;
            }
            Self::Lookup { name } => {
                write_u8(w, REQ_LOOKUP)?;
                write_length_prefixed_str(w, name)?;
            }
            Self::Unbind { name, owner } => {
                write_u8(w, REQ_UNBIND)?;
                write_length_prefixed_str(w, name)?;
                write_u32_le(w, owner.0)?;
            }
            Self::List => write_u8(w, REQ_LIST)?,
            Self::Invoke {
                object_id,
                method,
                args,
            } => {
                write_u8(w, REQ_INVOKE)?;
                write_u64_le(w, *object_id)?;
                write_length_prefixed_str(w, method)?;
                write_length_prefixed_bytes(w, args)?;
            }
        }
        Ok(buf)
    }

    /// Decode a frame body.
    pub fn decode(body: &[u8]) -> Result<Self, RegistryError> {
        let mut r = body;
        let tag = read_header(&mut r)?;
        let request = match tag {
            REQ_BIND => Self::Bind {
                handle: RemoteHandle::read_from(&mut r)?,
            },
            REQ_LOOKUP => Self::Lookup {
                name: read_length_prefixed_str(&mut r)?,
            },
            REQ_UNBIND => Self::Unbind {
                name: read_length_prefixed_str(&mut r)?,
                owner: Rank(read_u32_le(&mut r)?),
            },
            REQ_LIST => Self::List,
            REQ_INVOKE => Self::Invoke {
                object_id: read_u64_le(&mut r)?,
                method: read_length_prefixed_str(&mut r)?,
                args: read_length_prefixed_bytes(&mut r)?,
            },
            other => {
                return Err(RegistryError::MalformedFrame {
                    detail: format!("unknown request tag {other}"),
                })
            }
        };
        finish(r)?;
        Ok(request)
    }

    /// Short name of the request kind, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bind { .. } => "bind",
            Self::Lookup { .. } => "lookup",
            Self::Unbind { .. } => "unbind",
            Self::List => "list",
            Self::Invoke { .. } => "invoke",
        }
    }
}

impl Response {
    /// Encode as a frame body.
    pub fn encode(&self) -> Result<Vec<u8>, RegistryError> {
        let mut buf = vec![FORMAT_VERSION];
        let w: &mut dyn Write = &mut buf;
        match self {
            Self::Bound => write_u8(w, RESP_BOUND)?,
            Self::AlreadyBound { owner } => {
                write_u8(w, RESP_ALREADY_BOUND)?;
                write_u32_le(w, owner.0)?;
            }
            Self::Found(handle) => {
                write_u8(w, RESP_FOUND)?;
                handle.write_to(w)?;
            }
            Self::NotFound => write_u8(w, RESP_NOT_FOUND)?,
            Self::Unbound => write_u8(w, RESP_UNBOUND)?,
            Self::NotOwner { owner } => {
                write_u8(w, RESP_NOT_OWNER)?;
                write_u32_le(w, owner.0)?;
            }
            Self::Names(names) => {
                write_u8(w, RESP_NAMES)?;
                write_u32_le(w, names.len() as u32)?;
                for name in names {
                    write_length_prefixed_str(w, name)?;
                }
            }
            Self::Returned(bytes) => {
                write_u8(w, RESP_RETURNED)?;
                write_length_prefixed_bytes(w, bytes)?;
            }
            Self::Failed { reason } => {
                write_u8(w, RESP_FAILED)?;
                write_length_prefixed_str(w, reason)?;
            }
        }
        Ok(buf)
    }

    /// Decode a frame body.
    pub fn decode(body: &[u8]) -> Result<Self, RegistryError> {
        let mut r = body;
        let tag = read_header(&mut r)?;
        let response = match tag {
            RESP_BOUND => Self::Bound,
            RESP_ALREADY_BOUND => Self::AlreadyBound {
                owner: Rank(read_u32_le(&mut r)?),
            },
            RESP_FOUND => Self::Found(RemoteHandle::read_from(&mut r)?),
            RESP_NOT_FOUND => Self::NotFound,
            RESP_UNBOUND => Self::Unbound,
            RESP_NOT_OWNER => Self::NotOwner {
                owner: Rank(read_u32_le(&mut r)?),
            },
            RESP_NAMES => {
                let count = read_u32_le(&mut r)? as usize;
                // Each name needs at least its 4-byte length prefix.
                if count > r.len() / 4 {
                    return Err(RegistryError::MalformedFrame {
                        detail: format!("name count {count} exceeds frame"),
                    });
                }
                let mut names = Vec::with_capacity(count);
                for _ in 0..count {
                    names.push(read_length_prefixed_str(&mut r)?);
                }
                Self::Names(names)
            }
            RESP_RETURNED => Self::Returned(read_length_prefixed_bytes(&mut r)?),
            RESP_FAILED => Self::Failed {
                reason: read_length_prefixed_str(&mut r)?,
            },
            other => {
                return Err(RegistryError::MalformedFrame {
                    detail: format!("unknown response tag {other}"),
                })
            }
        };
        finish(r)?;
        Ok(response)
    }

    /// Short name of the response kind, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bound => "bound",
            Self::AlreadyBound { .. } => "already-bound",
            Self::Found(_) => "found",
            Self::NotFound => "not-found",
            Self::Unbound => "unbound",
            Self::NotOwner { .. } => "not-owner",
            Self::Names(_) => "names",
            Self::Returned(_) => "returned",
            Self::Failed { .. } => "failed",
        }
    }
}

fn read_header(r: &mut dyn Read) -> Result<u8, RegistryError> {
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(RegistryError::UnsupportedVersion { found: version });
    }
    read_u8(r)
}

fn finish(rest: &[u8]) -> Result<(), RegistryError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::MalformedFrame {
            detail: format!("{} trailing bytes", rest.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn handle(name: &str) -> RemoteHandle {
        RemoteHandle {
            name: name.into(),
            owner: Rank(3),
            endpoint: "127.0.0.1:4100".parse().unwrap(),
            object_id: 42,
        }
    }

    #[test]
    fn bind_request_layout() {
        let body = Request::Lookup { name: "a".into() }.encode().unwrap();
        assert_eq!(body, vec![FORMAT_VERSION, REQ_LOOKUP, 1, 0, 0, 0, b'a']);
    }

    #[test]
    fn handle_survives_the_wire() {
        let body = Response::Found(handle("agent-7")).encode().unwrap();
        assert_eq!(
            Response::decode(&body).unwrap(),
            Response::Found(handle("agent-7"))
        );
    }

    #[test]
    fn wrong_version_rejected() {
        let mut body = Request::List.encode().unwrap();
        body[0] = 99;
        assert!(matches!(
            Request::decode(&body),
            Err(RegistryError::UnsupportedVersion { found: 99 })
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut body = Response::Unbound.encode().unwrap();
        body.push(0);
        assert!(matches!(
            Response::decode(&body),
            Err(RegistryError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(matches!(
            Request::decode(&[FORMAT_VERSION, 200]),
            Err(RegistryError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn bad_endpoint_rejected() {
        let mut body = vec![FORMAT_VERSION, RESP_FOUND];
        write_length_prefixed_str(&mut body, "x").unwrap();
        write_u32_le(&mut body, 0).unwrap();
        write_length_prefixed_str(&mut body, "not-an-addr").unwrap();
        write_u64_le(&mut body, 1).unwrap();
        assert!(matches!(
            Response::decode(&body),
            Err(RegistryError::Address { .. })
        ));
    }

    fn arb_request() -> impl Strategy<Value = Request> {
        prop_oneof![
            "[a-z0-9-]{0,12}".prop_map(|name| Request::Lookup { name }),
            ("[a-z]{1,8}", 0u32..64).prop_map(|(name, r)| Request::Unbind {
                name,
                owner: Rank(r)
            }),
            Just(Request::List),
            (any::<u64>(), "[a-z_]{1,10}", proptest::collection::vec(any::<u8>(), 0..32))
                .prop_map(|(object_id, method, args)| Request::Invoke {
                    object_id,
                    method,
                    args
                }),
            "[a-z]{1,8}".prop_map(|n| Request::Bind { handle: handle(&n) }),
        ]
    }

    proptest! {
        #[test]
        fn truncated_requests_never_decode(req in arb_request(), cut in 1usize..64) {
            let body = req.encode().unwrap();
            prop_assert_eq!(Request::decode(&body).unwrap(), req);
            let keep = body.len().saturating_sub(cut);
            prop_assert!(Request::decode(&body[..keep]).is_err());
        }
    }
}

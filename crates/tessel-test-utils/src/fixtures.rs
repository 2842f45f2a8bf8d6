//! Reusable remote-object fixtures.
//!
//! Three standard [`Remote`] implementations for registry and engine
//! tests:
//!
//! - [`EchoObject`] returns its arguments, tagged with its label.
//! - [`CounterObject`] keeps an `i64` total under `add` / `get`.
//! - [`FailingObject`] fails deterministically after N calls.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use tessel_registry::{Remote, RemoteError};

/// Answers `echo` with `label` followed by the arguments.
pub struct EchoObject {
    pub label: String,
}

impl EchoObject {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Remote for EchoObject {
    fn invoke(&self, method: &str, args: &[u8]) -> Result<Vec<u8>, RemoteError> {
        match method {
            "echo" => {
                let mut out = self.label.clone().into_bytes();
                out.extend_from_slice(args);
                Ok(out)
            }
            "label" => Ok(self.label.clone().into_bytes()),
            _ => Err(RemoteError::UnknownMethod {
                method: method.into(),
            }),
        }
    }
}

/// Running total. `add` takes an `i64` (little-endian) and returns the
/// new total; `get` returns the total.
#[derive(Default)]
pub struct CounterObject {
    total: AtomicI64,
}

impl CounterObject {
    pub fn new(start: i64) -> Self {
        Self {
            total: AtomicI64::new(start),
        }
    }

    /// Current total, read locally.
    pub fn total(&self) -> i64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Encode an `add` argument.
    pub fn add_args(delta: i64) -> Vec<u8> {
        delta.to_le_bytes().to_vec()
    }

    /// Decode an `add` or `get` result.
    pub fn decode(bytes: &[u8]) -> Option<i64> {
        bytes.try_into().ok().map(i64::from_le_bytes)
    }
}

impl Remote for CounterObject {
    fn invoke(&self, method: &str, args: &[u8]) -> Result<Vec<u8>, RemoteError> {
        match method {
            "add" => {
                let delta = Self::decode(args).ok_or_else(|| RemoteError::BadArguments {
                    reason: format!("expected 8 bytes, got {}", args.len()),
                })?;
                let total = self.total.fetch_add(delta, Ordering::SeqCst) + delta;
                Ok(total.to_le_bytes().to_vec())
            }
            "get" => Ok(self.total().to_le_bytes().to_vec()),
            _ => Err(RemoteError::UnknownMethod {
                method: method.into(),
            }),
        }
    }
}

/// Succeeds `succeed_count` times, then fails every call.
///
/// Uses `AtomicUsize` for the call counter so it satisfies `Sync`.
pub struct FailingObject {
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingObject {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `invoke()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Remote for FailingObject {
    fn invoke(&self, _method: &str, _args: &[u8]) -> Result<Vec<u8>, RemoteError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(RemoteError::Failed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        Ok((n as u64).to_le_bytes().to_vec())
    }
}

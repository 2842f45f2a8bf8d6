//! Binary encode/decode primitives and length-prefixed framing.
//!
//! All integers are little-endian. Strings and byte arrays are
//! length-prefixed with a `u32`. A frame is a `u32` body length followed
//! by the body; bodies larger than [`MAX_FRAME_BYTES`] are rejected
//! before any allocation.

use std::io::{ErrorKind, Read, Write};

use crate::error::RegistryError;
use crate::MAX_FRAME_BYTES;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), RegistryError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), RegistryError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), RegistryError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), RegistryError> {
    write_length_prefixed_bytes(w, s.as_bytes())
}

/// Write a length-prefixed byte array (u32 length + bytes).
pub fn write_length_prefixed_bytes(w: &mut dyn Write, b: &[u8]) -> Result<(), RegistryError> {
    let len = u32::try_from(b.len()).map_err(|_| RegistryError::MalformedFrame {
        detail: format!("field of {} bytes exceeds u32 length prefix", b.len()),
    })?;
    write_u32_le(w, len)?;
    w.write_all(b)?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, RegistryError> {
    let mut buf = [0u8; 1];
    read_exact(r, &mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, RegistryError> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, RegistryError> {
    let mut buf = [0u8; 8];
    read_exact(r, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, RegistryError> {
    let buf = read_length_prefixed_bytes(r)?;
    String::from_utf8(buf).map_err(|e| RegistryError::MalformedFrame {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

/// Read a length-prefixed byte array.
pub fn read_length_prefixed_bytes(r: &mut dyn Read) -> Result<Vec<u8>, RegistryError> {
    let len = read_u32_le(r)? as usize;
    if len > MAX_FRAME_BYTES {
        return Err(RegistryError::MalformedFrame {
            detail: format!("field length {len} exceeds frame limit"),
        });
    }
    let mut buf = vec![0u8; len];
    read_exact(r, &mut buf)?;
    Ok(buf)
}

/// `read_exact` with end-of-input reported as a malformed frame.
fn read_exact(r: &mut dyn Read, buf: &mut [u8]) -> Result<(), RegistryError> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => RegistryError::MalformedFrame {
            detail: format!("truncated field: needed {} bytes", buf.len()),
        },
        _ => io_error(e),
    })
}

/// Classify an I/O error, folding socket read timeouts into
/// [`RegistryError::Timeout`] with an unknown wait.
pub(crate) fn io_error(e: std::io::Error) -> RegistryError {
    match e.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => RegistryError::Timeout {
            waited: std::time::Duration::ZERO,
        },
        _ => RegistryError::Io(e),
    }
}

// ── Framing ─────────────────────────────────────────────────────

/// Write one frame: `u32` body length, then the body.
pub fn write_frame(w: &mut dyn Write, body: &[u8]) -> Result<(), RegistryError> {
    if body.len() > MAX_FRAME_BYTES {
        return Err(RegistryError::MalformedFrame {
            detail: format!("frame body of {} bytes exceeds limit", body.len()),
        });
    }
    write_length_prefixed_bytes(w, body)?;
    w.flush()?;
    Ok(())
}

/// Read one frame body.
///
/// Returns `Ok(None)` on clean EOF (the peer closed between frames),
/// `Ok(Some(body))` on success, or an error on truncated data.
pub fn read_frame(r: &mut dyn Read) -> Result<Option<Vec<u8>>, RegistryError> {
    // Read the length byte-by-byte to distinguish clean EOF (zero bytes
    // available) from truncation (1-3 bytes before EOF).
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        match r.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(RegistryError::MalformedFrame {
                    detail: format!("truncated frame header: got {filled} of 4 bytes"),
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(e)),
        }
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(RegistryError::MalformedFrame {
            detail: format!("frame length {len} exceeds limit of {MAX_FRAME_BYTES}"),
        });
    }
    let mut body = vec![0u8; len];
    read_exact(r, &mut body)?;
    Ok(Some(body))
}

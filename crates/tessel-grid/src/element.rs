//! Fixed-width little-endian cell element encoding.

use std::fmt;

/// A value that can live in a grid cell and travel in a packed buffer.
///
/// Every element has a fixed encoded width; packed buffers are plain
/// concatenations of little-endian elements with no framing.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Encoded width in bytes.
    const BYTES: usize;

    /// Append the little-endian encoding to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from the first [`BYTES`](Self::BYTES) bytes of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than `BYTES`. Callers check buffer
    /// lengths against the descriptor before decoding.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const BYTES: usize = std::mem::size_of::<$t>();

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(&bytes[..Self::BYTES]);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_element!(u8, i32, u32, i64, u64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings_are_little_endian() {
        let mut out = Vec::new();
        0x0102_0304u32.write_le(&mut out);
        assert_eq!(out, [4, 3, 2, 1]);
        assert_eq!(u32::read_le(&out), 0x0102_0304);

        out.clear();
        (-1.5f64).write_le(&mut out);
        assert_eq!(out.len(), f64::BYTES);
        assert_eq!(f64::read_le(&out), -1.5);
    }
}

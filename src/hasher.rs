//! Content hashing utilities.
//!
//! Downloads are verified against a SHA-256 digest written in the manifest.
//! [`DigestWriter`] hashes bytes as they are streamed to disk so large
//! archives are never buffered in memory.
//!
//! # Examples
//!
//! ```
//! use std::io::Write;
//! use kumade::hasher::DigestWriter;
//!
//! let mut writer = DigestWriter::new(Vec::new());
//! writer.write_all(b"abc").expect("write");
//! let (bytes, digest) = writer.finish();
//! assert_eq!(bytes, b"abc");
//! assert_eq!(
//!     digest,
//!     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
//! );
//! ```

use std::io::{self, Write};

use sha2::{Digest, Sha256};

/// Render bytes as lower-case hexadecimal.
#[must_use]
pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        for nibble in [byte >> 4, byte & 0x0f] {
            if let Some(digit) = char::from_digit(u32::from(nibble), 16) {
                out.push(digit);
            }
        }
    }
    out
}

/// Compute the SHA-256 digest of `data` as lower-case hex.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex_string(&Sha256::digest(data))
}

/// Compare a computed digest against an expected one, ignoring case and
/// surrounding whitespace.
#[must_use]
pub fn digest_matches(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// Writer adaptor that hashes and counts everything passing through it.
#[derive(Debug)]
pub struct DigestWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> DigestWriter<W> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Return the inner writer and the hex digest of all written bytes.
    #[must_use]
    pub fn finish(self) -> (W, String) {
        (self.inner, hex_string(&self.hasher.finalize()))
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let count = self.inner.write(buf)?;
        if let Some(accepted) = buf.get(..count) {
            self.hasher.update(accepted);
        }
        self.written = self
            .written
            .saturating_add(u64::try_from(count).unwrap_or(u64::MAX));
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

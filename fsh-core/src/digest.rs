use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::plan::SamplePlan;

/// Digest width in bytes; rendered as 48 uppercase hex characters.
pub const DIGEST_LEN: usize = 24;

const HEX_LEN: usize = DIGEST_LEN * 2;

/// A 24-byte sampled-content fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Parse 48 hex characters (case-insensitive). `None` on any other input.
    pub fn parse_hex(s: &str) -> Option<Self> {
        if s.len() != HEX_LEN || !s.is_ascii() {
            return None;
        }
        let mut out = [0u8; DIGEST_LEN];
        for (i, pair) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(pair).ok()?;
            out[i] = u8::from_str_radix(pair, 16).ok()?;
        }
        Some(Digest(out))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::with_capacity(HEX_LEN);
        for b in self.0 {
            let _ = write!(s, "{b:02X}");
        }
        f.write_str(&s)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Hash the planned sample of `path` into a 24-byte digest.
///
/// Fold order is fixed and order-dependent: first block, interior blocks in
/// index order, last block, then the 8-byte big-endian file size. Interior
/// and last blocks are read only when the plan spans distinct blocks; a
/// shorter file is covered entirely by the first read. Short reads at EOF
/// truncate the fold input and are not errors.
pub fn digest_file(path: &Path, plan: &SamplePlan) -> Result<Digest> {
    let mut f = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; plan.block_size as usize];

    let n = read_up_to(&mut f, &mut buf).map_err(|e| Error::io(path, e))?;
    hasher.update(&buf[..n]);

    if plan.spans_distinct_blocks() {
        for i in 0..plan.interior_count {
            f.seek(SeekFrom::Start(plan.interior_offset(i))).map_err(|e| Error::io(path, e))?;
            let n = read_up_to(&mut f, &mut buf).map_err(|e| Error::io(path, e))?;
            hasher.update(&buf[..n]);
        }

        // Last block: from block_size before EOF, read to the end. Shorter
        // than block_size only when the whole file is.
        let last_start = plan.file_size.saturating_sub(plan.block_size);
        f.seek(SeekFrom::Start(last_start)).map_err(|e| Error::io(path, e))?;
        let mut tail = Vec::with_capacity(plan.block_size as usize);
        f.read_to_end(&mut tail).map_err(|e| Error::io(path, e))?;
        hasher.update(&tail);
    }

    hasher.update(&plan.file_size.to_be_bytes());

    let mut out = [0u8; DIGEST_LEN];
    hasher.finalize_xof().fill(&mut out);
    Ok(Digest(out))
}

/// Fill as much of `buf` as the stream has left. EOF short-fills, any other
/// read failure propagates.
fn read_up_to(f: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = f.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::digest::Digest;
use crate::error::{Error, Result};

/// Format version token; the first non-empty line of every manifest.
/// Future revisions increment the trailing integer.
pub const MAGIC: &str = "FSH24-1";

/// One persisted record: `digest|block_count|size|path`. Immutable once
/// created; re-verification produces a transient result, not a mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub digest: Digest,
    /// Total blocks sampled, including the mandatory first and last.
    pub block_count: u32,
    /// File size in bytes at hashing time.
    pub size: u64,
    /// Caller-supplied path, stored verbatim. Paths containing `|` are out
    /// of contract.
    pub path: String,
}

/// Ordered entry list; insertion order is preserved through encode/decode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

/// A decoded manifest plus the malformed body lines that were skipped
/// (each a recoverable `Error::LineParse`).
#[derive(Debug, Default)]
pub struct DecodeOutcome {
    pub manifest: Manifest,
    pub skipped: Vec<Error>,
}

impl Manifest {
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push_str(MAGIC);
        out.push('\n');
        for e in &self.entries {
            let _ = writeln!(out, "{}|{}|{}|{}", e.digest, e.block_count, e.size, e.path);
        }
        out
    }

    /// Decode manifest text. A missing or unrecognized header is fatal
    /// (`Error::Format`); a malformed body line is skipped and recorded.
    pub fn decode(text: &str) -> Result<DecodeOutcome> {
        let mut lines = text.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, l)) if l.trim().is_empty() => continue,
                Some((_, l)) => break l.trim_end(),
                None => return Err(Error::Format("missing FSH24 header".to_string())),
            }
        };
        if header != MAGIC {
            if header.starts_with("FSH24-") {
                return Err(Error::Format(format!(
                    "unsupported manifest version {header:?} (expected {MAGIC})"
                )));
            }
            return Err(Error::Format(format!("not an FSH24 manifest (header {header:?})")));
        }

        let mut manifest = Manifest::default();
        let mut skipped = Vec::new();
        for (idx, raw) in lines {
            let line = raw.trim_end();
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(entry) => manifest.entries.push(entry),
                Err(reason) => skipped.push(Error::LineParse { line: idx + 1, reason }),
            }
        }
        Ok(DecodeOutcome { manifest, skipped })
    }

    pub fn load(path: &Path) -> Result<DecodeOutcome> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::decode(&text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.encode()).map_err(|e| Error::io(path, e))
    }
}

fn parse_line(line: &str) -> std::result::Result<ManifestEntry, String> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() != 4 {
        return Err(format!("expected 4 pipe-delimited fields, got {}", fields.len()));
    }
    let digest =
        Digest::parse_hex(fields[0]).ok_or_else(|| format!("bad digest {:?}", fields[0]))?;
    let block_count: u32 =
        fields[1].parse().map_err(|_| format!("bad block count {:?}", fields[1]))?;
    let size: u64 = fields[2].parse().map_err(|_| format!("bad file size {:?}", fields[2]))?;
    Ok(ManifestEntry { digest, block_count, size, path: fields[3].to_string() })
}

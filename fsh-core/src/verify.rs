//! Re-derive sampled digests against a manifest and classify each entry.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use crate::digest::{digest_file, Digest};
use crate::hash::duration_secs;
use crate::manifest::{Manifest, ManifestEntry};
use crate::plan::{SamplePlan, SampleParams};
use crate::progress::{FileOutcome, Report};

/// Per-entry classification, evaluated existence -> size -> content. A file
/// is only hashed once its current size matches the declared one; the plan
/// is rebuilt from the entry's recorded block count. `ReadFailed` covers a
/// present, size-matching file whose read fails mid-hash (the per-file I/O
/// failure the batch must record rather than propagate).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerifyStatus {
    Verified,
    Missing,
    SizeMismatch { actual: u64 },
    HashMismatch { actual: Digest },
    ReadFailed { error: String },
}

impl VerifyStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerifyStatus::Verified)
    }
}

/// Transient outcome for one manifest entry; never written back.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyResult {
    pub path: String,
    pub expected_digest: Digest,
    pub expected_size: u64,
    pub actual_size: Option<u64>,
    #[serde(flatten)]
    pub status: VerifyStatus,
    /// `block_count * block_size` when a digest was actually computed, else 0.
    pub hashed_bytes: u64,
    #[serde(rename = "processing_time", serialize_with = "duration_secs")]
    pub elapsed: Duration,
}

/// Aggregate counts and byte totals across a verify run. Derived, never
/// persisted.
#[derive(Clone, Debug, Serialize)]
pub struct VerifySummary {
    pub verified: usize,
    pub failed: usize,
    pub total: usize,
    pub success: bool,
    /// Current sizes summed over entries whose path exists.
    pub total_size: u64,
    /// Planned bytes summed over files that were actually hashed.
    pub total_hashed_size: u64,
    #[serde(rename = "total_time", serialize_with = "duration_secs")]
    pub elapsed: Duration,
}

impl VerifySummary {
    /// Hashed bytes as a fraction of present bytes.
    pub fn hashed_fraction(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        self.total_hashed_size as f64 / self.total_size as f64
    }
}

#[derive(Debug)]
pub struct VerifyOutcome {
    pub summary: VerifySummary,
    pub results: Vec<VerifyResult>,
}

/// Verify every manifest entry, in manifest order. Parallel across files;
/// results land at their entry's position regardless of completion order.
pub fn verify(manifest: &Manifest, params: &SampleParams, report: &dyn Report) -> VerifyOutcome {
    let start = Instant::now();
    let results: Vec<VerifyResult> = manifest
        .entries
        .par_iter()
        .map(|entry| {
            let path = Path::new(&entry.path);
            report.started(path);
            let result = check_entry(entry, params);
            report.finished(path, &FileOutcome::Checked(&result));
            result
        })
        .collect();

    let mut verified = 0;
    let mut total_size = 0u64;
    let mut total_hashed_size = 0u64;
    for r in &results {
        if r.status.is_verified() {
            verified += 1;
        }
        if let Some(size) = r.actual_size {
            total_size += size;
        }
        total_hashed_size += r.hashed_bytes;
    }
    let total = results.len();
    let failed = total - verified;

    VerifyOutcome {
        summary: VerifySummary {
            verified,
            failed,
            total,
            success: failed == 0,
            total_size,
            total_hashed_size,
            elapsed: start.elapsed(),
        },
        results,
    }
}

fn check_entry(entry: &ManifestEntry, params: &SampleParams) -> VerifyResult {
    let path = Path::new(&entry.path);
    let start = Instant::now();

    let mut result = VerifyResult {
        path: entry.path.clone(),
        expected_digest: entry.digest,
        expected_size: entry.size,
        actual_size: None,
        status: VerifyStatus::Missing,
        hashed_bytes: 0,
        elapsed: Duration::ZERO,
    };

    let Ok(meta) = fs::metadata(path) else {
        result.elapsed = start.elapsed();
        return result;
    };
    let actual = meta.len();
    result.actual_size = Some(actual);

    if actual != entry.size {
        result.status = VerifyStatus::SizeMismatch { actual };
        result.elapsed = start.elapsed();
        return result;
    }

    // Size already matched, so the declared block count reconstructs the
    // exact plan the entry was hashed under.
    let sample = SamplePlan::with_block_count(actual, entry.block_count, params.block_size);
    match digest_file(path, &sample) {
        Ok(d) if d == entry.digest => {
            result.status = VerifyStatus::Verified;
            result.hashed_bytes = sample.hashed_bytes();
        }
        Ok(d) => {
            result.status = VerifyStatus::HashMismatch { actual: d };
            result.hashed_bytes = sample.hashed_bytes();
        }
        Err(e) => {
            result.status = VerifyStatus::ReadFailed { error: e.to_string() };
        }
    }
    result.elapsed = start.elapsed();
    result
}

//! Batch hashing: per-file sampled digests and manifest assembly.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Serialize, Serializer};

use crate::digest::{digest_file, Digest};
use crate::error::{Error, Result};
use crate::manifest::{Manifest, ManifestEntry};
use crate::plan::{plan, SampleParams};
use crate::progress::{FileOutcome, Report};

/// Everything measured while hashing one file.
#[derive(Clone, Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub size: u64,
    pub digest: Digest,
    pub block_count: u32,
    pub hashed_bytes: u64,
    pub coverage: f64,
    #[serde(rename = "processing_time", serialize_with = "duration_secs")]
    pub elapsed: Duration,
}

impl FileReport {
    pub fn to_entry(&self) -> ManifestEntry {
        ManifestEntry {
            digest: self.digest,
            block_count: self.block_count,
            size: self.size,
            path: self.path.to_string_lossy().into_owned(),
        }
    }
}

/// Hash one file under `params`. Size is taken from metadata, the plan from
/// the planner, the digest from the engine.
pub fn hash_file(path: &Path, params: &SampleParams) -> Result<FileReport> {
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(Error::io(path, e)),
    };
    let size = meta.len();
    let sample = plan(size, params);
    let start = Instant::now();
    let digest = digest_file(path, &sample)?;
    Ok(FileReport {
        path: path.to_path_buf(),
        size,
        digest,
        block_count: sample.total_blocks(),
        hashed_bytes: sample.hashed_bytes(),
        coverage: sample.coverage(),
        elapsed: start.elapsed(),
    })
}

/// Reports in input order plus the files that failed, recorded rather than
/// propagated.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub reports: Vec<FileReport>,
    pub failures: Vec<(PathBuf, Error)>,
}

impl BatchOutcome {
    pub fn manifest(&self) -> Manifest {
        Manifest { entries: self.reports.iter().map(FileReport::to_entry).collect() }
    }

    pub fn total_size(&self) -> u64 {
        self.reports.iter().map(|r| r.size).sum()
    }

    pub fn total_hashed_bytes(&self) -> u64 {
        self.reports.iter().map(|r| r.hashed_bytes).sum()
    }
}

/// Hash many files, in parallel across files (never within one). Results
/// come back in input order regardless of completion order; one failing
/// file is recorded and the rest proceed.
pub fn hash_files(paths: &[PathBuf], params: &SampleParams, report: &dyn Report) -> BatchOutcome {
    let results: Vec<(PathBuf, Result<FileReport>)> = paths
        .par_iter()
        .map(|p| {
            report.started(p);
            let res = hash_file(p, params);
            match &res {
                Ok(r) => report.finished(p, &FileOutcome::Hashed(r)),
                Err(e) => report.finished(p, &FileOutcome::HashFailed(e)),
            }
            (p.clone(), res)
        })
        .collect();

    let mut out = BatchOutcome::default();
    for (path, res) in results {
        match res {
            Ok(r) => out.reports.push(r),
            Err(e) => out.failures.push((path, e)),
        }
    }
    out
}

pub(crate) fn duration_secs<S: Serializer>(
    d: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(d.as_secs_f64())
}

use std::path::Path;

use crate::error::Error;
use crate::hash::FileReport;
use crate::verify::VerifyResult;

/// What happened to one file in a batch.
pub enum FileOutcome<'a> {
    Hashed(&'a FileReport),
    HashFailed(&'a Error),
    Checked(&'a VerifyResult),
}

/// Structural progress events from a running batch. Workers may call this
/// concurrently; the core depends on no particular rendering.
pub trait Report: Sync {
    fn started(&self, path: &Path);
    fn finished(&self, path: &Path, outcome: &FileOutcome<'_>);
}

/// Ignores everything; for tests and library callers.
pub struct NullReport;

impl Report for NullReport {
    fn started(&self, _path: &Path) {}
    fn finished(&self, _path: &Path, _outcome: &FileOutcome<'_>) {}
}

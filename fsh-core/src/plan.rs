//! Deterministic sampling plans: how many blocks a file gets and where.

/// Sample block size used when nothing else is configured. 4 MiB lines up
/// with common filesystem cluster and SSD block sizes, so one sampled block
/// costs roughly one physical read.
pub const DEFAULT_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// Default fraction of a large file's bytes that must end up in the digest.
pub const DEFAULT_TARGET_COVERAGE: f64 = 0.01;

/// Files below this size get the fixed four-block plan instead of the
/// coverage-scaled one.
pub const SMALL_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// First + last + two interior blocks; no plan is ever smaller.
const MIN_TOTAL_BLOCKS: u64 = 4;

/// Tunable inputs to the planner and digest engine. Passed explicitly so
/// alternate block sizes and thresholds are testable without recompiling.
#[derive(Clone, Copy, Debug)]
pub struct SampleParams {
    pub block_size: u64,
    pub target_coverage: f64,
    pub small_file_threshold: u64,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            target_coverage: DEFAULT_TARGET_COVERAGE,
            small_file_threshold: SMALL_FILE_THRESHOLD,
        }
    }
}

/// The deterministic description of which bytes of a file will be sampled.
/// Derived from file size and params, never persisted; a manifest records
/// only the total block count, from which the plan is reconstructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplePlan {
    pub block_size: u64,
    pub interior_count: u32,
    pub file_size: u64,
}

/// Decides how many interior blocks a file of a given size is sampled with.
/// Two implementations exist, selected by the small-file threshold.
pub trait BlockBudget {
    fn interior_blocks(&self, file_size: u64) -> u32;
}

/// Fixed four-block plan: small files are cheap to oversample and a constant
/// plan keeps their timing predictable.
pub struct FixedSmallFile;

impl BlockBudget for FixedSmallFile {
    fn interior_blocks(&self, _file_size: u64) -> u32 {
        (MIN_TOTAL_BLOCKS - 2) as u32
    }
}

/// Scales the total block count so that `total * block_size / file_size`
/// stays at or above the target coverage, rounding up. Only a lower bound is
/// enforced; small inputs may be covered far beyond the target.
pub struct CoverageScaled {
    pub block_size: u64,
    pub target_coverage: f64,
}

impl BlockBudget for CoverageScaled {
    fn interior_blocks(&self, file_size: u64) -> u32 {
        let wanted = (self.target_coverage * file_size as f64 / self.block_size as f64).ceil();
        let total = (wanted as u64).max(MIN_TOTAL_BLOCKS);
        (total - 2).min(u64::from(u32::MAX)) as u32
    }
}

/// Plan the sample for a file of `file_size` bytes. Pure and deterministic:
/// the same size and params always yield the same plan, on any machine.
pub fn plan(file_size: u64, params: &SampleParams) -> SamplePlan {
    let interior_count = if file_size < params.small_file_threshold {
        FixedSmallFile.interior_blocks(file_size)
    } else {
        CoverageScaled {
            block_size: params.block_size,
            target_coverage: params.target_coverage,
        }
        .interior_blocks(file_size)
    };
    SamplePlan { block_size: params.block_size, interior_count, file_size }
}

impl SamplePlan {
    /// Rebuild the plan a manifest entry was hashed under from its recorded
    /// total block count. Offsets depend only on size and count, so this is
    /// exact regardless of the coverage the manifest was created with.
    pub fn with_block_count(file_size: u64, block_count: u32, block_size: u64) -> Self {
        Self { block_size, interior_count: block_count.saturating_sub(2), file_size }
    }

    /// Total blocks sampled, including the mandatory first and last.
    pub fn total_blocks(&self) -> u32 {
        self.interior_count + 2
    }

    /// Nominal start offset of interior block `i`, evenly distributed across
    /// the interior of the file. Not randomized.
    pub fn interior_offset(&self, i: u32) -> u64 {
        let num = self.file_size as u128 * (u128::from(i) + 2);
        (num / (u128::from(self.interior_count) + 2)) as u64
    }

    /// Whether the file is long enough that the interior and last blocks sit
    /// past the first one. When false the engine folds only the first read;
    /// the declared block count is unchanged (see DESIGN.md on this skip).
    pub fn spans_distinct_blocks(&self) -> bool {
        self.file_size > self.block_size.saturating_mul(u64::from(self.total_blocks()))
    }

    /// Bytes the plan accounts for: `total_blocks * block_size`. May exceed
    /// the file size for tiny files.
    pub fn hashed_bytes(&self) -> u64 {
        u64::from(self.total_blocks()).saturating_mul(self.block_size)
    }

    /// Fraction of the file the plan covers (can exceed 1.0 for tiny files).
    pub fn coverage(&self) -> f64 {
        if self.file_size == 0 {
            return 0.0;
        }
        self.hashed_bytes() as f64 / self.file_size as f64
    }
}

use fsh_core::plan::{plan, SamplePlan, SampleParams, DEFAULT_BLOCK_SIZE, SMALL_FILE_THRESHOLD};
use proptest::prelude::*;

const MIB: u64 = 1024 * 1024;

#[test]
fn small_files_always_get_four_blocks() {
    let params = SampleParams::default();
    for size in [0, 1, 4096, MIB, 10 * MIB, 99 * MIB, SMALL_FILE_THRESHOLD - 1] {
        let p = plan(size, &params);
        assert_eq!(p.total_blocks(), 4, "size {size}");
        assert_eq!(p.interior_count, 2);
    }
}

#[test]
fn threshold_boundary_is_continuous() {
    let params = SampleParams::default();
    // Just below and at the boundary both land on the minimum plan; the
    // coverage policy only grows past it.
    assert_eq!(plan(SMALL_FILE_THRESHOLD - 1, &params).total_blocks(), 4);
    assert_eq!(plan(SMALL_FILE_THRESHOLD, &params).total_blocks(), 4);
}

#[test]
fn large_file_meets_target_coverage() {
    let params = SampleParams::default();
    for size in [SMALL_FILE_THRESHOLD, 1 << 30, 10 * (1 << 30), 40 * (1 << 30)] {
        let p = plan(size, &params);
        let covered = p.total_blocks() as f64 * DEFAULT_BLOCK_SIZE as f64 / size as f64;
        assert!(
            covered >= params.target_coverage,
            "size {size}: coverage {covered} below target"
        );
    }
}

#[test]
fn ten_gib_needs_twenty_six_blocks() {
    // ceil(0.01 * 10 GiB / 4 MiB) = 26
    let p = plan(10 * (1 << 30), &SampleParams::default());
    assert_eq!(p.total_blocks(), 26);
    assert_eq!(p.interior_count, 24);
}

#[test]
fn interior_offsets_ordered_and_in_bounds() {
    let params = SampleParams::default();
    let p = plan(10 * (1 << 30), &params);
    assert!(p.spans_distinct_blocks());
    let mut prev = 0u64;
    for i in 0..p.interior_count {
        let off = p.interior_offset(i);
        assert!(off > prev, "offset {i} not increasing");
        assert!(off < p.file_size);
        prev = off;
    }
    // Interior samples stay clear of the first block and leave room for the last.
    assert!(p.interior_offset(0) >= p.block_size);
}

#[test]
fn plan_reconstruction_from_block_count_is_exact() {
    let params = SampleParams::default();
    for size in [0, 12 * MIB, SMALL_FILE_THRESHOLD, 3 * (1 << 30)] {
        let p = plan(size, &params);
        let rebuilt = SamplePlan::with_block_count(size, p.total_blocks(), params.block_size);
        assert_eq!(rebuilt, p);
    }
}

#[test]
fn zero_size_plan_is_degenerate_but_valid() {
    let p = plan(0, &SampleParams::default());
    assert_eq!(p.total_blocks(), 4);
    assert!(!p.spans_distinct_blocks());
    assert_eq!(p.coverage(), 0.0);
}

proptest! {
    #[test]
    fn block_count_monotone_in_file_size(a in 0u64..1 << 42, b in 0u64..1 << 42) {
        let params = SampleParams::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(plan(lo, &params).total_blocks() <= plan(hi, &params).total_blocks());
    }

    #[test]
    fn lower_coverage_never_adds_blocks(size in SMALL_FILE_THRESHOLD..1 << 42, c in 0.001f64..0.2) {
        let base = SampleParams::default();
        let loose = SampleParams { target_coverage: c.min(base.target_coverage), ..base };
        let tight = SampleParams { target_coverage: c.max(base.target_coverage), ..base };
        prop_assert!(plan(size, &loose).interior_count <= plan(size, &tight).interior_count);
    }

    #[test]
    fn coverage_floor_holds(size in SMALL_FILE_THRESHOLD..1 << 42) {
        let params = SampleParams::default();
        let p = plan(size, &params);
        let covered = p.hashed_bytes() as f64 / size as f64;
        prop_assert!(covered >= params.target_coverage);
        prop_assert!(p.total_blocks() >= 4);
    }
}

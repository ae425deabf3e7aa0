use fsh_core::hash::{hash_file, hash_files};
use fsh_core::manifest::Manifest;
use fsh_core::plan::SampleParams;
use fsh_core::progress::NullReport;
use fsh_core::verify::{verify, VerifyStatus};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

fn tiny_params() -> SampleParams {
    SampleParams { block_size: 4096, target_coverage: 0.01, small_file_threshold: 64 * 1024 }
}

fn write_patterned(path: &Path, len: usize) {
    let mut buf = vec![0u8; len];
    for (i, b) in buf.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(31).wrapping_add(7);
    }
    std::fs::write(path, buf).unwrap();
}

fn flip_byte(path: &Path, offset: u64) {
    let mut f = OpenOptions::new().read(true).write(true).open(path).unwrap();
    f.seek(SeekFrom::Start(offset)).unwrap();
    let original = (offset as u8).wrapping_mul(31).wrapping_add(7);
    f.write_all(&[original ^ 0xFF]).unwrap();
}

fn manifest_for(paths: &[PathBuf], params: &SampleParams) -> Manifest {
    let outcome = hash_files(paths, params, &NullReport);
    assert!(outcome.failures.is_empty());
    outcome.manifest()
}

#[test]
fn unchanged_file_verifies() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("ref.bin");
    write_patterned(&path, 10 * 1024 * 1024);

    let params = SampleParams::default();
    let manifest = manifest_for(&[path], &params);
    let out = verify(&manifest, &params, &NullReport);
    assert_eq!(out.results.len(), 1);
    assert_eq!(out.results[0].status, VerifyStatus::Verified);
    assert!(out.summary.success);
    assert_eq!(out.summary.verified, 1);
    assert_eq!(out.summary.failed, 0);
    assert_eq!(out.summary.total_size, 10 * 1024 * 1024);
}

#[test]
fn deleted_file_is_missing() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("ref.bin");
    write_patterned(&path, 1024);

    let params = SampleParams::default();
    let manifest = manifest_for(&[path.clone()], &params);
    std::fs::remove_file(&path).unwrap();

    let out = verify(&manifest, &params, &NullReport);
    assert_eq!(out.results[0].status, VerifyStatus::Missing);
    assert_eq!(out.results[0].actual_size, None);
    assert!(!out.summary.success);
    // Absent files contribute nothing to the byte totals.
    assert_eq!(out.summary.total_size, 0);
    assert_eq!(out.summary.total_hashed_size, 0);
}

#[test]
fn appended_byte_is_a_size_mismatch_without_rehashing() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("ref.bin");
    write_patterned(&path, 10 * 1024 * 1024);

    let params = SampleParams::default();
    let manifest = manifest_for(&[path.clone()], &params);

    let mut f = OpenOptions::new().append(true).open(&path).unwrap();
    f.write_all(&[0]).unwrap();
    drop(f);

    let out = verify(&manifest, &params, &NullReport);
    let expected = 10 * 1024 * 1024u64;
    assert_eq!(out.results[0].status, VerifyStatus::SizeMismatch { actual: expected + 1 });
    assert_eq!(out.results[0].actual_size, Some(expected + 1));
    // Never hashed, so no hashed bytes are accounted.
    assert_eq!(out.results[0].hashed_bytes, 0);
    assert!(!out.summary.success);
}

#[test]
fn first_block_flip_is_a_hash_mismatch() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("ref.bin");
    write_patterned(&path, 10 * 1024 * 1024);

    let params = SampleParams::default();
    let manifest = manifest_for(&[path.clone()], &params);
    flip_byte(&path, 0);

    let out = verify(&manifest, &params, &NullReport);
    match &out.results[0].status {
        VerifyStatus::HashMismatch { actual } => {
            assert_ne!(*actual, manifest.entries[0].digest);
        }
        other => panic!("expected HashMismatch, got {other:?}"),
    }
    assert!(out.results[0].hashed_bytes > 0);
    assert!(!out.summary.success);
}

#[test]
fn unsampled_flip_verifies_clean_the_blind_spot() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("big.bin");
    write_patterned(&path, 2 * 1024 * 1024);

    let params = tiny_params();
    let manifest = manifest_for(&[path.clone()], &params);
    // Between the first block and the earliest interior block; see the
    // digest tests for the sampled layout of this size.
    flip_byte(&path, 300_000);

    let out = verify(&manifest, &params, &NullReport);
    assert_eq!(out.results[0].status, VerifyStatus::Verified);
    assert!(out.summary.success);
    // A large-enough file never has more hashed than present bytes.
    assert!(out.summary.total_hashed_size <= out.summary.total_size);
}

#[test]
fn verification_ignores_the_coverage_the_caller_passes() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("big.bin");
    write_patterned(&path, 2 * 1024 * 1024);

    // Hashed at 5% coverage; verified with params at the default 1%. The
    // plan comes from the entry's block count, so this must still verify.
    let hash_params = SampleParams { target_coverage: 0.05, ..tiny_params() };
    let manifest = manifest_for(&[path.clone()], &hash_params);
    assert!(manifest.entries[0].block_count > 6);

    let out = verify(&manifest, &tiny_params(), &NullReport);
    assert_eq!(out.results[0].status, VerifyStatus::Verified);
}

#[test]
fn mixed_manifest_keeps_order_and_sums_add_up() {
    let td = tempfile::tempdir().unwrap();
    let ok = td.path().join("ok.bin");
    let gone = td.path().join("gone.bin");
    let grown = td.path().join("grown.bin");
    let flipped = td.path().join("flipped.bin");
    for p in [&ok, &gone, &grown, &flipped] {
        write_patterned(p, 256 * 1024);
    }

    let params = SampleParams::default();
    let manifest =
        manifest_for(&[ok.clone(), gone.clone(), grown.clone(), flipped.clone()], &params);

    std::fs::remove_file(&gone).unwrap();
    OpenOptions::new().append(true).open(&grown).unwrap().write_all(b"x").unwrap();
    flip_byte(&flipped, 10);

    let out = verify(&manifest, &params, &NullReport);
    assert_eq!(out.results.len(), 4);
    // Manifest order, not completion order.
    for (r, e) in out.results.iter().zip(&manifest.entries) {
        assert_eq!(r.path, e.path);
    }
    assert_eq!(out.results[0].status, VerifyStatus::Verified);
    assert_eq!(out.results[1].status, VerifyStatus::Missing);
    assert!(matches!(out.results[2].status, VerifyStatus::SizeMismatch { .. }));
    assert!(matches!(out.results[3].status, VerifyStatus::HashMismatch { .. }));

    let s = &out.summary;
    assert_eq!(s.verified, 1);
    assert_eq!(s.failed, 3);
    assert_eq!(s.verified + s.failed, s.total);
    assert!(!s.success);
    // gone.bin is absent; the other three exist (one a byte longer).
    assert_eq!(s.total_size, 3 * 256 * 1024 + 1);
    // Only ok.bin and flipped.bin were actually hashed.
    assert_eq!(s.total_hashed_size, 2 * 4 * fsh_core::plan::DEFAULT_BLOCK_SIZE);
}

#[test]
fn batch_hashing_records_failures_without_aborting() {
    let td = tempfile::tempdir().unwrap();
    let good = td.path().join("good.bin");
    let ghost = td.path().join("ghost.bin");
    write_patterned(&good, 4096);

    let outcome = hash_files(&[good.clone(), ghost.clone()], &SampleParams::default(), &NullReport);
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, ghost);
    assert!(matches!(outcome.failures[0].1, fsh_core::error::Error::NotFound(_)));

    let manifest = outcome.manifest();
    assert_eq!(manifest.entries.len(), 1);
    assert_eq!(manifest.entries[0].path, good.to_string_lossy());
}

#[test]
fn single_file_report_carries_plan_figures() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("file.bin");
    write_patterned(&path, 1024 * 1024);

    let r = hash_file(&path, &SampleParams::default()).unwrap();
    assert_eq!(r.size, 1024 * 1024);
    assert_eq!(r.block_count, 4);
    assert_eq!(r.hashed_bytes, 4 * fsh_core::plan::DEFAULT_BLOCK_SIZE);
    assert!(r.coverage > 1.0); // tiny file, oversampled by design of the floor
}

#[test]
fn results_serialize_with_snake_case_status_tags() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("file.bin");
    write_patterned(&path, 4096);

    let params = SampleParams::default();
    let manifest = manifest_for(&[path.clone()], &params);
    std::fs::remove_file(&path).unwrap();

    let out = verify(&manifest, &params, &NullReport);
    let json = serde_json::to_value(&out.results[0]).unwrap();
    assert_eq!(json["status"], "missing");
    assert_eq!(json["expected_digest"].as_str().unwrap().len(), 48);
    assert!(json["processing_time"].is_number());

    let summary = serde_json::to_value(&out.summary).unwrap();
    assert_eq!(summary["success"], false);
    assert_eq!(summary["failed"], 1);
}

#[test]
fn skipped_manifest_lines_do_not_enter_the_counts() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("file.bin");
    write_patterned(&path, 4096);

    let params = SampleParams::default();
    let manifest = manifest_for(&[path], &params);
    let mut text = manifest.encode();
    text.push_str("mangled line without fields\n");

    let decoded = Manifest::decode(&text).unwrap();
    assert_eq!(decoded.skipped.len(), 1);
    let out = verify(&decoded.manifest, &params, &NullReport);
    assert_eq!(out.summary.total, 1);
    assert!(out.summary.success);
}

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use walkdir::WalkDir;

use fsh_core::error::Error as CoreError;
use fsh_core::hash::{hash_files, BatchOutcome};
use fsh_core::manifest::{DecodeOutcome, Manifest};
use fsh_core::plan::SampleParams;
use fsh_core::progress::{FileOutcome, NullReport, Report};
use fsh_core::verify::{verify, VerifyOutcome, VerifyStatus};

#[derive(Parser)]
#[command(name = "fsh", version, about = "FSH24 sampled integrity hasher")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Hash files and write an FSH24 manifest
    Hash {
        /// Files and/or directories to hash
        inputs: Vec<PathBuf>,
        /// Manifest to write
        #[arg(short, long, default_value = "checksums.fsh24")]
        output: PathBuf,
        /// Recurse into directories
        #[arg(short, long, default_value_t = false)]
        recursive: bool,
        /// Target coverage fraction for large files (0.01 = 1%)
        #[arg(long, default_value_t = 0.01)]
        coverage: f64,
        /// Sample block size; accepts K/M/G suffix
        #[arg(long, default_value = "4M")]
        block_size: String,
        /// Only hash paths matching these globs
        #[arg(long)]
        include: Vec<String>,
        /// Skip paths matching these globs
        #[arg(long)]
        exclude: Vec<String>,
        /// Emit a JSON report on stdout
        #[arg(short, long, default_value_t = false)]
        json: bool,
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
    /// Verify files against an FSH24 manifest
    Verify {
        manifest: PathBuf,
        /// Must match the block size the manifest was written with
        #[arg(long, default_value = "4M")]
        block_size: String,
        /// Emit a JSON report on stdout
        #[arg(short, long, default_value_t = false)]
        json: bool,
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.cmd {
        Cmd::Hash {
            inputs,
            output,
            recursive,
            coverage,
            block_size,
            include,
            exclude,
            json,
            verbose,
        } => {
            let params = SampleParams {
                block_size: parse_block_size(&block_size)?,
                target_coverage: coverage,
                ..SampleParams::default()
            };
            hash_cmd(&inputs, &output, recursive, &params, &include, &exclude, json, verbose)
        }
        Cmd::Verify { manifest, block_size, json, verbose } => {
            let params = SampleParams {
                block_size: parse_block_size(&block_size)?,
                ..SampleParams::default()
            };
            verify_cmd(&manifest, &params, json, verbose)
        }
    }
}

fn hash_cmd(
    inputs: &[PathBuf],
    output: &Path,
    recursive: bool,
    params: &SampleParams,
    include: &[String],
    exclude: &[String],
    json: bool,
    verbose: bool,
) -> Result<ExitCode> {
    if inputs.is_empty() {
        return Err(anyhow!("no input files or directories given"));
    }
    let (inc, exc) = build_globset(include, exclude)?;
    let files = list_files(inputs, recursive, &inc, &exc);
    if files.is_empty() {
        return Err(anyhow!("no files found to process"));
    }

    let start = Instant::now();
    let outcome = if json {
        hash_files(&files, params, &NullReport)
    } else {
        hash_files(&files, params, &Console { verbose })
    };
    let elapsed = start.elapsed();

    outcome.manifest().save(output).with_context(|| format!("write {}", output.display()))?;

    if json {
        print_hash_json(&outcome, elapsed.as_secs_f64())?;
    } else {
        if files.len() > 1 {
            let total = outcome.total_size();
            let hashed = outcome.total_hashed_bytes();
            let pct = if total > 0 { hashed as f64 / total as f64 * 100.0 } else { 0.0 };
            println!("Processed {} files in {:.3}s", outcome.reports.len(), elapsed.as_secs_f64());
            println!("Total file size: {} bytes", total);
            println!("Total hashed size: {} bytes", hashed);
            println!("Total hash percentage: {:.4}%", pct);
        }
        println!("Hash file saved: {}", output.display());
    }

    if outcome.failures.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn verify_cmd(
    manifest_path: &Path,
    params: &SampleParams,
    json: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let DecodeOutcome { manifest, skipped } = Manifest::load(manifest_path)
        .with_context(|| format!("read {}", manifest_path.display()))?;

    if !json {
        for err in &skipped {
            eprintln!("warning: {err}");
        }
    }

    let outcome = if json {
        verify(&manifest, params, &NullReport)
    } else {
        verify(&manifest, params, &Console { verbose })
    };

    if json {
        print_verify_json(&outcome, &skipped)?;
    } else {
        let s = &outcome.summary;
        if verbose {
            println!();
            println!("Verification complete: {} verified, {} failed", s.verified, s.failed);
            println!("Total time: {:.3}s", s.elapsed.as_secs_f64());
            if s.total > 0 {
                println!(
                    "Average time per file: {:.3}s",
                    s.elapsed.as_secs_f64() / s.total as f64
                );
            }
            println!("Total file size: {} bytes", s.total_size);
            println!("Total hashed size: {} bytes", s.total_hashed_size);
            println!("Total hashed percentage: {:.4}%", s.hashed_fraction() * 100.0);
        } else {
            println!("Verification: {} verified, {} failed", s.verified, s.failed);
        }
    }

    if outcome.summary.success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

/// Console rendering of progress events; one line per finished file.
struct Console {
    verbose: bool,
}

impl Report for Console {
    fn started(&self, _path: &Path) {}

    fn finished(&self, path: &Path, outcome: &FileOutcome<'_>) {
        match outcome {
            FileOutcome::Hashed(r) => {
                if self.verbose {
                    println!(
                        "{}  {}  ({} blocks, {:.4}% coverage, {:.3}s)",
                        r.digest,
                        path.display(),
                        r.block_count,
                        r.coverage * 100.0,
                        r.elapsed.as_secs_f64()
                    );
                } else {
                    println!("{}  {}", r.digest, path.display());
                }
            }
            FileOutcome::HashFailed(e) => {
                eprintln!("warning: skipping {}: {e}", path.display());
            }
            FileOutcome::Checked(res) => match &res.status {
                VerifyStatus::Verified => {
                    if self.verbose {
                        println!("Verified: {}", path.display());
                    }
                }
                VerifyStatus::Missing => println!("!MISSING: {}", path.display()),
                VerifyStatus::SizeMismatch { actual } => println!(
                    "!SIZE MISMATCH: {} (expected: {}, actual: {})",
                    path.display(),
                    res.expected_size,
                    actual
                ),
                VerifyStatus::HashMismatch { .. } => {
                    println!("HASH MISMATCH: {}", path.display());
                }
                VerifyStatus::ReadFailed { error } => {
                    println!("!READ ERROR: {} ({})", path.display(), error);
                }
            },
        }
    }
}

fn build_globset(
    includes: &[String],
    excludes: &[String],
) -> Result<(globset::GlobSet, globset::GlobSet)> {
    let mut incb = GlobSetBuilder::new();
    let mut excb = GlobSetBuilder::new();
    if includes.is_empty() {
        incb.add(Glob::new("**/*")?);
    }
    for g in includes {
        incb.add(Glob::new(g)?);
    }
    for g in excludes {
        excb.add(Glob::new(g)?);
    }
    Ok((incb.build()?, excb.build()?))
}

/// Expand files and directories into a sorted, deterministic file list.
/// Missing inputs warn and are skipped; globs apply to directory walks.
fn list_files(
    inputs: &[PathBuf],
    recursive: bool,
    inc: &globset::GlobSet,
    exc: &globset::GlobSet,
) -> Vec<PathBuf> {
    let mut v = Vec::new();
    for p in inputs {
        let md = match fs::metadata(p) {
            Ok(md) => md,
            Err(_) => {
                eprintln!("warning: path not found: {}", p.display());
                continue;
            }
        };
        if md.is_file() {
            v.push(p.clone());
            continue;
        }
        let walker = if recursive {
            WalkDir::new(p).min_depth(1)
        } else {
            WalkDir::new(p).min_depth(1).max_depth(1)
        };
        for e in walker.into_iter().filter_map(|e| e.ok()) {
            if !e.file_type().is_file() {
                continue;
            }
            let rp = e.path().to_string_lossy().replace('\\', "/");
            if !inc.is_match(&rp) {
                continue;
            }
            if exc.is_match(&rp) {
                continue;
            }
            v.push(e.path().to_path_buf());
        }
    }
    v.sort();
    v
}

/// Parse a block size like `65536`, `64K`, `4M`, `1G`.
fn parse_block_size(spec: &str) -> Result<u64> {
    let s = spec.trim().to_uppercase();
    let (num, mul) = if let Some(n) = s.strip_suffix('K') {
        (n, 1u64 << 10)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1u64 << 20)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1u64 << 30)
    } else {
        (s.as_str(), 1u64)
    };
    let v: u64 = num.parse().map_err(|_| anyhow!("bad block size {spec:?}"))?;
    if v == 0 {
        return Err(anyhow!("block size must be positive"));
    }
    Ok(v * mul)
}

fn print_hash_json(outcome: &BatchOutcome, total_secs: f64) -> Result<()> {
    #[derive(Serialize)]
    struct Doc<'a> {
        magic: &'static str,
        total_files: usize,
        total_processing_time: f64,
        files: &'a [fsh_core::hash::FileReport],
        failures: Vec<serde_json::Value>,
    }
    let doc = Doc {
        magic: fsh_core::manifest::MAGIC,
        total_files: outcome.reports.len(),
        total_processing_time: total_secs,
        files: &outcome.reports,
        failures: outcome
            .failures
            .iter()
            .map(|(p, e)| {
                serde_json::json!({ "path": p.to_string_lossy(), "error": e.to_string() })
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn print_verify_json(outcome: &VerifyOutcome, skipped: &[CoreError]) -> Result<()> {
    #[derive(Serialize)]
    struct Doc<'a> {
        summary: &'a fsh_core::verify::VerifySummary,
        results: &'a [fsh_core::verify::VerifyResult],
        skipped_lines: Vec<serde_json::Value>,
    }
    let doc = Doc {
        summary: &outcome.summary,
        results: &outcome.results,
        skipped_lines: skipped
            .iter()
            .map(|e| match e {
                CoreError::LineParse { line, reason } => {
                    serde_json::json!({ "line": line, "reason": reason })
                }
                other => serde_json::json!({ "reason": other.to_string() }),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

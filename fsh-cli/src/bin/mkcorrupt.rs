//! mkcorrupt — make corrupted and truncated copies of a file.
//!
//! Produces the two damage shapes the verifier has to catch: a same-length
//! copy with a percentage of bytes scrambled (simulates bit rot / bad
//! sectors) and a shortened copy (simulates an incomplete download).
//!
//!   mkcorrupt big.bin                      # big.bin.corrupt + big.bin.truncated
//!   mkcorrupt big.bin --corrupt-pct 0.5 --keep-pct 90 --seed 7

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const CHUNK: usize = 8 * 1024;

#[derive(Parser)]
#[command(name = "mkcorrupt", version, about = "Generate damaged copies of a file for verifier testing")]
struct Args {
    /// File to damage (read-only; copies are written next to it)
    input: PathBuf,
    /// Percentage of bytes to scramble in the corrupted copy
    #[arg(long, default_value_t = 1.0)]
    corrupt_pct: f64,
    /// Percentage of the file to keep in the truncated copy
    #[arg(long, default_value_t = 80.0)]
    keep_pct: f64,
    /// Directory for the output files (defaults to the input's directory)
    #[arg(long)]
    outdir: Option<PathBuf>,
    /// RNG seed, for reproducible damage
    #[arg(long, default_value_t = 0x1BADF00D)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let size = std::fs::metadata(&args.input)
        .with_context(|| format!("stat {}", args.input.display()))?
        .len();
    let name = args
        .input
        .file_name()
        .with_context(|| format!("no file name in {}", args.input.display()))?
        .to_string_lossy()
        .into_owned();
    let outdir = match &args.outdir {
        Some(d) => {
            std::fs::create_dir_all(d)?;
            d.clone()
        }
        None => args.input.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };

    let corrupt_path = outdir.join(format!("{name}.corrupt"));
    let truncated_path = outdir.join(format!("{name}.truncated"));

    let mut rng = StdRng::seed_from_u64(args.seed);
    write_corrupted(&args.input, &corrupt_path, args.corrupt_pct, &mut rng)?;
    let kept = write_truncated(&args.input, &truncated_path, size, args.keep_pct)?;

    println!("{}  ({} bytes, {:.2}% scrambled)", corrupt_path.display(), size, args.corrupt_pct);
    println!("{}  ({} of {} bytes kept)", truncated_path.display(), kept, size);
    Ok(())
}

/// Stream a copy, scrambling `pct` percent of the bytes in each chunk at
/// random positions. Same length as the input.
fn write_corrupted(input: &Path, output: &Path, pct: f64, rng: &mut StdRng) -> Result<()> {
    let mut reader = BufReader::new(File::open(input).context("open input")?);
    let mut writer = BufWriter::new(File::create(output).context("create corrupted copy")?);
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let to_flip = ((n as f64) * pct / 100.0).round() as usize;
        for _ in 0..to_flip {
            let pos = rng.gen_range(0..n);
            buf[pos] = rng.gen();
        }
        writer.write_all(&buf[..n])?;
    }
    writer.flush()?;
    Ok(())
}

/// Stream a copy of the first `keep_pct` percent of the input. Returns the
/// number of bytes written.
fn write_truncated(input: &Path, output: &Path, size: u64, keep_pct: f64) -> Result<u64> {
    let keep = ((size as f64) * keep_pct / 100.0) as u64;
    let mut reader = BufReader::new(File::open(input).context("open input")?);
    let mut writer = BufWriter::new(File::create(output).context("create truncated copy")?);
    let mut remaining = keep;
    let mut buf = vec![0u8; CHUNK];
    while remaining > 0 {
        let want = CHUNK.min(remaining as usize);
        let n = reader.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    writer.flush()?;
    Ok(keep - remaining)
}

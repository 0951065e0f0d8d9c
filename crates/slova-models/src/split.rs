use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slova_tokenize::TokenBlock;

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub train: usize,
    pub eval: usize,
    pub skipped: usize,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Stream packed blocks into a train and an eval file.
///
/// Each block goes to eval with probability `eval_fraction`, drawn from a
/// generator seeded with `seed`, so the same input and seed always give the
/// same split. Lines that are not valid blocks are skipped.
///
/// # Errors
///
/// Returns `InvalidFraction` for a fraction outside `[0, 1]`, or an IO
/// error from any of the three files.
pub fn split_blocks(
    packed: &Path,
    train_out: &Path,
    eval_out: &Path,
    eval_fraction: f64,
    seed: u64,
) -> Result<SplitReport> {
    if !(0.0..=1.0).contains(&eval_fraction) {
        return Err(ModelError::InvalidFraction(eval_fraction));
    }
    let mut reader = BufReader::new(File::open(packed)?);
    let mut train = create(train_out)?;
    let mut eval = create(eval_out)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut report = SplitReport::default();

    let mut line = Vec::new();
    let mut line_no = 0usize;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_no += 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let block: TokenBlock = match serde_json::from_slice(&line) {
            Ok(block) => block,
            Err(e) => {
                report.skipped += 1;
                tracing::warn!(line = line_no, "skipping malformed block: {e}");
                continue;
            }
        };
        let (out, count) = if rng.random_bool(eval_fraction) {
            (&mut eval, &mut report.eval)
        } else {
            (&mut train, &mut report.train)
        };
        serde_json::to_writer(&mut *out, &block)?;
        out.write_all(b"\n")?;
        *count += 1;
    }
    train.flush()?;
    eval.flush()?;

    tracing::info!(
        train = report.train,
        eval = report.eval,
        skipped = report.skipped,
        seed,
        "packed blocks split"
    );
    Ok(report)
}

//! Appends a column of random scores to an existing CSV, for exercising the
//! import pipeline with fresh metric data.

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;
use rand::Rng;

use crate::io_utils;

pub const RANDOM_MIN: u32 = 0;
pub const RANDOM_MAX: u32 = 100;

/// Either a whole number or a two-decimal float in `0..=100`, with even odds.
pub fn random_score<R: Rng>(rng: &mut R) -> String {
    if rng.gen_bool(0.5) {
        rng.gen_range(RANDOM_MIN..=RANDOM_MAX).to_string()
    } else {
        let value: f64 = rng.gen_range(f64::from(RANDOM_MIN)..=f64::from(RANDOM_MAX));
        format!("{value:.2}")
    }
}

/// Rewrites `path` in place with `column` appended; returns the number of
/// data rows that received a value.
pub fn add_random_column<R: Rng>(path: &Path, column: &str, rng: &mut R) -> Result<usize> {
    let mut reader = io_utils::open_csv_reader_from_path(path, false)
        .with_context(|| format!("Opening CSV file {path:?}"))?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Reading CSV file {path:?}"))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    let Some((header, data)) = rows.split_first_mut() else {
        bail!("CSV file {path:?} is empty");
    };
    header.push(column.to_string());
    for row in data.iter_mut() {
        row.push(random_score(rng));
    }
    let data_rows = data.len();

    let mut writer = io_utils::open_csv_writer(path)?;
    for row in &rows {
        writer
            .write_record(row)
            .with_context(|| format!("Writing CSV file {path:?}"))?;
    }
    writer.flush().context("Flushing CSV output")?;

    info!(
        "Added column '{column}' to {:?} ({data_rows} row(s), values {RANDOM_MIN}-{RANDOM_MAX})",
        path
    );
    Ok(data_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::{analyze_numeric, infer_column_type};
    use rand::{SeedableRng, rngs::StdRng};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scores_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let score = random_score(&mut rng);
            let literal = analyze_numeric(&score).expect("numeric");
            assert!((0.0..=100.0).contains(&literal.value), "{score}");
            if literal.has_decimal_point {
                assert_eq!(score.split('.').nth(1).map(str::len), Some(2), "{score}");
            }
        }
    }

    #[test]
    fn column_is_appended_to_every_row() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("data.csv");
        fs::write(&path, "dataset,score\nset_a,1\nset_b,2\n").expect("write");

        let mut rng = StdRng::seed_from_u64(42);
        let rows = add_random_column(&path, "随机分数", &mut rng).expect("add column");
        assert_eq!(rows, 2);

        let content = fs::read_to_string(&path).expect("read");
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "dataset,score,随机分数");
        let appended = lines[1..]
            .iter()
            .map(|line| line.rsplit(',').next().unwrap_or_default())
            .collect::<Vec<_>>();
        assert!(infer_column_type(&appended).is_numeric());
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").expect("write");
        let mut rng = StdRng::seed_from_u64(1);
        assert!(add_random_column(&path, "x", &mut rng).is_err());
    }
}

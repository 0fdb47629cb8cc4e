/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared helpers for sample CSV I/O and reproducible train/test partitioning.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use csv::{ReaderBuilder, Writer};
use faer::{Mat, MatRef};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::error::Error;
use std::fs::File;

/// Load a CSV file of LAT samples into coordinate and value arrays.
///
/// Each row is `x, y, z, value`; the first three columns form the sample
/// coordinates and the last the measured value.
///
/// # Arguments
/// * `file_path` - Path to the CSV file.
/// * `has_headers` - Whether the file has a single header row to skip.
///
/// # Returns
/// On success, returns `(coords, values)` where `coords` has shape
/// `(n_samples, 3)`.
pub fn csv_to_samples(
    file_path: &str,
    has_headers: bool,
) -> Result<(Mat<f64>, Vec<f64>), Box<dyn Error>> {
    let file = File::open(file_path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .from_reader(file);

    let mut coords = Vec::new();
    let mut values = Vec::new();
    let mut num_rows = 0;

    for result in reader.records() {
        let record = result?;
        if record.len() != 4 {
            return Err(format!(
                "expected 4 columns (x, y, z, value), got {} on row {}",
                record.len(),
                num_rows + 1
            )
            .into());
        }

        for (i, field) in record.iter().enumerate() {
            let parsed: f64 = field.trim().parse()?;
            if i == 3 {
                values.push(parsed);
            } else {
                coords.push(parsed);
            }
        }

        num_rows += 1;
    }

    let coords = MatRef::from_row_major_slice(coords.as_slice(), num_rows, 3).to_owned();

    Ok((coords, values))
}

/// Write per-vertex coordinates and estimated values to a CSV file.
///
/// Each row of `points` is written followed by the corresponding estimate,
/// with headers `X, Y, Z, EstimatedLAT`.
///
/// # Errors
/// Returns an error if writing to disk fails or the lengths disagree.
pub fn estimates_to_csv(
    points: &Mat<f64>,
    estimates: &[f64],
    filename: &str,
) -> Result<(), Box<dyn Error>> {
    if points.nrows() != estimates.len() {
        return Err(format!(
            "{} points but {} estimates",
            points.nrows(),
            estimates.len()
        )
        .into());
    }

    let mut wtr = Writer::from_path(filename)?;
    wtr.write_record(["X", "Y", "Z", "EstimatedLAT"])?;

    for i in 0..points.nrows() {
        let mut record: Vec<String> = points.row(i).iter().map(|c| c.to_string()).collect();
        record.push(estimates[i].to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Randomly partition `0..num_samples` into training and held-out test
/// index sets.
///
/// # Arguments
/// * `num_samples` - Total number of measured samples.
/// * `num_train` - Number of indices assigned to the training set; the
///   remainder form the test set. Clamped to `num_samples`.
/// * `seed` - Optional random seed.
///   - If `Some(seed)` is provided, the same partition is produced
///     deterministically across runs (useful for reproducible folds).
///   - If `None`, the generator is seeded from the operating system's
///     randomness source.
///
/// # Returns
/// `(train_indices, test_indices)`, each sorted ascending.
pub fn random_partition(
    num_samples: usize,
    num_train: usize,
    seed: Option<u64>,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut indices: Vec<usize> = (0..num_samples).collect();
    indices.shuffle(&mut rng);

    let split = num_train.min(num_samples);
    let mut train = indices[..split].to_vec();
    let mut test = indices[split..].to_vec();
    train.sort_unstable();
    test.sort_unstable();

    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_is_disjoint_and_covers() {
        let (train, test) = random_partition(100, 70, Some(42));
        assert_eq!(train.len(), 70);
        assert_eq!(test.len(), 30);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn partition_is_reproducible_for_a_seed() {
        let first = random_partition(50, 10, Some(7));
        let second = random_partition(50, 10, Some(7));
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_train_count_is_clamped() {
        let (train, test) = random_partition(5, 12, Some(1));
        assert_eq!(train, vec![0, 1, 2, 3, 4]);
        assert!(test.is_empty());
    }

    #[test]
    fn csv_roundtrip_preserves_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.csv");
        let path = path.to_str().unwrap();

        let points = Mat::from_fn(3, 3, |i, j| (i * 3 + j) as f64 / 2.0);
        let values = [10.5, -3.25, 0.0];
        estimates_to_csv(&points, &values, path).unwrap();

        let (coords, vals) = csv_to_samples(path, true).unwrap();
        assert_eq!(coords.nrows(), 3);
        assert_eq!(vals, values.to_vec());
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(coords[(i, j)], points[(i, j)]);
            }
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines observed/filled signal representations and raw-sample conditioning helpers.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Signal representations and raw-sample conditioning.
//!
//! Two per-vertex signal variants coexist in the pipeline and are easy to
//! transpose in review, so they are distinct types: [`ObservedSignal`] holds
//! only the measured values (the hard constraints of the solve), while
//! [`FilledSignal`] holds a value for every vertex (measured or
//! nearest-neighbour filled) and is only ever consumed by the edge
//! sparsifier.

use crate::kdtree::KDTree;
use crate::mesh::TriangleMesh;
use faer::Mat;
use std::error::Error;
use std::fmt;

/// Number of neighbours (including self) examined by [`flag_anomalous`].
pub const ANOMALY_NEIGHBOURS: usize = 6;

/// Search radius in millimetres for the neighbourhood consensus check.
pub const ANOMALY_RADIUS: f64 = 5.0;

// A sample deviating from its neighbourhood mean by more than this many
// milliseconds is flagged; isolated samples fall back to a 3-sigma check
// against the global distribution.
const ANOMALY_DEVIATION_MS: f64 = 30.0;
const ANOMALY_GLOBAL_SIGMAS: f64 = 3.0;

/// Errors raised when assembling an observed signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// The index and value lists have different lengths.
    MismatchedLengths { indices: usize, values: usize },

    /// The same vertex index appears twice.
    DuplicateIndex { index: usize },
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalError::MismatchedLengths { indices, values } => write!(
                f,
                "observed signal has {} indices but {} values",
                indices, values
            ),
            SignalError::DuplicateIndex { index } => {
                write!(f, "vertex {} appears more than once", index)
            }
        }
    }
}

impl Error for SignalError {}

/// Sparse measured signal values at a subset of mesh vertices.
///
/// These are the training constraints of the interpolation: the estimator
/// reproduces them exactly at their vertices.
#[derive(Debug, Clone)]
pub struct ObservedSignal {
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl ObservedSignal {
    /// Creates an observed signal from parallel index and value lists.
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Result<Self, SignalError> {
        if indices.len() != values.len() {
            return Err(SignalError::MismatchedLengths {
                indices: indices.len(),
                values: values.len(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for &i in &indices {
            if !seen.insert(i) {
                return Err(SignalError::DuplicateIndex { index: i });
            }
        }

        Ok(Self { indices, values })
    }

    /// Number of measured vertices.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Measured vertex indices.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Measured values, parallel to [`ObservedSignal::indices`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The mesh coordinates of the measured vertices, one row per sample.
    pub fn coordinates(&self, mesh: &TriangleMesh) -> Mat<f64> {
        Mat::from_fn(self.indices.len(), 3, |s, c| {
            mesh.vertices()[(self.indices[s], c)]
        })
    }

    /// Per-vertex membership mask of length `num_vertices`.
    pub fn membership_mask(&self, num_vertices: usize) -> Vec<bool> {
        let mut mask = vec![false; num_vertices];
        for &i in &self.indices {
            mask[i] = true;
        }
        mask
    }
}

/// A signal value at every mesh vertex.
///
/// Measured vertices carry their observed value; the rest carry the value
/// of their nearest measured neighbour (see
/// [`NearestValueLocator::fill`](crate::NearestValueLocator::fill)).
#[derive(Debug, Clone)]
pub struct FilledSignal {
    values: Vec<f64>,
}

impl FilledSignal {
    pub(crate) fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The full per-vertex value vector.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The value at a single vertex.
    pub fn value(&self, vertex: usize) -> f64 {
        self.values[vertex]
    }
}

/// Maps raw measurement coordinates onto their nearest mesh vertices.
///
/// Mapping systems record samples at catheter positions that rarely
/// coincide with mesh vertices. Each sample is assigned to the single
/// nearest vertex; when several samples land on the same vertex, later
/// ones overwrite earlier ones. The returned signal lists vertices in
/// ascending index order.
pub fn map_samples(mesh: &TriangleMesh, coords: &Mat<f64>, values: &[f64]) -> ObservedSignal {
    assert_eq!(
        coords.nrows(),
        values.len(),
        "sample coordinates and values must have the same length"
    );

    let n = mesh.num_vertices();
    let tree = KDTree::new(mesh.vertices());

    let mut known = vec![false; n];
    let mut mapped = vec![0.0; n];
    for s in 0..coords.nrows() {
        let nearest = tree.k_nearest(coords.row(s), 1);
        if let Some(&(vertex, _)) = nearest.first() {
            known[vertex] = true;
            mapped[vertex] = values[s];
        }
    }

    let indices: Vec<usize> = (0..n).filter(|&i| known[i]).collect();
    let vals: Vec<f64> = indices.iter().map(|&i| mapped[i]).collect();

    // indices are distinct by construction
    ObservedSignal { indices, values: vals }
}

/// Flags raw measurements that disagree with their local neighbourhood.
///
/// For each sample, up to [`ANOMALY_NEIGHBOURS`]` - 1` nearest samples
/// within [`ANOMALY_RADIUS`] that have not themselves been flagged form a
/// consensus mean; a sample deviating from it by more than 30 ms is
/// flagged. A sample with no unflagged neighbours in range is compared
/// against the global mean instead and flagged beyond three standard
/// deviations. Samples are visited in input order, so earlier flags
/// exclude a bad sample from later neighbourhoods.
pub fn flag_anomalous(coords: &Mat<f64>, values: &[f64]) -> Vec<bool> {
    assert_eq!(
        coords.nrows(),
        values.len(),
        "sample coordinates and values must have the same length"
    );

    let m = values.len();
    if m == 0 {
        return Vec::new();
    }

    let tree = KDTree::new(coords);

    let global_mean = values.iter().sum::<f64>() / m as f64;
    let global_var = values
        .iter()
        .map(|v| (v - global_mean).powi(2))
        .sum::<f64>()
        / m as f64;
    let global_std = global_var.sqrt();

    let mut anomalous = vec![false; m];
    for i in 0..m {
        let neighbours = tree.k_nearest(coords.row(i), ANOMALY_NEIGHBOURS);

        // skip self (rank 0) and anything flagged or out of range
        let neigh_vals: Vec<f64> = neighbours
            .iter()
            .skip(1)
            .filter(|&&(id, dist)| dist < ANOMALY_RADIUS && !anomalous[id])
            .map(|&(id, _)| values[id])
            .collect();

        if !neigh_vals.is_empty() {
            let mean = neigh_vals.iter().sum::<f64>() / neigh_vals.len() as f64;
            if (values[i] - mean).abs() > ANOMALY_DEVIATION_MS {
                anomalous[i] = true;
            }
        } else if (values[i] - global_mean).abs() > ANOMALY_GLOBAL_SIGMAS * global_std {
            anomalous[i] = true;
        }
    }

    anomalous
}

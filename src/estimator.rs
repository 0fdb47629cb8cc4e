/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the regularized least-squares estimator over the sparsified graph Laplacian.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! The closed-form regularized estimator.

use crate::signal::ObservedSignal;
use faer::prelude::*;
use faer::{Mat, Side};
use std::error::Error;
use std::fmt;

/// Errors raised by the regularized solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimatorError {
    /// No training vertices were supplied. The hard-constraint mask would
    /// be all zero and `alpha` alone would have to carry the global scale,
    /// which is almost never intended.
    EmptyTrainingSet,

    /// The system matrix could not be factorised. This occurs with
    /// degenerate hyperparameters, typically `alpha = 0` combined with a
    /// connected component containing no training vertex.
    SingularSystem,
}

impl fmt::Display for EstimatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorError::EmptyTrainingSet => {
                write!(f, "the training index set is empty")
            }
            EstimatorError::SingularSystem => {
                write!(
                    f,
                    "the regularized system matrix is singular or numerically indefinite \
                     (is alpha positive?)"
                )
            }
        }
    }
}

impl Error for EstimatorError {}

/// Solves the regularized interpolation system over a graph Laplacian.
///
/// With `M_l` the diagonal selector of training vertices, `M_u` its
/// complement and `y` the observed values scattered into a length-`N`
/// vector, the estimate is the solution of
///
/// ```text
/// (M_l + alpha * M_u + beta * L) x = y
/// ```
///
/// Training rows carry a unit diagonal, so the solve reproduces their
/// observed values up to numerical precision; `alpha` weakly pins
/// unobserved vertices (and keeps the system nonsingular), while `beta`
/// spreads values along the surviving graph edges. After the solve, the
/// training entries are overwritten with their observed values exactly, so
/// pass-through holds bit-for-bit regardless of conditioning.
///
/// For `alpha > 0` the system matrix is symmetric positive-definite and is
/// factorised with a Cholesky LLᵀ decomposition.
///
/// ### Errors
/// - [`EstimatorError::EmptyTrainingSet`] if `observed` holds no vertices.
/// - [`EstimatorError::SingularSystem`] if the factorisation fails.
pub fn estimate(
    observed: &ObservedSignal,
    laplacian: &Mat<f64>,
    alpha: f64,
    beta: f64,
) -> Result<Vec<f64>, EstimatorError> {
    if observed.is_empty() {
        return Err(EstimatorError::EmptyTrainingSet);
    }

    let n = laplacian.nrows();
    let is_train = observed.membership_mask(n);

    let mut y = Mat::<f64>::zeros(n, 1);
    for (&i, &v) in observed.indices().iter().zip(observed.values()) {
        y[(i, 0)] = v;
    }

    let system = Mat::from_fn(n, n, |i, j| {
        let mask = match (i == j, is_train[i]) {
            (true, true) => 1.0,
            (true, false) => alpha,
            (false, _) => 0.0,
        };
        mask + beta * laplacian[(i, j)]
    });

    let factor = system
        .llt(Side::Lower)
        .map_err(|_| EstimatorError::SingularSystem)?;
    let solution = factor.solve(&y);

    let mut estimates: Vec<f64> = (0..n).map(|i| solution[(i, 0)]).collect();

    // exact pass-through of the observed values, overriding numerical drift
    for (&i, &v) in observed.indices().iter().zip(observed.values()) {
        estimates[i] = v;
    }

    Ok(estimates)
}

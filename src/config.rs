/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares configuration types for edge sparsification and estimator hyperparameters.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Declares configuration types for edge sparsification and estimator hyperparameters.
use serde::{Deserialize, Serialize};

/// Hyperparameters controlling edge sparsification and the regularized solve.
///
/// # Overview
/// The pipeline removes mesh edges whose endpoint signal values disagree
/// sharply (a likely conduction discontinuity) and then smooths the signal
/// over the surviving graph. These parameters control when an edge is
/// removed and how the solve trades data fidelity against smoothness.
///
/// The default `alpha`/`beta` were found by cross-validation on the source
/// datasets and are exposed here as tunable inputs rather than constants;
/// useful ranges are roughly `1e-5..=1e-3` for `alpha` and `1e-2..=1.0`
/// for `beta`.
///
/// ### Default Values
/// - `edge_threshold`: `50.0`
/// - `trust_distance`: `15.0`
/// - `alpha`: `1e-5`
/// - `beta`: `1e-2`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InterpolationParams {
    /// Signal-value jump (in signal units, milliseconds in the source
    /// domain) at or above which an edge is considered to cross a
    /// discontinuity. Strictly smaller jumps always keep the edge.
    pub edge_threshold: f64,

    /// Distance (mesh units, millimetres) within which an edge endpoint
    /// must lie from a real measurement for the jump across the edge to be
    /// trusted. An edge with either endpoint farther than this is kept
    /// regardless of the jump, since far from data a large jump is more
    /// likely an artifact of nearest-neighbour filling.
    pub trust_distance: f64,

    /// Penalty weight on unobserved vertices. Must be positive: with
    /// `alpha = 0` a connected component containing no training vertex
    /// makes the system singular.
    pub alpha: f64,

    /// Smoothness weight on the graph Laplacian term. Larger values pull
    /// neighbouring vertices toward similar values at the cost of fidelity
    /// away from the training data.
    pub beta: f64,
}

impl Default for InterpolationParams {
    fn default() -> Self {
        InterpolationParams {
            edge_threshold: 50.0,
            trust_distance: 15.0,
            alpha: 1e-5,
            beta: 1e-2,
        }
    }
}

impl InterpolationParams {
    /// Returns a new [`InterpolationParamsBuilder`] populated with defaults.
    pub fn builder() -> InterpolationParamsBuilder {
        InterpolationParamsBuilder::new()
    }
}

/// A convenience builder for constructing an [`InterpolationParams`]
/// instance.
///
/// The builder should be called via the [`InterpolationParams::builder`]
/// method. See [`InterpolationParams`] for details on each field.
#[derive(Debug, Clone, Copy)]
pub struct InterpolationParamsBuilder {
    pub edge_threshold: f64,
    pub trust_distance: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl InterpolationParamsBuilder {
    /// Creates a new instance of the [`InterpolationParamsBuilder`].
    fn new() -> Self {
        let defaults = InterpolationParams::default();
        Self {
            edge_threshold: defaults.edge_threshold,
            trust_distance: defaults.trust_distance,
            alpha: defaults.alpha,
            beta: defaults.beta,
        }
    }

    /// Sets the discontinuity threshold on endpoint signal jumps.
    pub fn edge_threshold(mut self, edge_threshold: f64) -> Self {
        self.edge_threshold = edge_threshold;
        self
    }

    /// Sets the measurement trust distance.
    pub fn trust_distance(mut self, trust_distance: f64) -> Self {
        self.trust_distance = trust_distance;
        self
    }

    /// Sets the unobserved-vertex penalty weight.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the smoothness weight.
    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Builds and returns an [`InterpolationParams`] instance from the
    /// values defined in the builder.
    pub fn build(self) -> InterpolationParams {
        InterpolationParams {
            edge_threshold: self.edge_threshold,
            trust_distance: self.trust_distance,
            alpha: self.alpha,
            beta: self.beta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let params = InterpolationParams::builder()
            .edge_threshold(25.0)
            .alpha(1e-3)
            .build();

        assert_eq!(params.edge_threshold, 25.0);
        assert_eq!(params.alpha, 1e-3);
        assert_eq!(params.trust_distance, 15.0);
        assert_eq!(params.beta, 1e-2);
    }

    #[test]
    fn params_roundtrip_through_json() {
        let params = InterpolationParams::default();
        let text = serde_json::to_string(&params).unwrap();
        let back: InterpolationParams = serde_json::from_str(&text).unwrap();
        assert_eq!(back.edge_threshold, params.edge_threshold);
        assert_eq!(back.beta, params.beta);
    }
}

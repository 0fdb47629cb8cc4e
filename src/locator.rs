/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the nearest-known-value locator for signal fill and trust-distance queries.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Spatial lookup of the nearest actually-measured signal values.

use crate::kdtree::KDTree;
use crate::mesh::TriangleMesh;
use crate::signal::{FilledSignal, ObservedSignal};
use faer::{Mat, RowRef};
use std::error::Error;
use std::fmt;

/// Errors raised by [`NearestValueLocator`] queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// A k-nearest query requested more neighbours than the locator holds
    /// reference points. The locator never truncates or clamps `k`, since
    /// doing so would mask a misconfigured measurement set.
    InsufficientReferencePoints { requested: usize, available: usize },
}

impl fmt::Display for LocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorError::InsufficientReferencePoints {
                requested,
                available,
            } => write!(
                f,
                "k-nearest query requested {} neighbours but only {} reference points exist",
                requested, available
            ),
        }
    }
}

impl Error for LocatorError {}

/// A spatial index over the actually-measured sample points.
///
/// Used twice in the pipeline: to fill unmeasured vertices with the value
/// of their nearest measured neighbour, and to measure how far an edge
/// endpoint sits from any real measurement (the sparsifier only trusts a
/// signal jump across an edge when both endpoints are close to real data).
#[derive(Debug)]
pub struct NearestValueLocator {
    tree: KDTree,
    values: Vec<f64>,
}

impl NearestValueLocator {
    /// Builds a locator over reference points and their measured values.
    pub fn new(reference_coords: &Mat<f64>, reference_values: &[f64]) -> Self {
        assert_eq!(
            reference_coords.nrows(),
            reference_values.len(),
            "reference coordinates and values must have the same length"
        );

        Self {
            tree: KDTree::new(reference_coords),
            values: reference_values.to_vec(),
        }
    }

    /// Number of reference points held.
    pub fn num_reference_points(&self) -> usize {
        self.values.len()
    }

    /// Returns the `k` nearest reference points to `point` as
    /// `(reference index, distance)` pairs, ascending by distance.
    ///
    /// ### Errors
    /// - [`LocatorError::InsufficientReferencePoints`] if `k` exceeds the
    ///   number of reference points.
    pub fn query(&self, point: RowRef<f64>, k: usize) -> Result<Vec<(usize, f64)>, LocatorError> {
        if k > self.values.len() {
            return Err(LocatorError::InsufficientReferencePoints {
                requested: k,
                available: self.values.len(),
            });
        }

        Ok(self.tree.k_nearest(point, k))
    }

    /// The measured value at the reference point nearest to `point`.
    pub fn nearest_value(&self, point: RowRef<f64>) -> Result<f64, LocatorError> {
        let nearest = self.query(point, 1)?;
        Ok(self.values[nearest[0].0])
    }

    /// Distance from `point` to the nearest measurement that is not the
    /// point itself.
    ///
    /// Queries two neighbours and discards the first when it sits at
    /// distance zero, which guards against a query point that is itself a
    /// reference point reporting a spurious zero. With a single reference
    /// point that coincides with the query, there is no other measurement
    /// to report a distance to and the result is `f64::INFINITY` (the
    /// sparsifier then treats the endpoint as far from all data and keeps
    /// its edges).
    pub fn trust_distance(&self, point: RowRef<f64>) -> Result<f64, LocatorError> {
        let available = self.values.len();
        if available == 0 {
            return Err(LocatorError::InsufficientReferencePoints {
                requested: 2,
                available,
            });
        }

        let neighbours = self.tree.k_nearest(point, 2);
        match neighbours[0].1 > 0.0 {
            true => Ok(neighbours[0].1),
            // first hit is the point itself
            false => Ok(neighbours.get(1).map_or(f64::INFINITY, |n| n.1)),
        }
    }

    /// Produces a value for every mesh vertex: observed vertices keep their
    /// measured value, the rest take the value of the nearest reference
    /// point (exact nearest-neighbour assignment).
    ///
    /// ### Errors
    /// - [`LocatorError::InsufficientReferencePoints`] if the locator holds
    ///   no reference points at all.
    pub fn fill(
        &self,
        mesh: &TriangleMesh,
        observed: &ObservedSignal,
    ) -> Result<FilledSignal, LocatorError> {
        let n = mesh.num_vertices();

        let mut values = vec![0.0; n];
        let mut is_observed = vec![false; n];
        for (&i, &v) in observed.indices().iter().zip(observed.values()) {
            is_observed[i] = true;
            values[i] = v;
        }

        for i in 0..n {
            if !is_observed[i] {
                values[i] = self.nearest_value(mesh.vertex(i))?;
            }
        }

        Ok(FilledSignal::from_values(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TriangleMesh;

    fn line_locator(xs: &[f64], values: &[f64]) -> NearestValueLocator {
        let coords = Mat::from_fn(xs.len(), 3, |i, j| if j == 0 { xs[i] } else { 0.0 });
        NearestValueLocator::new(&coords, values)
    }

    fn probe(x: f64) -> Mat<f64> {
        Mat::from_fn(1, 3, |_, j| if j == 0 { x } else { 0.0 })
    }

    #[test]
    fn query_rejects_oversized_k() {
        let locator = line_locator(&[0.0, 1.0], &[5.0, 6.0]);
        let p = probe(0.5);
        let err = locator.query(p.row(0), 3).unwrap_err();
        assert_eq!(
            err,
            LocatorError::InsufficientReferencePoints {
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn trust_distance_skips_self_match() {
        let locator = line_locator(&[0.0, 4.0], &[5.0, 6.0]);

        // probing at a reference point must report the other point, not 0
        let p = probe(0.0);
        assert_eq!(locator.trust_distance(p.row(0)).unwrap(), 4.0);

        // probing elsewhere reports the plain nearest distance
        let q = probe(1.0);
        assert_eq!(locator.trust_distance(q.row(0)).unwrap(), 1.0);
    }

    #[test]
    fn trust_distance_with_single_self_reference_is_infinite() {
        let locator = line_locator(&[2.0], &[5.0]);
        let p = probe(2.0);
        assert_eq!(locator.trust_distance(p.row(0)).unwrap(), f64::INFINITY);
    }

    #[test]
    fn trust_distance_with_no_references_errors() {
        let locator = line_locator(&[], &[]);
        let p = probe(0.0);
        assert!(matches!(
            locator.trust_distance(p.row(0)),
            Err(LocatorError::InsufficientReferencePoints { .. })
        ));
    }

    #[test]
    fn fill_keeps_observed_and_copies_nearest() {
        // four vertices on a line; vertices 0 and 3 are measured
        let vertices = Mat::from_fn(4, 3, |i, j| if j == 0 { i as f64 } else { 0.0 });
        let mesh = TriangleMesh::new(vertices, vec![[0, 1, 2], [1, 2, 3]]).unwrap();
        let observed = ObservedSignal::new(vec![0, 3], vec![100.0, -40.0]).unwrap();

        let locator = line_locator(&[0.0, 3.0], &[100.0, -40.0]);
        let filled = locator.fill(&mesh, &observed).unwrap();

        assert_eq!(filled.values(), &[100.0, 100.0, -40.0, -40.0]);
    }
}

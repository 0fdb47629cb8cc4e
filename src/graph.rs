/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements discontinuity-aware edge sparsification and adjacency/Laplacian construction.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Edge sparsification and graph matrix construction.

use crate::config::InterpolationParams;
use crate::locator::{LocatorError, NearestValueLocator};
use crate::mesh::{Edge, TriangleMesh};
use crate::signal::FilledSignal;
use faer::Mat;
use itertools::{Either, Itertools};
use rayon::prelude::*;

/// The outcome of edge sparsification.
#[derive(Debug, Clone)]
pub struct SparsifiedEdges {
    /// Edges retained, in their original order.
    pub kept: Vec<Edge>,

    /// 3D midpoint of each dropped edge, for diagnostic visualization of
    /// where the estimated discontinuity boundary runs.
    pub dropped_midpoints: Vec<[f64; 3]>,
}

impl SparsifiedEdges {
    /// Number of edges removed.
    pub fn num_dropped(&self) -> usize {
        self.dropped_midpoints.len()
    }
}

/// Removes edges that likely cross a true signal discontinuity.
///
/// An edge `{i, j}` is **retained** when any of the following holds:
/// - `|signal[j] - signal[i]| < edge_threshold` (strict: a jump exactly at
///   the threshold drops the edge),
/// - vertex `i` is farther than `trust_distance` from every real
///   measurement,
/// - vertex `j` is farther than `trust_distance` from every real
///   measurement.
///
/// A large jump is only trusted as a real discontinuity when both
/// endpoints sit close to actual measurements; elsewhere the jump is more
/// likely an artifact of nearest-neighbour filling, and the edge is kept
/// to preserve connectivity. Retained edges are always a subset of the
/// input; an edge with `|Δ| = 0` is always retained.
///
/// The per-edge trust-distance queries are independent and run in
/// parallel.
///
/// ### Errors
/// - [`LocatorError::InsufficientReferencePoints`] if the locator holds no
///   reference points.
pub fn sparsify_edges(
    mesh: &TriangleMesh,
    edges: &[Edge],
    signal: &FilledSignal,
    locator: &NearestValueLocator,
    params: &InterpolationParams,
) -> Result<SparsifiedEdges, LocatorError> {
    let keep_flags: Vec<bool> = edges
        .par_iter()
        .map(|edge| -> Result<bool, LocatorError> {
            let delta = (signal.value(edge.j) - signal.value(edge.i)).abs();
            if delta < params.edge_threshold {
                return Ok(true);
            }

            let d_i = locator.trust_distance(mesh.vertex(edge.i))?;
            let d_j = locator.trust_distance(mesh.vertex(edge.j))?;
            Ok(d_i > params.trust_distance || d_j > params.trust_distance)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (kept, dropped_midpoints): (Vec<Edge>, Vec<[f64; 3]>) = edges
        .iter()
        .zip(keep_flags)
        .partition_map(|(&edge, keep)| match keep {
            true => Either::Left(edge),
            false => {
                let a = mesh.vertex(edge.i);
                let b = mesh.vertex(edge.j);
                Either::Right([
                    (a[0] + b[0]) / 2.0,
                    (a[1] + b[1]) / 2.0,
                    (a[2] + b[2]) / 2.0,
                ])
            }
        });

    Ok(SparsifiedEdges {
        kept,
        dropped_midpoints,
    })
}

/// Builds the symmetric binary adjacency matrix of an edge list.
pub fn unweighted_adjacency(num_vertices: usize, edges: &[Edge]) -> Mat<f64> {
    let mut a = Mat::<f64>::zeros(num_vertices, num_vertices);
    for edge in edges {
        a[(edge.i, edge.j)] = 1.0;
        a[(edge.j, edge.i)] = 1.0;
    }
    a
}

/// Builds the diagonal degree matrix `D[i, i] = sum_j A[i, j]`.
pub fn degree_matrix(adjacency: &Mat<f64>) -> Mat<f64> {
    let n = adjacency.nrows();
    let mut d = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        d[(i, i)] = adjacency.row(i).iter().sum();
    }
    d
}

/// Builds the combinatorial graph Laplacian `L = D - A`.
///
/// `L` is symmetric positive-semidefinite with one zero eigenvalue per
/// connected component; every row sums to zero.
pub fn laplacian(adjacency: &Mat<f64>) -> Mat<f64> {
    let d = degree_matrix(adjacency);
    d - adjacency
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::edge_matrix;
    use crate::signal::ObservedSignal;

    /// Single triangle with vertices 1 mm apart in x/y.
    fn triangle_mesh() -> TriangleMesh {
        let vertices = Mat::from_fn(3, 3, |i, j| match (i, j) {
            (1, 0) => 1.0,
            (2, 1) => 1.0,
            _ => 0.0,
        });
        TriangleMesh::new(vertices, vec![[0, 1, 2]]).unwrap()
    }

    fn locator_for(mesh: &TriangleMesh, observed: &ObservedSignal) -> NearestValueLocator {
        NearestValueLocator::new(&observed.coordinates(mesh), observed.values())
    }

    #[test]
    fn jump_at_threshold_is_dropped_below_is_kept() {
        let mesh = triangle_mesh();
        // all three vertices measured, so every endpoint is trusted
        let observed = ObservedSignal::new(vec![0, 1, 2], vec![0.0, 50.0, 10.0]).unwrap();
        let locator = locator_for(&mesh, &observed);
        let filled = FilledSignal::from_values(vec![0.0, 50.0, 10.0]);
        let params = InterpolationParams::default(); // threshold 50

        let edges = edge_matrix(&mesh).edges;
        let result = sparsify_edges(&mesh, &edges, &filled, &locator, &params).unwrap();

        // {0,1} has delta exactly 50 -> dropped; {1,2} delta 40 and
        // {0,2} delta 10 -> kept
        assert_eq!(result.kept, vec![Edge::new(1, 2), Edge::new(0, 2)]);
        assert_eq!(result.num_dropped(), 1);
        assert_eq!(result.dropped_midpoints[0], [0.5, 0.0, 0.0]);
    }

    #[test]
    fn untrusted_endpoints_keep_arbitrarily_large_jumps() {
        // vertices 100 mm apart; only vertex 0 is measured, so endpoints 1
        // and 2 sit far beyond the trust distance
        let vertices = Mat::from_fn(3, 3, |i, j| match (i, j) {
            (1, 0) => 100.0,
            (2, 1) => 100.0,
            _ => 0.0,
        });
        let mesh = TriangleMesh::new(vertices, vec![[0, 1, 2]]).unwrap();
        let observed = ObservedSignal::new(vec![0], vec![0.0]).unwrap();
        let locator = locator_for(&mesh, &observed);
        let filled = FilledSignal::from_values(vec![0.0, 1e6, -1e6]);
        let params = InterpolationParams::default();

        let edges = edge_matrix(&mesh).edges;
        let result = sparsify_edges(&mesh, &edges, &filled, &locator, &params).unwrap();

        assert_eq!(result.kept.len(), edges.len());
        assert!(result.dropped_midpoints.is_empty());
    }

    #[test]
    fn zero_delta_edges_are_always_retained() {
        let mesh = triangle_mesh();
        let observed = ObservedSignal::new(vec![0, 1, 2], vec![5.0, 5.0, 5.0]).unwrap();
        let locator = locator_for(&mesh, &observed);
        let filled = FilledSignal::from_values(vec![5.0, 5.0, 5.0]);
        let params = InterpolationParams::builder().edge_threshold(1e-12).build();

        let edges = edge_matrix(&mesh).edges;
        let result = sparsify_edges(&mesh, &edges, &filled, &locator, &params).unwrap();
        assert_eq!(result.kept.len(), edges.len());
    }

    #[test]
    fn scaling_signal_and_threshold_together_is_invariant() {
        let mesh = triangle_mesh();
        let observed = ObservedSignal::new(vec![0, 1, 2], vec![0.0, 30.0, 80.0]).unwrap();
        let locator = locator_for(&mesh, &observed);
        let params = InterpolationParams::builder().edge_threshold(40.0).build();

        let filled = FilledSignal::from_values(vec![0.0, 30.0, 80.0]);
        let edges = edge_matrix(&mesh).edges;
        let baseline = sparsify_edges(&mesh, &edges, &filled, &locator, &params).unwrap();

        let doubled = FilledSignal::from_values(vec![0.0, 60.0, 160.0]);
        let params2 = InterpolationParams::builder().edge_threshold(80.0).build();
        let scaled = sparsify_edges(&mesh, &edges, &doubled, &locator, &params2).unwrap();

        assert_eq!(baseline.kept, scaled.kept);
    }

    #[test]
    fn adjacency_is_symmetric_with_zero_diagonal() {
        let edges = vec![Edge::new(0, 1), Edge::new(1, 3), Edge::new(2, 3)];
        let a = unweighted_adjacency(4, &edges);

        for i in 0..4 {
            assert_eq!(a[(i, i)], 0.0);
            for j in 0..4 {
                assert_eq!(a[(i, j)], a[(j, i)]);
            }
        }
        assert_eq!(a[(0, 1)], 1.0);
        assert_eq!(a[(0, 2)], 0.0);
    }

    #[test]
    fn laplacian_rows_sum_to_zero() {
        let mesh = triangle_mesh();
        let edges = edge_matrix(&mesh).edges;
        let a = unweighted_adjacency(mesh.num_vertices(), &edges);
        let l = laplacian(&a);

        for i in 0..l.nrows() {
            let row_sum: f64 = l.row(i).iter().sum();
            assert!(row_sum.abs() < 1e-14);
        }
    }

    #[test]
    fn connected_triangle_laplacian_annihilates_constants() {
        // L * 1 = 0 for a connected graph
        let mesh = triangle_mesh();
        let edges = edge_matrix(&mesh).edges;
        let a = unweighted_adjacency(mesh.num_vertices(), &edges);
        let l = laplacian(&a);

        let ones = Mat::from_fn(3, 1, |_, _| 1.0);
        let product = &l * &ones;
        for i in 0..3 {
            assert!(product[(i, 0)].abs() < 1e-14);
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for graph-based LAT interpolation.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Graph-based interpolation of local activation time (LAT) maps.
//!
//! Electro-anatomical mapping systems record local activation times at a
//! sparse set of catheter positions on a triangulated cardiac surface. This
//! crate estimates the activation time at **every** mesh vertex from those
//! sparse samples by treating the mesh as a graph and solving a regularized
//! least-squares problem on it:
//!
//! - The mesh connectivity yields an edge set; edges suspected of crossing a
//!   true conduction discontinuity (e.g. a scar boundary) are removed before
//!   smoothing, so the estimate does not blur across them.
//! - An edge is only removed when both of its endpoints lie close enough to a
//!   real measurement for the signal jump across it to be trusted; far from
//!   data, edges are kept to preserve connectivity.
//! - The surviving graph's combinatorial Laplacian `L = D - A` drives a
//!   closed-form solve of `(M_l + alpha*M_u + beta*L) x = y`, where `M_l`
//!   pins measured vertices to their observed values and `alpha`, `beta`
//!   weight the unobserved-vertex penalty and the smoothness prior.
//!
//! The solve is a single dense Cholesky factorisation, built on
//! [`faer`](https://docs.rs/faer/latest/faer/) - meshes in the intended range
//! (hundreds to a few thousand vertices) fit comfortably in memory.
//!
//! # Example
//!
//! ```
//! use faer::Mat;
//! use graphlat::{GraphInterpolator, ObservedSignal, TriangleMesh};
//! use graphlat::config::InterpolationParams;
//!
//! // Two triangles sharing an edge, flat in z.
//! let vertices = Mat::from_fn(4, 3, |i, j| match (i, j) {
//!     (1, 0) => 1.0,
//!     (2, 1) => 1.0,
//!     (3, 0) => 1.0,
//!     (3, 1) => 1.0,
//!     _ => 0.0,
//! });
//! let triangles = vec![[0, 1, 2], [1, 3, 2]];
//! let mesh = TriangleMesh::new(vertices, triangles).unwrap();
//!
//! // Activation times measured at two of the four vertices.
//! let observed = ObservedSignal::new(vec![0, 3], vec![10.0, 30.0]).unwrap();
//!
//! let interpolator = GraphInterpolator::builder(mesh, observed)
//!     .params(InterpolationParams::default())
//!     .build();
//! let map = interpolator.fit().unwrap();
//!
//! // Measured vertices pass through exactly; the rest are smoothed in.
//! assert_eq!(map.estimates[0], 10.0);
//! assert_eq!(map.estimates[3], 30.0);
//! assert!(map.estimates.iter().all(|v| v.is_finite()));
//! ```
//!
//! # References
//! 1.  Shuman et al. The emerging field of signal processing on graphs. IEEE
//!     Signal Processing Magazine, 30(3):83-98, 2013.
//! 2.  Belkin, Matveeva, Niyogi. Regularization and semi-supervised learning
//!     on large graphs. COLT 2004.

pub mod config;

pub mod progress;

mod common;

mod estimator;

mod graph;

mod interp;

mod kdtree;

mod locator;

mod mesh;

mod signal;

pub use {
    common::{csv_to_samples, estimates_to_csv, random_partition},
    estimator::{estimate, EstimatorError},
    graph::{degree_matrix, laplacian, sparsify_edges, unweighted_adjacency, SparsifiedEdges},
    interp::{
        interpolate, GraphInterpolator, GraphInterpolatorBuilder, InterpolationError, LatMap,
        MapIOError,
    },
    locator::{LocatorError, NearestValueLocator},
    mesh::{edge_matrix, Edge, EdgeSet, MeshError, TriangleMesh},
    signal::{flag_anomalous, map_samples, FilledSignal, ObservedSignal, SignalError},
};

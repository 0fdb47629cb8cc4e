/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the triangulated surface mesh data model and mesh-to-graph edge extraction.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Triangulated surface mesh data model and mesh-to-graph edge extraction.

use faer::{Mat, RowRef};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Errors raised when validating mesh connectivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A triangle references a vertex index outside `[0, num_vertices)`.
    TriangleOutOfRange {
        triangle: usize,
        vertex: usize,
        num_vertices: usize,
    },

    /// The vertex matrix does not have three coordinate columns.
    BadVertexDimensions { ncols: usize },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::TriangleOutOfRange {
                triangle,
                vertex,
                num_vertices,
            } => write!(
                f,
                "triangle {} references vertex {} but the mesh has {} vertices",
                triangle, vertex, num_vertices
            ),
            MeshError::BadVertexDimensions { ncols } => {
                write!(f, "expected 3 coordinate columns, got {}", ncols)
            }
        }
    }
}

impl Error for MeshError {}

/// An undirected graph edge between two mesh vertices.
///
/// Stored in canonical form with `i < j` so that the same vertex pair
/// compares and hashes identically regardless of the orientation it was
/// encountered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub i: usize,
    pub j: usize,
}

impl Edge {
    /// Creates a canonical edge from two distinct vertex indices.
    pub fn new(a: usize, b: usize) -> Self {
        debug_assert!(a != b, "degenerate edge {a}-{b}");
        match a < b {
            true => Edge { i: a, j: b },
            false => Edge { i: b, j: a },
        }
    }
}

/// The deduplicated edge list of a mesh, with per-edge incident triangles.
#[derive(Debug, Clone)]
pub struct EdgeSet {
    /// Edges in order of first sighting during triangle iteration.
    pub edges: Vec<Edge>,

    /// For each edge, the indices (into the mesh triangle list) of the
    /// triangles containing it. Interior manifold edges have two, boundary
    /// edges one.
    pub edge_triangles: Vec<Vec<usize>>,
}

impl EdgeSet {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// A triangulated anatomical surface mesh.
///
/// Holds an `N x 3` matrix of vertex coordinates (millimetres in the source
/// domain) and a list of triangles, each a triplet of vertex indices.
/// Connectivity is validated once at construction; the mesh is immutable for
/// the lifetime of an interpolation run.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    vertices: Mat<f64>,
    triangles: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Creates a mesh from vertex coordinates and triangle index triples.
    ///
    /// ### Errors
    /// - [`MeshError::BadVertexDimensions`] if `vertices` is not `N x 3`.
    /// - [`MeshError::TriangleOutOfRange`] if any triangle references a
    ///   vertex index outside `[0, N)`.
    pub fn new(vertices: Mat<f64>, triangles: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        if vertices.ncols() != 3 {
            return Err(MeshError::BadVertexDimensions {
                ncols: vertices.ncols(),
            });
        }

        let num_vertices = vertices.nrows();
        for (t, tri) in triangles.iter().enumerate() {
            for &v in tri {
                if v >= num_vertices {
                    return Err(MeshError::TriangleOutOfRange {
                        triangle: t,
                        vertex: v,
                        num_vertices,
                    });
                }
            }
        }

        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Number of vertices in the mesh.
    pub fn num_vertices(&self) -> usize {
        self.vertices.nrows()
    }

    /// The `N x 3` vertex coordinate matrix.
    pub fn vertices(&self) -> &Mat<f64> {
        &self.vertices
    }

    /// The coordinates of a single vertex.
    pub fn vertex(&self, index: usize) -> RowRef<'_, f64> {
        self.vertices.row(index)
    }

    /// The triangle index triples.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }
}

/// Computes the deduplicated edge list of a mesh from its triangles.
///
/// Each triangle `(a, b, c)` contributes the edges `{a, b}`, `{b, c}` and
/// `{a, c}`. A pair arising from multiple triangles yields a single edge
/// whose incident-triangle list accumulates every sighting. Membership is
/// tracked through a canonical-pair hash map, so lookup is near constant
/// time; the returned edge order is the order of first sighting.
pub fn edge_matrix(mesh: &TriangleMesh) -> EdgeSet {
    let mut edges: Vec<Edge> = Vec::new();
    let mut edge_triangles: Vec<Vec<usize>> = Vec::new();
    let mut index_of: HashMap<Edge, usize> = HashMap::new();

    for (t, tri) in mesh.triangles().iter().enumerate() {
        let tri_edges = [
            Edge::new(tri[0], tri[1]),
            Edge::new(tri[1], tri[2]),
            Edge::new(tri[0], tri[2]),
        ];

        for edge in tri_edges {
            match index_of.get(&edge) {
                Some(&k) => edge_triangles[k].push(t),
                None => {
                    index_of.insert(edge, edges.len());
                    edges.push(edge);
                    edge_triangles.push(vec![t]);
                }
            }
        }
    }

    EdgeSet {
        edges,
        edge_triangles,
    }
}

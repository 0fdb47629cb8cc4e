/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides a simple KD-tree implementation for k-nearest-neighbour queries over mesh points.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::{Mat, Row, RowRef};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

// Wrapper for a single point row carrying its original row index.
#[derive(Debug, Clone, PartialEq)]
struct PointRow {
    coords: Row<f64>,
    id: usize,
}

impl PointRow {
    fn new(coords: RowRef<f64>, id: usize) -> Self {
        Self {
            coords: coords.to_owned(),
            id,
        }
    }
}

fn euclidean(a: RowRef<f64>, b: RowRef<f64>) -> f64 {
    let dist: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| (p - q).powi(2))
        .sum();

    dist.sqrt()
}

/// A node in the KDTree
#[derive(Debug)]
struct Node {
    point: PointRow,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug, PartialEq)]
struct Neighbour {
    distance: f64,
    id: usize,
}

impl Eq for Neighbour {}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        // Reverse order for max-heap
        other.distance.partial_cmp(&self.distance)
    }
}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

/// A static KD-tree over the rows of a point matrix.
///
/// Supports k-nearest-neighbour queries by Euclidean distance, returning
/// row indices into the original matrix together with true (not squared)
/// distances, ascending.
#[derive(Debug)]
pub struct KDTree {
    nodes: Vec<Node>,
}

impl KDTree {
    /// Constructs a new KDTree from a matrix of points (rows are points).
    pub fn new(points: &Mat<f64>) -> Self {
        let mut rows: Vec<PointRow> = (0..points.nrows())
            .map(|i| PointRow::new(points.row(i), i))
            .collect();

        let mut tree = KDTree { nodes: Vec::new() };
        tree.build_tree(&mut rows, 0);
        tree
    }

    /// Number of points stored in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recursively builds the KDTree and stores nodes in a flat vector.
    fn build_tree(&mut self, points: &mut [PointRow], depth: usize) -> Option<usize> {
        if points.is_empty() {
            return None;
        }

        // Determine splitting axis
        let axis = depth % points[0].coords.ncols();

        // Sort points by the current axis and pivot on the median
        points.sort_by(|a, b| {
            a.coords[axis]
                .partial_cmp(&b.coords[axis])
                .unwrap_or(Ordering::Equal)
        });
        let mid = points.len() / 2;

        let node_index = self.nodes.len();
        self.nodes.push(Node {
            point: points[mid].clone(),
            left: None,
            right: None,
        });

        self.nodes[node_index].left = self.build_tree(&mut points[..mid], depth + 1);
        self.nodes[node_index].right = self.build_tree(&mut points[mid + 1..], depth + 1);

        Some(node_index)
    }

    /// Returns up to `k` nearest stored points to `target`, closest first.
    ///
    /// If the tree holds fewer than `k` points, everything it holds is
    /// returned; callers that consider that an error must check the length
    /// themselves.
    pub fn k_nearest(&self, target: RowRef<f64>, k: usize) -> Vec<(usize, f64)> {
        if k == 0 {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k);
        self.k_nearest_impl(0, target, k, 0, &mut heap);

        let mut result: Vec<_> = heap.into_sorted_vec();
        result.reverse(); // closest first
        result.into_iter().map(|n| (n.id, n.distance)).collect()
    }

    fn k_nearest_impl(
        &self,
        node_index: usize,
        target: RowRef<f64>,
        k: usize,
        depth: usize,
        heap: &mut BinaryHeap<Neighbour>,
    ) {
        if node_index >= self.nodes.len() {
            return;
        }

        let node = &self.nodes[node_index];
        let dist = euclidean(target, node.point.coords.as_ref());

        if heap.len() < k {
            heap.push(Neighbour {
                distance: dist,
                id: node.point.id,
            });
        } else if dist < heap.peek().unwrap().distance {
            heap.pop();
            heap.push(Neighbour {
                distance: dist,
                id: node.point.id,
            });
        }

        let axis = depth % node.point.coords.ncols();
        let diff = target[axis] - node.point.coords[axis];

        let (near_idx, far_idx) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near_idx {
            self.k_nearest_impl(near, target, k, depth + 1, heap);
        }

        if let Some(far) = far_idx {
            // the splitting plane can only hide closer points if it lies
            // within the current worst radius
            if heap.len() < k || diff.abs() <= heap.peek().unwrap().distance {
                self.k_nearest_impl(far, target, k, depth + 1, heap);
            }
        }
    }
}

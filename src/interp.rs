/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the end-to-end interpolation pipeline, result type, and map persistence.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! The end-to-end interpolation pipeline.

use crate::common;
use crate::config::InterpolationParams;
use crate::estimator::{estimate, EstimatorError};
use crate::graph::{laplacian, sparsify_edges, unweighted_adjacency};
use crate::locator::{LocatorError, NearestValueLocator};
use crate::mesh::{edge_matrix, MeshError, TriangleMesh};
use crate::progress::{ProgressMsg, ProgressSink};
use crate::signal::{ObservedSignal, SignalError};
use faer::Mat;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors raised while running the interpolation pipeline.
#[derive(Debug)]
pub enum InterpolationError {
    /// The mesh connectivity is malformed.
    Mesh(MeshError),

    /// The observed signal could not be assembled.
    Signal(SignalError),

    /// A spatial query against the measured points failed.
    Locator(LocatorError),

    /// The regularized solve failed.
    Estimator(EstimatorError),
}

impl fmt::Display for InterpolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpolationError::Mesh(e) => write!(f, "mesh validation failed: {}", e),
            InterpolationError::Signal(e) => write!(f, "observed signal invalid: {}", e),
            InterpolationError::Locator(e) => write!(f, "nearest-value query failed: {}", e),
            InterpolationError::Estimator(e) => write!(f, "estimator failed: {}", e),
        }
    }
}

impl Error for InterpolationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InterpolationError::Mesh(e) => Some(e),
            InterpolationError::Signal(e) => Some(e),
            InterpolationError::Locator(e) => Some(e),
            InterpolationError::Estimator(e) => Some(e),
        }
    }
}

impl From<MeshError> for InterpolationError {
    fn from(e: MeshError) -> Self {
        InterpolationError::Mesh(e)
    }
}

impl From<SignalError> for InterpolationError {
    fn from(e: SignalError) -> Self {
        InterpolationError::Signal(e)
    }
}

impl From<LocatorError> for InterpolationError {
    fn from(e: LocatorError) -> Self {
        InterpolationError::Locator(e)
    }
}

impl From<EstimatorError> for InterpolationError {
    fn from(e: EstimatorError) -> Self {
        InterpolationError::Estimator(e)
    }
}

/// A fitted per-vertex LAT estimate with pipeline diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatMap {
    /// Estimated signal value for every mesh vertex. Training vertices
    /// carry their observed value exactly.
    pub estimates: Vec<f64>,

    /// Number of distinct edges extracted from the mesh.
    pub num_edges: usize,

    /// Number of edges surviving sparsification.
    pub num_kept_edges: usize,

    /// Midpoints of the dropped edges (the estimated discontinuity
    /// boundary), for downstream visualization.
    pub dropped_midpoints: Vec<[f64; 3]>,

    /// The hyperparameters the map was fitted with.
    pub params: InterpolationParams,
}

const JSON_FORMAT_NAME: &str = "graphlat.map.json";
const JSON_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct JsonEnvelope<T> {
    format: String,
    version: u32,
    #[serde(flatten)]
    map: T,
}

/// Errors that can occur when saving or loading a [`LatMap`].
#[derive(Debug)]
pub enum MapIOError {
    /// Low-level file I/O failure.
    Io { path: PathBuf, source: io::Error },

    /// Error serializing the map to JSON.
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Error parsing JSON when reading a map from disk.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The JSON `format` field does not match the expected map format.
    FormatMismatch { path: PathBuf, found: String },

    /// The JSON `version` field does not match the supported version.
    VersionMismatch { path: PathBuf, found: u32 },
}

impl fmt::Display for MapIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapIOError::Io { path, source } => {
                write!(f, "accessing {}: {}", path.display(), source)
            }
            MapIOError::Serialize { path, source } => {
                write!(f, "serializing JSON to {}: {}", path.display(), source)
            }
            MapIOError::Parse { path, source } => {
                write!(f, "parsing JSON in {}: {}", path.display(), source)
            }
            MapIOError::FormatMismatch { path, found } => write!(
                f,
                "unsupported format {:?} (expected {:?}) in {}",
                found,
                JSON_FORMAT_NAME,
                path.display()
            ),
            MapIOError::VersionMismatch { path, found } => write!(
                f,
                "unsupported version {} (expected {}) in {}",
                found,
                JSON_VERSION,
                path.display()
            ),
        }
    }
}

impl Error for MapIOError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MapIOError::Io { source, .. } => Some(source),
            MapIOError::Serialize { source, .. } | MapIOError::Parse { source, .. } => Some(source),
            MapIOError::FormatMismatch { .. } | MapIOError::VersionMismatch { .. } => None,
        }
    }
}

impl LatMap {
    /// Saves the map as JSON with a format/version envelope.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MapIOError> {
        let path_ref = path.as_ref();

        let file = File::create(path_ref).map_err(|e| MapIOError::Io {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);

        let envelope = JsonEnvelope {
            format: JSON_FORMAT_NAME.to_string(),
            version: JSON_VERSION,
            map: self,
        };
        serde_json::to_writer_pretty(&mut writer, &envelope).map_err(|e| {
            MapIOError::Serialize {
                path: path_ref.to_path_buf(),
                source: e,
            }
        })?;

        writer.flush().map_err(|e| MapIOError::Io {
            path: path_ref.to_path_buf(),
            source: e,
        })
    }

    /// Loads a map saved by [`LatMap::save`], validating the envelope.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapIOError> {
        let path_ref = path.as_ref();

        let file = File::open(path_ref).map_err(|e| MapIOError::Io {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let reader = BufReader::new(file);

        let envelope: JsonEnvelope<LatMap> =
            serde_json::from_reader(reader).map_err(|e| MapIOError::Parse {
                path: path_ref.to_path_buf(),
                source: e,
            })?;

        if envelope.format != JSON_FORMAT_NAME {
            return Err(MapIOError::FormatMismatch {
                path: path_ref.to_path_buf(),
                found: envelope.format,
            });
        }
        if envelope.version != JSON_VERSION {
            return Err(MapIOError::VersionMismatch {
                path: path_ref.to_path_buf(),
                found: envelope.version,
            });
        }

        Ok(envelope.map)
    }

    /// Writes the per-vertex estimates alongside their coordinates as CSV.
    pub fn estimates_to_csv(
        &self,
        mesh: &TriangleMesh,
        filename: &str,
    ) -> Result<(), Box<dyn Error>> {
        common::estimates_to_csv(mesh.vertices(), &self.estimates, filename)
    }
}

/// The graph-based LAT interpolator.
///
/// Chains the full pipeline over an immutable mesh and observed signal:
/// nearest-neighbour fill of unmeasured vertices, edge extraction,
/// discontinuity-aware sparsification, Laplacian construction, and the
/// regularized solve with the *observed* (pre-fill) values as hard
/// constraints.
///
/// Construct via [`GraphInterpolator::builder`].
#[derive(Debug)]
pub struct GraphInterpolator {
    mesh: TriangleMesh,
    observed: ObservedSignal,
    params: InterpolationParams,
    progress: Option<Arc<dyn ProgressSink>>,
}

/// A convenience builder for constructing a [`GraphInterpolator`].
///
/// The builder should be called via the [`GraphInterpolator::builder`]
/// method.
#[derive(Debug)]
pub struct GraphInterpolatorBuilder {
    mesh: TriangleMesh,
    observed: ObservedSignal,
    params: InterpolationParams,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl GraphInterpolatorBuilder {
    fn new(mesh: TriangleMesh, observed: ObservedSignal) -> Self {
        Self {
            mesh,
            observed,
            params: InterpolationParams::default(),
            progress: None,
        }
    }

    /// Sets the sparsification and solve hyperparameters.
    pub fn params(mut self, params: InterpolationParams) -> Self {
        self.params = params;
        self
    }

    /// Attaches a progress sink notified at each pipeline stage.
    pub fn progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Builds and returns a [`GraphInterpolator`] instance.
    pub fn build(self) -> GraphInterpolator {
        GraphInterpolator {
            mesh: self.mesh,
            observed: self.observed,
            params: self.params,
            progress: self.progress,
        }
    }
}

impl GraphInterpolator {
    /// Returns a new [`GraphInterpolatorBuilder`] over a mesh and the
    /// signal observed at a subset of its vertices.
    pub fn builder(mesh: TriangleMesh, observed: ObservedSignal) -> GraphInterpolatorBuilder {
        GraphInterpolatorBuilder::new(mesh, observed)
    }

    /// The mesh being interpolated over.
    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// The observed training signal.
    pub fn observed(&self) -> &ObservedSignal {
        &self.observed
    }

    fn emit(&self, msg: ProgressMsg) {
        if let Some(sink) = &self.progress {
            sink.emit(msg);
        }
    }

    /// Runs the full pipeline and returns the fitted [`LatMap`].
    ///
    /// ### Errors
    /// - [`InterpolationError::Estimator`] with
    ///   [`EstimatorError::EmptyTrainingSet`] if no vertices are observed.
    /// - [`InterpolationError::Locator`] if a spatial query fails.
    /// - [`InterpolationError::Estimator`] with
    ///   [`EstimatorError::SingularSystem`] if the solve cannot be
    ///   factorised (see [`InterpolationParams::alpha`]).
    pub fn fit(&self) -> Result<LatMap, InterpolationError> {
        if self.observed.is_empty() {
            return Err(EstimatorError::EmptyTrainingSet.into());
        }

        let n = self.mesh.num_vertices();

        // spatial index over the actually-measured vertices only
        let measured_coords = self.observed.coordinates(&self.mesh);
        let locator = NearestValueLocator::new(&measured_coords, self.observed.values());

        let filled = locator.fill(&self.mesh, &self.observed)?;

        let edge_set = edge_matrix(&self.mesh);
        self.emit(ProgressMsg::EdgesBuilt {
            num_edges: edge_set.len(),
        });

        let sparsified =
            sparsify_edges(&self.mesh, &edge_set.edges, &filled, &locator, &self.params)?;
        self.emit(ProgressMsg::EdgesPruned {
            num_kept: sparsified.kept.len(),
            num_dropped: sparsified.num_dropped(),
        });

        let adjacency = unweighted_adjacency(n, &sparsified.kept);
        let l = laplacian(&adjacency);

        let estimates = estimate(&self.observed, &l, self.params.alpha, self.params.beta)?;
        self.emit(ProgressMsg::SolveFinished { num_vertices: n });

        Ok(LatMap {
            estimates,
            num_edges: edge_set.len(),
            num_kept_edges: sparsified.kept.len(),
            dropped_midpoints: sparsified.dropped_midpoints,
            params: self.params,
        })
    }
}

/// One-shot convenience over the full pipeline.
///
/// Builds the mesh and observed signal, fits with the given parameters,
/// and returns the per-vertex estimates. See [`GraphInterpolator`] for the
/// staged API with diagnostics and progress reporting.
pub fn interpolate(
    vertices: Mat<f64>,
    triangles: Vec<[usize; 3]>,
    train_indices: Vec<usize>,
    train_values: Vec<f64>,
    params: InterpolationParams,
) -> Result<Vec<f64>, InterpolationError> {
    let mesh = TriangleMesh::new(vertices, triangles)?;
    let observed = ObservedSignal::new(train_indices, train_values)?;

    let map = GraphInterpolator::builder(mesh, observed)
        .params(params)
        .build()
        .fit()?;

    Ok(map.estimates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::closure_sink;
    use std::sync::mpsc;

    fn single_triangle() -> (Mat<f64>, Vec<[usize; 3]>) {
        let vertices = Mat::from_fn(3, 3, |i, j| match (i, j) {
            (1, 0) => 1.0,
            (2, 1) => 1.0,
            _ => 0.0,
        });
        (vertices, vec![[0, 1, 2]])
    }

    #[test]
    fn degenerate_single_triangle_pins_and_smooths() {
        let (vertices, triangles) = single_triangle();
        let params = InterpolationParams::builder()
            .alpha(1e-5)
            .beta(1e-2)
            .build();

        let estimates = interpolate(vertices, triangles, vec![0], vec![100.0], params).unwrap();

        assert_eq!(estimates[0], 100.0);
        for &v in &estimates[1..] {
            assert!(v.is_finite());
            assert!(v >= 0.0 && v <= 100.0, "estimate {v} outside [0, 100]");
        }
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let (vertices, triangles) = single_triangle();
        let err =
            interpolate(vertices, triangles, vec![], vec![], InterpolationParams::default())
                .unwrap_err();
        assert!(matches!(
            err,
            InterpolationError::Estimator(EstimatorError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn malformed_mesh_is_rejected() {
        let vertices = Mat::<f64>::zeros(3, 3);
        let err = interpolate(
            vertices,
            vec![[0, 1, 9]],
            vec![0],
            vec![1.0],
            InterpolationParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InterpolationError::Mesh(_)));
    }

    #[test]
    fn discontinuity_is_not_smoothed_across() {
        // two squares joined along the x = 1 seam; the left half sits at
        // LAT 0, the right at LAT 200, with all four corners of each half
        // measured. Every seam-crossing edge jumps by 200 >= threshold and
        // gets dropped, so the halves are estimated independently.
        let vertices = Mat::from_fn(6, 3, |i, j| match j {
            0 => (i % 3) as f64,
            1 => (i / 3) as f64,
            _ => 0.0,
        });
        // columns x = 0, 1, 2; rows y = 0, 1
        let triangles = vec![[0, 1, 3], [1, 4, 3], [1, 2, 4], [2, 5, 4]];

        let observed =
            ObservedSignal::new(vec![0, 2, 3, 5], vec![0.0, 200.0, 0.0, 200.0]).unwrap();
        let mesh = TriangleMesh::new(vertices, triangles).unwrap();
        let map = GraphInterpolator::builder(mesh, observed)
            .params(InterpolationParams::default())
            .build()
            .fit()
            .unwrap();

        assert!(map.num_kept_edges < map.num_edges);
        // the unmeasured seam vertices (1 and 4) take a side rather than
        // averaging to ~100
        assert!(map.estimates[1] < 50.0 || map.estimates[1] > 150.0);
        assert!(map.estimates[4] < 50.0 || map.estimates[4] > 150.0);
    }

    #[test]
    fn progress_events_are_emitted_in_stage_order() {
        let (tx, rx) = mpsc::channel();
        let (sink, handle) = closure_sink(16, move |msg| {
            let _ = tx.send(msg);
        });

        let (vertices, triangles) = single_triangle();
        let mesh = TriangleMesh::new(vertices, triangles).unwrap();
        let observed = ObservedSignal::new(vec![0], vec![1.0]).unwrap();

        let interpolator = GraphInterpolator::builder(mesh, observed)
            .progress_sink(sink)
            .build();
        interpolator.fit().unwrap();
        drop(interpolator); // closes the sink channel
        handle.join().unwrap();

        let events: Vec<ProgressMsg> = rx.iter().collect();
        assert!(matches!(events[0], ProgressMsg::EdgesBuilt { num_edges: 3 }));
        assert!(matches!(events[1], ProgressMsg::EdgesPruned { .. }));
        assert!(matches!(
            events[2],
            ProgressMsg::SolveFinished { num_vertices: 3 }
        ));
    }

    #[test]
    fn map_roundtrips_through_json() {
        let (vertices, triangles) = single_triangle();
        let mesh = TriangleMesh::new(vertices, triangles).unwrap();
        let observed = ObservedSignal::new(vec![0], vec![25.0]).unwrap();
        let map = GraphInterpolator::builder(mesh, observed)
            .build()
            .fit()
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fitted.json");
        map.save(&path).unwrap();
        let loaded = LatMap::load(&path).unwrap();

        assert_eq!(loaded.estimates, map.estimates);
        assert_eq!(loaded.num_edges, map.num_edges);
        assert_eq!(loaded.num_kept_edges, map.num_kept_edges);
    }

    #[test]
    fn load_rejects_foreign_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.json");
        std::fs::write(
            &path,
            r#"{"format":"something.else","version":1,"estimates":[],"num_edges":0,"num_kept_edges":0,"dropped_midpoints":[],"params":{"edge_threshold":50.0,"trust_distance":15.0,"alpha":1e-5,"beta":1e-2}}"#,
        )
        .unwrap();

        let err = LatMap::load(&path).unwrap_err();
        assert!(matches!(err, MapIOError::FormatMismatch { .. }));
    }
}

use thiserror::Error;

use crate::host::{PointId, PolygonId};

/// Top-level error type for polygon reduction.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),

    #[error(transparent)]
    Simplify(#[from] SimplifyError),

    #[error("invalid reduction parameters: {0}")]
    InvalidParameters(String),
}

/// Errors raised by the host mesh layer.
///
/// Any of these aborts the running layer. Points are written before polygons, so a
/// failure during polygon emission can leave the layer half-written.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("point {0:?} not found")]
    PointNotFound(PointId),

    #[error("polygon {0:?} not found")]
    PolygonNotFound(PolygonId),

    #[error("host access failed: {0}")]
    Failed(String),
}

/// Errors related to the topology graph.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors raised while triangulating a single polygon.
///
/// Ingest records these per polygon and keeps going.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("invalid boundary loop: {0}")]
    InvalidLoop(String),

    #[error("triangulation failed: {0}")]
    Failed(String),
}

/// Contract violations by the edge-collapse simplifier.
#[derive(Debug, Error)]
pub enum SimplifyError {
    #[error("collapse names unknown vertex index {0}")]
    UnknownVertex(usize),

    #[error("collapse names a vertex that already collapsed: {0}")]
    VertexAlreadyCollapsed(String),

    /// A replayed collapse runs along a protected edge, named by its host points.
    #[error("collapse crosses the protected edge between points {0:?} and {1:?}")]
    ProtectedEdgeCollapsed(PointId, PointId),
}

/// Convenience type alias for results using [`ReduceError`].
pub type Result<T> = std::result::Result<T, ReduceError>;

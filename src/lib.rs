//! Polygon-mesh reduction by edge collapse.
//!
//! A host mesh layer is triangulated into a topology graph, split into connected
//! parts and classified into protected and free edges. An [`simplify::EdgeCollapseSimplifier`]
//! picks the collapses, which are replayed onto the graph and written back to the host.
//! [`operations::ReducePolygons`] runs the whole pipeline.

pub mod error;
pub mod host;
pub mod math;
pub mod operations;
pub mod params;
pub mod simplify;
pub mod tessellation;
pub mod topology;

pub use error::{ReduceError, Result};
pub use operations::{ReducePolygons, ReductionReport};
pub use params::{ReduceParams, ReductionMode};

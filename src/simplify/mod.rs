//! The edge-collapse simplifier seam.
//!
//! The reduction pipeline hands a plain vertex/triangle soup to an
//! [`EdgeCollapseSimplifier`] and records every collapse it reports. Which edge goes
//! next and where the surviving vertex lands are entirely the simplifier's business.

mod adapter;
mod edge_collapse;
mod quadric;

pub use adapter::{SimplificationAdapter, SimplifyRun};
pub use edge_collapse::EdgeCollapse;
pub use quadric::Quadric;

use std::collections::BTreeSet;

use crate::error::Result;
use crate::math::Point3;

/// Cost and placement strategy used to order collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostStrategy {
    /// Squared edge length; the merged vertex sits at the midpoint.
    EdgeLength,
    /// Quadric error at the error-minimising position (midpoint if singular).
    #[default]
    Quadric,
    /// Quadric error evaluated at the midpoint, which is also the placement.
    QuadricMidpoint,
}

/// Input handed to a simplifier.
#[derive(Debug, Clone, Default)]
pub struct SimplifyInput {
    /// Vertex positions, indexed by vertex id.
    pub positions: Vec<Point3>,
    /// Triangles as vertex ids.
    pub triangles: Vec<[usize; 3]>,
    /// Edges that must not collapse, stored as `(low, high)` id pairs.
    pub protected: BTreeSet<(usize, usize)>,
    /// Stop once the live edge count is at or below this.
    pub target_edges: usize,
    /// Cost and placement strategy.
    pub strategy: CostStrategy,
}

/// One performed collapse.
///
/// `surviving` and `removed` are the edge's endpoints as the simplifier saw them;
/// `reversed` means the roles were swapped and `removed` is the vertex that stayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapseEvent {
    /// Nominal surviving vertex.
    pub surviving: usize,
    /// Nominal removed vertex.
    pub removed: usize,
    /// The merge went the other way.
    pub reversed: bool,
}

impl CollapseEvent {
    /// `(kept, dropped)` after applying the direction flag.
    #[must_use]
    pub fn resolved(&self) -> (usize, usize) {
        if self.reversed {
            (self.removed, self.surviving)
        } else {
            (self.surviving, self.removed)
        }
    }
}

/// Result of a simplifier run.
#[derive(Debug, Clone, Default)]
pub struct SimplifyOutcome {
    /// Final positions, indexed like the input; only surviving entries are meaningful.
    pub positions: Vec<Point3>,
    /// Number of collapses performed.
    pub collapses: usize,
    /// Live edges left.
    pub edges_remaining: usize,
    /// The target was not reached because no free edge could collapse.
    pub stopped_early: bool,
}

/// An external edge-collapse algorithm.
///
/// Implementations must never collapse a protected edge and must call `on_collapse`
/// exactly once per performed collapse, in order.
pub trait EdgeCollapseSimplifier {
    /// Runs the simplification.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed.
    fn simplify(
        &mut self,
        input: &SimplifyInput,
        on_collapse: &mut dyn FnMut(CollapseEvent),
    ) -> Result<SimplifyOutcome>;
}

/// Normalises an undirected vertex pair to `(low, high)`.
#[must_use]
pub fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

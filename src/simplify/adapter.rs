//! Bridges the topology graph and an [`EdgeCollapseSimplifier`].

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::{edge_key, CollapseEvent, CostStrategy, EdgeCollapseSimplifier, SimplifyInput};
use crate::error::{Result, SimplifyError};
use crate::math::Point3;
use crate::operations::CollapseRecord;
use crate::params::ReductionMode;
use crate::topology::{TopologyGraph, VertexId};

/// What a simplifier run produced, in graph terms.
#[derive(Debug, Clone, Default)]
pub struct SimplifyRun {
    /// Collapses in the order they were reported.
    pub records: Vec<CollapseRecord>,
    /// Final position of every vertex handed to the simplifier.
    pub positions: Vec<(VertexId, Point3)>,
    /// Live edges before simplification.
    pub edges_before: usize,
    /// The stopping target given to the simplifier.
    pub target_edges: usize,
    /// Live edges the simplifier reports afterwards.
    pub edges_after: usize,
    /// The target could not be reached.
    pub stopped_early: bool,
}

impl SimplifyRun {
    /// Writes the final positions onto the vertices that survived replay.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex is no longer in the graph.
    pub fn apply_positions(&self, graph: &mut TopologyGraph) -> Result<()> {
        for &(v, position) in &self.positions {
            let vertex = graph.vertex_mut(v)?;
            if !vertex.collapsed {
                vertex.point = position;
            }
        }
        Ok(())
    }
}

/// Flattens the graph into a vertex/triangle soup, runs a simplifier over it and
/// translates the reported collapses back into graph vertices.
///
/// Live vertices get dense ids in arena order, so the same graph always produces the
/// same soup.
pub struct SimplificationAdapter {
    mode: ReductionMode,
    strategy: CostStrategy,
}

impl SimplificationAdapter {
    /// Creates a new adapter.
    #[must_use]
    pub fn new(mode: ReductionMode, strategy: CostStrategy) -> Self {
        Self { mode, strategy }
    }

    /// Runs `simplifier` over the live part of `graph`.
    ///
    /// The graph itself is not modified; replay the returned records to apply them.
    ///
    /// # Errors
    ///
    /// Returns an error if the simplifier fails or reports a vertex it was never given.
    pub fn run<S: EdgeCollapseSimplifier + ?Sized>(
        &self,
        graph: &TopologyGraph,
        simplifier: &mut S,
    ) -> Result<SimplifyRun> {
        let ids: Vec<VertexId> = graph
            .vertices()
            .filter(|(_, v)| !v.collapsed)
            .map(|(id, _)| id)
            .collect();
        let dense: HashMap<VertexId, usize> = ids.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        let index = |v: VertexId| {
            dense
                .get(&v)
                .copied()
                .ok_or_else(|| SimplifyError::VertexAlreadyCollapsed(format!("{v:?}")))
        };

        let mut positions = Vec::with_capacity(ids.len());
        for &v in &ids {
            positions.push(graph.vertex(v)?.point);
        }

        let mut triangles = Vec::new();
        for (_, tri) in graph.triangles().filter(|(_, t)| !t.deleted) {
            let [a, b, c] = tri.corners;
            triangles.push([index(a)?, index(b)?, index(c)?]);
        }

        let mut protected = BTreeSet::new();
        let mut edges_before = 0;
        for (_, edge) in graph.edges().filter(|(_, e)| !e.collapsed) {
            edges_before += 1;
            if edge.protected {
                protected.insert(edge_key(index(edge.v0)?, index(edge.v1)?));
            }
        }

        let target_edges = self.mode.target_edges(edges_before);
        let input = SimplifyInput {
            positions,
            triangles,
            protected,
            target_edges,
            strategy: self.strategy,
        };

        let mut events: Vec<CollapseEvent> = Vec::new();
        let outcome = simplifier.simplify(&input, &mut |event| events.push(event))?;

        let vertex = |i: usize| ids.get(i).copied().ok_or(SimplifyError::UnknownVertex(i));
        let mut records = Vec::with_capacity(events.len());
        for event in events {
            records.push(CollapseRecord {
                surviving: vertex(event.surviving)?,
                removed: vertex(event.removed)?,
                reversed: event.reversed,
            });
        }

        let mut final_positions = Vec::with_capacity(ids.len());
        for (i, &v) in ids.iter().enumerate() {
            let position = outcome.positions.get(i).copied().unwrap_or(input.positions[i]);
            final_positions.push((v, position));
        }

        debug!(
            vertices = ids.len(),
            triangles = input.triangles.len(),
            protected = input.protected.len(),
            edges_before,
            target_edges,
            collapses = records.len(),
            "simplifier finished"
        );
        Ok(SimplifyRun {
            records,
            positions: final_positions,
            edges_before,
            target_edges,
            edges_after: outcome.edges_remaining,
            stopped_early: outcome.stopped_early,
        })
    }
}

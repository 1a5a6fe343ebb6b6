use tracing::debug;

use crate::error::{Result, SimplifyError, TopologyError};
use crate::topology::{TopologyGraph, TriangleId, VertexId};

/// One collapse reported by the simplifier, in graph terms.
///
/// `reversed` swaps the roles: `removed` survives and `surviving` goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapseRecord {
    /// Nominal surviving vertex.
    pub surviving: VertexId,
    /// Nominal removed vertex.
    pub removed: VertexId,
    /// The merge went the other way.
    pub reversed: bool,
}

impl CollapseRecord {
    /// `(keep, remove)` after applying the direction flag.
    #[must_use]
    pub fn resolved(&self) -> (VertexId, VertexId) {
        if self.reversed {
            (self.removed, self.surviving)
        } else {
            (self.surviving, self.removed)
        }
    }
}

/// Applies collapse records to the topology graph, in order.
///
/// Triangles on the collapsed edge are deleted, triangles of the removed vertex are
/// retargeted to the kept one and flagged as updated, and edges that become parallel
/// are merged. Nothing is freed; entities are only flagged.
pub struct ReplayCollapses<'a> {
    records: &'a [CollapseRecord],
}

impl<'a> ReplayCollapses<'a> {
    /// Creates a new `ReplayCollapses` operation.
    #[must_use]
    pub fn new(records: &'a [CollapseRecord]) -> Self {
        Self { records }
    }

    /// Executes the replay, returning the number of collapses applied.
    ///
    /// # Errors
    ///
    /// Returns a [`SimplifyError`] if a record names a collapsed vertex or crosses a
    /// protected edge, and a [`TopologyError`] if its vertices share no edge.
    pub fn execute(&self, graph: &mut TopologyGraph) -> Result<usize> {
        for record in self.records {
            collapse(graph, record)?;
        }
        debug!(
            collapses = self.records.len(),
            live_vertices = graph.live_vertex_count(),
            live_edges = graph.live_edge_count(),
            live_triangles = graph.live_triangle_count(),
            "replayed collapses"
        );
        Ok(self.records.len())
    }
}

fn collapse(graph: &mut TopologyGraph, record: &CollapseRecord) -> Result<()> {
    let (keep, remove) = record.resolved();
    for v in [keep, remove] {
        if graph.vertex(v)?.collapsed {
            return Err(SimplifyError::VertexAlreadyCollapsed(format!("{v:?}")).into());
        }
    }
    let edge = graph.find_edge(keep, remove).ok_or_else(|| {
        TopologyError::InvalidTopology(format!("no edge between {keep:?} and {remove:?}"))
    })?;
    if graph.edge(edge)?.protected {
        let a = graph.vertex(keep)?.host_point;
        let b = graph.vertex(remove)?.host_point;
        return Err(SimplifyError::ProtectedEdgeCollapsed(a, b).into());
    }

    for tri in graph.edge(edge)?.triangles.clone() {
        delete_triangle(graph, tri)?;
    }
    graph.edge_mut(edge)?.collapsed = true;
    graph.vertex_mut(keep)?.edges.retain(|&e| e != edge);
    graph.vertex_mut(remove)?.edges.retain(|&e| e != edge);

    for tri in graph.vertex(remove)?.triangles.clone() {
        let data = graph.triangle(tri)?;
        if data.deleted {
            continue;
        }
        if data.has_corner(keep) {
            debug!(?tri, "collapse degenerated a triangle");
            delete_triangle(graph, tri)?;
            continue;
        }
        let data = graph.triangle_mut(tri)?;
        data.replace_corner(remove, keep);
        data.updated = true;
        let kept = graph.vertex_mut(keep)?;
        if !kept.triangles.contains(&tri) {
            kept.triangles.push(tri);
        }
    }

    for e in graph.vertex(remove)?.edges.clone() {
        let data = graph.edge(e)?;
        if data.collapsed {
            continue;
        }
        let Some(other) = data.other(remove) else {
            continue;
        };
        if other == keep {
            graph.edge_mut(e)?.collapsed = true;
            graph.vertex_mut(keep)?.edges.retain(|&x| x != e);
            continue;
        }
        if let Some(twin) = graph.find_edge(keep, other) {
            let (triangles, protected) = {
                let data = graph.edge_mut(e)?;
                data.collapsed = true;
                (std::mem::take(&mut data.triangles), data.protected)
            };
            let target = graph.edge_mut(twin)?;
            target.protected |= protected;
            for tri in triangles {
                if !target.triangles.contains(&tri) {
                    target.triangles.push(tri);
                }
            }
            graph.vertex_mut(other)?.edges.retain(|&x| x != e);
        } else {
            graph.edge_mut(e)?.retarget(remove, keep);
            graph.vertex_mut(keep)?.edges.push(e);
        }
    }

    let removed = graph.vertex_mut(remove)?;
    removed.edges.clear();
    removed.triangles.clear();
    removed.collapsed = true;
    Ok(())
}

/// Flags a triangle deleted and unlinks it from its corners and their edges.
fn delete_triangle(graph: &mut TopologyGraph, tri: TriangleId) -> Result<()> {
    let data = graph.triangle_mut(tri)?;
    if data.deleted {
        return Ok(());
    }
    data.deleted = true;
    let corners = data.corners;
    for v in corners {
        let edges = graph.vertex(v)?.edges.clone();
        for e in edges {
            graph.edge_mut(e)?.triangles.retain(|&t| t != tri);
        }
        graph.vertex_mut(v)?.triangles.retain(|&t| t != tri);
    }
    Ok(())
}

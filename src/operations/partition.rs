use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::error::Result;
use crate::host::HostMesh;
use crate::topology::{FaceId, PartData, PartId, TopologyGraph};

/// Groups the graph's faces into connected parts.
///
/// Two faces are connected when they share a host side that carries no lock mark.
/// Hidden, locked and skipped polygons are not in the graph, so sides against them
/// never connect anything.
#[derive(Debug, Default)]
pub struct PartitionParts;

impl PartitionParts {
    /// Creates a new `PartitionParts` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the partition, returning the new parts in discovery order.
    ///
    /// Seeds are taken in face order and members are listed in face order, so
    /// identical input always yields identical parts.
    ///
    /// # Errors
    ///
    /// Returns an error if a host query fails.
    pub fn execute<H: HostMesh + ?Sized>(&self, graph: &mut TopologyGraph, host: &H) -> Result<Vec<PartId>> {
        let seeds: Vec<FaceId> = graph.faces().map(|(id, _)| id).collect();
        let mut visited: HashSet<FaceId> = HashSet::with_capacity(seeds.len());
        let mut parts = Vec::new();

        for seed in seeds {
            if !visited.insert(seed) {
                continue;
            }
            let mut members = vec![seed];
            let mut queue = VecDeque::from([seed]);

            while let Some(face) = queue.pop_front() {
                let points = graph.face(face)?.points.clone();
                let n = points.len();
                for i in 0..n {
                    let (a, b) = (points[i], points[(i + 1) % n]);
                    if host.is_edge_locked(a, b)? {
                        continue;
                    }
                    for polygon in host.edge_polygons(a, b)? {
                        let Some(other) = graph.face_for_polygon(polygon) else {
                            continue;
                        };
                        if visited.insert(other) {
                            members.push(other);
                            queue.push_back(other);
                        }
                    }
                }
            }

            members.sort_unstable();
            let part = graph.add_part(PartData {
                faces: members.clone(),
            });
            for face in members {
                let triangles = {
                    let data = graph.face_mut(face)?;
                    data.part = Some(part);
                    data.triangles.clone()
                };
                for tri in triangles {
                    graph.triangle_mut(tri)?.part = Some(part);
                }
            }
            parts.push(part);
        }

        debug!(parts = parts.len(), "partitioned faces");
        Ok(parts)
    }
}

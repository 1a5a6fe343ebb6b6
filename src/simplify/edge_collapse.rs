//! Greedy edge-collapse simplifier.
//!
//! Edges sit in a min-heap keyed by collapse cost. Entries are invalidated lazily:
//! every vertex carries a version stamp that is bumped whenever its neighbourhood
//! changes, and a popped entry whose stamps no longer match is dropped.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use tracing::{debug, trace};

use super::{edge_key, CollapseEvent, CostStrategy, EdgeCollapseSimplifier, Quadric, SimplifyInput, SimplifyOutcome};
use crate::error::{Result, SimplifyError};
use crate::math::polygon_3d::triangle_normal;
use crate::math::Point3;

/// Reference [`EdgeCollapseSimplifier`].
///
/// Vertices touching a protected edge are pinned: they may absorb a neighbour but
/// never move or disappear, so an edge between two pinned vertices never collapses.
/// A collapse is rejected when it would make the surface non-manifold, flip a
/// surviving triangle, or strand a vertex without triangles.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeCollapse;

impl EdgeCollapse {
    /// Creates a new `EdgeCollapse` simplifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EdgeCollapseSimplifier for EdgeCollapse {
    fn simplify(
        &mut self,
        input: &SimplifyInput,
        on_collapse: &mut dyn FnMut(CollapseEvent),
    ) -> Result<SimplifyOutcome> {
        let mut state = State::new(input)?;
        let mut heap = BinaryHeap::new();
        for a in 0..state.positions.len() {
            for &b in state.neighbors[a].range(a + 1..) {
                state.push(&mut heap, a, b);
            }
        }

        let mut collapses = 0;
        while state.edge_count > input.target_edges {
            let Some(candidate) = heap.pop() else {
                break;
            };
            let (a, b) = (candidate.a, candidate.b);
            if !state.alive[a]
                || !state.alive[b]
                || state.stamps[a] != candidate.stamp_a
                || state.stamps[b] != candidate.stamp_b
                || !state.neighbors[a].contains(&b)
            {
                continue;
            }
            let Some(plan) = state.plan(a, b) else {
                trace!(a, b, "collapse rejected");
                continue;
            };

            state.collapse(&plan);
            on_collapse(CollapseEvent {
                surviving: a,
                removed: b,
                reversed: plan.keep == b,
            });
            collapses += 1;

            state.stamps[plan.keep] += 1;
            let neighbours: Vec<usize> = state.neighbors[plan.keep].iter().copied().collect();
            for n in neighbours {
                let (lo, hi) = edge_key(plan.keep, n);
                state.push(&mut heap, lo, hi);
            }
        }

        let stopped_early = state.edge_count > input.target_edges;
        debug!(
            collapses,
            edges_remaining = state.edge_count,
            target = input.target_edges,
            stopped_early,
            "edge collapse finished"
        );
        Ok(SimplifyOutcome {
            positions: state.positions,
            collapses,
            edges_remaining: state.edge_count,
            stopped_early,
        })
    }
}

/// A queued edge.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: f64,
    a: usize,
    b: usize,
    stamp_a: u32,
    stamp_b: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Reversed so the max-heap pops the cheapest edge, lowest ids first on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.a.cmp(&self.a))
            .then_with(|| other.b.cmp(&self.b))
            .then_with(|| other.stamp_a.cmp(&self.stamp_a))
            .then_with(|| other.stamp_b.cmp(&self.stamp_b))
    }
}

/// An accepted collapse.
#[derive(Debug, Clone, Copy)]
struct Plan {
    keep: usize,
    remove: usize,
    position: Point3,
}

struct State {
    strategy: CostStrategy,
    positions: Vec<Point3>,
    quadrics: Vec<Quadric>,
    neighbors: Vec<BTreeSet<usize>>,
    vertex_tris: Vec<BTreeSet<usize>>,
    triangles: Vec<Option<[usize; 3]>>,
    protected: BTreeSet<(usize, usize)>,
    pinned: Vec<bool>,
    alive: Vec<bool>,
    stamps: Vec<u32>,
    edge_count: usize,
}

impl State {
    fn new(input: &SimplifyInput) -> Result<Self> {
        let n = input.positions.len();
        let mut neighbors = vec![BTreeSet::new(); n];
        let mut vertex_tris = vec![BTreeSet::new(); n];
        let mut quadrics = vec![Quadric::default(); n];
        let mut triangles = Vec::with_capacity(input.triangles.len());

        for (t, &tri) in input.triangles.iter().enumerate() {
            if let Some(&bad) = tri.iter().find(|&&v| v >= n) {
                return Err(SimplifyError::UnknownVertex(bad).into());
            }
            let [a, b, c] = tri;
            if a == b || b == c || a == c {
                triangles.push(None);
                continue;
            }
            for (i, &v) in tri.iter().enumerate() {
                vertex_tris[v].insert(t);
                let w = tri[(i + 1) % 3];
                neighbors[v].insert(w);
                neighbors[w].insert(v);
            }
            if let Some(q) = Quadric::from_triangle(&input.positions[a], &input.positions[b], &input.positions[c]) {
                for v in tri {
                    quadrics[v] += q;
                }
            }
            triangles.push(Some(tri));
        }

        let mut pinned = vec![false; n];
        let mut protected = BTreeSet::new();
        for &(a, b) in &input.protected {
            for v in [a, b] {
                if v >= n {
                    return Err(SimplifyError::UnknownVertex(v).into());
                }
                pinned[v] = true;
            }
            protected.insert(edge_key(a, b));
        }

        let edge_count = neighbors.iter().map(BTreeSet::len).sum::<usize>() / 2;
        Ok(Self {
            strategy: input.strategy,
            positions: input.positions.clone(),
            quadrics,
            neighbors,
            vertex_tris,
            triangles,
            protected,
            pinned,
            alive: vec![true; n],
            stamps: vec![0; n],
            edge_count,
        })
    }

    fn push(&self, heap: &mut BinaryHeap<Candidate>, a: usize, b: usize) {
        if self.protected.contains(&(a, b)) || (self.pinned[a] && self.pinned[b]) {
            return;
        }
        let (_, cost) = self.placement(a, b);
        heap.push(Candidate {
            cost,
            a,
            b,
            stamp_a: self.stamps[a],
            stamp_b: self.stamps[b],
        });
    }

    /// Preferred merged position of `(a, b)` and its cost.
    fn placement(&self, a: usize, b: usize) -> (Point3, f64) {
        let (pa, pb) = (self.positions[a], self.positions[b]);
        let midpoint = Point3::from((pa.coords + pb.coords) * 0.5);
        let mut q = self.quadrics[a];
        q += self.quadrics[b];

        let position = if self.pinned[a] {
            pa
        } else if self.pinned[b] {
            pb
        } else {
            match self.strategy {
                CostStrategy::EdgeLength | CostStrategy::QuadricMidpoint => midpoint,
                CostStrategy::Quadric => q.optimal_point().unwrap_or(midpoint),
            }
        };
        let cost = match self.strategy {
            CostStrategy::EdgeLength => (pa - pb).norm_squared(),
            CostStrategy::Quadric | CostStrategy::QuadricMidpoint => q.evaluate(&position).max(0.0),
        };
        (position, cost)
    }

    fn plan(&self, a: usize, b: usize) -> Option<Plan> {
        if self.protected.contains(&edge_key(a, b)) || (self.pinned[a] && self.pinned[b]) {
            return None;
        }
        let (keep, remove) = if self.pinned[b] { (b, a) } else { (a, b) };

        let shared: BTreeSet<usize> = self.vertex_tris[a].intersection(&self.vertex_tris[b]).copied().collect();
        if shared.is_empty() {
            return None;
        }

        // Link condition: the endpoints' common neighbours are exactly the apexes
        // of the triangles on the edge.
        let mut apexes = BTreeSet::new();
        for &t in &shared {
            let tri = self.triangles[t]?;
            apexes.extend(tri.iter().copied().filter(|&v| v != a && v != b));
        }
        let common: BTreeSet<usize> = self.neighbors[a].intersection(&self.neighbors[b]).copied().collect();
        if common != apexes {
            return None;
        }

        let boundary_edge = shared.len() == 1;
        if !boundary_edge && self.is_boundary_vertex(a) && self.is_boundary_vertex(b) {
            return None;
        }

        let merged_degree = self.neighbors[a].union(&self.neighbors[b]).filter(|&&v| v != a && v != b).count();
        if merged_degree < 3 && !boundary_edge {
            return None;
        }

        // Nothing may be left with edges but no triangles.
        if self.vertex_tris[a].union(&self.vertex_tris[b]).all(|t| shared.contains(t)) {
            return None;
        }
        if apexes.iter().any(|&o| self.vertex_tris[o].is_subset(&shared)) {
            return None;
        }

        let (preferred, _) = self.placement(a, b);
        let mut options = vec![preferred];
        if !self.pinned[a] && !self.pinned[b] {
            options.push(self.positions[keep]);
            options.push(self.positions[remove]);
        }
        let position = options.into_iter().find(|p| !self.flips(a, b, &shared, p))?;
        Some(Plan { keep, remove, position })
    }

    fn is_boundary_vertex(&self, v: usize) -> bool {
        self.neighbors[v]
            .iter()
            .any(|&n| self.vertex_tris[v].intersection(&self.vertex_tris[n]).count() == 1)
    }

    /// Whether moving `a` and `b` to `position` flips or flattens a surviving triangle.
    fn flips(&self, a: usize, b: usize, shared: &BTreeSet<usize>, position: &Point3) -> bool {
        for &t in self.vertex_tris[a].union(&self.vertex_tris[b]) {
            if shared.contains(&t) {
                continue;
            }
            let Some(tri) = self.triangles[t] else {
                continue;
            };
            let before = tri.map(|v| self.positions[v]);
            let after = tri.map(|v| if v == a || v == b { *position } else { self.positions[v] });
            let n0 = triangle_normal(&before[0], &before[1], &before[2]);
            let n1 = triangle_normal(&after[0], &after[1], &after[2]);
            if n0.norm_squared() > 0.0 && n0.dot(&n1) <= 0.0 {
                return true;
            }
        }
        false
    }

    fn collapse(&mut self, plan: &Plan) {
        let Plan { keep, remove, position } = *plan;

        let shared: Vec<usize> = self.vertex_tris[keep]
            .intersection(&self.vertex_tris[remove])
            .copied()
            .collect();
        for t in shared {
            if let Some(tri) = self.triangles[t].take() {
                for v in tri {
                    self.vertex_tris[v].remove(&t);
                }
            }
        }

        for t in std::mem::take(&mut self.vertex_tris[remove]) {
            if let Some(tri) = self.triangles[t].as_mut() {
                for v in tri.iter_mut() {
                    if *v == remove {
                        *v = keep;
                    }
                }
                self.vertex_tris[keep].insert(t);
            }
        }

        self.neighbors[keep].remove(&remove);
        self.protected.remove(&edge_key(keep, remove));
        self.edge_count -= 1;
        for n in std::mem::take(&mut self.neighbors[remove]) {
            if n == keep {
                continue;
            }
            self.neighbors[n].remove(&remove);
            let was_protected = self.protected.remove(&edge_key(remove, n));
            if self.neighbors[keep].insert(n) {
                self.neighbors[n].insert(keep);
            } else {
                self.edge_count -= 1;
            }
            if was_protected {
                self.protected.insert(edge_key(keep, n));
            }
        }

        let absorbed = self.quadrics[remove];
        self.quadrics[keep] += absorbed;
        self.positions[keep] = position;
        self.pinned[keep] |= self.pinned[remove];
        self.alive[remove] = false;
    }
}

use std::fmt;

use tracing::info;

use super::{BuildTopology, ClassifyConstraints, EmitMesh, EmitMode, PartitionParts, ReplayCollapses};
use crate::error::Result;
use crate::host::HostMesh;
use crate::params::ReduceParams;
use crate::simplify::{EdgeCollapse, EdgeCollapseSimplifier, SimplificationAdapter};

/// Summary of one layer reduction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReductionReport {
    /// Graph vertices created by ingest.
    pub vertices_ingested: usize,
    /// Triangles created by ingest.
    pub triangles_ingested: usize,
    /// Host polygons registered as faces.
    pub faces_ingested: usize,
    /// Connected parts found.
    pub parts: usize,
    /// Edges the simplifier may not collapse.
    pub protected_edges: usize,
    /// Live edges handed to the simplifier.
    pub edges_before: usize,
    /// Live edges left after replay.
    pub edges_after: usize,
    /// The stopping target derived from the reduction mode.
    pub target_edges: usize,
    /// Collapses replayed onto the graph.
    pub collapses: usize,
    /// The simplifier ran out of legal collapses before reaching the target.
    pub stopped_early: bool,
    /// Participating polygons that could not be triangulated.
    pub skipped_polygons: usize,
    /// Host polygons whose point loop was rewritten.
    pub faces_rewritten: usize,
    /// Host polygons deleted.
    pub faces_deleted: usize,
    /// Host polygons added, either split leftovers or output triangles.
    pub faces_added: usize,
    /// Host points deleted.
    pub points_deleted: usize,
}

impl ReductionReport {
    /// Fraction of edges removed, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reduction_percent(&self) -> f64 {
        if self.edges_before == 0 {
            return 0.0;
        }
        (1.0 - self.edges_after as f64 / self.edges_before as f64) * 100.0
    }
}

impl fmt::Display for ReductionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reduction: {} → {} edges ({:.1}% reduction, {} collapses, target {}{})",
            self.edges_before,
            self.edges_after,
            self.reduction_percent(),
            self.collapses,
            self.target_edges,
            if self.stopped_early { ", stopped early" } else { "" }
        )
    }
}

/// Reduces the polygon count of one host layer by edge collapse.
///
/// The layer is ingested into a topology graph, split into parts, its edges are
/// classified as protected or free, the simplifier's collapses are replayed onto the
/// graph and the result is written back.
///
/// # Example
///
/// ```
/// use polyreduce::host::MemoryMesh;
/// use polyreduce::math::Point3;
/// use polyreduce::operations::ReducePolygons;
/// use polyreduce::params::{ReduceParams, ReductionMode};
///
/// let mut mesh = MemoryMesh::new();
/// let a = mesh.add_point(Point3::new(0.0, 0.0, 0.0));
/// let b = mesh.add_point(Point3::new(1.0, 0.0, 0.0));
/// let c = mesh.add_point(Point3::new(1.0, 1.0, 0.0));
/// let d = mesh.add_point(Point3::new(0.0, 1.0, 0.0));
/// mesh.add_face(&[a, b, c, d]);
///
/// let params = ReduceParams::default().with_mode(ReductionMode::Ratio(1.0));
/// let report = ReducePolygons::new(params).execute(&mut mesh).unwrap();
/// assert_eq!(report.collapses, 0);
/// ```
pub struct ReducePolygons<S = EdgeCollapse> {
    params: ReduceParams,
    simplifier: S,
}

impl ReducePolygons<EdgeCollapse> {
    /// Creates a reduction using the built-in simplifier.
    #[must_use]
    pub fn new(params: ReduceParams) -> Self {
        Self {
            params,
            simplifier: EdgeCollapse::new(),
        }
    }
}

impl<S: EdgeCollapseSimplifier> ReducePolygons<S> {
    /// Replaces the simplifier.
    #[must_use]
    pub fn with_simplifier<T: EdgeCollapseSimplifier>(self, simplifier: T) -> ReducePolygons<T> {
        ReducePolygons {
            params: self.params,
            simplifier,
        }
    }

    /// Executes the reduction on one layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid, a host call fails, or the
    /// simplifier breaks its contract. A host failure while writing back can leave
    /// the layer partially written.
    pub fn execute<H: HostMesh + ?Sized>(&mut self, host: &mut H) -> Result<ReductionReport> {
        self.params.validate()?;

        let (mut graph, ingest) = BuildTopology::new().execute(&*host)?;
        let parts = PartitionParts::new().execute(&mut graph, &*host)?;
        let protected_edges = ClassifyConstraints::new(self.params.policy()).execute(&mut graph, &*host)?;

        let mut report = ReductionReport {
            vertices_ingested: graph.vertex_count(),
            triangles_ingested: graph.triangle_count(),
            faces_ingested: graph.face_count(),
            parts: parts.len(),
            protected_edges,
            skipped_polygons: ingest.skipped.len(),
            ..ReductionReport::default()
        };

        let run = SimplificationAdapter::new(self.params.mode, self.params.strategy)
            .run(&graph, &mut self.simplifier)?;
        report.collapses = ReplayCollapses::new(&run.records).execute(&mut graph)?;
        run.apply_positions(&mut graph)?;
        report.edges_before = run.edges_before;
        report.target_edges = run.target_edges;
        report.edges_after = graph.live_edge_count();
        report.stopped_early = run.stopped_early;

        let mode = if self.params.triangulate_only {
            EmitMode::Triangulated
        } else {
            EmitMode::PreservePolygons
        };
        let emitted = EmitMesh::new(mode).execute(&graph, host)?;
        report.faces_rewritten = emitted.faces_rewritten;
        report.faces_deleted = emitted.faces_deleted;
        report.faces_added = emitted.faces_added;
        report.points_deleted = emitted.points_deleted;

        if report.collapses > 0 || emitted.changed() {
            host.mark_geometry_changed();
        }

        info!(
            faces = report.faces_ingested,
            parts = report.parts,
            protected = report.protected_edges,
            edges_before = report.edges_before,
            edges_after = report.edges_after,
            collapses = report.collapses,
            stopped_early = report.stopped_early,
            "{report}"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::{ReduceError, SimplifyError};
    use crate::host::{MemoryMesh, PointId, PolygonId};
    use crate::math::Point3;
    use crate::params::{CostStrategy, ReductionMode};
    use crate::simplify::{CollapseEvent, SimplifyInput, SimplifyOutcome};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    /// Undirected sides of all live polygons with the number of polygons using each.
    fn side_counts(mesh: &MemoryMesh) -> HashMap<(PointId, PointId), usize> {
        let mut counts = HashMap::new();
        for (_, info) in mesh.live_polygons() {
            let n = info.points.len();
            for i in 0..n {
                let (a, b) = (info.points[i], info.points[(i + 1) % n]);
                let key = if a < b { (a, b) } else { (b, a) };
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts
    }

    fn unit_cube() -> MemoryMesh {
        let mut mesh = MemoryMesh::new();
        let v: Vec<PointId> = [
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(0.0, 1.0, 1.0),
        ]
        .into_iter()
        .map(|q| mesh.add_point(q))
        .collect();
        for face in [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ] {
            mesh.add_face(&face.map(|i| v[i]));
        }
        mesh
    }

    /// A 3x3 grid of unit quads over 4x4 points.
    fn grid_3x3() -> (MemoryMesh, Vec<PointId>) {
        let mut mesh = MemoryMesh::new();
        let mut pts = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                pts.push(mesh.add_point(p(f64::from(x), f64::from(y), 0.0)));
            }
        }
        for y in 0..3 {
            for x in 0..3 {
                let i = y * 4 + x;
                mesh.add_face(&[pts[i], pts[i + 1], pts[i + 5], pts[i + 4]]);
            }
        }
        (mesh, pts)
    }

    #[test]
    fn flat_quad_at_full_ratio_is_untouched() {
        init_tracing();
        let mut mesh = MemoryMesh::new();
        let pts: Vec<PointId> = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)]
            .into_iter()
            .map(|q| mesh.add_point(q))
            .collect();
        let face = mesh.add_face(&pts);
        let before = mesh.clone();

        let params = ReduceParams::default().with_mode(ReductionMode::Ratio(1.0));
        let report = ReducePolygons::new(params).execute(&mut mesh).unwrap();

        assert_eq!(report.collapses, 0);
        assert_eq!(report.edges_before, 5);
        assert_eq!(report.edges_after, 5);
        assert_eq!(mesh.polygon(face).unwrap().points, pts);
        assert_eq!(mesh.live_polygons(), before.live_polygons());
        assert!(!mesh.geometry_changed());
    }

    #[test]
    fn closed_cube_stays_closed_at_half_ratio() {
        init_tracing();
        let mut mesh = unit_cube();
        let params = ReduceParams::default()
            .with_mode(ReductionMode::Ratio(0.5))
            .with_preserve_boundary(false)
            .with_preserve_material(false);
        let report = ReducePolygons::new(params).execute(&mut mesh).unwrap();

        assert_eq!(report.edges_before, 18);
        assert_eq!(report.target_edges, 9);
        assert!(report.collapses > 0);
        assert!(report.edges_after < report.edges_before);
        assert_eq!(report.edges_after, 18 - 3 * report.collapses);
        // Each collapse on a closed surface takes exactly one point.
        assert_eq!(mesh.live_point_count(), 8 - report.collapses);
        for (side, count) in side_counts(&mesh) {
            assert_eq!(count, 2, "side {side:?} is not shared by two polygons");
        }
        assert!(mesh.geometry_changed());
    }

    #[test]
    fn locked_boundary_survives_and_stops_early() {
        init_tracing();
        let (mut mesh, pts) = grid_3x3();
        let ring = [0, 1, 2, 3, 7, 11, 15, 14, 13, 12, 8, 4];
        for i in 0..ring.len() {
            mesh.lock_edge(pts[ring[i]], pts[ring[(i + 1) % ring.len()]]);
        }
        let original: Vec<Point3> = ring.iter().map(|&r| mesh.point_position(pts[r]).unwrap()).collect();
        let params = ReduceParams::default().with_mode(ReductionMode::Count(usize::MAX));
        let report = ReducePolygons::new(params).execute(&mut mesh).unwrap();

        assert_eq!(report.target_edges, 0);
        assert!(report.stopped_early);
        assert!(report.collapses > 0);
        assert_eq!(report.protected_edges, 12);
        for i in 0..ring.len() {
            let (a, b) = (pts[ring[i]], pts[ring[(i + 1) % ring.len()]]);
            assert!(!mesh.edge_polygons(a, b).unwrap().is_empty());
            assert_eq!(mesh.point_position(a).unwrap(), original[i]);
        }
    }

    #[test]
    fn quad_grid_reduces_with_default_params() {
        init_tracing();
        let (mut mesh, pts) = grid_3x3();
        let ring = [0, 1, 2, 3, 7, 11, 15, 14, 13, 12, 8, 4];
        let original: Vec<Point3> = ring.iter().map(|&r| mesh.point_position(pts[r]).unwrap()).collect();
        let report = ReducePolygons::new(ReduceParams::default()).execute(&mut mesh).unwrap();

        // Only the 12 open sides are protected, not the quad diagonals.
        assert_eq!(report.edges_before, 33);
        assert_eq!(report.protected_edges, 12);
        assert!(report.collapses > 0);
        assert!(report.edges_after < report.edges_before);
        for (i, &r) in ring.iter().enumerate() {
            assert_eq!(mesh.point_position(pts[r]).unwrap(), original[i]);
        }
        assert!(mesh.geometry_changed());
    }

    #[test]
    fn material_seam_never_collapses() {
        init_tracing();
        for ratio in [0.0, 0.25, 0.5, 1.0] {
            let mut mesh = MemoryMesh::new();
            let a = mesh.add_point(p(0.0, 0.0, 0.0));
            let b = mesh.add_point(p(1.0, 0.0, 0.0));
            let c = mesh.add_point(p(0.0, 1.0, 0.0));
            let d = mesh.add_point(p(1.0, 1.0, 0.0));
            let f0 = mesh.add_face(&[a, b, c]);
            let f1 = mesh.add_face(&[b, d, c]);
            mesh.set_material(f0, "steel").unwrap();
            mesh.set_material(f1, "glass").unwrap();

            let params = ReduceParams::default()
                .with_mode(ReductionMode::Ratio(ratio))
                .with_preserve_boundary(false)
                .with_preserve_material(true);
            let report = ReducePolygons::new(params).execute(&mut mesh).unwrap();

            assert_eq!(report.protected_edges, 1);
            assert!(!mesh.edge_polygons(b, c).unwrap().is_empty(), "ratio {ratio}");
            assert_eq!(mesh.point_position(b).unwrap(), p(1.0, 0.0, 0.0));
            assert_eq!(mesh.point_position(c).unwrap(), p(0.0, 1.0, 0.0));
        }
    }

    #[test]
    fn invalid_ratio_is_rejected_before_touching_the_host() {
        let mut mesh = unit_cube();
        let before = mesh.clone();
        let params = ReduceParams::default().with_mode(ReductionMode::Ratio(2.0));
        let err = ReducePolygons::new(params).execute(&mut mesh).unwrap_err();
        assert!(matches!(err, ReduceError::InvalidParameters(_)));
        assert_eq!(mesh.live_polygons(), before.live_polygons());
    }

    #[test]
    fn triangulate_only_emits_triangles() {
        let mut mesh = unit_cube();
        let params = ReduceParams::default()
            .with_mode(ReductionMode::Ratio(1.0))
            .with_triangulate_only(true);
        let report = ReducePolygons::new(params).execute(&mut mesh).unwrap();

        assert_eq!(report.collapses, 0);
        assert_eq!(report.faces_added, 12);
        assert_eq!(report.faces_deleted, 6);
        let polygons = mesh.live_polygons();
        assert_eq!(polygons.len(), 12);
        assert!(polygons.iter().all(|(_, info)| info.points.len() == 3));
        assert!(mesh.geometry_changed());
    }

    #[test]
    fn hidden_polygon_keeps_its_points() {
        let (mut mesh, pts) = grid_3x3();
        let hidden = PolygonId(4);
        mesh.set_hidden(hidden, true).unwrap();
        let loop_before = mesh.polygon(hidden).unwrap().points;

        let params = ReduceParams::default()
            .with_mode(ReductionMode::Ratio(0.0))
            .with_preserve_boundary(false);
        ReducePolygons::new(params).execute(&mut mesh).unwrap();

        let info = mesh.polygon(hidden).unwrap();
        assert_eq!(info.points, loop_before);
        for point in [pts[5], pts[6], pts[10], pts[9]] {
            assert!(mesh.point_position(point).is_ok());
        }
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let run = || {
            let mut mesh = unit_cube();
            let params = ReduceParams::default()
                .with_mode(ReductionMode::Ratio(0.5))
                .with_preserve_boundary(false)
                .with_strategy(CostStrategy::QuadricMidpoint);
            let report = ReducePolygons::new(params).execute(&mut mesh).unwrap();
            let polygons: Vec<Vec<PointId>> = mesh
                .live_polygons()
                .into_iter()
                .map(|(_, info)| info.points.clone())
                .collect();
            (report, polygons)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn skipped_polygon_is_reported_and_left_alone() {
        let (mut mesh, pts) = grid_3x3();
        let bad = mesh.add_face(&[pts[0], pts[1], pts[0], pts[1]]);
        let params = ReduceParams::default().with_mode(ReductionMode::Ratio(1.0));
        let report = ReducePolygons::new(params).execute(&mut mesh).unwrap();
        assert_eq!(report.skipped_polygons, 1);
        assert_eq!(mesh.polygon(bad).unwrap().points, vec![pts[0], pts[1], pts[0], pts[1]]);
    }

    /// Reports a collapse across whatever edge it was told is protected.
    struct Rogue;

    impl EdgeCollapseSimplifier for Rogue {
        fn simplify(
            &mut self,
            input: &SimplifyInput,
            on_collapse: &mut dyn FnMut(CollapseEvent),
        ) -> Result<SimplifyOutcome> {
            if let Some(&(a, b)) = input.protected.iter().next() {
                on_collapse(CollapseEvent {
                    surviving: a,
                    removed: b,
                    reversed: false,
                });
            }
            Ok(SimplifyOutcome {
                positions: input.positions.clone(),
                collapses: 1,
                edges_remaining: 0,
                stopped_early: false,
            })
        }
    }

    #[test]
    fn simplifier_crossing_a_protected_edge_is_fatal() {
        let (mut mesh, _) = grid_3x3();
        let err = ReducePolygons::new(ReduceParams::default())
            .with_simplifier(Rogue)
            .execute(&mut mesh)
            .unwrap_err();
        assert!(matches!(
            err,
            ReduceError::Simplify(SimplifyError::ProtectedEdgeCollapsed(..))
        ));
    }

    #[test]
    fn report_display_summarises_edges() {
        let report = ReductionReport {
            edges_before: 18,
            edges_after: 9,
            target_edges: 9,
            collapses: 3,
            ..ReductionReport::default()
        };
        assert_eq!(
            report.to_string(),
            "Reduction: 18 → 9 edges (50.0% reduction, 3 collapses, target 9)"
        );
    }
}

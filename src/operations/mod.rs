mod build;
mod classify;
mod emit;
mod partition;
mod reduce;
mod replay;

pub use build::{BuildTopology, IngestReport, SkippedPolygon};
pub use classify::{ClassifyConstraints, ConstraintPolicy};
pub use emit::{EmitMesh, EmitMode, EmitReport};
pub use partition::PartitionParts;
pub use reduce::{ReducePolygons, ReductionReport};
pub use replay::{CollapseRecord, ReplayCollapses};

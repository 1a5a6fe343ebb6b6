use crate::error::{ReduceError, Result};
use crate::operations::ConstraintPolicy;

pub use crate::simplify::CostStrategy;

/// How the stopping target is derived from the live edge count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReductionMode {
    /// Keep this fraction of the edges, in `[0, 1]`.
    Ratio(f64),
    /// Remove this many edges.
    Count(usize),
}

impl Default for ReductionMode {
    fn default() -> Self {
        Self::Ratio(0.5)
    }
}

/// Parameters controlling one polygon reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReduceParams {
    /// Stopping target.
    pub mode: ReductionMode,
    /// Collapse cost and placement strategy, forwarded to the simplifier.
    pub strategy: CostStrategy,
    /// Protect edges with fewer than two incident polygons.
    pub preserve_boundary: bool,
    /// Protect edges between polygons with different materials.
    pub preserve_material: bool,
    /// Re-emit every surviving triangle as its own polygon.
    pub triangulate_only: bool,
}

impl Default for ReduceParams {
    fn default() -> Self {
        Self {
            mode: ReductionMode::default(),
            strategy: CostStrategy::default(),
            preserve_boundary: true,
            preserve_material: false,
            triangulate_only: false,
        }
    }
}

impl ReduceParams {
    /// Sets the stopping target.
    #[must_use]
    pub fn with_mode(mut self, mode: ReductionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the collapse strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: CostStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets boundary preservation.
    #[must_use]
    pub fn with_preserve_boundary(mut self, on: bool) -> Self {
        self.preserve_boundary = on;
        self
    }

    /// Sets material-seam preservation.
    #[must_use]
    pub fn with_preserve_material(mut self, on: bool) -> Self {
        self.preserve_material = on;
        self
    }

    /// Sets triangulated output.
    #[must_use]
    pub fn with_triangulate_only(mut self, on: bool) -> Self {
        self.triangulate_only = on;
        self
    }

    /// Checks the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::InvalidParameters`] if the ratio is not a finite value in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if let ReductionMode::Ratio(ratio) = self.mode {
            if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
                return Err(ReduceError::InvalidParameters(format!(
                    "ratio must be within [0, 1], got {ratio}"
                )));
            }
        }
        Ok(())
    }

    /// The live edge count at which simplification stops.
    #[must_use]
    pub fn target_edges(&self, current: usize) -> usize {
        self.mode.target_edges(current)
    }

    /// The edge protection policy implied by these parameters.
    #[must_use]
    pub fn policy(&self) -> ConstraintPolicy {
        ConstraintPolicy {
            preserve_boundary: self.preserve_boundary,
            preserve_material: self.preserve_material,
        }
    }
}

impl ReductionMode {
    /// Stopping target for `current` live edges.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn target_edges(&self, current: usize) -> usize {
        match *self {
            Self::Ratio(ratio) => {
                let ratio = ratio.clamp(0.0, 1.0);
                ((current as f64 * ratio).floor() as usize).min(current)
            }
            Self::Count(count) => current.saturating_sub(count),
        }
    }
}

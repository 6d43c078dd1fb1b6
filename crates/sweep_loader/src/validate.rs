//! Coverage gate applied to decoded volumes before they are sampled.
//!
//! This is a heuristic: a volume with enough sweeps and a dense first sweep is
//! assumed to be usable. It will let some partially corrupted files through
//! and reject some sparse but valid ones.

use crate::volume::SweepInfo;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_VALID_SWEEPS: usize = 5;
pub const DEFAULT_MIN_FIRST_SWEEP_RAYS: usize = 700;

/// Thresholds a volume's sweep metadata has to meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageRule {
    /// Minimum number of sweeps with a non-missing identifier.
    pub min_valid_sweeps: usize,
    /// Minimum ray count of the first sweep.
    pub min_first_sweep_rays: usize,
}

impl Default for CoverageRule {
    fn default() -> Self {
        Self {
            min_valid_sweeps: DEFAULT_MIN_VALID_SWEEPS,
            min_first_sweep_rays: DEFAULT_MIN_FIRST_SWEEP_RAYS,
        }
    }
}

impl CoverageRule {
    pub fn is_valid(&self, sweeps: &[SweepInfo]) -> bool {
        let valid_sweeps = sweeps.iter().filter(|s| s.is_present()).count();
        if valid_sweeps < self.min_valid_sweeps {
            return false;
        }
        sweeps
            .first()
            .is_some_and(|first| first.actual_ray_count >= self.min_first_sweep_rays)
    }
}

/// Checks `sweeps` against the default [`CoverageRule`].
pub fn is_valid(sweeps: &[SweepInfo]) -> bool {
    CoverageRule::default().is_valid(sweeps)
}

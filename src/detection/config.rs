use crate::detection::DetectionError;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

/// Distance between consecutive `eps` values of the search grid.
pub const EPS_STEP: f64 = 0.1;

/// Largest number of `(eps, min_samples)` pairs a search grid may hold.
pub const MAX_GRID_POINTS: usize = 10_000;

/// Knobs of the table detector.
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes: `{"eps_range": [1.0, 1.5], "verbose": true}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Closed range of clustering radii, walked in steps of [`EPS_STEP`]
    pub eps_range: (f64, f64),
    /// Closed range of neighborhood sizes that make a point dense
    pub min_samples_range: (usize, usize),
    /// Log what is being analyzed and what was found
    pub verbose: bool,
    /// Evaluate the radii of the search grid on the rayon thread pool
    pub parallel: bool,
    /// Upper bound on grid-search time per sheet, in milliseconds
    pub time_budget_ms: Option<u64>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            eps_range: (1.0, 2.0),
            min_samples_range: (2, 5),
            verbose: false,
            parallel: true,
            time_budget_ms: None,
        }
    }
}

impl DetectorConfig {
    /// Checks that both search ranges describe a non-empty grid of at most
    /// [`MAX_GRID_POINTS`] configurations.
    pub fn validate(&self) -> Result<(), DetectionError> {
        let (eps_lower, eps_upper) = self.eps_range;
        if !eps_lower.is_finite() || !eps_upper.is_finite() {
            return Err(DetectionError::InvalidConfig(format!(
                "eps range ({eps_lower}, {eps_upper}) must be finite"
            )));
        }
        if eps_lower <= 0.0 {
            return Err(DetectionError::InvalidConfig(format!(
                "eps lower bound {eps_lower} must be positive"
            )));
        }
        if eps_lower > eps_upper {
            return Err(DetectionError::InvalidConfig(format!(
                "eps range ({eps_lower}, {eps_upper}) is reversed"
            )));
        }
        let (samples_lower, samples_upper) = self.min_samples_range;
        if samples_lower == 0 {
            return Err(DetectionError::InvalidConfig(
                "min_samples lower bound must be at least 1".to_string(),
            ));
        }
        if samples_lower > samples_upper {
            return Err(DetectionError::InvalidConfig(format!(
                "min_samples range ({samples_lower}, {samples_upper}) is reversed"
            )));
        }
        let eps_count = self.eps_count();
        let samples_count = (samples_upper - samples_lower) as f64 + 1.0;
        if eps_count * samples_count > MAX_GRID_POINTS as f64 {
            return Err(DetectionError::InvalidConfig(format!(
                "search grid of {eps_count} eps x {samples_count} min_samples values exceeds {MAX_GRID_POINTS} configurations"
            )));
        }
        Ok(())
    }

    /// Number of radii in the search grid, computed without building it.
    fn eps_count(&self) -> f64 {
        let (lower, upper) = self.eps_range;
        ((upper - lower) / EPS_STEP + 1e-9).floor().max(0.0) + 1.0
    }

    /// Radii of the search grid in ascending order.
    ///
    /// Values are `lower + i * 0.1` with floating-point noise removed, so the
    /// default grid is exactly `1.0, 1.1, ..., 2.0`.
    pub fn eps_values(&self) -> Vec<f64> {
        let lower = self.eps_range.0;
        let steps = (self.eps_count() as usize).saturating_sub(1);
        (0..=steps)
            .map(|step| round_noise(lower + step as f64 * EPS_STEP))
            .collect()
    }

    /// Neighborhood sizes of the search grid in ascending order.
    pub fn min_samples_values(&self) -> Vec<usize> {
        let (lower, upper) = self.min_samples_range;
        (lower..=upper).collect()
    }

    /// Per-sheet search time bound, if any.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }
}

fn round_noise(value: f64) -> f64 {
    (value * 1e9).round() / 1e9
}

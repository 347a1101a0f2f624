//! Grid search over DBSCAN parameters.
//!
//! Every `(eps, min_samples)` pair of the configured grid is clustered and
//! scored with `num_outliers - 5 * num_tables`. The canonical order is `eps`
//! ascending, then `min_samples` ascending; the winner is the first result in
//! that order with the strictly lowest score among results that found at
//! least one table.
use crate::detection::bbox::bounding_boxes;
use crate::detection::bbox::TableBoundingBox;
use crate::detection::candidates::Point;
use crate::detection::config::DetectorConfig;
use crate::detection::dbscan::count_clusters;
use crate::detection::dbscan::count_noise;
use crate::detection::dbscan::dbscan;
use crate::detection::dbscan::Neighborhoods;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

/// Points credited to the selection score for every detected table.
pub const TABLE_REWARD: i64 = 5;

/// Result of one clustering run of the grid search.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigurationResult {
    pub eps: f64,
    pub min_samples: usize,
    pub num_tables: usize,
    pub num_outliers: usize,
    pub score: i64,
    pub bboxes: Vec<TableBoundingBox>,
}

/// `num_outliers - 5 * num_tables`; lower is better.
pub fn selection_score(num_tables: usize, num_outliers: usize) -> i64 {
    num_outliers as i64 - TABLE_REWARD * num_tables as i64
}

/// Every recorded result plus the position of the chosen one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchOutcome {
    /// All evaluated configurations, in canonical order
    pub results: Vec<ConfigurationResult>,
    /// Index into `results` of the chosen configuration
    pub best: Option<usize>,
    /// Whether the time budget cut the grid short
    pub truncated: bool,
}

impl SearchOutcome {
    pub fn best(&self) -> Option<&ConfigurationResult> {
        self.best.map(|index| &self.results[index])
    }
}

/// Clusters `points` with every configuration of the grid.
///
/// An empty point set is never clustered and yields an empty outcome.
pub fn search(points: &[Point], config: &DetectorConfig) -> SearchOutcome {
    if points.is_empty() {
        return SearchOutcome::default();
    }
    let eps_values = config.eps_values();
    let min_samples_values = config.min_samples_values();
    let deadline = config.time_budget().map(|budget| Instant::now() + budget);

    let evaluate = |eps: &f64| evaluate_radius(points, *eps, &min_samples_values, deadline);
    let rows: Vec<Vec<ConfigurationResult>> = if config.parallel {
        eps_values.par_iter().map(evaluate).collect()
    } else {
        eps_values.iter().map(evaluate).collect()
    };

    let results: Vec<ConfigurationResult> = rows.into_iter().flatten().collect();
    let truncated = results.len() < eps_values.len() * min_samples_values.len();
    let best = select_best(&results);
    SearchOutcome {
        results,
        best,
        truncated,
    }
}

/// Runs one `eps` row of the grid, sharing the neighborhoods across all
/// `min_samples` values.
fn evaluate_radius(
    points: &[Point],
    eps: f64,
    min_samples_values: &[usize],
    deadline: Option<Instant>,
) -> Vec<ConfigurationResult> {
    if is_expired(deadline) {
        return Vec::new();
    }
    let neighborhoods = Neighborhoods::build(points, eps);
    let mut results = Vec::with_capacity(min_samples_values.len());
    for &min_samples in min_samples_values {
        if is_expired(deadline) {
            break;
        }
        let labels = dbscan(&neighborhoods, min_samples);
        let num_tables = count_clusters(&labels);
        let num_outliers = count_noise(&labels);
        results.push(ConfigurationResult {
            eps,
            min_samples,
            num_tables,
            num_outliers,
            score: selection_score(num_tables, num_outliers),
            bboxes: bounding_boxes(points, &labels),
        });
    }
    results
}

fn is_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Index of the first result with the strictly lowest score among those
/// that found at least one table.
pub fn select_best(results: &[ConfigurationResult]) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (index, result) in results.iter().enumerate() {
        if result.num_tables == 0 {
            continue;
        }
        match best {
            Some((_, score)) if result.score >= score => {}
            _ => best = Some((index, result.score)),
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(eps: f64, min_samples: usize, num_tables: usize, num_outliers: usize) -> ConfigurationResult {
        ConfigurationResult {
            eps,
            min_samples,
            num_tables,
            num_outliers,
            score: selection_score(num_tables, num_outliers),
            bboxes: Vec::new(),
        }
    }

    fn two_blocks() -> Vec<Point> {
        let mut points = Vec::new();
        for row in 0..3 {
            for col in 0..3 {
                points.push((row, col));
            }
            for col in 6..9 {
                points.push((row, col));
            }
        }
        points
    }

    #[test]
    fn score_formula() {
        assert_eq!(selection_score(2, 0), -10);
        assert_eq!(selection_score(1, 3), -2);
        assert_eq!(selection_score(0, 7), 7);
    }

    #[test]
    fn first_strict_minimum_wins() {
        let results = vec![
            result(1.0, 2, 0, 0),
            result(1.0, 3, 1, 1),
            result(1.1, 2, 2, 6),
            result(1.1, 3, 1, 1),
        ];
        // -4 at index 1 ties with -4 at indices 2 and 3
        assert_eq!(select_best(&results), Some(1));

        let improved = vec![result(1.0, 2, 1, 2), result(1.0, 3, 2, 0)];
        assert_eq!(select_best(&improved), Some(1));
    }

    #[test]
    fn zero_table_results_are_not_eligible() {
        // score 0 beats -1 numerically but found no table
        let results = vec![result(1.0, 2, 0, 0), result(1.0, 3, 1, 4)];
        assert_eq!(select_best(&results), Some(1));
        assert_eq!(select_best(&[result(1.0, 2, 0, 3)]), None);
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn evaluates_whole_grid_in_canonical_order() {
        let config = DetectorConfig {
            parallel: false,
            ..Default::default()
        };
        let outcome = search(&two_blocks(), &config);
        assert_eq!(outcome.results.len(), 11 * 4);
        assert!(!outcome.truncated);
        let order: Vec<(f64, usize)> = outcome
            .results
            .iter()
            .take(5)
            .map(|result| (result.eps, result.min_samples))
            .collect();
        assert_eq!(order, vec![(1.0, 2), (1.0, 3), (1.0, 4), (1.0, 5), (1.1, 2)]);

        let best = outcome.best().unwrap();
        assert_eq!((best.eps, best.min_samples), (1.0, 2));
        assert_eq!(best.num_tables, 2);
        assert_eq!(best.num_outliers, 0);
        assert_eq!(
            best.bboxes,
            vec![TableBoundingBox::from([1, 1, 3, 3]), TableBoundingBox::from([1, 7, 3, 9])]
        );
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut points = two_blocks();
        points.push((10, 0));
        points.push((10, 2));
        points.sort();
        let sequential = search(
            &points,
            &DetectorConfig {
                parallel: false,
                ..Default::default()
            },
        );
        let parallel = search(&points, &DetectorConfig::default());
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn empty_points_are_not_clustered() {
        let outcome = search(&[], &DetectorConfig::default());
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.best, None);
    }

    #[test]
    fn sparse_points_have_no_viable_clustering() {
        let points = vec![(0, 0), (0, 5), (5, 0)];
        let outcome = search(&points, &DetectorConfig::default());
        assert_eq!(outcome.results.len(), 44);
        assert!(outcome.results.iter().all(|result| result.num_tables == 0));
        assert_eq!(outcome.best(), None);
    }

    #[test]
    fn expired_budget_skips_everything() {
        let config = DetectorConfig {
            time_budget_ms: Some(0),
            ..Default::default()
        };
        let outcome = search(&two_blocks(), &config);
        assert!(outcome.results.is_empty());
        assert!(outcome.truncated);
        assert_eq!(outcome.best, None);
    }
}

//! Density-based clustering (DBSCAN) of points on the integer grid.
//!
//! Semantics follow the classic formulation:
//!
//! - the neighborhood of a point holds every point, itself included, at
//!   Euclidean distance `<= eps`;
//! - a point is *core* when its neighborhood has at least `min_samples` points;
//! - points are visited in input order, and each unlabeled core point opens
//!   the next cluster, which grows through core points only;
//! - a non-core point joins the first cluster that reaches it, and points no
//!   cluster reaches are noise.
use crate::detection::candidates::Point;
use std::collections::HashMap;

/// Cluster label of one point; `None` marks noise.
pub type Label = Option<usize>;

/// Neighborhoods of a point set for one radius.
///
/// Building them is the expensive part of a run, and they do not depend on
/// `min_samples`, so the search computes them once per radius.
#[derive(Clone, Debug)]
pub struct Neighborhoods {
    lists: Vec<Vec<usize>>,
}

impl Neighborhoods {
    /// Finds the neighbors of every point within `eps`.
    ///
    /// Points live on an integer grid, so only offsets up to `floor(eps)` in
    /// each direction can qualify, and never more than the span of the point
    /// set. When that window holds fewer cells than there are points, the
    /// offsets are looked up in a coordinate index; otherwise every pair is
    /// compared.
    pub fn build(points: &[Point], eps: f64) -> Self {
        let reach = reach_within(points, eps);
        let window = (2 * reach as u128 + 1).pow(2);
        let lists = if window <= points.len() as u128 {
            Self::by_offsets(points, &offsets_within(eps, reach))
        } else {
            Self::by_pairs(points, eps)
        };
        Self { lists }
    }

    fn by_offsets(points: &[Point], offsets: &[(isize, isize)]) -> Vec<Vec<usize>> {
        let index: HashMap<Point, usize> = points
            .iter()
            .enumerate()
            .map(|(position, point)| (*point, position))
            .collect();
        points
            .iter()
            .map(|(row, col)| {
                offsets
                    .iter()
                    .filter_map(|(row_offset, col_offset)| {
                        let row = row.checked_add_signed(*row_offset)?;
                        let col = col.checked_add_signed(*col_offset)?;
                        index.get(&(row, col)).copied()
                    })
                    .collect()
            })
            .collect()
    }

    fn by_pairs(points: &[Point], eps: f64) -> Vec<Vec<usize>> {
        let limit = eps * eps;
        points
            .iter()
            .map(|(row, col)| {
                points
                    .iter()
                    .enumerate()
                    .filter(|(_, (other_row, other_col))| {
                        let row_delta = row.abs_diff(*other_row) as f64;
                        let col_delta = col.abs_diff(*other_col) as f64;
                        row_delta * row_delta + col_delta * col_delta <= limit
                    })
                    .map(|(position, _)| position)
                    .collect()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Neighbors of point `position`, itself included.
    pub fn of(&self, position: usize) -> &[usize] {
        &self.lists[position]
    }
}

/// Largest per-axis offset worth probing: `floor(eps)`, capped by the
/// row and column span of `points`.
fn reach_within(points: &[Point], eps: f64) -> usize {
    if !(eps >= 0.0) {
        return 0;
    }
    let spread = |axis: fn(&Point) -> usize| {
        let min = points.iter().map(axis).min().unwrap_or(0);
        let max = points.iter().map(axis).max().unwrap_or(0);
        max - min
    };
    let span = spread(|point| point.0).max(spread(|point| point.1));
    (eps.floor() as usize).min(span)
}

/// Integer offsets `(dr, dc)` with `sqrt(dr² + dc²) <= eps` and both
/// components within `reach`.
fn offsets_within(eps: f64, reach: usize) -> Vec<(isize, isize)> {
    if !(eps >= 0.0) {
        return Vec::new();
    }
    let reach = reach as isize;
    let limit = eps * eps;
    let mut offsets = Vec::new();
    for row_offset in -reach..=reach {
        for col_offset in -reach..=reach {
            let distance = (row_offset * row_offset + col_offset * col_offset) as f64;
            if distance <= limit {
                offsets.push((row_offset, col_offset));
            }
        }
    }
    offsets
}

/// Labels every point of `neighborhoods` for the given density threshold.
///
/// Cluster labels are `0, 1, ...` in the order their first core point
/// appears in the input.
pub fn dbscan(neighborhoods: &Neighborhoods, min_samples: usize) -> Vec<Label> {
    let count = neighborhoods.len();
    let is_core: Vec<bool> = (0..count)
        .map(|position| neighborhoods.of(position).len() >= min_samples)
        .collect();
    let mut labels: Vec<Label> = vec![None; count];
    let mut next_label = 0usize;
    let mut stack = Vec::new();

    for start in 0..count {
        if labels[start].is_some() || !is_core[start] {
            continue;
        }
        let mut current = start;
        loop {
            if labels[current].is_none() {
                labels[current] = Some(next_label);
                if is_core[current] {
                    stack.extend(
                        neighborhoods
                            .of(current)
                            .iter()
                            .copied()
                            .filter(|neighbor| labels[*neighbor].is_none()),
                    );
                }
            }
            match stack.pop() {
                Some(neighbor) => current = neighbor,
                None => break,
            }
        }
        next_label += 1;
    }
    labels
}

/// Clusters `points` in one go.
pub fn cluster(points: &[Point], eps: f64, min_samples: usize) -> Vec<Label> {
    dbscan(&Neighborhoods::build(points, eps), min_samples)
}

/// Number of distinct clusters among `labels`.
pub fn count_clusters(labels: &[Label]) -> usize {
    labels
        .iter()
        .flatten()
        .max()
        .map(|label| label + 1)
        .unwrap_or(0)
}

/// Number of noise points among `labels`.
pub fn count_noise(labels: &[Label]) -> usize {
    labels.iter().filter(|label| label.is_none()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(row: usize, col: usize, height: usize, width: usize) -> Vec<Point> {
        let mut points = Vec::new();
        for r in row..row + height {
            for c in col..col + width {
                points.push((r, c));
            }
        }
        points
    }

    #[test]
    fn offsets_follow_euclidean_radius() {
        // 4-neighborhood plus the point itself
        assert_eq!(offsets_within(1.0, 1).len(), 5);
        // diagonals join once eps passes sqrt(2)
        assert_eq!(offsets_within(1.4, 1).len(), 5);
        assert_eq!(offsets_within(1.5, 1).len(), 9);
        // (0, ±2) and (±2, 0) sit exactly on the radius
        assert_eq!(offsets_within(2.0, 2).len(), 13);
        assert_eq!(offsets_within(2.0, 1).len(), 9);
    }

    #[test]
    fn reach_is_capped_by_span() {
        let points = block(3, 3, 2, 4);
        assert_eq!(reach_within(&points, 1.9), 1);
        assert_eq!(reach_within(&points, 1e6), 3);
        assert_eq!(reach_within(&[(7, 7)], 1e12), 0);
        assert_eq!(reach_within(&points, f64::NAN), 0);
    }

    #[test]
    fn huge_radius_links_every_point() {
        let mut points = block(0, 0, 3, 3);
        points.push((40, 90));
        let neighborhoods = Neighborhoods::build(&points, 1e6);
        for position in 0..points.len() {
            assert_eq!(neighborhoods.of(position).len(), points.len());
        }
        let labels = dbscan(&neighborhoods, 2);
        assert_eq!(count_clusters(&labels), 1);
        assert_eq!(count_noise(&labels), 0);
    }

    #[test]
    fn pairwise_and_offset_lookups_agree() {
        let mut points = block(0, 0, 4, 4);
        points.extend(block(6, 1, 2, 5));
        points.push((9, 9));
        points.sort();
        for eps in [1.0, 1.5, 2.0, 2.9] {
            let reach = reach_within(&points, eps);
            let mut by_offsets = Neighborhoods::by_offsets(&points, &offsets_within(eps, reach));
            let mut by_pairs = Neighborhoods::by_pairs(&points, eps);
            by_offsets.iter_mut().for_each(|list| list.sort());
            by_pairs.iter_mut().for_each(|list| list.sort());
            assert_eq!(by_offsets, by_pairs, "eps {eps}");
        }
    }

    #[test]
    fn neighborhoods_include_self() {
        let points = vec![(0, 0), (0, 1), (5, 5)];
        let neighborhoods = Neighborhoods::build(&points, 1.0);
        assert_eq!(neighborhoods.len(), 3);
        let mut first = neighborhoods.of(0).to_vec();
        first.sort();
        assert_eq!(first, vec![0, 1]);
        assert_eq!(neighborhoods.of(2), &[2]);
    }

    #[test]
    fn separates_distant_blocks() {
        let mut points = block(0, 0, 3, 3);
        points.extend(block(0, 6, 3, 3));
        points.sort();
        let labels = cluster(&points, 1.0, 2);
        assert_eq!(count_clusters(&labels), 2);
        assert_eq!(count_noise(&labels), 0);
        // row-major order meets the left block first
        assert_eq!(labels[0], Some(0));
        assert_eq!(labels[points.iter().position(|p| *p == (0, 6)).unwrap()], Some(1));
    }

    #[test]
    fn isolated_points_are_noise() {
        let mut points = block(0, 0, 2, 2);
        points.push((10, 10));
        let labels = cluster(&points, 1.0, 2);
        assert_eq!(count_clusters(&labels), 1);
        assert_eq!(labels[4], None);
        assert_eq!(count_noise(&labels), 1);
    }

    #[test]
    fn border_points_are_kept() {
        let points = vec![(0, 0), (0, 1), (0, 2), (0, 3), (0, 4), (0, 5), (0, 6), (0, 7)];
        let neighborhoods = Neighborhoods::build(&points, 1.0);
        let labels = dbscan(&neighborhoods, 3);
        // both ends count only two points and are not core
        assert_eq!(labels[0], Some(0));
        assert_eq!(labels[7], Some(0));
        assert_eq!(count_clusters(&labels), 1);

        let sparse = vec![(0, 0), (0, 1), (0, 2), (0, 4), (0, 5), (0, 6)];
        let labels = cluster(&sparse, 1.0, 3);
        assert_eq!(labels, vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)]);
    }

    #[test]
    fn shared_border_point_goes_to_earlier_cluster() {
        // (1, 0) and (1, 2) are core; (1, 1) sits between them with three points
        let points = vec![(0, 0), (0, 2), (1, 0), (1, 1), (1, 2), (2, 0), (2, 2)];
        let labels = cluster(&points, 1.0, 4);
        assert_eq!(labels[2], Some(0));
        assert_eq!(labels[3], Some(0));
        assert_eq!(labels[4], Some(1));
        assert_eq!(
            labels,
            vec![Some(0), Some(1), Some(0), Some(0), Some(1), Some(0), Some(1)]
        );
    }

    #[test]
    fn high_threshold_leaves_only_noise() {
        let points = block(0, 0, 2, 2);
        let labels = cluster(&points, 1.0, 10);
        assert_eq!(count_clusters(&labels), 0);
        assert_eq!(count_noise(&labels), 4);
    }

    #[test]
    fn empty_input() {
        assert!(cluster(&[], 1.5, 2).is_empty());
        assert_eq!(count_clusters(&[]), 0);
    }
}

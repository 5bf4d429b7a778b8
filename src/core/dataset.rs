//! Simulated datasets and cluster labels.

use crate::utils::{select_entries, select_rows};
use faer::{Col, Mat};

/// Cluster membership for each row of a design.
///
/// Labels are arbitrary ids; rows sharing an id belong to the same cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clusters {
    labels: Vec<usize>,
}

impl Clusters {
    /// One cluster per row.
    pub fn singletons(n_rows: usize) -> Self {
        Self {
            labels: (0..n_rows).collect(),
        }
    }

    /// Build from explicit labels.
    pub fn from_labels(labels: Vec<usize>) -> Self {
        Self { labels }
    }

    /// Number of labelled rows.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no rows are labelled.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Raw labels, aligned with rows.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of distinct clusters.
    pub fn n_clusters(&self) -> usize {
        let mut seen = self.labels.clone();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }

    /// Row indices grouped by cluster, in order of first appearance.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = Vec::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (row, &label) in self.labels.iter().enumerate() {
            match order.iter().position(|&l| l == label) {
                Some(g) => groups[g].push(row),
                None => {
                    order.push(label);
                    groups.push(vec![row]);
                }
            }
        }
        groups
    }

    /// Labels for a subset of rows.
    ///
    /// When the subset has fewer rows than there are clusters, the old
    /// assignment no longer describes the sample and every row becomes its
    /// own cluster.
    pub fn restrict(&self, rows: &[usize]) -> Self {
        if rows.len() < self.n_clusters() {
            return Self::singletons(rows.len());
        }
        Self {
            labels: rows.iter().map(|&r| self.labels[r]).collect(),
        }
    }
}

/// One simulated regression sample.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Design matrix, `n_true × p`. The first `n_base` rows are Gaussian draws.
    pub x: Mat<f64>,
    /// Response vector, length `n_true`.
    pub y: Col<f64>,
    /// Cluster labels, length `n_true`.
    pub clusters: Clusters,
    /// `p × p` covariance descriptor used for projected targets.
    pub sigma: Mat<f64>,
    /// Residual noise standard deviation.
    pub sd: f64,
    /// Number of randomly drawn rows before any leverage rows.
    pub n_base: usize,
}

impl Dataset {
    /// Total number of rows, including appended leverage rows.
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    /// Number of covariates.
    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Rows, responses and clusters for a subset of observations.
    pub fn subset(&self, rows: &[usize]) -> (Mat<f64>, Col<f64>, Clusters) {
        (
            select_rows(&self.x, rows),
            select_entries(&self.y, rows),
            self.clusters.restrict(rows),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_groups() {
        let clusters = Clusters::singletons(3);
        assert_eq!(clusters.n_clusters(), 3);
        assert_eq!(clusters.groups(), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_groups_follow_first_appearance() {
        let clusters = Clusters::from_labels(vec![7, 3, 7, 3, 1]);
        assert_eq!(clusters.n_clusters(), 3);
        assert_eq!(clusters.groups(), vec![vec![0, 2], vec![1, 3], vec![4]]);
    }

    #[test]
    fn test_restrict_keeps_labels_when_large_enough() {
        let clusters = Clusters::from_labels(vec![0, 0, 1, 1, 2, 2]);
        let restricted = clusters.restrict(&[0, 1, 2, 4]);
        assert_eq!(restricted.labels(), &[0, 0, 1, 2]);
    }

    #[test]
    fn test_restrict_resets_stale_labels() {
        let clusters = Clusters::singletons(10);
        let restricted = clusters.restrict(&[2, 5, 9]);
        assert_eq!(restricted.labels(), &[0, 1, 2]);
        assert_eq!(restricted.n_clusters(), 3);
    }

    #[test]
    fn test_subset_aligns_rows() {
        let dataset = Dataset {
            x: Mat::from_fn(4, 2, |i, j| (i * 10 + j) as f64),
            y: Col::from_fn(4, |i| i as f64),
            clusters: Clusters::singletons(4),
            sigma: Mat::identity(2, 2),
            sd: 1.0,
            n_base: 4,
        };

        let (x, y, clusters) = dataset.subset(&[3, 1]);
        assert_eq!(x[(0, 0)], 30.0);
        assert_eq!(x[(1, 1)], 11.0);
        assert_eq!(y[0], 3.0);
        assert_eq!(clusters.len(), 2);
    }
}

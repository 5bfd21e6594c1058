/// Density-based clustering (DBSCAN) over [`ClusterPoint`]s
///
/// Deterministic: points are visited in input order and members are kept in
/// the order they were reached. Clusters come back largest first, ties going
/// to the cluster holding the lowest point position. The verification
/// pipeline reads only the first cluster of each run.
use crate::consensus::point::{ClusterPoint, DistanceMetric};
use std::cmp::Reverse;
use std::collections::VecDeque;

/// Parameters of one clustering run
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterParams {
    /// Minimum cluster size, counting the core point itself
    pub min_points: usize,
    /// Neighborhood radius (inclusive)
    pub epsilon: f64,
    pub metric: DistanceMetric,
}

/// Cluster `points`; each returned group has at least `min_points` members.
pub fn cluster<P: ClusterPoint + Clone>(params: &ClusterParams, points: &[P]) -> Vec<Vec<P>> {
    let neighborhoods = neighborhoods(params, points);
    let count = points.len();

    let mut visited = vec![false; count];
    let mut assigned = vec![false; count];
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for seed in 0..count {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;

        if !is_core(&neighborhoods[seed], params.min_points) {
            // Noise for now; may still be claimed as a border point later.
            continue;
        }

        let mut members = vec![seed];
        assigned[seed] = true;
        let mut frontier: VecDeque<usize> = neighborhoods[seed].iter().copied().collect();

        while let Some(candidate) = frontier.pop_front() {
            if !assigned[candidate] {
                assigned[candidate] = true;
                members.push(candidate);
            }
            if visited[candidate] {
                continue;
            }
            visited[candidate] = true;
            if is_core(&neighborhoods[candidate], params.min_points) {
                frontier.extend(neighborhoods[candidate].iter().copied());
            }
        }

        if members.len() >= params.min_points {
            clusters.push(members);
        }
    }

    clusters.sort_by_key(|members| (Reverse(members.len()), members.iter().min().copied()));

    log::trace!(
        "dbscan: {} points, eps={}, min_points={}, {} cluster(s)",
        count,
        params.epsilon,
        params.min_points,
        clusters.len()
    );

    clusters
        .into_iter()
        .map(|members| members.into_iter().map(|i| points[i].clone()).collect())
        .collect()
}

fn is_core(neighbors: &[usize], min_points: usize) -> bool {
    neighbors.len() + 1 >= min_points
}

/// Neighbor lists (excluding self), each in ascending point order
fn neighborhoods<P: ClusterPoint>(params: &ClusterParams, points: &[P]) -> Vec<Vec<usize>> {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            points
                .iter()
                .enumerate()
                .filter(|&(j, other)| {
                    j != i && other.distance_to(point, params.metric) <= params.epsilon
                })
                .map(|(j, _)| j)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::point::IndexedPoint;

    fn points(vectors: &[&[f64]]) -> Vec<IndexedPoint> {
        vectors
            .iter()
            .enumerate()
            .map(|(i, v)| IndexedPoint::for_evidence(i, v.to_vec()))
            .collect()
    }

    fn indices(group: &[IndexedPoint]) -> Vec<usize> {
        let mut ids: Vec<usize> = group.iter().map(|p| p.index).collect();
        ids.sort_unstable();
        ids
    }

    fn cosine(epsilon: f64) -> ClusterParams {
        ClusterParams {
            min_points: 2,
            epsilon,
            metric: DistanceMetric::Cosine,
        }
    }

    #[test]
    fn test_near_identical_features_form_first_cluster() {
        let pts = points(&[&[1.0, 0.0], &[1.0, 0.001], &[0.0, 1.0]]);
        let clusters = cluster(&cosine(0.00001), &pts);

        assert_eq!(clusters.len(), 1);
        assert_eq!(indices(&clusters[0]), vec![1, 2]);
    }

    #[test]
    fn test_no_cluster_when_all_points_disagree() {
        let pts = points(&[&[1.0, 0.0], &[0.0, 1.0], &[-1.0, 0.0]]);
        assert!(cluster(&cosine(0.00001), &pts).is_empty());
    }

    #[test]
    fn test_largest_cluster_comes_first() {
        let pts = points(&[&[1.0, 0.0], &[1.0, 0.0], &[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0]]);
        let clusters = cluster(&cosine(0.00001), &pts);

        assert_eq!(clusters.len(), 2);
        assert_eq!(indices(&clusters[0]), vec![3, 4, 5]);
        assert_eq!(indices(&clusters[1]), vec![1, 2]);
    }

    #[test]
    fn test_equal_clusters_ordered_by_lowest_member() {
        let params = ClusterParams {
            min_points: 2,
            epsilon: 0.5,
            metric: DistanceMetric::SquaredEuclidean,
        };
        let pts = points(&[&[10.0], &[0.0], &[10.1], &[0.1], &[50.0]]);
        let clusters = cluster(&params, &pts);

        assert_eq!(clusters.len(), 2);
        assert_eq!(indices(&clusters[0]), vec![1, 3]);
        assert_eq!(indices(&clusters[1]), vec![2, 4]);
    }

    #[test]
    fn test_chained_density_reaches_border_points() {
        let params = ClusterParams {
            min_points: 2,
            epsilon: 1.0,
            metric: DistanceMetric::SquaredEuclidean,
        };
        let pts = points(&[&[0.0], &[1.0], &[2.0], &[3.0], &[10.0]]);
        let clusters = cluster(&params, &pts);

        assert_eq!(clusters.len(), 1);
        assert_eq!(indices(&clusters[0]), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_min_points_larger_than_group() {
        let params = ClusterParams {
            min_points: 3,
            epsilon: 0.00001,
            metric: DistanceMetric::Cosine,
        };
        let pts = points(&[&[1.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]]);
        assert!(cluster(&params, &pts).is_empty());
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let pts = points(&[&[1.0, 0.0], &[0.0, 1.0], &[1.0, 0.0], &[0.0, 1.0], &[1.0, 0.0]]);
        let first = cluster(&cosine(0.00001), &pts);
        for _ in 0..10 {
            assert_eq!(cluster(&cosine(0.00001), &pts), first);
        }
        assert_eq!(indices(&first[0]), vec![1, 3, 5]);
    }

    #[test]
    fn test_empty_input() {
        let pts: Vec<IndexedPoint> = Vec::new();
        assert!(cluster(&cosine(0.1), &pts).is_empty());
    }
}

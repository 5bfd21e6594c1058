/// Indexed numeric points and the distance functions clustering runs over
use serde::{Deserialize, Serialize};

/// Distance metric selector
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Sum of squared per-dimension differences
    #[serde(rename = "squared_euclidean")]
    SquaredEuclidean,
    /// 1 - cosine similarity, bounded in [0, 2]
    #[serde(rename = "cosine")]
    Cosine,
}

impl DistanceMetric {
    /// `true` selects squared Euclidean, `false` cosine
    pub fn from_flag(squared_euclidean: bool) -> Self {
        if squared_euclidean {
            DistanceMetric::SquaredEuclidean
        } else {
            DistanceMetric::Cosine
        }
    }

    /// Distance reported for vectors that cannot be compared
    pub fn incomparable(self) -> f64 {
        match self {
            DistanceMetric::SquaredEuclidean => f64::MAX,
            DistanceMetric::Cosine => MAX_COSINE_DISTANCE,
        }
    }

    /// Distance between two vectors. Never panics; mismatched lengths
    /// return [`DistanceMetric::incomparable`].
    pub fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        if a.len() != b.len() {
            return self.incomparable();
        }
        match self {
            DistanceMetric::SquaredEuclidean => squared_euclidean(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
        }
    }
}

pub const MAX_COSINE_DISTANCE: f64 = 2.0;

fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = y - x;
            d * d
        })
        .sum();
    if sum.is_nan() {
        return f64::MAX;
    }
    sum
}

fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    // Zero vectors carry no direction and never join a consensus.
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return MAX_COSINE_DISTANCE;
    }

    let distance = 1.0 - dot / denom;
    if distance.is_nan() {
        return MAX_COSINE_DISTANCE;
    }
    distance.clamp(0.0, MAX_COSINE_DISTANCE)
}

/// Capability set the clustering collaborator needs from a point
pub trait ClusterPoint {
    fn distance_to(&self, other: &Self, metric: DistanceMetric) -> f64;
    fn identity(&self) -> String;
}

/// One evidence item's value on a consensus axis.
///
/// `index` is 1-based: evidence `i` is carried as index `i + 1` and mapped
/// back with [`IndexedPoint::evidence_index`].
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedPoint {
    pub index: usize,
    pub vector: Vec<f64>,
}

impl IndexedPoint {
    pub fn new(index: usize, vector: Vec<f64>) -> Self {
        Self { index, vector }
    }

    /// Point for the evidence at 0-based position `evidence_index`
    pub fn for_evidence(evidence_index: usize, vector: Vec<f64>) -> Self {
        Self::new(evidence_index + 1, vector)
    }

    /// 0-based evidence position this point stands for
    pub fn evidence_index(&self) -> usize {
        self.index.saturating_sub(1)
    }
}

impl ClusterPoint for IndexedPoint {
    fn distance_to(&self, other: &Self, metric: DistanceMetric) -> f64 {
        metric.distance(&self.vector, &other.vector)
    }

    fn identity(&self) -> String {
        self.index.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_squared_euclidean() {
        let a = IndexedPoint::new(1, vec![0.0, 0.0]);
        let b = IndexedPoint::new(2, vec![3.0, 4.0]);
        assert!(approx(a.distance_to(&b, DistanceMetric::SquaredEuclidean), 25.0));
        assert!(approx(b.distance_to(&a, DistanceMetric::SquaredEuclidean), 25.0));
        assert_eq!(a.distance_to(&a, DistanceMetric::SquaredEuclidean), 0.0);
    }

    #[test]
    fn test_cosine_distance_bounds() {
        let x = IndexedPoint::new(1, vec![1.0, 0.0]);
        let y = IndexedPoint::new(2, vec![0.0, 1.0]);
        let neg_x = IndexedPoint::new(3, vec![-1.0, 0.0]);
        let scaled_x = IndexedPoint::new(4, vec![5.0, 0.0]);

        assert!(approx(x.distance_to(&y, DistanceMetric::Cosine), 1.0));
        assert!(approx(x.distance_to(&neg_x, DistanceMetric::Cosine), 2.0));
        assert!(approx(x.distance_to(&scaled_x, DistanceMetric::Cosine), 0.0));
    }

    #[test]
    fn test_near_identical_features_within_radius() {
        let a = IndexedPoint::new(1, vec![1.0, 0.0]);
        let b = IndexedPoint::new(2, vec![1.0, 0.001]);
        let d = a.distance_to(&b, DistanceMetric::Cosine);
        assert!(d >= 0.0);
        assert!(d < 0.00001);
    }

    #[test]
    fn test_dimension_mismatch_sentinels() {
        let short = IndexedPoint::new(1, vec![1.0]);
        let long = IndexedPoint::new(2, vec![1.0, 2.0]);
        assert_eq!(
            short.distance_to(&long, DistanceMetric::SquaredEuclidean),
            f64::MAX
        );
        assert_eq!(short.distance_to(&long, DistanceMetric::Cosine), 2.0);
    }

    #[test]
    fn test_zero_vector_is_maximally_dissimilar() {
        let zero = IndexedPoint::new(1, vec![0.0, 0.0]);
        let other_zero = IndexedPoint::new(2, vec![0.0, 0.0]);
        let x = IndexedPoint::new(3, vec![1.0, 0.0]);
        assert_eq!(zero.distance_to(&other_zero, DistanceMetric::Cosine), 2.0);
        assert_eq!(zero.distance_to(&x, DistanceMetric::Cosine), 2.0);
    }

    #[test]
    fn test_nan_inputs_never_cluster() {
        let nan = IndexedPoint::new(1, vec![f64::NAN]);
        let x = IndexedPoint::new(2, vec![1.0]);
        assert_eq!(nan.distance_to(&x, DistanceMetric::SquaredEuclidean), f64::MAX);
        assert_eq!(nan.distance_to(&x, DistanceMetric::Cosine), 2.0);
    }

    #[test]
    fn test_index_mapping() {
        let point = IndexedPoint::for_evidence(0, vec![]);
        assert_eq!(point.index, 1);
        assert_eq!(point.evidence_index(), 0);
        assert_eq!(point.identity(), "1");
    }

    #[test]
    fn test_metric_flag() {
        assert_eq!(DistanceMetric::from_flag(true), DistanceMetric::SquaredEuclidean);
        assert_eq!(DistanceMetric::from_flag(false), DistanceMetric::Cosine);
    }
}

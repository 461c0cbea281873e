//! Distance functions for nearest-neighbour search

use serde::{Deserialize, Serialize};

/// Distance metric for vector search; smaller is closer for all metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// L2 (Euclidean) distance
    #[default]
    L2,
    /// 1 - cosine similarity
    Cosine,
    /// 1 - dot product (for normalized vectors)
    InnerProduct,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            DistanceMetric::Cosine => {
                let mut dot = 0.0;
                let mut norm_a = 0.0;
                let mut norm_b = 0.0;
                for (x, y) in a.iter().zip(b) {
                    dot += x * y;
                    norm_a += x * x;
                    norm_b += y * y;
                }
                if norm_a <= 0.0 || norm_b <= 0.0 {
                    return 1.0;
                }
                1.0 - dot / (norm_a * norm_b).sqrt()
            }
            DistanceMetric::InnerProduct => 1.0 - a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
        }
    }
}

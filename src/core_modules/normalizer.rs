// THEORY:
// The `PathNormalizer` maps a gesture of any length, size and position to a
// fixed-length `FeatureVector`, so the same shape drawn near or far from the
// camera, or anywhere in the frame, lands on nearly the same vector.
//
// Steps:
// 1.  **Translate** so the centroid of the raw points is the origin.
// 2.  **Scale** uniformly so the bounding-box diagonal (or the RMS radius) is 1.
//     A degenerate trace with zero extent is divided by a small epsilon instead.
// 3.  **Resample** to a fixed number of points spaced evenly by arc length,
//     interpolating between the original samples. This removes the influence of
//     drawing speed and of how many frames the gesture happened to span.
// 4.  **Emit** the resampled coordinates, optionally followed by the unit
//     direction of every resampled segment.
//
// The layout of the vector is described by a `FeatureSpec`. The spec travels
// inside the trained model, so the normalizer and classifier always agree on
// the dimension.

use crate::core_modules::trace::GestureTrace;
use serde::{Deserialize, Serialize};

/// Stand-in scale for traces with no spatial extent.
const MIN_SCALE: f64 = 1e-6;
/// Segments shorter than this have no meaningful direction.
const MIN_SEGMENT: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Divide by the bounding-box diagonal.
    BoundingBoxDiagonal,
    /// Divide by the root-mean-square distance from the centroid.
    RmsRadius,
}

/// Layout of a feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub resample_points: usize,
    pub scale: ScaleMode,
    /// Append `(dx, dy)` unit directions of the resampled segments.
    pub directions: bool,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            resample_points: 32,
            scale: ScaleMode::BoundingBoxDiagonal,
            directions: true,
        }
    }
}

impl FeatureSpec {
    pub fn dimension(&self) -> usize {
        let n = self.resample_points;
        let directions = if self.directions { 2 * n.saturating_sub(1) } else { 0 };
        2 * n + directions
    }
}

/// Fixed-length, shape-only summary of a gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    /// Root-mean-square difference against `other`. Both must have equal length.
    pub fn rms_distance(&self, other: &[f64]) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(other)
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        (sum / self.0.len() as f64).sqrt()
    }
}

#[derive(Debug, Clone)]
pub struct PathNormalizer {
    spec: FeatureSpec,
}

impl PathNormalizer {
    pub fn new(spec: FeatureSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn dimension(&self) -> usize {
        self.spec.dimension()
    }

    pub fn normalize(&self, trace: &GestureTrace) -> FeatureVector {
        self.normalize_path(&trace.path())
    }

    pub fn normalize_path(&self, points: &[(f64, f64)]) -> FeatureVector {
        if points.is_empty() {
            return FeatureVector(vec![0.0; self.dimension()]);
        }

        // --- 1. Translate ---
        let count = points.len() as f64;
        let cx = points.iter().map(|p| p.0).sum::<f64>() / count;
        let cy = points.iter().map(|p| p.1).sum::<f64>() / count;
        let centered: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x - cx, y - cy)).collect();

        // --- 2. Scale ---
        let scale = self.scale_of(&centered).max(MIN_SCALE);
        let scaled: Vec<(f64, f64)> = centered.iter().map(|&(x, y)| (x / scale, y / scale)).collect();

        // --- 3. Resample ---
        let resampled = resample(&scaled, self.spec.resample_points);

        // --- 4. Emit ---
        let mut features = Vec::with_capacity(self.dimension());
        for &(x, y) in &resampled {
            features.push(x);
            features.push(y);
        }
        if self.spec.directions {
            for pair in resampled.windows(2) {
                let dx = pair[1].0 - pair[0].0;
                let dy = pair[1].1 - pair[0].1;
                let length = dx.hypot(dy);
                if length < MIN_SEGMENT {
                    features.extend([0.0, 0.0]);
                } else {
                    features.extend([dx / length, dy / length]);
                }
            }
        }
        FeatureVector(features)
    }

    fn scale_of(&self, centered: &[(f64, f64)]) -> f64 {
        match self.spec.scale {
            ScaleMode::BoundingBoxDiagonal => {
                let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
                let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for &(x, y) in centered {
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
                (max_x - min_x).hypot(max_y - min_y)
            }
            ScaleMode::RmsRadius => {
                let mean_sq = centered.iter().map(|&(x, y)| x * x + y * y).sum::<f64>()
                    / centered.len() as f64;
                mean_sq.sqrt()
            }
        }
    }
}

/// Resamples a polyline to `n` points evenly spaced along its arc length.
/// The first and last points of the input are always kept.
pub fn resample(points: &[(f64, f64)], n: usize) -> Vec<(f64, f64)> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    if n == 0 {
        return Vec::new();
    }

    let mut cumulative = Vec::with_capacity(points.len());
    cumulative.push(0.0);
    for pair in points.windows(2) {
        let step = (pair[1].0 - pair[0].0).hypot(pair[1].1 - pair[0].1);
        let last = cumulative[cumulative.len() - 1];
        cumulative.push(last + step);
    }
    let total = cumulative[cumulative.len() - 1];
    if points.len() == 1 || total <= f64::EPSILON {
        return vec![first; n];
    }

    let last_segment = points.len() - 2;
    (0..n)
        .map(|i| {
            let target = if n == 1 { 0.0 } else { total * i as f64 / (n - 1) as f64 };
            let idx = cumulative
                .partition_point(|&c| c <= target)
                .saturating_sub(1)
                .min(last_segment);
            let segment = cumulative[idx + 1] - cumulative[idx];
            let t = if segment > 0.0 {
                ((target - cumulative[idx]) / segment).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (a, b) = (points[idx], points[idx + 1]);
            (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::trace::CandidatePoint;
    use std::f64::consts::TAU;

    fn spiral(n: usize) -> Vec<(f64, f64)> {
        (0..n)
            .map(|i| {
                let t = i as f64 / (n - 1) as f64;
                let r = 20.0 + 60.0 * t;
                (300.0 + r * (t * TAU * 1.5).cos(), 200.0 + r * (t * TAU * 1.5).sin())
            })
            .collect()
    }

    fn assert_close(a: &FeatureVector, b: &FeatureVector, tolerance: f64) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((x - y).abs() < tolerance, "{x} vs {y}");
        }
    }

    #[test]
    fn dimension_is_fixed_regardless_of_trace_length() {
        let normalizer = PathNormalizer::new(FeatureSpec::default());
        for n in [5, 50, 500] {
            let trace = GestureTrace::from_points(
                spiral(n)
                    .into_iter()
                    .enumerate()
                    .map(|(i, (x, y))| CandidatePoint::new(x, y, 255.0, i as u64))
                    .collect(),
            );
            assert_eq!(normalizer.normalize(&trace).len(), 126, "trace of {n} points");
        }
    }

    #[test]
    fn translation_and_scale_do_not_change_features() {
        for scale in [ScaleMode::BoundingBoxDiagonal, ScaleMode::RmsRadius] {
            let normalizer = PathNormalizer::new(FeatureSpec {
                scale,
                ..FeatureSpec::default()
            });
            let path = spiral(60);
            let moved: Vec<_> = path.iter().map(|&(x, y)| (x * 0.37 - 140.0, y * 0.37 + 55.0)).collect();
            let grown: Vec<_> = path.iter().map(|&(x, y)| (x * 3.0 + 12.0, y * 3.0 - 900.0)).collect();
            let base = normalizer.normalize_path(&path);
            assert_close(&base, &normalizer.normalize_path(&moved), 1e-9);
            assert_close(&base, &normalizer.normalize_path(&grown), 1e-9);
        }
    }

    #[test]
    fn coincident_points_do_not_divide_by_zero() {
        let normalizer = PathNormalizer::new(FeatureSpec::default());
        let features = normalizer.normalize_path(&[(5.0, 5.0); 20]);
        assert_eq!(features.len(), normalizer.dimension());
        assert!(features.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn resampling_spaces_points_evenly_along_the_path() {
        // An L-shape sampled very unevenly.
        let path = [(0.0, 0.0), (1.0, 0.0), (10.0, 0.0), (10.0, 10.0)];
        let out = resample(&path, 5);
        let expected = [(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 5.0), (10.0, 10.0)];
        for (got, want) in out.iter().zip(expected) {
            assert!((got.0 - want.0).abs() < 1e-9 && (got.1 - want.1).abs() < 1e-9);
        }
    }

    #[test]
    fn directions_are_unit_vectors() {
        let normalizer = PathNormalizer::new(FeatureSpec::default());
        let features = normalizer.normalize_path(&spiral(40));
        let directions = &features.as_slice()[64..];
        for pair in directions.chunks(2) {
            assert!((pair[0].hypot(pair[1]) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn coordinates_only_layout() {
        let spec = FeatureSpec {
            resample_points: 16,
            scale: ScaleMode::BoundingBoxDiagonal,
            directions: false,
        };
        assert_eq!(spec.dimension(), 32);
        assert_eq!(PathNormalizer::new(spec).normalize_path(&spiral(9)).len(), 32);
    }
}

// THEORY:
// `CandidatePoint` is the per-frame output of the spot tracker and the unit the
// segmenter accumulates. `GestureTrace` is the ordered path of one gesture. The
// segmenter owns a trace exclusively while it grows and moves it out on
// completion, so nobody can observe a trace that is still being appended to.

use serde::{Deserialize, Serialize};

/// A wand-tip position found in a single frame, in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidatePoint {
    pub x: f64,
    pub y: f64,
    /// Mean intensity (0-255) of the bright region the point was taken from.
    pub intensity: f64,
    /// Pixel area of that region.
    pub area: u32,
    pub timestamp_ms: u64,
}

impl CandidatePoint {
    pub fn new(x: f64, y: f64, intensity: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            intensity,
            area: 1,
            timestamp_ms,
        }
    }

    pub fn distance_to(&self, other: &CandidatePoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// False when either coordinate is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned extent of a trace: `(min_x, min_y)` to `(max_x, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceBounds {
    pub min: (f64, f64),
    pub max: (f64, f64),
}

impl TraceBounds {
    pub fn width(&self) -> f64 {
        self.max.0 - self.min.0
    }

    pub fn height(&self) -> f64 {
        self.max.1 - self.min.1
    }

    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }
}

/// The completed path of one gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureTrace {
    points: Vec<CandidatePoint>,
}

impl GestureTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<CandidatePoint>) -> Self {
        Self { points }
    }

    pub(crate) fn push(&mut self, point: CandidatePoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[CandidatePoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<CandidatePoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&CandidatePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&CandidatePoint> {
        self.points.last()
    }

    pub fn bounds(&self) -> Option<TraceBounds> {
        let first = self.points.first()?;
        let mut bounds = TraceBounds {
            min: first.position(),
            max: first.position(),
        };
        for p in &self.points[1..] {
            bounds.min.0 = bounds.min.0.min(p.x);
            bounds.min.1 = bounds.min.1.min(p.y);
            bounds.max.0 = bounds.max.0.max(p.x);
            bounds.max.1 = bounds.max.1.max(p.y);
        }
        Some(bounds)
    }

    /// Bounding-box diagonal in pixels; zero for an empty trace.
    pub fn extent(&self) -> f64 {
        self.bounds().map_or(0.0, |b| b.diagonal())
    }

    pub fn duration_ms(&self) -> u64 {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => b.timestamp_ms.saturating_sub(a.timestamp_ms),
            _ => 0,
        }
    }

    pub fn path(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(CandidatePoint::position).collect()
    }
}

// THEORY:
// Synthetic IR frames for demos and tests. A frame is a dark background with an
// optional bright disc standing in for the retro-reflective wand tip, plus
// optional static distractors (a lamp, a window). Disc pixels are decided by
// their pixel centres, so the centroid of a rendered disc sits on the requested
// sub-pixel position to within a fraction of a pixel.

use crate::core_modules::frame::Frame;
use image::{GrayImage, Luma};
use std::f64::consts::TAU;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSpec {
    pub width: u32,
    pub height: u32,
    pub background: u8,
    pub tip_radius: f64,
    pub tip_intensity: u8,
    /// Milliseconds between consecutive frames.
    pub frame_interval_ms: u64,
}

impl Default for SceneSpec {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            background: 20,
            tip_radius: 6.0,
            tip_intensity: 255,
            // ~30 fps
            frame_interval_ms: 33,
        }
    }
}

impl SceneSpec {
    pub fn blank(&self, timestamp_ms: u64) -> Frame {
        Frame::new(
            GrayImage::from_pixel(self.width, self.height, Luma([self.background])),
            timestamp_ms,
        )
    }

    /// A frame with the wand tip at `center`.
    pub fn with_tip(&self, center: (f64, f64), timestamp_ms: u64) -> Frame {
        let mut luma = GrayImage::from_pixel(self.width, self.height, Luma([self.background]));
        paint_disc(&mut luma, center, self.tip_radius, self.tip_intensity);
        Frame::new(luma, timestamp_ms)
    }

    /// One frame per path point, then `trailing_blanks` empty frames.
    pub fn render_path(&self, path: &[(f64, f64)], trailing_blanks: usize) -> Vec<Frame> {
        let tips = path.iter().map(|&p| Some(p));
        let blanks = std::iter::repeat_n(None, trailing_blanks);
        tips.chain(blanks)
            .enumerate()
            .map(|(i, tip)| {
                let ts = i as u64 * self.frame_interval_ms;
                match tip {
                    Some(center) => self.with_tip(center, ts),
                    None => self.blank(ts),
                }
            })
            .collect()
    }
}

/// Fills every pixel whose centre lies within `radius` of `center`.
pub fn paint_disc(luma: &mut GrayImage, center: (f64, f64), radius: f64, value: u8) {
    let (width, height) = luma.dimensions();
    let x0 = (center.0 - radius).floor().max(0.0) as u32;
    let y0 = (center.1 - radius).floor().max(0.0) as u32;
    let x1 = ((center.0 + radius).ceil().max(0.0) as u32).min(width);
    let y1 = ((center.1 + radius).ceil().max(0.0) as u32).min(height);
    for y in y0..y1 {
        for x in x0..x1 {
            if (x as f64 - center.0).hypot(y as f64 - center.1) <= radius {
                luma.put_pixel(x, y, Luma([value]));
            }
        }
    }
}

/// `points` samples on a circle, first and last coinciding. `clockwise` is as
/// seen on screen, with y pointing down.
pub fn circle_path(center: (f64, f64), radius: f64, points: usize, clockwise: bool) -> Vec<(f64, f64)> {
    let last = points.saturating_sub(1).max(1) as f64;
    let sign = if clockwise { 1.0 } else { -1.0 };
    (0..points)
        .map(|i| {
            let theta = i as f64 / last * TAU;
            (center.0 + radius * theta.cos(), center.1 + sign * radius * theta.sin())
        })
        .collect()
}

/// `points` samples on the straight segment from `from` to `to`.
pub fn line_path(from: (f64, f64), to: (f64, f64), points: usize) -> Vec<(f64, f64)> {
    let last = points.saturating_sub(1).max(1) as f64;
    (0..points)
        .map(|i| {
            let t = i as f64 / last;
            (from.0 + t * (to.0 - from.0), from.1 + t * (to.1 - from.1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::spot_tracker::{SpotTracker, TrackerConfig};

    #[test]
    fn rendered_tip_is_found_where_it_was_painted() {
        let scene = SceneSpec::default();
        let mut tracker = SpotTracker::new(TrackerConfig::default()).unwrap();
        let point = tracker.detect(&scene.with_tip((123.4, 321.7), 99)).unwrap();
        assert!((point.x - 123.4).abs() < 0.5, "x = {}", point.x);
        assert!((point.y - 321.7).abs() < 0.5, "y = {}", point.y);
        assert_eq!(point.timestamp_ms, 99);
        assert!(tracker.detect(&scene.blank(132)).is_none());
    }

    #[test]
    fn disc_near_the_edge_is_clipped() {
        let mut luma = GrayImage::new(10, 10);
        paint_disc(&mut luma, (-2.0, 9.5), 4.0, 255);
        assert_eq!(luma.get_pixel(0, 9), &Luma([255]));
        assert_eq!(luma.get_pixel(9, 0), &Luma([0]));
    }

    #[test]
    fn render_path_appends_blank_frames_at_a_steady_rate() {
        let scene = SceneSpec {
            width: 64,
            height: 48,
            ..SceneSpec::default()
        };
        let frames = scene.render_path(&line_path((10.0, 10.0), (50.0, 30.0), 4), 3);
        assert_eq!(frames.len(), 7);
        assert_eq!(frames[6].timestamp_ms(), 6 * 33);
        assert!(frames[6].luma().pixels().all(|p| p.0[0] == scene.background));
    }

    #[test]
    fn circle_is_closed() {
        let path = circle_path((320.0, 240.0), 100.0, 40, true);
        assert_eq!(path.len(), 40);
        assert!((path[0].0 - path[39].0).abs() < 1e-9);
        assert!((path[0].1 - path[39].1).abs() < 1e-9);
        // Quarter-turn clockwise on screen moves from the right side downward.
        assert!(path[10].1 > 240.0);
    }
}

// THEORY:
// A `BrightRegion` is a single connected patch of above-threshold pixels in one
// frame. It is a "dumb" data container, a snapshot with no memory of earlier
// frames. The region finder produces them and the spot tracker judges them.
//
// Every property the tracker needs for filtering and selection (area, bounding
// box, mean and peak intensity, centroid) is computed once while the region is
// grown, so selection never has to revisit the pixels.

/// A pixel coordinate in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

/// A connected region of bright pixels detected in a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BrightRegion {
    /// Index of the region within the frame it was found in. Not persistent.
    pub id: usize,
    /// Top-left and bottom-right pixels (inclusive) enclosing the region.
    pub bounding_box: (PixelPoint, PixelPoint),
    /// Number of pixels in the region.
    pub area: u32,
    /// Mean intensity over the region's pixels.
    pub mean_intensity: f64,
    pub peak_intensity: u8,
    /// Centroid with every pixel weighted equally.
    pub centroid: (f64, f64),
}

impl BrightRegion {
    pub fn box_width(&self) -> u32 {
        self.bounding_box.1.x - self.bounding_box.0.x + 1
    }

    pub fn box_height(&self) -> u32 {
        self.bounding_box.1.y - self.bounding_box.0.y + 1
    }

    /// Fraction of the bounding box covered by the region, in (0, 1].
    /// Compact spots sit near pi/4 or above, thin streaks and glints near zero.
    pub fn fill_ratio(&self) -> f64 {
        let box_area = self.box_width() as f64 * self.box_height() as f64;
        self.area as f64 / box_area
    }

    pub fn distance_to(&self, point: (f64, f64)) -> f64 {
        (self.centroid.0 - point.0).hypot(self.centroid.1 - point.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_ratio_of_diagonal_streak_is_small() {
        let streak = BrightRegion {
            id: 0,
            bounding_box: (PixelPoint { x: 0, y: 0 }, PixelPoint { x: 9, y: 9 }),
            area: 10,
            mean_intensity: 240.0,
            peak_intensity: 255,
            centroid: (4.5, 4.5),
        };
        assert_eq!(streak.box_width(), 10);
        assert!((streak.fill_ratio() - 0.1).abs() < 1e-12);
    }
}

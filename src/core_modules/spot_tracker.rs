// THEORY:
// The `SpotTracker` turns one frame into at most one wand-tip position. It is
// the only stage that looks at pixels.
//
// Algorithm:
// 1.  **Pre-blur (optional)**: a light Gaussian blur merges sensor speckle into
//     the spot it belongs to before thresholding.
// 2.  **Regions**: `region_finder::find_regions` splits the thresholded frame
//     into connected bright regions.
// 3.  **Filtering**: regions outside the configured area bounds are rejected.
//     Tiny ones are noise specks. Huge ones are windows, lamps or
//     reflections. Regions that fill too little of their bounding box are
//     rejected as streaks and glints rather than a round tip.
// 4.  **Selection**: the brightest surviving region (by mean intensity) wins.
//     Ties go to the larger region, then to the one closest to the point chosen
//     in the previous frame, which keeps the track on the same object.
//
// The previous-frame point is the tracker's only memory. It is cleared whenever
// a frame yields nothing, so continuity never reaches back across a gap.

use crate::core_modules::bright_region::BrightRegion;
use crate::core_modules::frame::Frame;
use crate::core_modules::region_finder::find_regions;
use crate::core_modules::trace::CandidatePoint;
use crate::error::ConfigError;
use std::borrow::Cow;
use std::cmp::Ordering;
use tracing::trace;

/// Thresholds for bright-spot detection. All values are supplied externally.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Pixels strictly brighter than this are considered part of a spot.
    pub brightness_threshold: u8,
    /// Smallest accepted region, in pixels.
    pub min_area: u32,
    /// Largest accepted region, in pixels.
    pub max_area: u32,
    /// Gaussian pre-blur sigma. Zero disables blurring.
    pub blur_sigma: f32,
    /// Minimum fraction of its bounding box a region must fill.
    pub min_fill_ratio: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            brightness_threshold: 200,
            min_area: 50,
            max_area: 5000,
            blur_sigma: 0.0,
            min_fill_ratio: 0.3,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_area == 0 {
            return Err(ConfigError::invalid("min_blob_area", "must be greater than zero"));
        }
        if self.min_area >= self.max_area {
            return Err(ConfigError::invalid(
                "max_blob_area",
                format!("must exceed min_blob_area ({} >= {})", self.min_area, self.max_area),
            ));
        }
        if !(self.blur_sigma.is_finite() && self.blur_sigma >= 0.0) {
            return Err(ConfigError::invalid("blur_sigma", "must be a non-negative number"));
        }
        if !(0.0..=1.0).contains(&self.min_fill_ratio) {
            return Err(ConfigError::invalid("min_fill_ratio", "must lie in [0, 1]"));
        }
        Ok(())
    }
}

/// Why a bright region was not considered as the wand tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooSmall,
    TooLarge,
    NotCompact,
}

/// A region found by `SpotTracker::scan` and the tracker's verdict on it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionVerdict {
    pub region: BrightRegion,
    pub rejection: Option<Rejection>,
}

impl RegionVerdict {
    pub fn accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

pub struct SpotTracker {
    config: TrackerConfig,
    /// Position selected in the previous frame, if that frame had one.
    previous: Option<(f64, f64)>,
}

impl SpotTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            previous: None,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Finds the wand tip in `frame`, or `None` when no region qualifies.
    pub fn detect(&mut self, frame: &Frame) -> Option<CandidatePoint> {
        let verdicts = self.scan(frame);
        let previous = self.previous;

        let best = verdicts
            .iter()
            .filter(|v| v.accepted())
            .map(|v| &v.region)
            .reduce(|best, region| {
                if outranks(region, best, previous) {
                    region
                } else {
                    best
                }
            });

        let candidate = best.map(|region| CandidatePoint {
            x: region.centroid.0,
            y: region.centroid.1,
            intensity: region.mean_intensity,
            area: region.area,
            timestamp_ms: frame.timestamp_ms(),
        });

        match &candidate {
            Some(point) => trace!(
                x = point.x,
                y = point.y,
                intensity = point.intensity,
                regions = verdicts.len(),
                "wand tip located"
            ),
            None => trace!(regions = verdicts.len(), "no qualifying bright spot"),
        }

        self.previous = candidate.map(|p| p.position());
        candidate
    }

    /// Lists every bright region in `frame` with its accept/reject verdict.
    /// Does not touch the tracker's continuity memory, so calibration views can
    /// call it freely.
    pub fn scan(&self, frame: &Frame) -> Vec<RegionVerdict> {
        let luma = if self.config.blur_sigma > 0.0 {
            Cow::Owned(image::imageops::blur(frame.luma(), self.config.blur_sigma))
        } else {
            Cow::Borrowed(frame.luma())
        };

        find_regions(&luma, self.config.brightness_threshold)
            .into_iter()
            .map(|region| {
                let rejection = self.judge(&region);
                RegionVerdict { region, rejection }
            })
            .collect()
    }

    /// Drops the continuity memory, e.g. after a session reset.
    pub fn forget(&mut self) {
        self.previous = None;
    }

    fn judge(&self, region: &BrightRegion) -> Option<Rejection> {
        if region.area < self.config.min_area {
            Some(Rejection::TooSmall)
        } else if region.area > self.config.max_area {
            Some(Rejection::TooLarge)
        } else if region.fill_ratio() < self.config.min_fill_ratio {
            Some(Rejection::NotCompact)
        } else {
            None
        }
    }
}

/// True when `a` should be chosen over `b`: brighter, then larger, then closer
/// to the previous point. Exact ties keep `b`, the earlier region in raster order.
fn outranks(a: &BrightRegion, b: &BrightRegion, previous: Option<(f64, f64)>) -> bool {
    let by_intensity = a.mean_intensity.total_cmp(&b.mean_intensity);
    let by_area = a.area.cmp(&b.area);
    let by_continuity = match previous {
        Some(p) => b.distance_to(p).total_cmp(&a.distance_to(p)),
        None => Ordering::Equal,
    };
    by_intensity.then(by_area).then(by_continuity) == Ordering::Greater
}

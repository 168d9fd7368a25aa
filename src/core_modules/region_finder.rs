// THEORY:
// The region finder is the spatial grouping step of the spot tracker. It is a
// plain binary connected-component pass:
// 1.  **Thresholding**: a pixel is "bright" when its intensity is strictly above
//     the cutoff. Under IR illumination the retroreflective tip saturates the
//     sensor while most of the scene stays dark.
// 2.  **Region Growing**: every unvisited bright pixel seeds a flood fill over its
//     8 neighbours. Diagonal connectivity keeps a small, slightly ragged spot in
//     one piece instead of splitting it into specks.
// 3.  **Data Aggregation**: area, bounding box, mean/peak intensity and centroid
//     are accumulated during the fill and packaged into a `BrightRegion`.
// 4.  **Stateless Utility**: one frame in, a list of regions out. Any memory of
//     earlier frames lives in the `SpotTracker`.

use crate::core_modules::bright_region::{BrightRegion, PixelPoint};
use image::GrayImage;

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Finds every connected region of pixels brighter than `threshold`.
/// Regions are returned in raster order of their first pixel.
pub fn find_regions(luma: &GrayImage, threshold: u8) -> Vec<BrightRegion> {
    let (width, height) = luma.dimensions();
    let raw = luma.as_raw();
    let mut visited = vec![false; raw.len()];
    let mut regions = Vec::new();

    for (index, &value) in raw.iter().enumerate() {
        if visited[index] || value <= threshold {
            continue;
        }
        let region = grow_region(raw, width, height, threshold, index, &mut visited, regions.len());
        regions.push(region);
    }

    regions
}

/// Flood-fills one region starting at `seed`.
fn grow_region(
    raw: &[u8],
    width: u32,
    height: u32,
    threshold: u8,
    seed: usize,
    visited: &mut [bool],
    id: usize,
) -> BrightRegion {
    let mut stack = vec![seed];
    visited[seed] = true;

    let mut min = PixelPoint { x: u32::MAX, y: u32::MAX };
    let mut max = PixelPoint { x: 0, y: 0 };
    let mut area = 0u32;
    let mut total_intensity = 0u64;
    let mut peak_intensity = 0u8;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;

    while let Some(index) = stack.pop() {
        let x = (index % width as usize) as u32;
        let y = (index / width as usize) as u32;
        let value = raw[index];

        min.x = min.x.min(x);
        min.y = min.y.min(y);
        max.x = max.x.max(x);
        max.y = max.y.max(y);
        area += 1;
        total_intensity += value as u64;
        peak_intensity = peak_intensity.max(value);
        sum_x += x as f64;
        sum_y += y as f64;

        for (dx, dy) in NEIGHBOURS {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            let neighbour = ny as usize * width as usize + nx as usize;
            if !visited[neighbour] && raw[neighbour] > threshold {
                visited[neighbour] = true;
                stack.push(neighbour);
            }
        }
    }

    BrightRegion {
        id,
        bounding_box: (min, max),
        area,
        mean_intensity: total_intensity as f64 / area as f64,
        peak_intensity,
        centroid: (sum_x / area as f64, sum_y / area as f64),
    }
}

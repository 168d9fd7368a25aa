// THEORY:
// A debug overlay for calibration and demos. The luma frame is promoted to RGB,
// the accumulated gesture trail is drawn as a green polyline and the current
// tip as a filled red dot inside a yellow ring. Drawing clips silently at the
// image border, so points near or past the edge never panic.

use crate::core_modules::frame::Frame;
use crate::core_modules::trace::CandidatePoint;
use image::{DynamicImage, Rgb, RgbImage};

const TRAIL: Rgb<u8> = Rgb([0, 255, 0]);
const TIP: Rgb<u8> = Rgb([255, 0, 0]);
const RING: Rgb<u8> = Rgb([255, 255, 0]);
const TIP_RADIUS: f64 = 10.0;
const RING_RADIUS: f64 = 15.0;

/// Renders `trail` and the current `tip` over `frame`.
pub fn render_overlay(frame: &Frame, trail: &[CandidatePoint], tip: Option<&CandidatePoint>) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(frame.luma().clone()).to_rgb8();

    for pair in trail.windows(2) {
        draw_line(&mut canvas, pair[0].position(), pair[1].position(), TRAIL);
    }
    if let Some(tip) = tip {
        draw_disc(&mut canvas, tip.position(), TIP_RADIUS, TIP);
        draw_ring(&mut canvas, tip.position(), RING_RADIUS, RING);
    }
    canvas
}

fn put(canvas: &mut RgbImage, x: f64, y: f64, color: Rgb<u8>) {
    let (x, y) = (x.round(), y.round());
    if x < 0.0 || y < 0.0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color);
    }
}

fn draw_line(canvas: &mut RgbImage, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        put(canvas, from.0 + t * dx, from.1 + t * dy, color);
    }
}

fn draw_disc(canvas: &mut RgbImage, center: (f64, f64), radius: f64, color: Rgb<u8>) {
    let r = radius.ceil() as i64;
    for oy in -r..=r {
        for ox in -r..=r {
            let (fx, fy) = (ox as f64, oy as f64);
            if fx.hypot(fy) <= radius {
                put(canvas, center.0 + fx, center.1 + fy, color);
            }
        }
    }
}

fn draw_ring(canvas: &mut RgbImage, center: (f64, f64), radius: f64, color: Rgb<u8>) {
    let steps = (std::f64::consts::TAU * radius).ceil() as usize * 2;
    for i in 0..steps {
        let angle = std::f64::consts::TAU * i as f64 / steps as f64;
        put(canvas, center.0 + radius * angle.cos(), center.1 + radius * angle.sin(), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn trail_and_tip_are_drawn_over_the_frame() {
        let frame = Frame::new(GrayImage::from_pixel(100, 80, Luma([30])), 0);
        let trail = [
            CandidatePoint::new(10.0, 10.0, 255.0, 0),
            CandidatePoint::new(50.0, 10.0, 255.0, 33),
        ];
        let tip = CandidatePoint::new(70.0, 50.0, 255.0, 66);
        let img = render_overlay(&frame, &trail, Some(&tip));

        assert_eq!(img.dimensions(), (100, 80));
        assert_eq!(img.get_pixel(30, 10), &TRAIL);
        assert_eq!(img.get_pixel(70, 50), &TIP);
        assert_eq!(img.get_pixel(85, 50), &RING);
        assert_eq!(img.get_pixel(5, 70), &Rgb([30, 30, 30]));
    }

    #[test]
    fn drawing_past_the_border_is_clipped() {
        let frame = Frame::new(GrayImage::new(20, 20), 0);
        let trail = [
            CandidatePoint::new(-30.0, 5.0, 255.0, 0),
            CandidatePoint::new(60.0, 5.0, 255.0, 1),
        ];
        let tip = CandidatePoint::new(19.0, 19.0, 255.0, 2);
        let img = render_overlay(&frame, &trail, Some(&tip));
        assert_eq!(img.get_pixel(0, 5), &TRAIL);
        assert_eq!(img.get_pixel(19, 19), &TIP);
    }
}

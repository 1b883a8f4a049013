//! Conversions between the three coordinate spaces a box lives in:
//! display space (egui points inside the canvas), original image pixels,
//! and normalized center-based fractions of the image size.

use eframe::egui::{Pos2, Rect, Vec2, vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_vec2(self) -> Vec2 {
        vec2(self.width as f32, self.height as f32)
    }
}

/// Integer rectangle in original image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

/// Aspect-preserving "fit" of an image into a display rectangle, centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub scale: f32,
    /// Top-left corner of the scaled image in display space.
    pub offset: Pos2,
    pub scaled_size: Vec2,
}

impl FitTransform {
    pub fn fit(image: ImageSize, display: Rect) -> Option<Self> {
        if image.width == 0 || image.height == 0 || !display.is_positive() {
            return None;
        }
        let image_size = image.as_vec2();
        let scale = (display.width() / image_size.x).min(display.height() / image_size.y);
        let scaled_size = image_size * scale;
        let offset = display.min + (display.size() - scaled_size) / 2.0;
        Some(Self {
            scale,
            offset,
            scaled_size,
        })
    }

    /// The part of the display covered by the scaled image.
    pub fn image_area(&self) -> Rect {
        Rect::from_min_size(self.offset, self.scaled_size)
    }

    /// Clips a drawn rectangle to the visible image and converts it to pixels.
    ///
    /// Returns `None` when the clipped rectangle is narrower or shorter than
    /// `min_size` display points, which covers stray clicks and drags that miss
    /// the image entirely.
    pub fn display_to_image(&self, drawn: Rect, min_size: f32) -> Option<PixelRect> {
        let clipped = drawn.intersect(self.image_area());
        if !clipped.is_positive() || clipped.width() < min_size || clipped.height() < min_size {
            return None;
        }
        let local = clipped.translate(-self.offset.to_vec2());
        Some(PixelRect {
            left: (local.min.x / self.scale) as i32,
            top: (local.min.y / self.scale) as i32,
            width: (local.width() / self.scale) as i32,
            height: (local.height() / self.scale) as i32,
        })
    }

    /// Maps a display point to (fractional) image pixels, without clipping.
    pub fn display_point_to_image(&self, point: Pos2) -> Pos2 {
        ((point - self.offset) / self.scale).to_pos2()
    }

    pub fn image_to_display(&self, rect: PixelRect) -> Rect {
        Rect::from_min_size(
            self.offset + vec2(rect.left as f32, rect.top as f32) * self.scale,
            vec2(rect.width as f32, rect.height as f32) * self.scale,
        )
    }
}

pub fn image_to_normalized(rect: PixelRect, image: ImageSize) -> NormalizedBox {
    let (w, h) = (image.width as f64, image.height as f64);
    NormalizedBox {
        x_center: (rect.left as f64 + rect.width as f64 / 2.0) / w,
        y_center: (rect.top as f64 + rect.height as f64 / 2.0) / h,
        width: rect.width as f64 / w,
        height: rect.height as f64 / h,
    }
}

pub fn normalized_to_image(bbox: &NormalizedBox, image: ImageSize) -> PixelRect {
    let (w, h) = (image.width as f64, image.height as f64);
    PixelRect {
        left: ((bbox.x_center - bbox.width / 2.0) * w).round() as i32,
        top: ((bbox.y_center - bbox.height / 2.0) * h).round() as i32,
        width: (bbox.width * w).round() as i32,
        height: (bbox.height * h).round() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::pos2;

    fn display(w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(w, h))
    }

    #[test]
    fn fit_letterboxes_wide_display() {
        let t = FitTransform::fit(ImageSize::new(400, 300), display(1000.0, 600.0)).unwrap();
        assert_eq!(t.scale, 2.0);
        assert_eq!(t.scaled_size, vec2(800.0, 600.0));
        assert_eq!(t.offset, pos2(100.0, 0.0));
    }

    #[test]
    fn fit_rejects_empty_inputs() {
        assert!(FitTransform::fit(ImageSize::new(0, 10), display(100.0, 100.0)).is_none());
        assert!(FitTransform::fit(ImageSize::new(10, 10), display(0.0, 100.0)).is_none());
    }

    #[test]
    fn display_to_image_removes_offset_and_scale() {
        let t = FitTransform::fit(ImageSize::new(400, 300), display(1000.0, 600.0)).unwrap();
        let drawn = Rect::from_min_max(pos2(120.0, 40.0), pos2(220.0, 140.0));
        let px = t.display_to_image(drawn, 5.0).unwrap();
        assert_eq!(
            px,
            PixelRect {
                left: 10,
                top: 20,
                width: 50,
                height: 50
            }
        );
    }

    #[test]
    fn display_to_image_clips_to_visible_image() {
        let t = FitTransform::fit(ImageSize::new(400, 300), display(1000.0, 600.0)).unwrap();
        // starts left of the image in the letterbox margin
        let drawn = Rect::from_min_max(pos2(20.0, 20.0), pos2(140.0, 80.0));
        let px = t.display_to_image(drawn, 5.0).unwrap();
        assert_eq!(px.left, 0);
        assert_eq!(px.top, 10);
        assert_eq!(px.width, 20);
        assert_eq!(px.height, 30);
    }

    #[test]
    fn small_rectangles_are_discarded() {
        let t = FitTransform::fit(ImageSize::new(400, 300), display(1000.0, 600.0)).unwrap();
        let tiny = Rect::from_min_max(pos2(200.0, 200.0), pos2(203.0, 203.0));
        assert!(t.display_to_image(tiny, 5.0).is_none());

        // 100 points wide but only 3 of them on the image
        let mostly_outside = Rect::from_min_max(pos2(0.0, 200.0), pos2(103.0, 300.0));
        assert!(t.display_to_image(mostly_outside, 5.0).is_none());

        let outside = Rect::from_min_max(pos2(0.0, 0.0), pos2(90.0, 90.0));
        assert!(t.display_to_image(outside, 5.0).is_none());
    }

    #[test]
    fn display_round_trip_stays_within_a_pixel() {
        let images = [(640, 480), (1920, 1080), (333, 777), (50, 2000)];
        let displays = [(800.0, 600.0), (1280.0, 720.0), (500.0, 900.0)];
        for (iw, ih) in images {
            for (dw, dh) in displays {
                let t = FitTransform::fit(ImageSize::new(iw, ih), display(dw, dh)).unwrap();
                let area = t.image_area();
                let drawn = Rect::from_min_max(
                    area.min + area.size() * 0.1,
                    area.min + area.size() * 0.7 + vec2(40.0, 40.0),
                );
                let expected = drawn.intersect(area);
                let back = t.image_to_display(t.display_to_image(drawn, 5.0).unwrap());
                // truncation loses at most one image pixel per edge, two for the far edge
                let tol = 2.0 * t.scale + 1e-3;
                assert!((back.min.x - expected.min.x).abs() <= tol, "{back:?} vs {expected:?}");
                assert!((back.min.y - expected.min.y).abs() <= tol, "{back:?} vs {expected:?}");
                assert!((back.max.x - expected.max.x).abs() <= tol, "{back:?} vs {expected:?}");
                assert!((back.max.y - expected.max.y).abs() <= tol, "{back:?} vs {expected:?}");
            }
        }
    }

    #[test]
    fn normalization_uses_center_and_size() {
        let rect = PixelRect {
            left: 100,
            top: 50,
            width: 200,
            height: 100,
        };
        let n = image_to_normalized(rect, ImageSize::new(800, 400));
        assert_eq!(n.x_center, 0.25);
        assert_eq!(n.y_center, 0.25);
        assert_eq!(n.width, 0.25);
        assert_eq!(n.height, 0.25);
        assert_eq!(normalized_to_image(&n, ImageSize::new(800, 400)), rect);
    }

    #[test]
    fn normalization_does_not_clamp() {
        let rect = PixelRect {
            left: -10,
            top: 0,
            width: 120,
            height: 10,
        };
        let n = image_to_normalized(rect, ImageSize::new(100, 100));
        assert!(n.width > 1.0);
        assert!(n.x_center - n.width / 2.0 < 0.0);
    }

    #[test]
    fn normalized_round_trip_within_rounding() {
        let sizes = [(640, 480), (1, 1), (1023, 17), (4000, 3000)];
        let boxes = [
            (0.5, 0.5, 0.2, 0.3),
            (0.123456, 0.654321, 0.011111, 0.5),
            (0.9, 0.1, 0.2, 0.2),
            (0.0, 0.0, 0.0, 0.0),
        ];
        for (w, h) in sizes {
            let size = ImageSize::new(w, h);
            for (xc, yc, bw, bh) in boxes {
                let r = NormalizedBox {
                    x_center: xc,
                    y_center: yc,
                    width: bw,
                    height: bh,
                };
                let back = image_to_normalized(normalized_to_image(&r, size), size);
                let (px_w, px_h) = (1.0 / w as f64, 1.0 / h as f64);
                assert!((back.width - r.width).abs() <= 0.5 * px_w + 1e-9);
                assert!((back.height - r.height).abs() <= 0.5 * px_h + 1e-9);
                // center = left + width / 2 carries both roundings
                assert!((back.x_center - r.x_center).abs() <= 0.75 * px_w + 1e-9);
                assert!((back.y_center - r.y_center).abs() <= 0.75 * px_h + 1e-9);
            }
        }
    }
}

//! Frame compositor.
//!
//! Draws accepted detections onto a camera view, tints the view with its alert
//! color and joins the front and back views into one output image.

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rand::Rng;
use std::path::Path;

use crate::decision::AlertColor;
use crate::detect::Detection;
use crate::labels::{LabelTable, PERSON_LABEL};
use crate::palette::Palette;

/// Label text color.
pub const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 225]);
/// Share of the alert color in a tinted view.
pub const DEFAULT_TINT_ALPHA: f32 = 0.2;

const LABEL_MARGIN_X: u32 = 3;
const LABEL_MARGIN_Y: u32 = 4;
const DEFAULT_LABEL_SCALE: f32 = 13.0;
// Fallback glyph box when no font is loaded.
const PLAIN_GLYPH_WIDTH: u32 = 8;
const PLAIN_GLYPH_HEIGHT: u32 = 10;

// ----------------------------------------------------------------------------
// Label rendering
// ----------------------------------------------------------------------------

/// How box labels are measured and rendered.
///
/// Without a font the label background is still drawn, sized from a fixed glyph
/// box, but no text is rendered on it.
pub struct LabelStyle {
    font: Option<FontVec>,
    scale: PxScale,
}

impl LabelStyle {
    pub fn plain() -> Self {
        Self {
            font: None,
            scale: PxScale::from(DEFAULT_LABEL_SCALE),
        }
    }

    pub fn from_font_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font file {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow!("invalid font file {}: {}", path.display(), e))?;
        Ok(Self {
            font: Some(font),
            scale: PxScale::from(DEFAULT_LABEL_SCALE),
        })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Rendered size of `text` in pixels.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match &self.font {
            Some(font) => text_size(self.scale, font, text),
            None => (
                PLAIN_GLYPH_WIDTH * text.chars().count() as u32,
                PLAIN_GLYPH_HEIGHT,
            ),
        }
    }

    fn draw(&self, image: &mut RgbImage, text: &str, x: i32, y: i32) {
        if let Some(font) = &self.font {
            draw_text_mut(image, LABEL_TEXT_COLOR, x, y, self.scale, font, text);
        }
    }
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self::plain()
    }
}

/// Everything the per-side renderer reads. Shared read-only by both sides.
pub struct RenderAssets {
    pub labels: LabelTable,
    pub palette: Palette,
    pub style: LabelStyle,
    person_class: u32,
}

impl RenderAssets {
    /// Bundle the assets, resolving the person class id from `labels`.
    pub fn new(labels: LabelTable, palette: Palette, style: LabelStyle) -> Result<Self> {
        let person_class = labels.person_class_id()?;
        Ok(Self {
            labels,
            palette,
            style,
            person_class,
        })
    }

    pub fn person_class(&self) -> u32 {
        self.person_class
    }
}

impl Default for RenderAssets {
    fn default() -> Self {
        Self {
            labels: LabelTable::coco(),
            palette: Palette::default(),
            style: LabelStyle::plain(),
            person_class: 0,
        }
    }
}

// ----------------------------------------------------------------------------
// Drawing
// ----------------------------------------------------------------------------

/// Draw the person detections onto `image` and return how many were drawn.
///
/// Detections of any other class are skipped entirely: not drawn, not counted.
/// Each drawn box gets a color picked from the palette with `rng`.
pub fn annotate<R: Rng + ?Sized>(
    image: &mut RgbImage,
    detections: &[Detection],
    assets: &RenderAssets,
    rng: &mut R,
) -> usize {
    let mut persons = 0;
    for det in detections {
        if det.class_id != assets.person_class {
            continue;
        }
        let color = assets.palette.choose(rng);
        let label = assets.labels.name(det.class_id).unwrap_or(PERSON_LABEL);
        draw_detection(image, det, label, color, &assets.style);
        persons += 1;
    }
    persons
}

/// 1px box outline, then a filled label tab in the box color with the label on it.
pub fn draw_detection(
    image: &mut RgbImage,
    det: &Detection,
    label: &str,
    color: Rgb<u8>,
    style: &LabelStyle,
) {
    let x1 = det.x1 as i32;
    let y1 = det.y1 as i32;
    let x2 = det.x2 as i32;
    let y2 = det.y2 as i32;

    let outline = Rect::at(x1, y1)
        .of_size((x2 - x1 + 1).max(1) as u32, (y2 - y1 + 1).max(1) as u32);
    draw_hollow_rect_mut(image, outline, color);

    let (text_w, text_h) = style.measure(label);
    let tab = Rect::at(x1, y1).of_size(text_w + LABEL_MARGIN_X, text_h + LABEL_MARGIN_Y);
    draw_filled_rect_mut(image, tab, color);
    style.draw(image, label, x1 + 1, y1 + (LABEL_MARGIN_Y / 2) as i32);
}

/// Blend the whole view with a solid alert color: `(1 - alpha) * image + alpha * tint`.
pub fn tint(image: &mut RgbImage, color: AlertColor, alpha: f32) {
    let overlay = color.tint();
    for pixel in image.pixels_mut() {
        for (channel, tint) in pixel.0.iter_mut().zip(overlay.0) {
            *channel = blend(*channel, tint, alpha);
        }
    }
}

fn blend(base: u8, overlay: u8, alpha: f32) -> u8 {
    (base as f32 * (1.0 - alpha) + overlay as f32 * alpha)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Place `front` on the left and `back` on the right of a black canvas.
///
/// The canvas is `front.width + back.width` wide and as tall as the taller view;
/// rows below the shorter view stay black.
pub fn compose(front: &RgbImage, back: &RgbImage) -> RgbImage {
    let width = front.width() + back.width();
    let height = front.height().max(back.height());
    let mut canvas = RgbImage::new(width, height);
    imageops::replace(&mut canvas, front, 0, 0);
    imageops::replace(&mut canvas, back, front.width() as i64, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn person(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(0, x1, y1, x2, y2, 0.9)
    }

    #[test]
    fn compose_dimensions_follow_inputs() {
        for (fw, fh, bw, bh) in [(4, 3, 5, 7), (10, 10, 10, 10), (1, 9, 3, 2)] {
            let out = compose(&RgbImage::new(fw, fh), &RgbImage::new(bw, bh));
            assert_eq!(out.dimensions(), (fw + bw, fh.max(bh)));
        }
    }

    #[test]
    fn compose_places_front_left_and_leaves_gap_black() {
        let front = RgbImage::from_pixel(2, 2, Rgb([10, 10, 10]));
        let back = RgbImage::from_pixel(3, 4, Rgb([20, 20, 20]));
        let out = compose(&front, &back);

        assert_eq!(*out.get_pixel(1, 1), Rgb([10, 10, 10]));
        assert_eq!(*out.get_pixel(2, 0), Rgb([20, 20, 20]));
        assert_eq!(*out.get_pixel(4, 3), Rgb([20, 20, 20]));
        assert_eq!(*out.get_pixel(0, 3), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(1, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn tint_blends_eighty_twenty() {
        let mut image = RgbImage::from_pixel(2, 2, Rgb([100, 100, 100]));
        tint(&mut image, AlertColor::Red, DEFAULT_TINT_ALPHA);
        assert_eq!(*image.get_pixel(0, 0), Rgb([131, 80, 80]));

        let mut image = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        tint(&mut image, AlertColor::Green, DEFAULT_TINT_ALPHA);
        assert_eq!(*image.get_pixel(0, 0), Rgb([0, 51, 0]));
    }

    #[test]
    fn annotate_counts_and_draws_only_people() {
        let assets = RenderAssets::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut image = RgbImage::new(100, 100);
        let car = Detection::new(2, 60.0, 60.0, 90.0, 90.0, 0.8);

        let count = annotate(
            &mut image,
            &[person(10.0, 10.0, 40.0, 50.0), car, person(5.0, 60.0, 30.0, 95.0)],
            &assets,
            &mut rng,
        );

        assert_eq!(count, 2);
        // Outline of the first person box.
        assert_ne!(*image.get_pixel(40, 30), Rgb([0, 0, 0]));
        // Inside the car box nothing was drawn.
        assert_eq!(*image.get_pixel(90, 75), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(75, 75), Rgb([0, 0, 0]));
    }

    #[test]
    fn label_tab_covers_text_plus_margin() {
        let style = LabelStyle::plain();
        let (w, h) = style.measure("person");
        let mut image = RgbImage::new(200, 200);
        let color = Rgb([1, 2, 3]);
        draw_detection(&mut image, &person(20.0, 20.0, 150.0, 150.0), "person", color, &style);

        assert_eq!(*image.get_pixel(20 + w + LABEL_MARGIN_X - 1, 20 + h + LABEL_MARGIN_Y - 1), color);
        assert_eq!(*image.get_pixel(20 + w + LABEL_MARGIN_X, 21 + h + LABEL_MARGIN_Y), Rgb([0, 0, 0]));
    }

    #[test]
    fn boxes_on_the_frame_edge_do_not_panic() {
        let assets = RenderAssets::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut image = RgbImage::new(32, 24);
        let count = annotate(
            &mut image,
            &[person(0.0, 0.0, 32.0, 24.0), person(32.0, 24.0, 32.0, 24.0)],
            &assets,
            &mut rng,
        );
        assert_eq!(count, 2);
    }
}

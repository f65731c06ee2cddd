//! Box rendering for annotated prediction images.

use crate::processing::post::Detection;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use anyhow::Context;
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};

const CAPTION_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
const CAPTION_PADDING: u32 = 2;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Class colours, cycled by `class_id`.
const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

pub fn class_color(class_id: u32) -> Rgb<u8> {
    Rgb(PALETTE[class_id as usize % PALETTE.len()])
}

/// Outline thickness proportional to image size, never thinner than 2px.
pub fn line_thickness(width: u32, height: u32) -> u32 {
    (((width + height) as f32 / 2.0 * 0.003).round() as u32).max(2)
}

/// Caption font size proportional to image size, never smaller than 12px.
pub fn font_size(width: u32, height: u32) -> f32 {
    ((width + height) as f32 / 2.0 * 0.035).round().max(12.0)
}

/// Draws detection boxes with a filled `"<class> <confidence>"` caption.
pub struct Annotator {
    font: FontRef<'static>,
    class_names: Vec<String>,
}

impl Annotator {
    pub fn new(class_names: Vec<String>) -> anyhow::Result<Self> {
        let font = FontRef::try_from_slice(CAPTION_FONT).context("Failed to load caption font")?;
        Ok(Self { font, class_names })
    }

    /// Caption text for a detection, falling back to the numeric class id.
    pub fn caption(&self, det: &Detection) -> String {
        let name = self
            .class_names
            .get(det.class_id as usize)
            .cloned()
            .unwrap_or_else(|| det.class_id.to_string());
        format!("{} {:.2}", name, det.confidence)
    }

    pub fn draw(&self, image: &mut RgbImage, detections: &[Detection]) {
        let thickness = line_thickness(image.width(), image.height());
        let scale = PxScale::from(font_size(image.width(), image.height()));
        for det in detections {
            let Some(bounds) = pixel_bounds(image, det) else {
                continue;
            };
            let color = class_color(det.class_id);
            draw_rect(image, bounds, thickness, color);
            self.draw_caption(image, bounds, scale, &self.caption(det), color);
        }
    }

    /// Filled label above the box, or inside it when the box touches the top edge.
    fn draw_caption(
        &self,
        image: &mut RgbImage,
        (x1, y1, _, _): PixelBounds,
        scale: PxScale,
        text: &str,
        color: Rgb<u8>,
    ) {
        let (text_width, _) = text_size(scale, &self.font, text);
        let scaled = self.font.as_scaled(scale);
        let text_height = (scaled.ascent() - scaled.descent()).ceil() as u32;

        let label_width = text_width + 2 * CAPTION_PADDING;
        let label_height = text_height + 2 * CAPTION_PADDING;
        let top = if y1 >= label_height {
            y1 - label_height
        } else {
            y1
        };

        draw_filled_rect_mut(
            image,
            Rect::at(x1 as i32, top as i32).of_size(label_width, label_height),
            color,
        );
        draw_text_mut(
            image,
            TEXT_COLOR,
            (x1 + CAPTION_PADDING) as i32,
            (top + CAPTION_PADDING) as i32,
            scale,
            &self.font,
            text,
        );
    }
}

/// `(x1, y1, x2, y2)` clamped to the image, inclusive.
type PixelBounds = (u32, u32, u32, u32);

fn pixel_bounds(image: &RgbImage, det: &Detection) -> Option<PixelBounds> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let x1 = (det.x1.max(0.0) as u32).min(width - 1);
    let y1 = (det.y1.max(0.0) as u32).min(height - 1);
    let x2 = (det.x2.max(0.0) as u32).min(width - 1);
    let y2 = (det.y2.max(0.0) as u32).min(height - 1);
    (x2 >= x1 && y2 >= y1).then_some((x1, y1, x2, y2))
}

/// Draw a rectangle outline growing inwards from the box edges.
fn draw_rect(image: &mut RgbImage, (x1, y1, x2, y2): PixelBounds, thickness: u32, color: Rgb<u8>) {
    for t in 0..thickness {
        let top = y1 + t;
        let bottom = y2.saturating_sub(t);
        let left = x1 + t;
        let right = x2.saturating_sub(t);
        if top > bottom || left > right {
            break;
        }

        for x in x1..=x2 {
            image.put_pixel(x, top, color);
            image.put_pixel(x, bottom, color);
        }
        for y in y1..=y2 {
            image.put_pixel(left, y, color);
            image.put_pixel(right, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32, class_id: u32) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            class_id,
        }
    }

    #[test]
    fn test_line_thickness() {
        assert_eq!(line_thickness(100, 100), 2);
        assert_eq!(line_thickness(1920, 1080), 5);
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(class_color(0), class_color(20));
        assert_ne!(class_color(0), class_color(1));
    }

    fn annotator() -> Annotator {
        Annotator::new(vec!["glioma".to_string(), "tumor".to_string()]).unwrap()
    }

    #[test]
    fn test_font_size() {
        assert_eq!(font_size(100, 100), 12.0);
        assert_eq!(font_size(1000, 1000), 35.0);
    }

    #[test]
    fn test_caption_uses_class_name_or_id() {
        let annotator = annotator();

        let mut det = detection(0.0, 0.0, 1.0, 1.0, 1);
        det.confidence = 0.874;
        assert_eq!(annotator.caption(&det), "tumor 0.87");

        det.class_id = 7;
        assert_eq!(annotator.caption(&det), "7 0.87");
    }

    #[test]
    fn test_draws_box_outline() {
        let background = Rgb([0, 0, 0]);
        let mut image = RgbImage::from_pixel(100, 100, background);

        annotator().draw(&mut image, &[detection(10.0, 20.0, 60.0, 80.0, 3)]);

        let color = class_color(3);
        assert_eq!(*image.get_pixel(10, 20), color);
        assert_eq!(*image.get_pixel(60, 80), color);
        assert_eq!(*image.get_pixel(35, 21), color, "thickness 2 covers second row");
        assert_eq!(*image.get_pixel(35, 50), background, "interior untouched");
        assert_eq!(*image.get_pixel(5, 5), background, "exterior untouched");
    }

    #[test]
    fn test_caption_is_painted_above_box() {
        let background = Rgb([0, 0, 0]);
        let mut image = RgbImage::from_pixel(200, 200, background);

        annotator().draw(&mut image, &[detection(50.0, 80.0, 150.0, 150.0, 1)]);

        let color = class_color(1);
        // 12px font plus padding: label spans rows 64..80, right on the box's top edge
        assert_eq!(*image.get_pixel(51, 65), color, "label background filled");
        assert_eq!(*image.get_pixel(51, 62), background, "nothing above the label");
        assert_eq!(*image.get_pixel(45, 70), background, "label starts at the box's left edge");

        let text_pixels = (64..80)
            .flat_map(|y| (50..120).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let px = image.get_pixel(x, y);
                px.0.iter().all(|&c| c > 150)
            })
            .count();
        assert!(text_pixels > 10, "caption text drawn, got {text_pixels} light pixels");
    }

    #[test]
    fn test_caption_moves_inside_box_at_top_edge() {
        let background = Rgb([0, 0, 0]);
        let mut image = RgbImage::from_pixel(200, 200, background);

        annotator().draw(&mut image, &[detection(50.0, 5.0, 150.0, 150.0, 0)]);

        let color = class_color(0);
        assert_eq!(*image.get_pixel(51, 20), color, "label drawn below the top edge");
        assert_eq!(*image.get_pixel(51, 2), background);
    }

    #[test]
    fn test_out_of_bounds_box_is_clamped() {
        let mut image = RgbImage::new(50, 50);

        annotator().draw(&mut image, &[detection(-10.0, -10.0, 500.0, 500.0, 0)]);

        assert_eq!(*image.get_pixel(0, 0), class_color(0));
        assert_eq!(*image.get_pixel(49, 49), class_color(0));
    }

    #[test]
    fn test_no_detections_leaves_image_unchanged() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb([7, 8, 9]));
        let original = image.clone();

        annotator().draw(&mut image, &[]);

        assert_eq!(image, original);
    }
}

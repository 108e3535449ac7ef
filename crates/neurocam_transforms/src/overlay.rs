//! Saliency overlays on the original image.
//!
//! Both overlays resample the saliency map to the image resolution first. The
//! heatmap blends a jet-colored map into the image; the bounding box outlines
//! the largest connected region whose saliency exceeds a threshold.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::colormap::{colorize, resize_map};

/// Weight of the original image in the heatmap blend.
pub const HEATMAP_IMAGE_WEIGHT: f32 = 0.6;

/// Weight of the colored map in the heatmap blend.
pub const HEATMAP_COLOR_WEIGHT: f32 = 0.4;

/// Bounding-box rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Pixels with saliency strictly above this value form the mask.
    pub box_threshold: f32,
    /// Box color (R, G, B).
    pub box_color: [u8; 3],
    /// Stroke thickness in pixels, drawn inward.
    pub box_thickness: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            box_threshold: 0.5,
            box_color: [0, 255, 0],
            box_thickness: 2,
        }
    }
}

/// Axis-aligned region in pixel coordinates.
///
/// `x + width - 1` and `y + height - 1` are the last covered column and row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Blend a jet-colored `map` into `image`.
///
/// `out = round(0.6 * image + 0.4 * jet(map))` per channel. `image` is not
/// modified.
pub fn heatmap_overlay(image: &RgbImage, map: &Array2<f32>) -> RgbImage {
    let resized = resize_map(map, image.width(), image.height());
    blend_heat(image, &resized)
}

fn blend_heat(image: &RgbImage, resized: &Array2<f32>) -> RgbImage {
    let heat = colorize(resized);
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let base = image.get_pixel(x, y);
        let color = heat.get_pixel(x, y);
        Rgb(std::array::from_fn(|c| {
            let v = HEATMAP_IMAGE_WEIGHT * f32::from(base[c])
                + HEATMAP_COLOR_WEIGHT * f32::from(color[c]);
            v.round().clamp(0.0, 255.0) as u8
        }))
    })
}

/// Bounding box of the largest region of `map` above `threshold`.
///
/// `map` must already be at image resolution. Regions are compared by the area
/// of their outer contour; the first of equally large regions wins. Returns
/// `None` when no value exceeds the threshold.
pub fn largest_region(map: &Array2<f32>, threshold: f32) -> Option<BoundingBox> {
    let (height, width) = map.dim();
    let mask = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        if map[[y as usize, x as usize]] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    let contours: Vec<Contour<u32>> = find_contours(&mask);
    let mut best: Option<(f64, &Contour<u32>)> = None;
    for contour in &contours {
        // Only top-level outer borders
        if contour.border_type != BorderType::Outer || contour.parent.is_some() {
            continue;
        }
        let area = contour_area(contour);
        if best.map_or(true, |(best_area, _)| area > best_area) {
            best = Some((area, contour));
        }
    }

    best.and_then(|(_, contour)| bounding_rect(contour))
}

/// Shoelace area of the contour polygon.
fn contour_area(contour: &Contour<u32>) -> f64 {
    let points = &contour.points;
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            f64::from(p.x) * f64::from(q.y) - f64::from(q.x) * f64::from(p.y)
        })
        .sum();
    twice.abs() / 2.0
}

fn bounding_rect(contour: &Contour<u32>) -> Option<BoundingBox> {
    let min_x = contour.points.iter().map(|p| p.x).min()?;
    let max_x = contour.points.iter().map(|p| p.x).max()?;
    let min_y = contour.points.iter().map(|p| p.y).min()?;
    let max_y = contour.points.iter().map(|p| p.y).max()?;
    Some(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

/// Outline the largest above-threshold region of `map` on a copy of `image`.
///
/// The outer stroke runs from `(x, y)` to `(x + width, y + height)`, and
/// further strokes are drawn inward up to `box_thickness`. With no region above
/// the threshold the copy is pixel-identical to `image`.
pub fn bounding_box_overlay(image: &RgbImage, map: &Array2<f32>, config: &RenderConfig) -> RgbImage {
    let resized = resize_map(map, image.width(), image.height());
    outline_region(image, &resized, config).0
}

fn outline_region(
    image: &RgbImage,
    resized: &Array2<f32>,
    config: &RenderConfig,
) -> (RgbImage, Option<BoundingBox>) {
    let mut boxed = image.clone();
    let region = largest_region(resized, config.box_threshold);
    match region {
        Some(region) => draw_box(&mut boxed, region, config),
        None => tracing::warn!(
            threshold = config.box_threshold,
            "no saliency above threshold; bounding box skipped"
        ),
    }
    (boxed, region)
}

fn draw_box(canvas: &mut RgbImage, region: BoundingBox, config: &RenderConfig) {
    let color = Rgb(config.box_color);
    // Stroke spans x..=x+width, one pixel past the region
    let outer_w = region.width + 1;
    let outer_h = region.height + 1;
    for t in 0..config.box_thickness {
        let inner_w = outer_w.saturating_sub(2 * t);
        let inner_h = outer_h.saturating_sub(2 * t);
        if inner_w > 0 && inner_h > 0 {
            let rect = Rect::at((region.x + t) as i32, (region.y + t) as i32).of_size(inner_w, inner_h);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}

/// Rendered outputs for one saliency map.
#[derive(Debug, Clone)]
pub struct Overlays {
    /// Heatmap blended into the image.
    pub heatmap: RgbImage,
    /// Image with the largest salient region outlined.
    pub bounding_box: RgbImage,
    /// The outlined region, if any.
    pub region: Option<BoundingBox>,
}

/// Produces both overlays with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Create a renderer.
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Rendering options.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render the heatmap and bounding-box overlays of `map` on `image`.
    pub fn render(&self, image: &RgbImage, map: &Array2<f32>) -> Overlays {
        let resized = resize_map(map, image.width(), image.height());
        let (bounding_box, region) = outline_region(image, &resized, &self.config);
        tracing::debug!(?region, width = image.width(), height = image.height(), "rendered overlays");
        Overlays {
            heatmap: blend_heat(image, &resized),
            bounding_box,
            region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 10) as u8, (y * 10) as u8, ((x + y) * 5) as u8])
        })
    }

    fn blob_map(size: usize, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Array2<f32> {
        Array2::from_shape_fn((size, size), |(y, x)| {
            if rows.contains(&y) && cols.contains(&x) {
                0.9
            } else {
                0.1
            }
        })
    }

    #[test]
    fn test_render_config_default() {
        let config = RenderConfig::default();
        assert_eq!(config.box_threshold, 0.5);
        assert_eq!(config.box_color, [0, 255, 0]);
        assert_eq!(config.box_thickness, 2);
    }

    #[test]
    fn test_render_config_partial_json_fills_defaults() {
        let config: RenderConfig = serde_json::from_str(r#"{"box_thickness": 4}"#).unwrap();
        assert_eq!(config.box_thickness, 4);
        assert_eq!(config.box_threshold, 0.5);
        assert_eq!(config.box_color, [0, 255, 0]);

        let json = serde_json::to_string(&config).unwrap();
        let decoded: RenderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_zero_map_heatmap_closed_form() {
        let image = gradient_image(6, 5);
        let map = Array2::zeros((2, 2));
        let blended = heatmap_overlay(&image, &map);

        assert_eq!(blended.dimensions(), image.dimensions());
        for (x, y, pixel) in blended.enumerate_pixels() {
            let base = image.get_pixel(x, y);
            let expected = [
                (0.6 * f32::from(base[0])).round() as u8,
                (0.6 * f32::from(base[1])).round() as u8,
                (0.6 * f32::from(base[2]) + 0.4 * 128.0).round() as u8,
            ];
            assert_eq!(pixel.0, expected);
        }
    }

    #[test]
    fn test_zero_map_box_is_identity() {
        let image = gradient_image(8, 8);
        let boxed = bounding_box_overlay(&image, &Array2::zeros((3, 3)), &RenderConfig::default());
        assert_eq!(boxed, image);
    }

    #[test]
    fn test_threshold_is_strict() {
        let map = Array2::from_elem((4, 4), 0.5f32);
        assert_eq!(largest_region(&map, 0.5), None);
    }

    #[test]
    fn test_largest_region_of_blob() {
        let map = blob_map(16, 4..10, 3..12);
        let region = largest_region(&map, 0.5).unwrap();
        assert_eq!(
            region,
            BoundingBox {
                x: 3,
                y: 4,
                width: 9,
                height: 6
            }
        );
    }

    #[test]
    fn test_largest_of_two_regions_wins() {
        let mut map = blob_map(20, 1..4, 1..4);
        for y in 8..18 {
            for x in 6..16 {
                map[[y, x]] = 0.8;
            }
        }
        let region = largest_region(&map, 0.5).unwrap();
        assert_eq!((region.x, region.y, region.width, region.height), (6, 8, 10, 10));
    }

    #[test]
    fn test_box_drawn_around_blob() {
        let image = RgbImage::from_pixel(16, 16, Rgb([50, 50, 50]));
        let map = blob_map(16, 4..11, 4..11);
        let boxed = bounding_box_overlay(&image, &map, &RenderConfig::default());
        let green = Rgb([0, 255, 0]);

        // Outer stroke at x = 4 and x = 4 + 7
        assert_eq!(*boxed.get_pixel(4, 4), green);
        assert_eq!(*boxed.get_pixel(11, 11), green);
        assert_eq!(*boxed.get_pixel(4, 8), green);
        // Second stroke one pixel inside
        assert_eq!(*boxed.get_pixel(5, 8), green);
        // Interior and outside untouched
        assert_eq!(*boxed.get_pixel(8, 8), Rgb([50, 50, 50]));
        assert_eq!(*boxed.get_pixel(1, 1), Rgb([50, 50, 50]));
        // Input unchanged
        assert_eq!(*image.get_pixel(4, 4), Rgb([50, 50, 50]));
    }

    #[test]
    fn test_renderer_produces_both_overlays() {
        let image = gradient_image(16, 16);
        let map = blob_map(16, 4..11, 4..11);
        let overlays = Renderer::default().render(&image, &map);

        assert_eq!(overlays.heatmap.dimensions(), (16, 16));
        assert_eq!(overlays.bounding_box.dimensions(), (16, 16));
        assert_eq!(
            overlays.bounding_box,
            bounding_box_overlay(&image, &map, &RenderConfig::default())
        );
        assert!(overlays.region.is_some());
    }
}

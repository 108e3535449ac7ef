//! Map resampling and color mapping.

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::Array2;

/// Resample `map` to `width x height` with bilinear (triangle) filtering.
pub fn resize_map(map: &Array2<f32>, width: u32, height: u32) -> Array2<f32> {
    let (src_h, src_w) = map.dim();
    let (dst_w, dst_h) = (width as usize, height as usize);
    if src_h == 0 || src_w == 0 || dst_h == 0 || dst_w == 0 {
        return Array2::zeros((dst_h, dst_w));
    }

    let source: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(src_w as u32, src_h as u32, |x, y| {
            Luma([map[[y as usize, x as usize]]])
        });
    let resized = imageops::resize(&source, width, height, FilterType::Triangle);

    Array2::from_shape_fn((dst_h, dst_w), |(y, x)| resized.get_pixel(x as u32, y as u32)[0])
}

/// Quantize a `[0, 1]` map to 8-bit intensities (truncating, like `(v * 255) as u8`).
pub fn to_intensity(map: &Array2<f32>) -> GrayImage {
    let (height, width) = map.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let v = map[[y as usize, x as usize]].clamp(0.0, 1.0);
        Luma([(v * 255.0) as u8])
    })
}

/// Jet colormap: dark blue at 0 through cyan, yellow to dark red at 255.
pub fn jet(intensity: u8) -> Rgb<u8> {
    let v = f32::from(intensity) / 255.0;
    let channel = |offset: f32| {
        let c = (1.5 - (4.0 * v - offset).abs()).clamp(0.0, 1.0);
        (c * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Colorize a `[0, 1]` map with [`jet`].
pub fn colorize(map: &Array2<f32>) -> RgbImage {
    let intensity = to_intensity(map);
    RgbImage::from_fn(intensity.width(), intensity.height(), |x, y| {
        jet(intensity.get_pixel(x, y)[0])
    })
}

//! Diagnostic PNG rendering. Not part of any product: no-data is drawn black
//! and large rasters are strided down before encoding.

use crate::types::{PipelineResult, RealImage};
use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::{s, Array2, ArrayView2};
use std::path::Path;

/// ColorBrewer RdYlGn, 11 classes, from -1 to +1
const RDYLGN: [[u8; 3]; 11] = [
    [0xa5, 0x00, 0x26],
    [0xd7, 0x30, 0x27],
    [0xf4, 0x6d, 0x43],
    [0xfd, 0xae, 0x61],
    [0xfe, 0xe0, 0x8b],
    [0xff, 0xff, 0xbf],
    [0xd9, 0xef, 0x8b],
    [0xa6, 0xd9, 0x6a],
    [0x66, 0xbd, 0x63],
    [0x1a, 0x98, 0x50],
    [0x00, 0x68, 0x37],
];

fn strided(image: &RealImage, stride: usize) -> ArrayView2<'_, f32> {
    let step = stride.max(1) as isize;
    image.slice(s![..;step, ..;step])
}

/// Linear grey ramp between `vmin` (black) and `vmax` (white)
pub fn render_gray(image: &RealImage, vmin: f32, vmax: f32, stride: usize) -> GrayImage {
    let view = strided(image, stride);
    let (rows, cols) = view.dim();
    let span = (vmax - vmin).max(f32::EPSILON);
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let v = view[[y as usize, x as usize]];
        if v.is_nan() {
            Luma([0])
        } else {
            let t = ((v - vmin) / span).clamp(0.0, 1.0);
            Luma([(t * 255.0).round() as u8])
        }
    })
}

/// 8-bit grey levels shown as-is
pub fn render_levels(levels: &Array2<u8>) -> GrayImage {
    let (rows, cols) = levels.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| Luma([levels[[y as usize, x as usize]]]))
}

/// Vegetation index on a red-yellow-green ramp over [-1, 1]
pub fn render_index(image: &RealImage, stride: usize) -> RgbImage {
    let view = strided(image, stride);
    let (rows, cols) = view.dim();
    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        let v = view[[y as usize, x as usize]];
        if v.is_nan() {
            Rgb([0, 0, 0])
        } else {
            Rgb(diverging_color(v))
        }
    })
}

fn diverging_color(v: f32) -> [u8; 3] {
    let t = ((v.clamp(-1.0, 1.0) + 1.0) / 2.0) * (RDYLGN.len() - 1) as f32;
    let lo = (t.floor() as usize).min(RDYLGN.len() - 2);
    let frac = t - lo as f32;
    let (a, b) = (RDYLGN[lo], RDYLGN[lo + 1]);
    let mix = |i: usize| (a[i] as f32 + (b[i] as f32 - a[i] as f32) * frac).round() as u8;
    [mix(0), mix(1), mix(2)]
}

/// Two panels next to each other with a white gutter
pub fn side_by_side(left: &GrayImage, right: &GrayImage, gutter: u32) -> GrayImage {
    let width = left.width() + gutter + right.width();
    let height = left.height().max(right.height());
    let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));
    for (x, y, p) in left.enumerate_pixels() {
        canvas.put_pixel(x, y, *p);
    }
    let offset = left.width() + gutter;
    for (x, y, p) in right.enumerate_pixels() {
        canvas.put_pixel(x + offset, y, *p);
    }
    canvas
}

pub fn save_gray<P: AsRef<Path>>(image: &GrayImage, path: P) -> PipelineResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save(path.as_ref())?;
    log::info!("Saved: {}", path.as_ref().display());
    Ok(())
}

pub fn save_rgb<P: AsRef<Path>>(image: &RgbImage, path: P) -> PipelineResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save(path.as_ref())?;
    log::info!("Saved: {}", path.as_ref().display());
    Ok(())
}

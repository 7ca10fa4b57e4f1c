use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use fast_image_resize::images::{Image, ImageRef};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::RgbImage;
use ndarray::Array4;

use crate::error::{DecodeError, DetectError};

// Browsers and mobile clients don't agree on trailing `=`, accept both.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Drops a `data:image/jpeg;base64,` style header if there is one.
///
/// The payload ends at the next `,`; anything after it is ignored.
pub fn strip_data_uri(data: &str) -> &str {
    match data.split_once(',') {
        Some((_, rest)) => rest.split_once(',').map_or(rest, |(payload, _)| payload),
        None => data,
    }
}

/// Decodes a (possibly data-URI wrapped) base64 image into RGB.
pub fn decode_base64_image(data: &str) -> Result<RgbImage, DecodeError> {
    let payload: String = strip_data_uri(data)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = PAYLOAD_ENGINE.decode(payload)?;
    let image = image::load_from_memory(&bytes)?;
    Ok(image.to_rgb8())
}

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl PreprocessConfig {
    pub fn square(size: usize) -> Self {
        Self {
            height: size,
            width: size,
            channels: 3,
        }
    }
}

/// How an image was placed into a letterboxed network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub x_offset: u32,
    pub y_offset: u32,
}

impl Letterbox {
    /// Maps a position in network input pixels back to source image pixels.
    pub fn to_image(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.x_offset as f32) / self.scale,
            (y - self.y_offset as f32) / self.scale,
        )
    }
}

#[derive(Debug)]
pub struct Processor {
    pub config: PreprocessConfig,
}

impl Processor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Resizes `image` to fit the network input while keeping its aspect ratio, centers it on a
    /// black canvas and converts it to an NCHW tensor with values in `[0, 1]`.
    pub fn letterbox(&self, image: &RgbImage) -> Result<(Array4<f32>, Letterbox), DetectError> {
        let (orig_width, orig_height) = image.dimensions();
        if orig_width == 0 || orig_height == 0 {
            return Err(DetectError::Preprocess("image has no pixels".into()));
        }
        let (width, height) = (self.config.width as u32, self.config.height as u32);
        let scale = (width as f32 / orig_width as f32).min(height as f32 / orig_height as f32);
        let new_width = ((orig_width as f32 * scale) as u32).clamp(1, width);
        let new_height = ((orig_height as f32 * scale) as u32).clamp(1, height);

        let src = ImageRef::new(orig_width, orig_height, image.as_raw(), PixelType::U8x3)
            .map_err(|e| DetectError::Preprocess(e.to_string()))?;
        let mut dst_image = Image::new(new_width, new_height, PixelType::U8x3);
        let resize_options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
        Resizer::new()
            .resize(&src, &mut dst_image, Some(&resize_options))
            .map_err(|e| DetectError::Preprocess(e.to_string()))?;
        let resized = RgbImage::from_raw(new_width, new_height, dst_image.into_vec())
            .ok_or_else(|| DetectError::Preprocess("resized buffer has the wrong size".into()))?;

        // Center the resized image on the padded canvas
        let x_offset = (width - new_width) / 2;
        let y_offset = (height - new_height) / 2;
        let mut padded = RgbImage::new(width, height);
        image::imageops::overlay(&mut padded, &resized, x_offset as i64, y_offset as i64);

        let mut img_arr = Array4::<f32>::zeros((1, self.config.channels, self.config.height, self.config.width));
        for (x, y, rgb) in padded.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            img_arr[[0, 0, y, x]] = rgb[0] as f32 / 255.0;
            img_arr[[0, 1, y, x]] = rgb[1] as f32 / 255.0;
            img_arr[[0, 2, y, x]] = rgb[2] as f32 / 255.0;
        }

        Ok((img_arr, Letterbox { scale, x_offset, y_offset }))
    }
}

/// A rotated square region of an image, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub x_center: f32,
    pub y_center: f32,
    pub size: f32,
    /// Clockwise rotation in radians (image y axis points down).
    pub rotation: f32,
}

impl Roi {
    /// Maps a position inside the ROI (`u`, `v` from 0 to 1, unrotated) to image pixels.
    pub fn to_image(&self, u: f32, v: f32) -> (f32, f32) {
        let lx = (u - 0.5) * self.size;
        let ly = (v - 0.5) * self.size;
        let (sin, cos) = self.rotation.sin_cos();
        (
            self.x_center + lx * cos - ly * sin,
            self.y_center + lx * sin + ly * cos,
        )
    }
}

/// Resamples `roi` into a `size` x `size` NCHW tensor with values in `[0, 1]`.
///
/// Uses bilinear filtering; samples outside the image are black.
pub fn crop_rotated(image: &RgbImage, roi: &Roi, size: usize) -> Array4<f32> {
    let mut out = Array4::<f32>::zeros((1, 3, size, size));
    let (width, height) = image.dimensions();
    let fetch = |x: i64, y: i64, c: usize| -> f32 {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            0.0
        } else {
            image.get_pixel(x as u32, y as u32)[c] as f32
        }
    };

    for v in 0..size {
        for u in 0..size {
            let (sx, sy) = roi.to_image(
                (u as f32 + 0.5) / size as f32,
                (v as f32 + 0.5) / size as f32,
            );
            // pixel centers sit at +0.5
            let (fx, fy) = (sx - 0.5, sy - 0.5);
            let (x0, y0) = (fx.floor(), fy.floor());
            let (tx, ty) = (fx - x0, fy - y0);
            let (x0, y0) = (x0 as i64, y0 as i64);
            for c in 0..3 {
                let top = fetch(x0, y0, c) * (1.0 - tx) + fetch(x0 + 1, y0, c) * tx;
                let bottom = fetch(x0, y0 + 1, c) * (1.0 - tx) + fetch(x0 + 1, y0 + 1, c) * tx;
                out[[0, c, v, u]] = (top * (1.0 - ty) + bottom * ty) / 255.0;
            }
        }
    }
    out
}

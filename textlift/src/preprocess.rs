use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::media::{ImageAsset, MediaType};

/// Largest boost applied to pixels. The contrast factor's denominator
/// `259 - boost * 100` reaches zero at 2.59.
pub const MAX_EFFECTIVE_CONTRAST_BOOST: f32 = 2.5;

/// Prepares an image for recognition.
pub trait ImagePreprocessor: Send + Sync {
    fn preprocess(&self, image: &ImageAsset, contrast_boost: f32) -> Result<ImageAsset>;
}

/// Downscales oversized images, then applies contrast enhancement and
/// grayscale conversion.
#[derive(Debug, Clone)]
pub struct ContrastPreprocessor {
    max_image_dimension: u32,
}

impl ContrastPreprocessor {
    pub fn new(max_image_dimension: u32) -> Self {
        Self {
            max_image_dimension,
        }
    }
}

impl Default for ContrastPreprocessor {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl ImagePreprocessor for ContrastPreprocessor {
    fn preprocess(&self, image: &ImageAsset, contrast_boost: f32) -> Result<ImageAsset> {
        let img = image.decode()?;
        let img = resize_if_needed(img, self.max_image_dimension);
        let (width, height) = img.dimensions();

        let boost = effective_boost(contrast_boost);
        debug!(width, height, boost, "Preprocessing image");

        let enhanced = enhance(img.to_rgba8(), boost);

        let mut output = Vec::new();
        DynamicImage::ImageRgba8(enhanced)
            .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .map_err(|e| PipelineError::Encode(format!("Failed to encode image: {e}")))?;

        Ok(ImageAsset::derived(
            image,
            output,
            MediaType::Png,
            (width, height),
        ))
    }
}

/// Applies contrast enhancement and grayscale conversion with the default
/// size limit.
pub fn preprocess(image: &ImageAsset, contrast_boost: f32) -> Result<ImageAsset> {
    ContrastPreprocessor::default().preprocess(image, contrast_boost)
}

fn effective_boost(contrast_boost: f32) -> f32 {
    if contrast_boost > MAX_EFFECTIVE_CONTRAST_BOOST {
        warn!(
            requested = contrast_boost,
            applied = MAX_EFFECTIVE_CONTRAST_BOOST,
            "Contrast boost clamped below the formula's singular point"
        );
        MAX_EFFECTIVE_CONTRAST_BOOST
    } else {
        contrast_boost
    }
}

/// Contrast multiplier for a boost, where `boost * 100` is the classic
/// contrast level in `[-255, 255]`.
pub fn contrast_factor(boost: f32) -> f32 {
    let c = boost * 100.0;
    (259.0 * (c + 255.0)) / (255.0 * (259.0 - c))
}

/// Stretches one channel value away from mid-gray.
pub fn apply_contrast(channel: u8, factor: f32) -> u8 {
    (factor * (channel as f32 - 128.0) + 128.0)
        .round()
        .clamp(0.0, 255.0) as u8
}

pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Contrast on R, G and B, then collapse to gray. Alpha is kept.
fn enhance(mut pixels: RgbaImage, boost: f32) -> RgbaImage {
    let factor = contrast_factor(boost);
    for pixel in pixels.pixels_mut() {
        let r = apply_contrast(pixel[0], factor);
        let g = apply_contrast(pixel[1], factor);
        let b = apply_contrast(pixel[2], factor);
        let gray = luminance(r, g, b);
        pixel[0] = gray;
        pixel[1] = gray;
        pixel[2] = gray;
    }
    pixels
}

/// Resize image if it exceeds maximum dimension while maintaining aspect ratio
///
/// Uses Lanczos3 filter for high-quality downscaling
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_asset(img: DynamicImage) -> ImageAsset {
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .unwrap();
        ImageAsset::new(output, "image/png")
    }

    fn decode(asset: &ImageAsset) -> RgbaImage {
        image::load_from_memory(asset.bytes()).unwrap().to_rgba8()
    }

    #[test]
    fn test_contrast_factor_increases_with_boost() {
        let mut previous = 0.0;
        let mut boost = 0.5;
        while boost <= 2.5 {
            let factor = contrast_factor(boost);
            assert!(factor > previous, "factor must grow at boost {boost}");
            assert!(factor.is_finite() && factor > 0.0);
            previous = factor;
            boost += 0.05;
        }
    }

    #[test]
    fn test_mid_gray_is_fixed_point() {
        for boost in [0.5, 1.0, 1.7, 2.5] {
            assert_eq!(apply_contrast(128, contrast_factor(boost)), 128);
        }
    }

    #[test]
    fn test_separation_from_mid_gray_is_monotonic() {
        for channel in [0u8, 40, 100, 127, 129, 180, 255] {
            let mut previous = 0i32;
            for boost in [0.5, 0.8, 1.0, 1.5, 2.0, 2.5] {
                let out = apply_contrast(channel, contrast_factor(boost));
                let separation = (out as i32 - 128).abs();
                assert!(
                    separation >= previous,
                    "channel {channel} lost separation at boost {boost}"
                );
                previous = separation;
            }
        }
    }

    #[test]
    fn test_saturated_channels_are_stable_under_reapplication() {
        let factor = contrast_factor(1.0);
        for channel in [0u8, 255] {
            let once = apply_contrast(channel, factor);
            assert_eq!(apply_contrast(once, factor), once);
        }
    }

    #[test]
    fn test_effective_boost_clamps_singular_range() {
        assert_eq!(effective_boost(1.0), 1.0);
        assert_eq!(effective_boost(2.5), 2.5);
        assert_eq!(effective_boost(2.59), MAX_EFFECTIVE_CONTRAST_BOOST);
        assert_eq!(effective_boost(3.0), MAX_EFFECTIVE_CONTRAST_BOOST);
        assert!(contrast_factor(effective_boost(3.0)).is_finite());
    }

    #[test]
    fn test_luminance_weights() {
        assert_eq!(luminance(0, 0, 0), 0);
        assert_eq!(luminance(255, 255, 255), 255);
        assert_eq!(luminance(255, 0, 0), 76);
        assert_eq!(luminance(0, 255, 0), 150);
        assert_eq!(luminance(0, 0, 255), 29);
    }

    #[test]
    fn test_output_is_gray_and_keeps_alpha() {
        let mut img = RgbaImage::new(4, 4);
        for (x, _y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([200, (x * 40) as u8, 30, 77]);
        }
        let asset = png_asset(DynamicImage::ImageRgba8(img));

        let out = preprocess(&asset, 1.2).unwrap();
        assert_eq!(out.declared_type(), "image/png");
        assert_eq!(out.dimensions(), Some((4, 4)));

        for pixel in decode(&out).pixels() {
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
            assert_eq!(pixel[3], 77);
        }
    }

    #[test]
    fn test_pixel_values_follow_formula() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([100, 150, 200, 255]));
        let asset = png_asset(DynamicImage::ImageRgba8(img));

        let out = preprocess(&asset, 1.0).unwrap();
        let factor = contrast_factor(1.0);
        let expected = luminance(
            apply_contrast(100, factor),
            apply_contrast(150, factor),
            apply_contrast(200, factor),
        );
        assert_eq!(decode(&out).get_pixel(0, 0)[0], expected);
    }

    #[test]
    fn test_input_asset_is_not_mutated() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 255]));
        let asset = png_asset(DynamicImage::ImageRgba8(img));
        let before = asset.bytes().to_vec();

        let _ = preprocess(&asset, 2.0).unwrap();
        assert_eq!(asset.bytes(), before.as_slice());
    }

    #[test]
    fn test_output_keeps_source_name() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([90, 90, 90, 255]));
        let asset = png_asset(DynamicImage::ImageRgba8(img)).with_name("receipt.jpeg");

        let out = preprocess(&asset, 1.0).unwrap();
        assert_eq!(out.name(), Some("receipt.jpeg"));
        assert_eq!(out.declared_type(), "image/png");
    }

    #[test]
    fn test_invalid_bytes_fail_with_decode_error() {
        let asset = ImageAsset::new(vec![0u8, 1, 2, 3, 4, 5], "image/png");
        assert!(matches!(
            preprocess(&asset, 1.0),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let asset = png_asset(DynamicImage::new_rgb8(400, 100));
        let out = ContrastPreprocessor::new(200)
            .preprocess(&asset, 1.0)
            .unwrap();
        assert_eq!(out.dimensions(), Some((200, 50)));
    }

    #[test]
    fn test_resize_if_needed_no_change() {
        let img = DynamicImage::new_rgb8(500, 500);
        let resized = resize_if_needed(img, 1000);
        assert_eq!(resized.dimensions(), (500, 500));
    }

    #[test]
    fn test_resize_if_needed_height_exceeded() {
        let img = DynamicImage::new_rgb8(500, 2000);
        let resized = resize_if_needed(img, 1000);
        assert_eq!(resized.dimensions(), (250, 1000));
    }
}

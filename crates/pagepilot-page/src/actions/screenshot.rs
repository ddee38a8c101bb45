//! Screenshot post-processing.
//!
//! A captured tab image is in device pixels at the tab's zoom. Scaling it by
//! `1 / (zoom * dpr)` brings it back to CSS pixels so that coordinates read
//! off the image line up with `clientX` / `clientY` in the page.

use std::io::Cursor;

use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use pagepilot_config::ScreenshotFormat;
use pagepilot_protocols::ScreenshotPayload;

use crate::error::PageError;

/// A captured image and the page scale it was taken at.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotJob {
    pub data_url: String,
    pub zoom_factor: f64,
    pub device_pixel_ratio: f64,
}

impl From<ScreenshotPayload> for ScreenshotJob {
    fn from(payload: ScreenshotPayload) -> Self {
        Self {
            data_url: payload.data_url,
            zoom_factor: payload.zoom_factor,
            device_pixel_ratio: payload.device_pixel_ratio,
        }
    }
}

/// Output of [`process_screenshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedScreenshot {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Split a `data:<mime>;base64,<data>` URL and decode the bytes.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, PageError> {
    let invalid = |reason: &str| PageError::InvalidDataUrl(reason.to_string());
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| invalid("missing data: prefix"))?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing data separator"))?;
    if !header.ends_with(";base64") {
        return Err(invalid("not base64 encoded"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| PageError::InvalidDataUrl(e.to_string()))
}

/// Largest output side. Also the WebP format limit.
pub const MAX_SCREENSHOT_SIDE: u32 = 16383;

/// Output dimensions for an image of `width x height` device pixels, or
/// `Err((width, height))` with the unclamped size when a side would exceed
/// [`MAX_SCREENSHOT_SIDE`].
pub fn scaled_size(width: u32, height: u32, scale: f64) -> Result<(u32, u32), (f64, f64)> {
    let scale_dim = |v: u32| (v as f64 / scale).round().max(1.0);
    let (w, h) = (scale_dim(width), scale_dim(height));
    let max = f64::from(MAX_SCREENSHOT_SIDE);
    if w > max || h > max {
        return Err((w, h));
    }
    Ok((w as u32, h as u32))
}

/// Rescale a captured screenshot to CSS pixels and re-encode it.
pub fn process_screenshot(
    job: &ScreenshotJob,
    format: ScreenshotFormat,
) -> Result<ProcessedScreenshot, PageError> {
    let scale = job.zoom_factor * job.device_pixel_ratio;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(PageError::InvalidScale {
            zoom: job.zoom_factor,
            ratio: job.device_pixel_ratio,
        });
    }

    let bytes = decode_data_url(&job.data_url)?;
    let image =
        image::load_from_memory(&bytes).map_err(|e| PageError::ImageDecode(e.to_string()))?;

    let (width, height) = scaled_size(image.width(), image.height(), scale).map_err(
        |(width, height)| PageError::ScreenshotTooLarge {
            width,
            height,
            max: MAX_SCREENSHOT_SIDE,
        },
    )?;
    let resized = if (width, height) == (image.width(), image.height()) {
        image
    } else {
        image.resize_exact(width, height, FilterType::Lanczos3)
    };

    // The WebP encoder only takes 8-bit RGB(A).
    let rgba = DynamicImage::ImageRgba8(resized.to_rgba8());
    let image_format = match format {
        ScreenshotFormat::Webp => ImageFormat::WebP,
        ScreenshotFormat::Png => ImageFormat::Png,
    };
    let mut buffer = Cursor::new(Vec::new());
    rgba.write_to(&mut buffer, image_format)
        .map_err(|e| PageError::ImageEncode(e.to_string()))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(buffer.into_inner());
    Ok(ProcessedScreenshot {
        data_url: format!("data:{};base64,{}", format.mime_type(), encoded),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_data_url(width: u32, height: u32) -> String {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(buffer.into_inner())
        )
    }

    fn job(data_url: String, zoom: f64, dpr: f64) -> ScreenshotJob {
        ScreenshotJob {
            data_url,
            zoom_factor: zoom,
            device_pixel_ratio: dpr,
        }
    }

    fn decoded_size(data_url: &str) -> (u32, u32) {
        let bytes = decode_data_url(data_url).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_scaled_size_rounds_and_clamps() {
        assert_eq!(scaled_size(2560, 1600, 2.0), Ok((1280, 800)));
        assert_eq!(scaled_size(101, 51, 2.0), Ok((51, 26)));
        assert_eq!(scaled_size(1, 1, 4.0), Ok((1, 1)));
    }

    #[test]
    fn test_scaled_size_rejects_oversized_output() {
        assert_eq!(
            scaled_size(200, 100, 1e-6),
            Err((200_000_000.0, 100_000_000.0))
        );
        assert_eq!(scaled_size(16383, 10, 1.0), Ok((16383, 10)));
        assert!(scaled_size(8192, 10, 0.5).is_err());
    }

    #[test]
    fn test_tiny_scale_is_rejected_before_resizing() {
        let err = process_screenshot(&job(png_data_url(200, 100), 1e-6, 1.0), ScreenshotFormat::Png)
            .unwrap_err();
        assert!(matches!(
            err,
            PageError::ScreenshotTooLarge { max: MAX_SCREENSHOT_SIDE, .. }
        ));
        assert_eq!(err.class(), pagepilot_protocols::ErrorClass::Validation);
    }

    #[test]
    fn test_process_downscales_to_css_pixels() {
        let out = process_screenshot(&job(png_data_url(200, 100), 1.0, 2.0), ScreenshotFormat::Png)
            .unwrap();
        assert!(out.data_url.starts_with("data:image/png;base64,"));
        assert_eq!((out.width, out.height), (100, 50));
        assert_eq!(decoded_size(&out.data_url), (100, 50));
    }

    #[test]
    fn test_process_webp_with_zoom() {
        let out = process_screenshot(&job(png_data_url(300, 150), 1.5, 2.0), ScreenshotFormat::Webp)
            .unwrap();
        assert!(out.data_url.starts_with("data:image/webp;base64,"));
        assert_eq!((out.width, out.height), (100, 50));
        assert_eq!(decoded_size(&out.data_url), (100, 50));
    }

    #[test]
    fn test_upscales_when_zoomed_out() {
        let out = process_screenshot(&job(png_data_url(50, 40), 0.5, 1.0), ScreenshotFormat::Png)
            .unwrap();
        assert_eq!((out.width, out.height), (100, 80));
    }

    #[test]
    fn test_invalid_scale() {
        for (zoom, dpr) in [(0.0, 1.0), (1.0, -2.0), (f64::NAN, 1.0)] {
            let err = process_screenshot(&job(png_data_url(4, 4), zoom, dpr), ScreenshotFormat::Png)
                .unwrap_err();
            assert!(matches!(err, PageError::InvalidScale { .. }));
        }
    }

    #[test]
    fn test_invalid_data_url() {
        let err = process_screenshot(&job("not a url".into(), 1.0, 1.0), ScreenshotFormat::Png)
            .unwrap_err();
        assert!(matches!(err, PageError::InvalidDataUrl(_)));

        let err = process_screenshot(
            &job("data:image/png,rawbytes".into(), 1.0, 1.0),
            ScreenshotFormat::Png,
        )
        .unwrap_err();
        assert!(matches!(err, PageError::InvalidDataUrl(_)));
    }

    #[test]
    fn test_undecodable_image() {
        let url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(b"definitely not a png")
        );
        let err = process_screenshot(&job(url, 1.0, 1.0), ScreenshotFormat::Png).unwrap_err();
        assert!(matches!(err, PageError::ImageDecode(_)));
    }
}

//! 이미지 인코더.
//!
//! JPEG/PNG는 image crate, WebP는 libwebp(webp crate)로 인코딩.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use scenecap_core::error::CoreError;
use scenecap_core::models::frame::ImageFormat;
use std::io::Cursor;
use tracing::debug;

/// 지정 포맷/품질로 인코딩
///
/// `quality`는 1-100. PNG는 무손실이라 품질을 무시한다.
pub fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, CoreError> {
    let quality = quality.clamp(1, 100);
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return Err(CoreError::UnsupportedImage("인코딩할 이미지 크기 0".to_string()));
    }

    let encoded = match format {
        ImageFormat::Jpeg => encode_jpeg(image, quality)?,
        ImageFormat::Png => encode_png(image)?,
        ImageFormat::Webp => encode_webp(image, quality),
    };

    let raw_size = (w as usize) * (h as usize) * 4;
    debug!(
        "{format} 인코딩: {}x{} → {} bytes (품질 {}, 압축률 {:.1}%)",
        w,
        h,
        encoded.len(),
        quality,
        (encoded.len() as f32 / raw_size as f32) * 100.0
    );

    Ok(encoded)
}

/// JPEG 인코딩 (알파 채널 제거)
fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CoreError> {
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(|e| CoreError::UnsupportedImage(format!("JPEG 인코딩 실패: {e}")))?;
    Ok(buf)
}

/// PNG 인코딩
fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CoreError> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| CoreError::UnsupportedImage(format!("PNG 인코딩 실패: {e}")))?;
    Ok(cursor.into_inner())
}

/// WebP 인코딩
fn encode_webp(image: &DynamicImage, quality: u8) -> Vec<u8> {
    let rgba = image.to_rgba8();
    let (w, h) = (rgba.width(), rgba.height());
    let encoder = webp::Encoder::from_rgba(&rgba, w, h);
    encoder.encode(quality as f32).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn make_test_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            image::Rgba([128, 64, 200, 255]),
        ))
    }

    #[test]
    fn all_formats_produce_output() {
        let img = make_test_image(100, 100);
        for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Webp] {
            let bytes = encode(&img, format, 80).unwrap();
            assert!(!bytes.is_empty(), "{format} 출력 없음");
        }
    }

    #[test]
    fn encoded_output_is_decodable() {
        let img = make_test_image(64, 48);
        for format in [ImageFormat::Jpeg, ImageFormat::Png] {
            let bytes = encode(&img, format, 90).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (64, 48));
        }
    }

    #[test]
    fn jpeg_magic_bytes() {
        let bytes = encode(&make_test_image(16, 16), ImageFormat::Jpeg, 50).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn webp_riff_header() {
        let bytes = encode(&make_test_image(16, 16), ImageFormat::Webp, 75).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn quality_out_of_range_clamped() {
        let img = make_test_image(32, 32);
        assert!(encode(&img, ImageFormat::Jpeg, 0).is_ok());
        assert!(encode(&img, ImageFormat::Webp, 255).is_ok());
    }

    #[test]
    fn empty_image_rejected() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert!(matches!(
            encode(&img, ImageFormat::Png, 80),
            Err(CoreError::UnsupportedImage(_))
        ));
    }
}

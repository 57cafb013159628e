//! 고속 리사이즈.
//!
//! fast_image_resize 기반 리사이즈와 미리보기 크기 계산.

use fast_image_resize::{images::Image as FirImage, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbaImage};
use scenecap_core::error::CoreError;
use tracing::debug;

/// 고속 리사이즈 (정확한 목표 크기)
pub fn fast_resize(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<DynamicImage, CoreError> {
    let (src_w, src_h) = (image.width(), image.height());

    if src_w == 0 || src_h == 0 {
        return Err(CoreError::UnsupportedImage("소스 이미지 크기 0".to_string()));
    }
    if width == 0 || height == 0 {
        return Err(CoreError::Internal("목표 이미지 크기 0".to_string()));
    }

    // 동일 크기면 복제 반환
    if src_w == width && src_h == height {
        return Ok(image.clone());
    }

    let src_rgba = image.to_rgba8();

    let src_image = FirImage::from_vec_u8(
        src_w,
        src_h,
        src_rgba.into_raw(),
        fast_image_resize::PixelType::U8x4,
    )
    .map_err(|e| CoreError::UnsupportedImage(format!("소스 이미지 생성 실패: {e}")))?;

    let mut dst_image = FirImage::new(width, height, fast_image_resize::PixelType::U8x4);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));

    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| CoreError::Internal(format!("리사이즈 실패: {e}")))?;

    let result = RgbaImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| CoreError::Internal("결과 이미지 생성 실패".to_string()))?;

    debug!("리사이즈: {}x{} → {}x{}", src_w, src_h, width, height);

    Ok(DynamicImage::ImageRgba8(result))
}

/// 비율 유지하며 최대 크기 안에 맞춘 크기 계산 (확대하지 않음)
pub fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w <= max_w && src_h <= max_h {
        return (src_w, src_h);
    }
    let scale = f64::min(max_w as f64 / src_w as f64, max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}

/// 최대 크기 안으로 축소 (이미 작으면 그대로)
pub fn resize_to_fit(
    image: &DynamicImage,
    max_w: u32,
    max_h: u32,
) -> Result<DynamicImage, CoreError> {
    let (w, h) = fit_within(image.width(), image.height(), max_w, max_h);
    fast_resize(image, w, h)
}

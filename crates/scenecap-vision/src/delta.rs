//! 장면 변경 감지.
//!
//! 두 프레임을 동일한 저해상도(320x240) 그레이스케일로 리샘플한 뒤
//! 픽셀 단위 밝기 차이로 변경 비율을 계산한다.
//!
//! 임계값은 두 단계로 분리된다:
//! - [`PIXEL_NOISE_THRESHOLD`]: 픽셀 하나를 "변경됨"으로 셀 최소 밝기 차이 (고정)
//! - `CaptureConfig::change_threshold`: 변경 비율로 장면 전환을 판정하는 값 (호출자 소유)

use image::{DynamicImage, GrayImage};
use scenecap_core::error::CoreError;
use tracing::debug;

use crate::thumbnail;

/// 비교용 리샘플 너비
pub const SIGNATURE_WIDTH: u32 = 320;

/// 비교용 리샘플 높이
pub const SIGNATURE_HEIGHT: u32 = 240;

/// 픽셀 노이즈 임계값 (밝기 차이, 0-255)
pub const PIXEL_NOISE_THRESHOLD: u8 = 30;

/// 비교용 서명 생성: 320x240 리샘플 + 단일 채널 밝기
pub fn prepare(image: &DynamicImage) -> Result<GrayImage, CoreError> {
    let resized = thumbnail::fast_resize(image, SIGNATURE_WIDTH, SIGNATURE_HEIGHT)?;
    Ok(resized.to_luma8())
}

/// 변경 점수 계산 (0.0 ~ 1.0)
///
/// 크기가 다르면 `DimensionMismatch`: 배선 결함이므로 복구 대상이 아니다.
pub fn score(prev: &GrayImage, curr: &GrayImage) -> Result<f32, CoreError> {
    if prev.dimensions() != curr.dimensions() {
        return Err(CoreError::DimensionMismatch {
            expected: prev.dimensions(),
            actual: curr.dimensions(),
        });
    }

    let total = prev.as_raw().len();
    if total == 0 {
        return Ok(0.0);
    }

    let changed = count_changed(prev.as_raw(), curr.as_raw());
    let ratio = changed as f32 / total as f32;

    debug!(
        "변경 감지: {changed}/{total} 픽셀 ({:.1}%)",
        ratio * 100.0
    );

    Ok(ratio)
}

/// 두 이미지를 각각 리샘플한 뒤 점수 계산
pub fn score_images(prev: &DynamicImage, curr: &DynamicImage) -> Result<f32, CoreError> {
    score(&prepare(prev)?, &prepare(curr)?)
}

/// 점수와 장면 변경 임계값으로 판정 (점수가 임계값을 넘으면 장면 변경)
pub fn is_scene_change(score: f32, change_threshold: f32) -> bool {
    score > change_threshold
}

/// 노이즈 임계값을 넘는 픽셀 수: 슬라이스 직접 순회
#[inline]
fn count_changed(prev: &[u8], curr: &[u8]) -> usize {
    prev.iter()
        .zip(curr)
        .filter(|(p, c)| p.abs_diff(**c) > PIXEL_NOISE_THRESHOLD)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbaImage};

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            image::Rgba([rgb[0], rgb[1], rgb[2], 255]),
        ))
    }

    #[test]
    fn identical_images_score_zero() {
        let img = solid(640, 480, [100, 150, 200]);
        assert_eq!(score_images(&img, &img).unwrap(), 0.0);
    }

    #[test]
    fn black_to_white_scores_one() {
        let black = solid(1920, 1080, [0, 0, 0]);
        let white = solid(1920, 1080, [255, 255, 255]);
        let s = score_images(&black, &white).unwrap();
        assert!((s - 1.0).abs() < 1e-6, "점수: {s}");
    }

    #[test]
    fn score_is_symmetric() {
        let prev = RgbaImage::from_pixel(64, 64, image::Rgba([100, 100, 100, 255]));
        let mut curr = prev.clone();
        for y in 0..32 {
            for x in 0..64 {
                curr.put_pixel(x, y, image::Rgba([250, 20, 20, 255]));
            }
        }
        let a = DynamicImage::ImageRgba8(prev);
        let b = DynamicImage::ImageRgba8(curr);
        assert_eq!(score_images(&a, &b).unwrap(), score_images(&b, &a).unwrap());
    }

    #[test]
    fn small_noise_ignored() {
        // 밝기 차이 10 → 노이즈 임계값 미만
        let prev = solid(320, 240, [100, 100, 100]);
        let curr = solid(320, 240, [110, 110, 110]);
        assert_eq!(score_images(&prev, &curr).unwrap(), 0.0);
    }

    #[test]
    fn half_changed_scores_half() {
        let prev = GrayImage::from_pixel(SIGNATURE_WIDTH, SIGNATURE_HEIGHT, Luma([0]));
        let mut curr = prev.clone();
        for y in 0..SIGNATURE_HEIGHT / 2 {
            for x in 0..SIGNATURE_WIDTH {
                curr.put_pixel(x, y, Luma([200]));
            }
        }
        let s = score(&prev, &curr).unwrap();
        assert!((s - 0.5).abs() < 1e-6);
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let a = GrayImage::new(320, 240);
        let b = GrayImage::new(160, 120);
        assert!(matches!(
            score(&a, &b),
            Err(CoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn different_source_sizes_are_resampled() {
        let a = solid(1920, 1080, [10, 10, 10]);
        let b = solid(800, 600, [10, 10, 10]);
        assert_eq!(score_images(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn scene_threshold_is_strict() {
        assert!(is_scene_change(0.51, 0.5));
        assert!(!is_scene_change(0.5, 0.5));
        assert!(!is_scene_change(0.0, 0.0));
    }

    #[test]
    fn prepare_produces_fixed_size() {
        let sig = prepare(&solid(1024, 768, [1, 2, 3])).unwrap();
        assert_eq!(sig.dimensions(), (SIGNATURE_WIDTH, SIGNATURE_HEIGHT));
    }
}

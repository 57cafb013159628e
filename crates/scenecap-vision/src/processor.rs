//! 이미지 처리기.
//!
//! 원본 캡처 바이트 → 디코딩 → 미리보기 크기로 축소 → 요청 포맷 인코딩.

use image::DynamicImage;
use scenecap_core::error::CoreError;
use scenecap_core::models::frame::ImageFormat;
use tracing::debug;

use crate::encoder;
use crate::thumbnail;

/// 미리보기 최대 너비
pub const PREVIEW_MAX_WIDTH: u32 = 1920;

/// 미리보기 최대 높이
pub const PREVIEW_MAX_HEIGHT: u32 = 1080;

/// 처리 결과
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// 인코딩된 바이트
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// 이미지 처리기: 상태 없음, 스레드 간 공유 가능
#[derive(Debug, Clone, Copy)]
pub struct ImageProcessor {
    max_width: u32,
    max_height: u32,
}

impl ImageProcessor {
    /// 기본 미리보기 경계(1920x1080)로 생성
    pub fn new() -> Self {
        Self::with_bounds(PREVIEW_MAX_WIDTH, PREVIEW_MAX_HEIGHT)
    }

    /// 경계 지정 생성
    pub fn with_bounds(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
        }
    }

    /// 원본 바이트 디코딩
    pub fn decode(&self, raw: &[u8]) -> Result<DynamicImage, CoreError> {
        if raw.is_empty() {
            return Err(CoreError::UnsupportedImage("빈 이미지 버퍼".to_string()));
        }
        image::load_from_memory(raw)
            .map_err(|e| CoreError::UnsupportedImage(format!("이미지 디코딩 실패: {e}")))
    }

    /// 디코딩된 이미지를 경계 안으로 축소 후 인코딩
    pub fn render(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: u8,
    ) -> Result<ProcessedImage, CoreError> {
        let preview = thumbnail::resize_to_fit(image, self.max_width, self.max_height)?;
        let bytes = encoder::encode(&preview, format, quality)?;
        Ok(ProcessedImage {
            bytes,
            width: preview.width(),
            height: preview.height(),
            format,
        })
    }

    /// 원본 바이트 처리 (decode + render)
    pub fn process(
        &self,
        raw: &[u8],
        format: ImageFormat,
        quality: u8,
    ) -> Result<ProcessedImage, CoreError> {
        let image = self.decode(raw)?;
        let processed = self.render(&image, format, quality)?;
        debug!(
            "프레임 처리: {}x{} → {}x{} {format} ({} bytes)",
            image.width(),
            image.height(),
            processed.width,
            processed.height,
            processed.bytes.len()
        );
        Ok(processed)
    }

    /// 포맷 변환 (크기 유지)
    pub fn transcode(
        &self,
        bytes: &[u8],
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>, CoreError> {
        let image = self.decode(bytes)?;
        encoder::encode(&image, format, quality)
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

//! 비전(화면 캡처) 포트.
//!
//! 구현: `scenecap-vision` crate (xcap, core-graphics)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::surface::DisplaySurface;

/// OS 화면 캡처 primitive
#[async_trait]
pub trait ScreenSource: Send + Sync {
    /// 현재 캡처 가능한 서피스 목록 (호출할 때마다 새로 열거)
    async fn list_surfaces(&self) -> Result<Vec<DisplaySurface>, CoreError>;

    /// 서피스 캡처 → 원본 이미지 바이트 (PNG 등 디코딩 가능한 포맷)
    ///
    /// 서피스가 사라졌으면 `CaptureUnavailable { reason: SurfaceMissing }`.
    async fn capture(&self, surface_id: &str) -> Result<Vec<u8>, CoreError>;
}

/// 화면 기록 권한 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Unknown,
}

impl PermissionStatus {
    /// 캡처 시도 가능 여부 (`Unknown`도 거부로 취급)
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// 플랫폼별 화면 기록 권한 조회
pub trait PermissionProbe: Send + Sync {
    /// 현재 권한 상태
    fn status(&self) -> PermissionStatus;
}

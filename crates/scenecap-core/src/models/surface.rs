//! 디스플레이 서피스 모델.
//!
//! 캡처 가능한 모니터/창. 조회할 때마다 새로 열거되며 저장하지 않는다.

use serde::{Deserialize, Serialize};

/// 모니터 서피스 ID 접두사
pub const SCREEN_PREFIX: &str = "screen:";

/// 창 서피스 ID 접두사
pub const WINDOW_PREFIX: &str = "window:";

/// 서피스 영역 (전역 좌표)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// 캡처 가능한 디스플레이 서피스
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySurface {
    /// 안정적인 식별자 (`screen:<id>` / `window:<id>`)
    pub id: String,
    /// 표시 이름 (모니터 이름 또는 창 제목)
    pub name: String,
    /// 영역
    pub bounds: SurfaceBounds,
    /// 주 모니터 여부
    pub is_primary: bool,
}

/// 서피스 주소: OS 캡처 primitive가 요구하는 형태로 해석된 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAddress {
    /// 모니터 (xcap monitor id)
    Screen(u32),
    /// 창 (xcap window id)
    Window(u32),
}

impl SurfaceAddress {
    /// `screen:<n>` / `window:<n>` 파싱
    pub fn parse(surface_id: &str) -> Option<Self> {
        if let Some(rest) = surface_id.strip_prefix(SCREEN_PREFIX) {
            return rest.parse().ok().map(Self::Screen);
        }
        if let Some(rest) = surface_id.strip_prefix(WINDOW_PREFIX) {
            return rest.parse().ok().map(Self::Window);
        }
        None
    }

    /// 서피스 ID 문자열로 변환
    pub fn to_id(self) -> String {
        match self {
            Self::Screen(n) => format!("{SCREEN_PREFIX}{n}"),
            Self::Window(n) => format!("{WINDOW_PREFIX}{n}"),
        }
    }
}

/// 서피스 목록에서 주 서피스 선택 (주 모니터 없으면 첫 번째)
pub fn primary_surface(surfaces: &[DisplaySurface]) -> Option<&DisplaySurface> {
    surfaces
        .iter()
        .find(|s| s.is_primary)
        .or_else(|| surfaces.first())
}

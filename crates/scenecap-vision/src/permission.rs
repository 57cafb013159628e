//! 화면 기록 권한 조회.
//!
//! macOS는 CoreGraphics `ScreenCaptureAccess` preflight로 확인하고,
//! 별도 권한 모델이 없는 플랫폼은 항상 허용으로 본다.

use scenecap_core::ports::vision::{PermissionProbe, PermissionStatus};

/// 현재 플랫폼의 권한 조회기
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPermissionProbe;

impl SystemPermissionProbe {
    pub fn new() -> Self {
        Self
    }
}

impl PermissionProbe for SystemPermissionProbe {
    fn status(&self) -> PermissionStatus {
        platform_status()
    }
}

#[cfg(target_os = "macos")]
fn platform_status() -> PermissionStatus {
    use core_graphics::access::ScreenCaptureAccess;

    // preflight는 프롬프트를 띄우지 않는다
    if ScreenCaptureAccess::default().preflight() {
        PermissionStatus::Granted
    } else {
        tracing::debug!("화면 기록 권한 없음 (ScreenCaptureAccess preflight)");
        PermissionStatus::Denied
    }
}

#[cfg(not(target_os = "macos"))]
fn platform_status() -> PermissionStatus {
    PermissionStatus::Granted
}

/// 고정 상태를 반환하는 조회기 (테스트/헤드리스 실행용)
#[derive(Debug, Clone, Copy)]
pub struct FixedPermission(pub PermissionStatus);

impl PermissionProbe for FixedPermission {
    fn status(&self) -> PermissionStatus {
        self.0
    }
}

//! 스크린 캡처.
//!
//! - [`ScreenCapture`]: xcap 기반 `ScreenSource` 어댑터 (모니터 + 창)
//! - [`FrameCapturer`]: 권한 확인 → 서피스 해석 → OS 캡처

use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use scenecap_core::error::{CoreError, UnavailableReason};
use scenecap_core::models::frame::ImageFormat;
use scenecap_core::models::surface::{DisplaySurface, SurfaceAddress, SurfaceBounds};
use scenecap_core::ports::vision::{PermissionProbe, ScreenSource};
use std::sync::Arc;
use tracing::debug;
use xcap::{Monitor, Window};

use crate::encoder;

/// 스크린 캡처: xcap 기반
pub struct ScreenCapture {
    /// 창 서피스 포함 여부
    include_windows: bool,
}

impl ScreenCapture {
    /// 새 캡처 인스턴스 생성 (모니터 + 창)
    pub fn new() -> Self {
        Self {
            include_windows: true,
        }
    }

    /// 모니터만 열거
    pub fn monitors_only() -> Self {
        Self {
            include_windows: false,
        }
    }
}

impl Default for ScreenCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScreenSource for ScreenCapture {
    async fn list_surfaces(&self) -> Result<Vec<DisplaySurface>, CoreError> {
        let include_windows = self.include_windows;
        tokio::task::spawn_blocking(move || enumerate_surfaces(include_windows))
            .await
            .map_err(|e| CoreError::Internal(format!("서피스 열거 태스크 실패: {e}")))?
    }

    async fn capture(&self, surface_id: &str) -> Result<Vec<u8>, CoreError> {
        let address = SurfaceAddress::parse(surface_id)
            .ok_or_else(|| surface_missing(surface_id, "잘못된 서피스 ID"))?;
        let id = surface_id.to_string();

        tokio::task::spawn_blocking(move || {
            let image = match address {
                SurfaceAddress::Screen(n) => capture_monitor(&id, n)?,
                SurfaceAddress::Window(n) => capture_window(&id, n)?,
            };
            debug!("스크린 캡처 완료: {id} {}x{}", image.width(), image.height());
            encoder::encode(&DynamicImage::ImageRgba8(image), ImageFormat::Png, 100)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("캡처 태스크 실패: {e}")))?
    }
}

fn enumerate_surfaces(include_windows: bool) -> Result<Vec<DisplaySurface>, CoreError> {
    let monitors = Monitor::all().map_err(|e| backend_error("*", format!("모니터 목록 조회 실패: {e}")))?;

    let mut surfaces = Vec::with_capacity(monitors.len());
    for monitor in &monitors {
        let Ok(id) = monitor.id() else { continue };
        surfaces.push(DisplaySurface {
            id: SurfaceAddress::Screen(id).to_id(),
            name: monitor.name().unwrap_or_else(|_| format!("Monitor {id}")),
            bounds: SurfaceBounds {
                x: monitor.x().unwrap_or(0),
                y: monitor.y().unwrap_or(0),
                width: monitor.width().unwrap_or(0),
                height: monitor.height().unwrap_or(0),
            },
            is_primary: monitor.is_primary().unwrap_or(false),
        });
    }

    if include_windows {
        // 창 목록 실패는 모니터 목록을 막지 않는다
        match Window::all() {
            Ok(windows) => {
                for window in &windows {
                    if window.is_minimized().unwrap_or(false) {
                        continue;
                    }
                    let (Ok(id), Ok(width), Ok(height)) =
                        (window.id(), window.width(), window.height())
                    else {
                        continue;
                    };
                    if width == 0 || height == 0 {
                        continue;
                    }
                    surfaces.push(DisplaySurface {
                        id: SurfaceAddress::Window(id).to_id(),
                        name: window.title().unwrap_or_default(),
                        bounds: SurfaceBounds {
                            x: window.x().unwrap_or(0),
                            y: window.y().unwrap_or(0),
                            width,
                            height,
                        },
                        is_primary: false,
                    });
                }
            }
            Err(e) => debug!("창 목록 조회 실패 (무시): {e}"),
        }
    }

    debug!("서피스 {}개 열거", surfaces.len());
    Ok(surfaces)
}

fn capture_monitor(surface_id: &str, id: u32) -> Result<RgbaImage, CoreError> {
    let monitors =
        Monitor::all().map_err(|e| backend_error(surface_id, format!("모니터 목록 조회 실패: {e}")))?;
    let monitor = monitors
        .into_iter()
        .find(|m| m.id().ok() == Some(id))
        .ok_or_else(|| surface_missing(surface_id, "모니터를 찾을 수 없음"))?;
    monitor
        .capture_image()
        .map_err(|e| backend_error(surface_id, format!("스크린 캡처 실패: {e}")))
}

fn capture_window(surface_id: &str, id: u32) -> Result<RgbaImage, CoreError> {
    let windows =
        Window::all().map_err(|e| backend_error(surface_id, format!("창 목록 조회 실패: {e}")))?;
    let window = windows
        .into_iter()
        .find(|w| w.id().ok() == Some(id))
        .ok_or_else(|| surface_missing(surface_id, "창을 찾을 수 없음"))?;
    window
        .capture_image()
        .map_err(|e| backend_error(surface_id, format!("창 캡처 실패: {e}")))
}

fn surface_missing(surface_id: &str, message: &str) -> CoreError {
    CoreError::CaptureUnavailable {
        surface_id: surface_id.to_string(),
        reason: UnavailableReason::SurfaceMissing,
        message: message.to_string(),
    }
}

fn backend_error(surface_id: &str, message: String) -> CoreError {
    CoreError::CaptureUnavailable {
        surface_id: surface_id.to_string(),
        reason: UnavailableReason::Backend,
        message,
    }
}

/// 프레임 캡처기: 권한 확인 후 서피스를 해석해 캡처
///
/// 재시도하지 않는다. 실패는 호출자(스케줄러/온디맨드)가 보고한다.
#[derive(Clone)]
pub struct FrameCapturer {
    source: Arc<dyn ScreenSource>,
    permission: Arc<dyn PermissionProbe>,
}

impl FrameCapturer {
    pub fn new(source: Arc<dyn ScreenSource>, permission: Arc<dyn PermissionProbe>) -> Self {
        Self { source, permission }
    }

    /// 권한 확인 (`Denied`/`Unknown` → `CaptureUnavailable`)
    pub fn ensure_permission(&self, surface_id: &str) -> Result<(), CoreError> {
        let status = self.permission.status();
        if status.is_granted() {
            return Ok(());
        }
        Err(CoreError::CaptureUnavailable {
            surface_id: surface_id.to_string(),
            reason: UnavailableReason::PermissionDenied,
            message: format!("화면 기록 권한 필요 (상태: {status:?})"),
        })
    }

    /// 서피스 목록 (매 호출 새로 열거)
    pub async fn list_surfaces(&self) -> Result<Vec<DisplaySurface>, CoreError> {
        self.source.list_surfaces().await
    }

    /// 서피스 캡처 → 원본 바이트
    pub async fn capture(&self, surface_id: &str) -> Result<Vec<u8>, CoreError> {
        self.ensure_permission(surface_id)?;

        let surfaces = self.source.list_surfaces().await?;
        if !surfaces.iter().any(|s| s.id == surface_id) {
            return Err(surface_missing(surface_id, "서피스가 더 이상 존재하지 않음"));
        }

        self.source.capture(surface_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::FixedPermission;
    use scenecap_core::ports::vision::PermissionStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        captures: AtomicUsize,
    }

    #[async_trait]
    impl ScreenSource for CountingSource {
        async fn list_surfaces(&self) -> Result<Vec<DisplaySurface>, CoreError> {
            Ok(vec![DisplaySurface {
                id: "screen:1".to_string(),
                name: "Main".to_string(),
                bounds: SurfaceBounds {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 4,
                },
                is_primary: true,
            }])
        }

        async fn capture(&self, _surface_id: &str) -> Result<Vec<u8>, CoreError> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        }
    }

    fn capturer(status: PermissionStatus) -> (FrameCapturer, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            captures: AtomicUsize::new(0),
        });
        let capturer = FrameCapturer::new(source.clone(), Arc::new(FixedPermission(status)));
        (capturer, source)
    }

    #[tokio::test]
    async fn denied_permission_skips_os_call() {
        let (capturer, source) = capturer(PermissionStatus::Denied);
        let err = capturer.capture("screen:1").await.unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(source.captures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_permission_treated_as_denied() {
        let (capturer, source) = capturer(PermissionStatus::Unknown);
        assert!(capturer.capture("screen:1").await.unwrap_err().is_permission_denied());
        assert_eq!(source.captures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_surface_reported() {
        let (capturer, source) = capturer(PermissionStatus::Granted);
        let err = capturer.capture("screen:99").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::CaptureUnavailable {
                reason: UnavailableReason::SurfaceMissing,
                ..
            }
        ));
        assert_eq!(source.captures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn granted_capture_returns_bytes() {
        let (capturer, source) = capturer(PermissionStatus::Granted);
        assert_eq!(capturer.capture("screen:1").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(source.captures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn monitors_only_excludes_windows() {
        assert!(ScreenCapture::new().include_windows);
        assert!(!ScreenCapture::monitors_only().include_windows);
    }
}

//! 애플리케이션 설정 구조체.
//!
//! 캡처 주기/포맷/변경 감지, 저장소 경로/용량/보존 기간, 온디맨드 캡처,
//! 유지보수 주기를 정의한다. `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::models::frame::ImageFormat;

/// 캡처 주기 하한 (밀리초): 폭주 캡처 방지
pub const MIN_CAPTURE_INTERVAL_MS: u64 = 1_000;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 주기 캡처 설정
    #[serde(default)]
    pub capture: CaptureConfig,
    /// 프레임 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 온디맨드(핫키/수동) 캡처 설정
    #[serde(default)]
    pub on_demand: OnDemandConfig,
    /// 유지보수 루프 설정
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

// ============================================================
// 캡처 설정
// ============================================================

/// 주기 캡처 설정: 스케줄러가 소유
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// 캡처 주기 (밀리초, 하한 `MIN_CAPTURE_INTERVAL_MS`)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// 출력 이미지 포맷
    #[serde(default)]
    pub output_format: ImageFormat,
    /// 출력 품질 (1-100)
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// 캡처 대상 서피스 ID (비어 있으면 주 모니터)
    #[serde(default)]
    pub active_surface_ids: BTreeSet<String>,
    /// 장면 변경 감지 활성화
    #[serde(default = "default_true")]
    pub change_detection_enabled: bool,
    /// 장면 변경 판정 임계값 (0.0 ~ 1.0, 변경 픽셀 비율)
    #[serde(default = "default_change_threshold")]
    pub change_threshold: f32,
    /// 한 사이클 내 동시 캡처 서피스 수
    #[serde(default = "default_max_concurrent_captures")]
    pub max_concurrent_captures: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            output_format: ImageFormat::default(),
            quality: default_quality(),
            active_surface_ids: BTreeSet::new(),
            change_detection_enabled: true,
            change_threshold: default_change_threshold(),
            max_concurrent_captures: default_max_concurrent_captures(),
        }
    }
}

/// 캡처 설정 부분 업데이트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureConfigPatch {
    pub interval_ms: Option<u64>,
    pub output_format: Option<ImageFormat>,
    pub quality: Option<u8>,
    pub active_surface_ids: Option<BTreeSet<String>>,
    pub change_detection_enabled: Option<bool>,
    pub change_threshold: Option<f32>,
    pub max_concurrent_captures: Option<usize>,
}

/// 병합 결과: 타이머 재시작이 필요한 변경인지 판단용
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureConfigChange {
    /// 캡처 주기 변경됨
    pub interval_changed: bool,
    /// 활성 서피스 집합 변경됨
    pub surfaces_changed: bool,
}

impl CaptureConfigChange {
    /// 실행 중인 타이머를 다시 무장해야 하는지
    pub fn requires_restart(&self) -> bool {
        self.interval_changed || self.surfaces_changed
    }
}

impl CaptureConfig {
    /// 범위를 벗어난 값을 보정한 설정 반환
    pub fn normalized(mut self) -> Self {
        if self.interval_ms < MIN_CAPTURE_INTERVAL_MS {
            warn!(
                "캡처 주기 {}ms → 하한 {}ms로 보정",
                self.interval_ms, MIN_CAPTURE_INTERVAL_MS
            );
            self.interval_ms = MIN_CAPTURE_INTERVAL_MS;
        }
        if !(1..=100).contains(&self.quality) {
            warn!("품질 {} → 1-100 범위로 보정", self.quality);
            self.quality = self.quality.clamp(1, 100);
        }
        if !(0.0..=1.0).contains(&self.change_threshold) || self.change_threshold.is_nan() {
            warn!("변경 임계값 {} → 0.0-1.0 범위로 보정", self.change_threshold);
            self.change_threshold = if self.change_threshold.is_nan() {
                default_change_threshold()
            } else {
                self.change_threshold.clamp(0.0, 1.0)
            };
        }
        if self.max_concurrent_captures == 0 {
            self.max_concurrent_captures = 1;
        }
        self
    }

    /// 부분 업데이트 병합 (보정 포함)
    pub fn merge(&mut self, patch: CaptureConfigPatch) -> CaptureConfigChange {
        let before_interval = self.interval_ms;
        let before_surfaces = self.active_surface_ids.clone();

        let mut next = self.clone();
        if let Some(v) = patch.interval_ms {
            next.interval_ms = v;
        }
        if let Some(v) = patch.output_format {
            next.output_format = v;
        }
        if let Some(v) = patch.quality {
            next.quality = v;
        }
        if let Some(v) = patch.active_surface_ids {
            next.active_surface_ids = v;
        }
        if let Some(v) = patch.change_detection_enabled {
            next.change_detection_enabled = v;
        }
        if let Some(v) = patch.change_threshold {
            next.change_threshold = v;
        }
        if let Some(v) = patch.max_concurrent_captures {
            next.max_concurrent_captures = v;
        }
        *self = next.normalized();

        CaptureConfigChange {
            interval_changed: self.interval_ms != before_interval,
            surfaces_changed: self.active_surface_ids != before_surfaces,
        }
    }

    /// 캡처 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_CAPTURE_INTERVAL_MS))
    }
}

// ============================================================
// 저장소 설정
// ============================================================

/// 저장 파일 정리 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Organization {
    /// 기본 디렉토리에 모두 저장
    Flat,
    /// `YYYY-MM-DD/` 일자 폴더
    #[default]
    ByDate,
    /// 컨텍스트 태그 이름(게임/앱)별 폴더
    ByGame,
}

/// 프레임 저장소 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 기본 저장 디렉토리
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    /// 저장 이미지 포맷
    #[serde(default)]
    pub format: ImageFormat,
    /// 저장 품질 (1-100)
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// 최대 누적 저장 용량 (bytes)
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,
    /// 보존 기간 (일)
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    /// 파일명 패턴 (`{date}`, `{time}`, `{surface}`, `{id}`, `{scene}`, `{timestamp}`)
    #[serde(default = "default_naming_pattern")]
    pub naming_pattern: String,
    /// 폴더 정리 방식
    #[serde(default)]
    pub organization: Organization,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            format: ImageFormat::default(),
            quality: default_quality(),
            max_total_bytes: default_max_total_bytes(),
            max_age_days: default_max_age_days(),
            naming_pattern: default_naming_pattern(),
            organization: Organization::default(),
        }
    }
}

/// 저장소 설정 부분 업데이트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfigPatch {
    pub base_path: Option<PathBuf>,
    pub format: Option<ImageFormat>,
    pub quality: Option<u8>,
    pub max_total_bytes: Option<u64>,
    pub max_age_days: Option<u32>,
    pub naming_pattern: Option<String>,
    pub organization: Option<Organization>,
}

impl StorageConfig {
    /// 부분 업데이트 병합. 기본 경로가 바뀌었으면 `true`.
    pub fn merge(&mut self, patch: StorageConfigPatch) -> bool {
        let before = self.base_path.clone();
        if let Some(v) = patch.base_path {
            self.base_path = v;
        }
        if let Some(v) = patch.format {
            self.format = v;
        }
        if let Some(v) = patch.quality {
            self.quality = v.clamp(1, 100);
        }
        if let Some(v) = patch.max_total_bytes {
            self.max_total_bytes = v;
        }
        if let Some(v) = patch.max_age_days {
            self.max_age_days = v;
        }
        if let Some(v) = patch.naming_pattern {
            if v.trim().is_empty() {
                warn!("빈 파일명 패턴 무시");
            } else {
                self.naming_pattern = v;
            }
        }
        if let Some(v) = patch.organization {
            self.organization = v;
        }
        self.base_path != before
    }
}

// ============================================================
// 온디맨드/유지보수 설정
// ============================================================

/// 온디맨드 캡처 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnDemandConfig {
    /// 핫키 모드 활성화 (비활성 시 핫키 트리거 무시)
    #[serde(default)]
    pub hotkey_enabled: bool,
    /// 중복 트리거 억제 창 (밀리초)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for OnDemandConfig {
    fn default() -> Self {
        Self {
            hotkey_enabled: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// 유지보수 루프 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// 보존 기간 정리 주기 (초)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 보존 정리 주기를 Duration으로 반환
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance.cleanup_interval_secs.max(60))
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}
fn default_interval_ms() -> u64 {
    5_000
}
fn default_quality() -> u8 {
    80
}
fn default_change_threshold() -> f32 {
    0.1
}
fn default_max_concurrent_captures() -> usize {
    2
}
fn default_max_total_bytes() -> u64 {
    1024 * 1024 * 1024 // 1GB
}
fn default_max_age_days() -> u32 {
    30
}
fn default_naming_pattern() -> String {
    "{date}_{time}_{surface}".to_string()
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_cleanup_interval_secs() -> u64 {
    3_600 // 1시간
}

/// 플랫폼별 데이터 디렉토리 아래 `captures`
fn default_base_path() -> PathBuf {
    directories::ProjectDirs::from("com", "scenecap", "scenecap")
        .map(|p| p.data_dir().join("captures"))
        .unwrap_or_else(|| PathBuf::from("./captures"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_clamped_to_minimum() {
        let mut config = CaptureConfig::default();
        let change = config.merge(CaptureConfigPatch {
            interval_ms: Some(10),
            ..Default::default()
        });
        assert_eq!(config.interval_ms, MIN_CAPTURE_INTERVAL_MS);
        assert!(change.interval_changed);
    }

    #[test]
    fn merge_reports_surface_change_only() {
        let mut config = CaptureConfig::default();
        let change = config.merge(CaptureConfigPatch {
            active_surface_ids: Some(BTreeSet::from(["screen:1".to_string()])),
            quality: Some(90),
            ..Default::default()
        });
        assert!(change.surfaces_changed);
        assert!(!change.interval_changed);
        assert!(change.requires_restart());
        assert_eq!(config.quality, 90);
    }

    #[test]
    fn merge_same_values_no_restart() {
        let mut config = CaptureConfig::default();
        let change = config.merge(CaptureConfigPatch {
            interval_ms: Some(config.interval_ms),
            change_threshold: Some(0.3),
            ..Default::default()
        });
        assert!(!change.requires_restart());
        assert!((config.change_threshold - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn threshold_and_quality_clamped() {
        let config = CaptureConfig {
            quality: 0,
            change_threshold: 1.5,
            max_concurrent_captures: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.quality, 1);
        assert_eq!(config.change_threshold, 1.0);
        assert_eq!(config.max_concurrent_captures, 1);
    }

    #[test]
    fn storage_merge_detects_base_path_change() {
        let mut config = StorageConfig::default();
        assert!(!config.merge(StorageConfigPatch {
            max_age_days: Some(7),
            ..Default::default()
        }));
        assert!(config.merge(StorageConfigPatch {
            base_path: Some(PathBuf::from("/tmp/elsewhere")),
            ..Default::default()
        }));
        assert_eq!(config.max_age_days, 7);
    }

    #[test]
    fn organization_serde_kebab_case() {
        let json = serde_json::to_string(&Organization::ByGame).unwrap();
        assert_eq!(json, "\"by-game\"");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: CaptureConfig = serde_json::from_str(r#"{"interval_ms": 2000}"#).unwrap();
        assert_eq!(config.interval_ms, 2000);
        assert!(config.change_detection_enabled);
        assert!(config.active_surface_ids.is_empty());
    }
}

//! 설정 파일 관리.
//!
//! 플랫폼별 설정 디렉토리의 JSON 파일에 섹션 키(`capture`, `storage`, ...)별로
//! 설정을 저장/로드한다. [`ConfigStore`] 포트 구현.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::CoreError;
use crate::ports::config_store::ConfigStore;

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 섹션 키
pub const CAPTURE_KEY: &str = "capture";
pub const STORAGE_KEY: &str = "storage";
pub const ON_DEMAND_KEY: &str = "on_demand";
pub const MAINTENANCE_KEY: &str = "maintenance";

/// 설정 관리자
///
/// 설정 파일의 로드/저장 및 런타임 설정 변경을 관리한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 섹션 키 → JSON 값 (스레드 안전)
    sections: Arc<RwLock<Map<String, Value>>>,
    /// 설정 파일 경로
    config_path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 기본 경로로 설정 관리자 생성
    pub fn new() -> Result<Self, CoreError> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE_NAME);
        Self::with_path(config_path)
    }

    /// 지정된 경로로 설정 관리자 생성
    ///
    /// 설정 파일이 없으면 기본 설정을 생성하고 저장한다.
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "설정 디렉토리 생성 실패: {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
                info!("설정 디렉토리 생성: {}", parent.display());
            }
        }

        let sections = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let defaults = match serde_json::to_value(AppConfig::default_config())? {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            Self::save_to_file(&config_path, &defaults)?;
            info!("기본 설정 파일 생성: {}", config_path.display());
            defaults
        };

        Ok(Self {
            sections: Arc::new(RwLock::new(sections)),
            config_path,
        })
    }

    /// 전체 설정 조립 (섹션이 없거나 깨졌으면 기본값)
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            capture: self.section_or_default(CAPTURE_KEY),
            storage: self.section_or_default(STORAGE_KEY),
            on_demand: self.section_or_default(ON_DEMAND_KEY),
            maintenance: self.section_or_default(MAINTENANCE_KEY),
        }
    }

    /// 타입 지정 섹션 로드
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        match self.load(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// 타입 지정 섹션 저장
    pub fn save_section<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CoreError> {
        self.save(key, serde_json::to_value(value)?)
    }

    fn section_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.section(key) {
            Ok(Some(v)) => v,
            Ok(None) => T::default(),
            Err(e) => {
                warn!("설정 섹션 '{key}' 파싱 실패, 기본값 사용: {e}");
                T::default()
            }
        }
    }

    /// 설정 파일 경로 반환
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 설정 다시 로드
    pub fn reload(&self) -> Result<(), CoreError> {
        let sections = Self::load_from_file(&self.config_path)?;
        *self.sections.write() = sections;
        info!("설정 다시 로드 완료");
        Ok(())
    }

    /// 플랫폼별 설정 디렉토리 경로
    ///
    /// - macOS: `~/Library/Application Support/com.scenecap.scenecap/`
    /// - Windows: `%APPDATA%\scenecap\scenecap\config\`
    /// - Linux: `~/.config/scenecap/`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        directories::ProjectDirs::from("com", "scenecap", "scenecap")
            .map(|p| p.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }

    /// 파일에서 섹션 맵 로드
    fn load_from_file(path: &Path) -> Result<Map<String, Value>, CoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("설정 파일 읽기 실패: {}: {}", path.display(), e))
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            CoreError::Config(format!("설정 파일 파싱 실패: {}: {}", path.display(), e))
        })?;

        match value {
            Value::Object(map) => {
                debug!("설정 파일 로드 완료: {}", path.display());
                Ok(map)
            }
            _ => Err(CoreError::Config(format!(
                "설정 파일 최상위가 객체가 아님: {}",
                path.display()
            ))),
        }
    }

    /// 파일에 섹션 맵 저장
    fn save_to_file(path: &Path, sections: &Map<String, Value>) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(sections)
            .map_err(|e| CoreError::Config(format!("설정 직렬화 실패: {}", e)))?;

        fs::write(path, content).map_err(|e| {
            CoreError::Config(format!("설정 파일 저장 실패: {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

impl ConfigStore for ConfigManager {
    fn load(&self, key: &str) -> Result<Option<Value>, CoreError> {
        Ok(self.sections.read().get(key).cloned())
    }

    fn save(&self, key: &str, value: Value) -> Result<(), CoreError> {
        let mut sections = self.sections.write();
        sections.insert(key.to_string(), value);
        Self::save_to_file(&self.config_path, &sections)?;
        debug!("설정 저장 완료: {} ({key})", self.config_path.display());
        Ok(())
    }
}

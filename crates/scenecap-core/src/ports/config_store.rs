//! 설정 영속화 포트.
//!
//! 구현: `ConfigManager` (JSON 파일). 코어는 블랙박스 키/값 저장소로 취급한다.

use serde_json::Value;

use crate::error::CoreError;

/// 키/값 설정 저장소
pub trait ConfigStore: Send + Sync {
    /// 키에 해당하는 설정 로드 (없으면 `None`)
    fn load(&self, key: &str) -> Result<Option<Value>, CoreError>;

    /// 키에 설정 저장 (즉시 영속화)
    fn save(&self, key: &str, value: Value) -> Result<(), CoreError>;
}

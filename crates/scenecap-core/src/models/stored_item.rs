//! 저장 항목 모델.
//!
//! 저장소 인덱스(`index.json`)에 기록되는 항목과 통계.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::frame::{ContextTags, FrameMetadata};

/// 저장된 프레임 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    /// 항목 ID
    pub id: Uuid,
    /// 이미지 파일 절대 경로
    pub file_path: PathBuf,
    /// 캡처 메타데이터
    pub metadata: FrameMetadata,
    /// 파일 크기 (bytes)
    pub size_bytes: u64,
    /// 저장 시각
    pub created_at: DateTime<Utc>,
    /// 컨텍스트 태그
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_tags: Option<ContextTags>,
}

/// 저장소 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    /// 항목 수
    pub item_count: usize,
    /// 누적 용량 (bytes)
    pub total_bytes: u64,
    /// 가장 오래된 항목 시각
    pub oldest: Option<DateTime<Utc>>,
    /// 가장 최근 항목 시각
    pub newest: Option<DateTime<Utc>>,
}

//! 프레임 저장소 포트.
//!
//! 구현: `scenecap-storage` crate (파일 시스템 + JSON 인덱스)

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::frame::{CapturedFrame, ContextTags};
use crate::models::stored_item::{StorageStats, StoredItem};

/// 수락된 프레임의 영속 저장소
#[async_trait]
pub trait FrameStore: Send + Sync {
    /// 프레임 저장 후 용량 제한 적용
    async fn save(
        &self,
        frame: &CapturedFrame,
        context_tags: Option<ContextTags>,
    ) -> Result<StoredItem, CoreError>;

    /// 항목 삭제 (없는 ID는 무시)
    async fn delete(&self, id: Uuid) -> Result<(), CoreError>;

    /// 보존 기간 초과 항목 삭제, 삭제 수 반환
    async fn cleanup(&self) -> Result<usize, CoreError>;

    /// 저장소 통계
    async fn stats(&self) -> Result<StorageStats, CoreError>;
}

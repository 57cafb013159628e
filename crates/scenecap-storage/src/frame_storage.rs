//! 프레임 이미지 파일 저장소.
//!
//! 수락된 프레임을 로컬 파일 시스템에 저장/조회/관리.
//! 파일명 패턴과 폴더 정리 방식(flat/by-date/by-game), 용량 한도(오래된 순 삭제),
//! 보존 기간, 기본 경로 이전을 담당한다.
//!
//! 구조: `<base_path>/index.json` + `<base_path>/<정리 폴더>/<파일명>.<ext>`

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use scenecap_core::config::{StorageConfig, StorageConfigPatch};
use scenecap_core::error::CoreError;
use scenecap_core::models::frame::{CapturedFrame, ContextTags};
use scenecap_core::models::stored_item::{StorageStats, StoredItem};
use scenecap_core::ports::storage::FrameStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::index::{self, ItemIndex};
use crate::naming::{self, NamingContext};

struct State {
    config: StorageConfig,
    /// `None`이면 아직 `initialize` 전
    index: Option<ItemIndex>,
}

impl State {
    fn index_mut(&mut self) -> Result<&mut ItemIndex, CoreError> {
        self.index.as_mut().ok_or_else(not_initialized)
    }

    fn index(&self) -> Result<&ItemIndex, CoreError> {
        self.index.as_ref().ok_or_else(not_initialized)
    }
}

fn not_initialized() -> CoreError {
    CoreError::NotInitialized("프레임 저장소".to_string())
}

/// 프레임 이미지 파일 저장소
///
/// 인덱스는 단일 `tokio::sync::Mutex` 아래에서만 변경되고,
/// 변경할 때마다 `index.json`에 기록된다.
pub struct FrameStorage {
    state: Mutex<State>,
}

impl FrameStorage {
    /// 새 저장소 생성 (`initialize` 전까지 저장 불가)
    pub fn new(config: StorageConfig) -> Self {
        Self {
            state: Mutex::new(State {
                config,
                index: None,
            }),
        }
    }

    /// 기본 디렉토리 생성, 인덱스 로드, 보존 정책 1회 적용
    pub async fn initialize(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let base = state.config.base_path.clone();

        fs::create_dir_all(&base)
            .await
            .map_err(|e| CoreError::storage_io(&base, e))?;

        let loaded = index::load(&base).await?;
        info!(
            "프레임 저장소 초기화: {} ({}개 항목, 최대 {}bytes, {}일 보존)",
            base.display(),
            loaded.len(),
            state.config.max_total_bytes,
            state.config.max_age_days
        );
        state.index = Some(loaded);

        let expired = cleanup_locked(&mut state, Utc::now()).await?;
        let evicted = enforce_limits_locked(&mut state).await?;
        if expired + evicted > 0 {
            persist_locked(&state).await?;
        }
        Ok(())
    }

    /// 초기화 여부
    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.index.is_some()
    }

    /// 현재 설정 복사본
    pub async fn config(&self) -> StorageConfig {
        self.state.lock().await.config.clone()
    }

    /// 프레임 저장 후 용량 한도 적용
    ///
    /// 한도를 넘는 단일 항목은 방금 저장한 것이라도 삭제된다.
    /// 반환값은 저장 시점의 항목이다.
    pub async fn save(
        &self,
        frame: &CapturedFrame,
        context_tags: Option<ContextTags>,
    ) -> Result<StoredItem, CoreError> {
        let config = {
            let state = self.state.lock().await;
            state.index()?;
            state.config.clone()
        };

        let id = Uuid::new_v4();
        let file_path = target_path(&config, id, frame, context_tags.as_ref());

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::storage_io(parent, e))?;
        }
        fs::write(&file_path, &frame.buffer)
            .await
            .map_err(|e| CoreError::storage_io(&file_path, e))?;
        let size_bytes = fs::metadata(&file_path)
            .await
            .map_err(|e| CoreError::storage_io(&file_path, e))?
            .len();

        let item = StoredItem {
            id,
            file_path,
            metadata: frame.metadata.clone(),
            size_bytes,
            created_at: Utc::now(),
            context_tags,
        };

        let mut state = self.state.lock().await;
        state.index_mut()?.insert(id, item.clone());
        if let Err(e) = persist_locked(&state).await {
            // 인덱스에 없는 파일은 허용되므로 항목만 되돌린다
            state.index_mut()?.remove(&id);
            return Err(e);
        }

        debug!(
            "프레임 저장: {} ({}bytes)",
            item.file_path.display(),
            item.size_bytes
        );

        if enforce_limits_locked(&mut state).await? > 0 {
            persist_locked(&state).await?;
        }

        Ok(item)
    }

    /// 항목 삭제 (없는 ID는 조용히 무시)
    pub async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let Some(item) = state.index()?.get(&id).cloned() else {
            debug!("삭제 대상 없음: {id}");
            return Ok(());
        };

        remove_file_if_exists(&item.file_path).await?;
        state.index_mut()?.remove(&id);
        persist_locked(&state).await?;
        debug!("항목 삭제: {id}");
        Ok(())
    }

    /// 용량 한도 적용, 삭제 수 반환
    pub async fn enforce_limits(&self) -> Result<usize, CoreError> {
        let mut state = self.state.lock().await;
        let evicted = enforce_limits_locked(&mut state).await?;
        if evicted > 0 {
            persist_locked(&state).await?;
        }
        Ok(evicted)
    }

    /// 보존 기간 초과 항목 삭제, 삭제 수 반환
    pub async fn cleanup(&self) -> Result<usize, CoreError> {
        self.cleanup_at(Utc::now()).await
    }

    /// 기준 시각으로 보존 정책 적용
    pub async fn cleanup_at(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let mut state = self.state.lock().await;
        let removed = cleanup_locked(&mut state, now).await?;
        if removed > 0 {
            persist_locked(&state).await?;
        }
        Ok(removed)
    }

    /// 설정 부분 업데이트
    ///
    /// 기본 경로가 바뀌면 파일을 새 경로로 옮기고 인덱스를 새 경로에 기록한다.
    /// 개별 파일 이전 실패는 경고 후 기존 경로를 유지한다.
    pub async fn update_config(&self, patch: StorageConfigPatch) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let old_base = state.config.base_path.clone();
        let mut next = state.config.clone();
        let base_changed = next.merge(patch);

        if base_changed && state.index.is_some() {
            let new_base = next.base_path.clone();
            fs::create_dir_all(&new_base)
                .await
                .map_err(|e| CoreError::storage_io(&new_base, e))?;

            let moved = migrate_files(state.index_mut()?, &old_base, &new_base).await;
            state.config = next;
            persist_locked(&state).await?;

            if let Err(e) = index::remove(&old_base).await {
                warn!("이전 인덱스 삭제 실패 (무시): {e}");
            }
            info!(
                "저장소 경로 이전: {} → {} ({}개 파일 이동)",
                old_base.display(),
                new_base.display(),
                moved
            );
        } else {
            state.config = next;
        }

        if state.index.is_some() && enforce_limits_locked(&mut state).await? > 0 {
            persist_locked(&state).await?;
        }
        Ok(())
    }

    /// 전체 항목 (최신 순)
    pub async fn list(&self) -> Result<Vec<StoredItem>, CoreError> {
        let state = self.state.lock().await;
        let mut items: Vec<StoredItem> = state.index()?.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    /// 단일 항목
    pub async fn get(&self, id: Uuid) -> Result<Option<StoredItem>, CoreError> {
        let state = self.state.lock().await;
        Ok(state.index()?.get(&id).cloned())
    }

    /// 저장된 이미지 바이트
    pub async fn read_image(&self, id: Uuid) -> Result<Vec<u8>, CoreError> {
        let path = {
            let state = self.state.lock().await;
            state
                .index()?
                .get(&id)
                .map(|item| item.file_path.clone())
                .ok_or_else(|| CoreError::NotFound {
                    resource_type: "StoredItem".to_string(),
                    id: id.to_string(),
                })?
        };
        fs::read(&path)
            .await
            .map_err(|e| CoreError::storage_io(&path, e))
    }

    /// 저장소 통계
    pub async fn stats(&self) -> Result<StorageStats, CoreError> {
        let state = self.state.lock().await;
        let index = state.index()?;
        Ok(StorageStats {
            item_count: index.len(),
            total_bytes: total_bytes(index),
            oldest: index.values().map(|i| i.created_at).min(),
            newest: index.values().map(|i| i.created_at).max(),
        })
    }
}

#[async_trait]
impl FrameStore for FrameStorage {
    async fn save(
        &self,
        frame: &CapturedFrame,
        context_tags: Option<ContextTags>,
    ) -> Result<StoredItem, CoreError> {
        FrameStorage::save(self, frame, context_tags).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        FrameStorage::delete(self, id).await
    }

    async fn cleanup(&self) -> Result<usize, CoreError> {
        FrameStorage::cleanup(self).await
    }

    async fn stats(&self) -> Result<StorageStats, CoreError> {
        FrameStorage::stats(self).await
    }
}

/// 저장 경로 계산
fn target_path(
    config: &StorageConfig,
    id: Uuid,
    frame: &CapturedFrame,
    context_tags: Option<&ContextTags>,
) -> PathBuf {
    let dir = config.base_path.join(naming::organization_dir(
        config.organization,
        frame.metadata.timestamp,
        context_tags,
    ));
    let name = naming::file_name(
        &config.naming_pattern,
        &NamingContext {
            id,
            metadata: &frame.metadata,
            context_tags,
        },
    );
    dir.join(name)
}

fn total_bytes(index: &ItemIndex) -> u64 {
    index.values().map(|i| i.size_bytes).sum()
}

async fn persist_locked(state: &State) -> Result<(), CoreError> {
    index::persist(&state.config.base_path, state.index()?).await
}

/// 한도를 넘는 동안 가장 오래된 항목부터 삭제
///
/// 파일 삭제 실패는 경고만 남기고 항목은 인덱스에서 제거한다.
async fn enforce_limits_locked(state: &mut State) -> Result<usize, CoreError> {
    let max = state.config.max_total_bytes;
    if max == 0 {
        return Ok(0);
    }

    let index = state.index_mut()?;
    let mut total = total_bytes(index);
    if total <= max {
        return Ok(0);
    }

    let mut by_age: Vec<(DateTime<Utc>, Uuid)> =
        index.values().map(|i| (i.created_at, i.id)).collect();
    by_age.sort();

    let mut evicted = 0;
    for (_, id) in by_age {
        if total <= max {
            break;
        }
        let Some(item) = index.remove(&id) else {
            continue;
        };
        if let Err(e) = remove_file_if_exists(&item.file_path).await {
            warn!("용량 초과 항목 파일 삭제 실패 ({}): {e}", item.file_path.display());
        }
        total = total.saturating_sub(item.size_bytes);
        evicted += 1;
    }

    info!("용량 한도 적용: {evicted}개 항목 삭제 (현재 {total}/{max}bytes)");
    Ok(evicted)
}

/// 보존 기간 초과 항목 삭제
///
/// 파일 삭제에 실패한 항목은 다음 정리 때 다시 시도하도록 남겨 둔다.
async fn cleanup_locked(state: &mut State, now: DateTime<Utc>) -> Result<usize, CoreError> {
    let days = state.config.max_age_days;
    if days == 0 {
        return Ok(0);
    }
    // 표현 범위를 넘는 보존 기간은 만료 없음
    let Some(cutoff) = Duration::try_days(i64::from(days)).and_then(|d| now.checked_sub_signed(d))
    else {
        debug!("보존 기간 {days}일: 만료 기준 시각 없음, 정리 생략");
        return Ok(0);
    };

    let index = state.index_mut()?;
    let expired: Vec<(Uuid, PathBuf)> = index
        .values()
        .filter(|i| i.created_at < cutoff)
        .map(|i| (i.id, i.file_path.clone()))
        .collect();

    let mut removed = 0;
    for (id, path) in expired {
        match remove_file_if_exists(&path).await {
            Ok(()) => {
                index.remove(&id);
                removed += 1;
            }
            Err(e) => warn!("오래된 항목 삭제 실패 ({}): {e}", path.display()),
        }
    }

    if removed > 0 {
        info!("보존 정책: {removed}개 항목 삭제 (>{days}일)");
    }
    Ok(removed)
}

/// 모든 항목 파일을 새 기본 경로로 이동, 이동 수 반환
async fn migrate_files(index: &mut ItemIndex, old_base: &Path, new_base: &Path) -> usize {
    let mut moved = 0;
    for item in index.values_mut() {
        let relative = match item.file_path.strip_prefix(old_base) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => match item.file_path.file_name() {
                Some(name) => PathBuf::from(name),
                None => continue,
            },
        };
        let target = new_base.join(relative);

        match move_file(&item.file_path, &target).await {
            Ok(()) => {
                item.file_path = target;
                moved += 1;
            }
            Err(e) => warn!(
                "파일 이전 실패, 기존 경로 유지 ({}): {e}",
                item.file_path.display()
            ),
        }
    }
    moved
}

/// rename 우선, 실패 시 복사 후 삭제 (다른 볼륨)
async fn move_file(from: &Path, to: &Path) -> Result<(), CoreError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CoreError::storage_io(parent, e))?;
    }
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to)
        .await
        .map_err(|e| CoreError::storage_io(from, e))?;
    fs::remove_file(from)
        .await
        .map_err(|e| CoreError::storage_io(from, e))?;
    Ok(())
}

async fn remove_file_if_exists(path: &Path) -> Result<(), CoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CoreError::storage_io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenecap_core::config::Organization;
    use scenecap_core::models::frame::{FrameMetadata, ImageFormat};
    use tempfile::TempDir;

    fn config(base: &Path) -> StorageConfig {
        StorageConfig {
            base_path: base.to_path_buf(),
            ..StorageConfig::default()
        }
    }

    fn frame(size: usize) -> CapturedFrame {
        CapturedFrame {
            buffer: vec![7u8; size],
            metadata: FrameMetadata {
                surface_id: "screen:1".to_string(),
                timestamp: Utc::now(),
                width: 32,
                height: 32,
                format: ImageFormat::Jpeg,
                is_scene_change: true,
                change_score: Some(0.9),
                is_on_demand: false,
                triggered_at: None,
            },
        }
    }

    async fn create_test_storage(config: StorageConfig) -> FrameStorage {
        let storage = FrameStorage::new(config);
        storage.initialize().await.unwrap();
        storage
    }

    /// created_at 순서가 겹치지 않게 잠깐 대기
    async fn tick() {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    #[tokio::test]
    async fn save_before_initialize_fails() {
        let temp = TempDir::new().unwrap();
        let storage = FrameStorage::new(config(temp.path()));
        let result = storage.save(&frame(10), None).await;
        assert!(matches!(result, Err(CoreError::NotInitialized(_))));
        assert!(!storage.is_initialized().await);
    }

    #[tokio::test]
    async fn save_writes_file_and_index() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(config(temp.path())).await;

        let item = storage.save(&frame(100), None).await.unwrap();
        assert_eq!(item.size_bytes, 100);
        assert!(item.file_path.exists());
        assert!(item.file_path.starts_with(temp.path()));
        assert_eq!(item.file_path.extension().unwrap(), "jpg");
        assert!(temp.path().join("index.json").exists());

        let bytes = storage.read_image(item.id).await.unwrap();
        assert_eq!(bytes.len(), 100);
        assert_eq!(storage.get(item.id).await.unwrap(), Some(item));
    }

    #[tokio::test]
    async fn by_date_organization() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(config(temp.path())).await;
        let f = frame(10);
        let item = storage.save(&f, None).await.unwrap();
        let day = f.metadata.timestamp.format("%Y-%m-%d").to_string();
        assert_eq!(item.file_path.parent().unwrap(), temp.path().join(day));
    }

    #[tokio::test]
    async fn by_game_organization_uses_tag_name() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(StorageConfig {
            organization: Organization::ByGame,
            ..config(temp.path())
        })
        .await;
        let tags = ContextTags {
            name: Some("Celeste".to_string()),
            ..ContextTags::default()
        };
        let item = storage.save(&frame(10), Some(tags)).await.unwrap();
        assert_eq!(item.file_path.parent().unwrap(), temp.path().join("Celeste"));
        assert_eq!(item.context_tags.unwrap().name.as_deref(), Some("Celeste"));
    }

    #[tokio::test]
    async fn quota_evicts_oldest_first() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(StorageConfig {
            max_total_bytes: 250,
            ..config(temp.path())
        })
        .await;

        let a = storage.save(&frame(100), None).await.unwrap();
        tick().await;
        let b = storage.save(&frame(100), None).await.unwrap();
        tick().await;
        let c = storage.save(&frame(100), None).await.unwrap();

        assert!(storage.get(a.id).await.unwrap().is_none());
        assert!(!a.file_path.exists());
        assert!(storage.get(b.id).await.unwrap().is_some());
        assert!(storage.get(c.id).await.unwrap().is_some());

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.item_count, 2);
        assert!(stats.total_bytes <= 250);
    }

    #[tokio::test]
    async fn oversized_single_item_evicted() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(StorageConfig {
            max_total_bytes: 50,
            ..config(temp.path())
        })
        .await;

        let item = storage.save(&frame(100), None).await.unwrap();
        assert_eq!(item.size_bytes, 100);
        assert!(storage.get(item.id).await.unwrap().is_none());
        assert_eq!(storage.stats().await.unwrap().item_count, 0);
    }

    #[tokio::test]
    async fn delete_missing_is_noop() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(config(temp.path())).await;
        storage.delete(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_file_and_entry() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(config(temp.path())).await;
        let item = storage.save(&frame(10), None).await.unwrap();

        storage.delete(item.id).await.unwrap();
        assert!(!item.file_path.exists());
        assert!(storage.get(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_tolerates_missing_file() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(config(temp.path())).await;
        let item = storage.save(&frame(10), None).await.unwrap();
        std::fs::remove_file(&item.file_path).unwrap();

        storage.delete(item.id).await.unwrap();
        assert!(storage.get(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cleanup_removes_expired() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(StorageConfig {
            max_age_days: 7,
            ..config(temp.path())
        })
        .await;
        let item = storage.save(&frame(10), None).await.unwrap();

        assert_eq!(storage.cleanup().await.unwrap(), 0);
        let removed = storage
            .cleanup_at(Utc::now() + Duration::days(8))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!item.file_path.exists());
    }

    #[tokio::test]
    async fn item_exactly_at_cutoff_is_kept() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(StorageConfig {
            max_age_days: 7,
            ..config(temp.path())
        })
        .await;
        let item = storage.save(&frame(10), None).await.unwrap();

        let at_cutoff = item.created_at + Duration::days(7);
        assert_eq!(storage.cleanup_at(at_cutoff).await.unwrap(), 0);
        assert!(item.file_path.exists());

        let past_cutoff = at_cutoff + Duration::milliseconds(1);
        assert_eq!(storage.cleanup_at(past_cutoff).await.unwrap(), 1);
        assert!(!item.file_path.exists());
    }

    #[tokio::test]
    async fn huge_retention_never_expires() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(StorageConfig {
            max_age_days: u32::MAX,
            ..config(temp.path())
        })
        .await;
        let item = storage.save(&frame(10), None).await.unwrap();

        assert_eq!(storage.cleanup().await.unwrap(), 0);
        assert_eq!(
            storage
                .cleanup_at(Utc::now() + Duration::days(365 * 100))
                .await
                .unwrap(),
            0
        );
        assert!(storage.get(item.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn zero_retention_keeps_everything() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(StorageConfig {
            max_age_days: 0,
            ..config(temp.path())
        })
        .await;
        storage.save(&frame(10), None).await.unwrap();

        let later = Utc::now() + Duration::days(365 * 100);
        assert_eq!(storage.cleanup_at(later).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn long_naming_pattern_keeps_files_distinct() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(StorageConfig {
            naming_pattern: format!("{}_{{id}}", "x".repeat(130)),
            ..config(temp.path())
        })
        .await;
        let f = frame(10);
        let a = storage.save(&f, None).await.unwrap();
        let b = storage.save(&f, None).await.unwrap();
        assert_ne!(a.file_path, b.file_path);

        storage.delete(a.id).await.unwrap();
        assert!(!a.file_path.exists());
        assert!(b.file_path.exists());
        assert_eq!(storage.read_image(b.id).await.unwrap(), f.buffer);
    }

    #[tokio::test]
    async fn long_scene_tag_keeps_files_distinct() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(StorageConfig {
            naming_pattern: "{scene}".to_string(),
            ..config(temp.path())
        })
        .await;
        let tags = ContextTags {
            name: None,
            scene: Some("boss ".repeat(80)),
            tags: vec![],
        };
        let f = frame(10);
        let a = storage.save(&f, Some(tags.clone())).await.unwrap();
        let b = storage.save(&f, Some(tags)).await.unwrap();
        assert_ne!(a.file_path, b.file_path);
        assert!(a.file_path.exists() && b.file_path.exists());
    }

    #[tokio::test]
    async fn index_survives_restart() {
        let temp = TempDir::new().unwrap();
        let item = {
            let storage = create_test_storage(config(temp.path())).await;
            storage.save(&frame(10), None).await.unwrap()
        };

        let reopened = create_test_storage(config(temp.path())).await;
        assert_eq!(reopened.get(item.id).await.unwrap(), Some(item));
    }

    #[tokio::test]
    async fn initialize_purges_expired_from_index() {
        let temp = TempDir::new().unwrap();
        let item = {
            let storage = create_test_storage(config(temp.path())).await;
            storage.save(&frame(10), None).await.unwrap()
        };

        // 인덱스의 created_at을 40일 전으로 조작
        let path = temp.path().join("index.json");
        let mut index: ItemIndex =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        index.get_mut(&item.id).unwrap().created_at = Utc::now() - Duration::days(40);
        std::fs::write(&path, serde_json::to_vec(&index).unwrap()).unwrap();

        let reopened = create_test_storage(config(temp.path())).await;
        assert!(reopened.get(item.id).await.unwrap().is_none());
        assert!(!item.file_path.exists());
    }

    #[tokio::test]
    async fn corrupt_index_fails_initialize() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("index.json"), b"[1,2").unwrap();
        let storage = FrameStorage::new(config(temp.path()));
        assert!(storage.initialize().await.is_err());
        assert!(!storage.is_initialized().await);
    }

    #[tokio::test]
    async fn base_path_change_migrates_files() {
        let old = TempDir::new().unwrap();
        let new = TempDir::new().unwrap();
        let storage = create_test_storage(config(old.path())).await;
        let item = storage.save(&frame(10), None).await.unwrap();

        storage
            .update_config(StorageConfigPatch {
                base_path: Some(new.path().to_path_buf()),
                ..StorageConfigPatch::default()
            })
            .await
            .unwrap();

        let moved = storage.get(item.id).await.unwrap().unwrap();
        assert!(moved.file_path.starts_with(new.path()));
        assert!(moved.file_path.exists());
        assert!(!item.file_path.exists());
        assert!(new.path().join("index.json").exists());
        assert!(!old.path().join("index.json").exists());
        assert_eq!(storage.read_image(item.id).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn failed_migration_keeps_old_path() {
        let old = TempDir::new().unwrap();
        let new = TempDir::new().unwrap();
        let storage = create_test_storage(config(old.path())).await;
        let item = storage.save(&frame(10), None).await.unwrap();
        // 원본 파일이 사라진 상태로 이전 시도
        std::fs::remove_file(&item.file_path).unwrap();

        storage
            .update_config(StorageConfigPatch {
                base_path: Some(new.path().to_path_buf()),
                ..StorageConfigPatch::default()
            })
            .await
            .unwrap();

        let kept = storage.get(item.id).await.unwrap().unwrap();
        assert_eq!(kept.file_path, item.file_path);
    }

    #[tokio::test]
    async fn shrinking_quota_evicts_on_update() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(config(temp.path())).await;
        storage.save(&frame(100), None).await.unwrap();
        tick().await;
        storage.save(&frame(100), None).await.unwrap();

        storage
            .update_config(StorageConfigPatch {
                max_total_bytes: Some(150),
                ..StorageConfigPatch::default()
            })
            .await
            .unwrap();
        assert_eq!(storage.stats().await.unwrap().item_count, 1);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let temp = TempDir::new().unwrap();
        let storage = create_test_storage(config(temp.path())).await;
        let a = storage.save(&frame(1), None).await.unwrap();
        tick().await;
        let b = storage.save(&frame(1), None).await.unwrap();

        let list = storage.list().await.unwrap();
        assert_eq!(list[0].id, b.id);
        assert_eq!(list[1].id, a.id);

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.oldest, Some(a.created_at));
        assert_eq!(stats.newest, Some(b.created_at));
    }
}

//! 메타데이터 인덱스 파일 (`index.json`).
//!
//! 항목 ID를 키로 하는 JSON 객체. 임시 파일에 쓴 뒤 rename으로 교체한다.

use scenecap_core::error::CoreError;
use scenecap_core::models::stored_item::StoredItem;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// 인덱스 파일 이름
pub const INDEX_FILE_NAME: &str = "index.json";

const TEMP_SUFFIX: &str = ".tmp";

/// 메모리 인덱스
pub type ItemIndex = HashMap<Uuid, StoredItem>;

/// 기본 경로 아래 인덱스 파일 경로
pub fn index_path(base: &Path) -> PathBuf {
    base.join(INDEX_FILE_NAME)
}

/// 인덱스 로드 (파일 없음 → 빈 인덱스)
pub async fn load(base: &Path) -> Result<ItemIndex, CoreError> {
    let path = index_path(base);
    let bytes = match fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("인덱스 없음, 빈 인덱스로 시작: {}", path.display());
            return Ok(ItemIndex::new());
        }
        Err(e) => return Err(CoreError::storage_io(path, e)),
    };

    let index: ItemIndex = serde_json::from_slice(&bytes)?;
    debug!("인덱스 로드: {}개 항목", index.len());
    Ok(index)
}

/// 인덱스 저장 (임시 파일 → rename)
pub async fn persist(base: &Path, index: &ItemIndex) -> Result<(), CoreError> {
    // 키 순서 고정
    let ordered: BTreeMap<&Uuid, &StoredItem> = index.iter().collect();
    let json = serde_json::to_vec_pretty(&ordered)?;

    let path = index_path(base);
    let tmp = base.join(format!("{INDEX_FILE_NAME}{TEMP_SUFFIX}"));

    fs::write(&tmp, &json)
        .await
        .map_err(|e| CoreError::storage_io(&tmp, e))?;
    fs::rename(&tmp, &path)
        .await
        .map_err(|e| CoreError::storage_io(&path, e))?;
    Ok(())
}

/// 인덱스 파일 삭제 (없으면 무시)
pub async fn remove(base: &Path) -> Result<(), CoreError> {
    let path = index_path(base);
    match fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CoreError::storage_io(path, e)),
    }
}

//! 서피스별 직전 프레임 캐시.
//!
//! 서피스당 최대 한 개의 비교용 서명(320x240 밝기)을 보관한다.
//! 스케줄러와 온디맨드 경로가 같은 캐시를 공유한다.

use image::GrayImage;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 직전 프레임 캐시
#[derive(Debug, Default)]
pub struct LastFrameCache {
    entries: Mutex<HashMap<String, Arc<GrayImage>>>,
    /// `clear` 마다 증가. 이전 세대의 사이클이 캐시를 다시 채우지 못하게 한다.
    epoch: AtomicU64,
}

impl LastFrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 세대
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// 서명 교체 후 이전 값 반환 (원자적)
    ///
    /// `epoch`가 현재 세대와 다르면 저장하지 않고 `None`을 반환한다.
    pub fn exchange(
        &self,
        surface_id: &str,
        signature: Arc<GrayImage>,
        epoch: u64,
    ) -> Option<Arc<GrayImage>> {
        let mut entries = self.entries.lock();
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!("이전 세대 프레임 무시: {surface_id}");
            return None;
        }
        entries.insert(surface_id.to_string(), signature)
    }

    /// 서피스의 현재 서명
    pub fn get(&self, surface_id: &str) -> Option<Arc<GrayImage>> {
        self.entries.lock().get(surface_id).cloned()
    }

    /// 활성 목록에 없는 서피스 제거, 제거 수 반환
    pub fn retain_surfaces(&self, active: &BTreeSet<String>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|id, _| active.contains(id));
        before - entries.len()
    }

    /// 전체 비우기 + 세대 증가
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

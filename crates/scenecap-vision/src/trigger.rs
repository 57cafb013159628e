//! 온디맨드 트리거 디바운스.
//!
//! 액션(핫키/수동 버튼 등) 단위로 마지막 수락 시각을 기록하고,
//! 창 안에 들어온 트리거는 조용히 무시한다.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// 기본 디바운스 창 (밀리초)
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// 액션별 디바운스 게이트
#[derive(Debug)]
pub struct DebounceGate {
    window: Duration,
    /// 액션 → 마지막 수락 시각
    last_accepted: Mutex<HashMap<String, Instant>>,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 현재 시각 기준 수락 여부 (수락 시 시각 기록)
    pub fn try_acquire(&self, action: &str) -> bool {
        self.try_acquire_at(action, Instant::now())
    }

    /// 지정 시각 기준 수락 여부
    pub fn try_acquire_at(&self, action: &str, now: Instant) -> bool {
        let mut last = self.last_accepted.lock();
        if let Some(prev) = last.get(action) {
            let elapsed = now.saturating_duration_since(*prev);
            if elapsed < self.window {
                debug!("트리거 디바운스: {action} ({}ms 경과)", elapsed.as_millis());
                return false;
            }
        }
        last.insert(action.to_string(), now);
        true
    }

}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}

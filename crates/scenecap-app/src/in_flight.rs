//! 진행 중 플래그.
//!
//! `AtomicBool` 기반 재진입 방지. 가드를 drop하면 플래그가 해제된다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 공유 진행 중 플래그
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    flag: Arc<AtomicBool>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// 비어 있으면 점유 후 가드 반환, 이미 진행 중이면 `None`
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                flag: self.flag.clone(),
            })
    }

    /// 진행 중 여부
    pub fn is_active(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// 점유 가드
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

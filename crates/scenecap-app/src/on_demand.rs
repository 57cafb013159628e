//! 온디맨드 캡처 경로.
//!
//! 핫키/수동 요청으로 즉시 캡처한다. 액션별 디바운스(기본 500ms)와
//! 진행 중 재진입 방지를 거친 트리거만 실행되며, 무시된 트리거는 빈 결과를 반환한다.
//! 스케줄러와 같은 파이프라인(같은 직전 프레임 캐시)을 사용한다.

use chrono::Utc;
use scenecap_core::config::{CaptureConfig, OnDemandConfig};
use scenecap_core::models::frame::CapturedFrame;
use scenecap_vision::pipeline::{CapturePipeline, CaptureTrigger};
use scenecap_vision::trigger::DebounceGate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::event_bus::EventBus;
use crate::in_flight::InFlight;

/// 핫키 액션 이름
pub const HOTKEY_ACTION: &str = "hotkey";

/// 수동 요청 액션 이름
pub const MANUAL_ACTION: &str = "manual";

/// 온디맨드 캡처
pub struct OnDemandCapture {
    pipeline: Arc<CapturePipeline>,
    bus: EventBus,
    config: Arc<RwLock<CaptureConfig>>,
    gate: DebounceGate,
    in_flight: InFlight,
    /// 핫키 모드
    armed: AtomicBool,
}

impl OnDemandCapture {
    pub fn new(
        pipeline: Arc<CapturePipeline>,
        bus: EventBus,
        config: Arc<RwLock<CaptureConfig>>,
        on_demand: &OnDemandConfig,
    ) -> Self {
        let gate = DebounceGate::new(Duration::from_millis(on_demand.debounce_ms));
        debug!(
            "온디맨드 캡처 준비: 디바운스 {}ms, 핫키 {}",
            gate.window().as_millis(),
            on_demand.hotkey_enabled
        );
        Self {
            pipeline,
            bus,
            config,
            gate,
            in_flight: InFlight::new(),
            armed: AtomicBool::new(on_demand.hotkey_enabled),
        }
    }

    /// 핫키 모드 켜기
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
        info!("핫키 모드 활성화");
    }

    /// 핫키 모드 끄기
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
        info!("핫키 모드 비활성화");
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// 핫키 트리거 (비활성 상태면 무시)
    pub async fn handle_hotkey(&self) -> Vec<CapturedFrame> {
        if !self.is_armed() {
            debug!("핫키 모드 비활성, 트리거 무시");
            return Vec::new();
        }
        self.capture_now(HOTKEY_ACTION).await
    }

    /// 즉시 캡처
    ///
    /// 진행 중이거나 같은 액션의 디바운스 창 안이면 빈 결과.
    pub async fn capture_now(&self, action: &str) -> Vec<CapturedFrame> {
        let Some(_guard) = self.in_flight.try_begin() else {
            debug!("온디맨드 캡처 진행 중, 트리거 무시: {action}");
            return Vec::new();
        };
        if !self.gate.try_acquire(action) {
            return Vec::new();
        }

        let triggered_at = Utc::now();
        let config = self.config.read().await.clone();
        let report = self
            .pipeline
            .run_cycle(&config, CaptureTrigger::OnDemand { triggered_at })
            .await;

        info!(
            "온디맨드 캡처 ({action}): 프레임 {}, 실패 {}",
            report.frames.len(),
            report.failures.len()
        );
        self.bus.publish_all(report.to_events());
        report.frames
    }
}

//! 캡처 스케줄러.
//!
//! `Idle → Running → Idle` 상태 기계. 시작 시 즉시 한 번 캡처한 뒤
//! 반복 타이머를 무장한다. 사이클은 각자의 태스크에서 실행되며,
//! 사이클이 진행 중일 때 도착한 틱은 버린다 (큐에 쌓지 않음).

use scenecap_core::config::{CaptureConfig, CaptureConfigChange, CaptureConfigPatch};
use scenecap_core::config_manager::CAPTURE_KEY;
use scenecap_core::ports::config_store::ConfigStore;
use scenecap_vision::pipeline::{CapturePipeline, CaptureTrigger};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::event_bus::EventBus;
use crate::in_flight::InFlight;

/// 스케줄러 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

struct Inner {
    state: SchedulerState,
    timer: Option<JoinHandle<()>>,
    /// start/stop마다 증가 (즉시 사이클 중 정지 감지용)
    generation: u64,
}

/// 사이클 실행에 필요한 공유 자원
#[derive(Clone)]
struct CycleContext {
    pipeline: Arc<CapturePipeline>,
    bus: EventBus,
    config: Arc<RwLock<CaptureConfig>>,
    in_flight: InFlight,
    completed: Arc<AtomicU64>,
}

impl CycleContext {
    /// 사이클 1회 실행 후 이벤트 발행
    async fn run_cycle(&self) {
        let config = self.config.read().await.clone();
        let report = self
            .pipeline
            .run_cycle(&config, CaptureTrigger::Scheduled)
            .await;
        if report.permission_denied() {
            warn!("화면 기록 권한 없음: 이번 사이클 캡처 실패");
        }
        self.bus.publish_all(report.to_events());
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// 반복 타이머 태스크 생성 (첫 틱은 한 주기 뒤)
    fn spawn_timer(&self, period: Duration) -> JoinHandle<()> {
        let ctx = self.clone();
        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                let Some(guard) = ctx.in_flight.try_begin() else {
                    debug!("이전 캡처 사이클 진행 중, 틱 건너뜀");
                    continue;
                };

                // 타이머 취소와 무관하게 진행 중 사이클은 끝까지 실행
                let cycle = ctx.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    cycle.run_cycle().await;
                });
            }
        })
    }
}

/// 캡처 스케줄러
pub struct CaptureScheduler {
    ctx: CycleContext,
    inner: Mutex<Inner>,
    config_store: Option<Arc<dyn ConfigStore>>,
}

impl CaptureScheduler {
    /// 새 스케줄러 생성 (Idle)
    pub fn new(pipeline: Arc<CapturePipeline>, bus: EventBus, config: CaptureConfig) -> Self {
        Self {
            ctx: CycleContext {
                pipeline,
                bus,
                config: Arc::new(RwLock::new(config.normalized())),
                in_flight: InFlight::new(),
                completed: Arc::new(AtomicU64::new(0)),
            },
            inner: Mutex::new(Inner {
                state: SchedulerState::Idle,
                timer: None,
                generation: 0,
            }),
            config_store: None,
        }
    }

    /// 설정 변경 시 저장할 설정 저장소
    pub fn with_config_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.config_store = Some(store);
        self
    }

    /// 공유 설정 (온디맨드 경로가 같은 설정을 읽는다)
    pub fn shared_config(&self) -> Arc<RwLock<CaptureConfig>> {
        self.ctx.config.clone()
    }

    /// 현재 설정 복사본
    pub async fn config(&self) -> CaptureConfig {
        self.ctx.config.read().await.clone()
    }

    /// 현재 상태
    pub async fn state(&self) -> SchedulerState {
        self.inner.lock().await.state
    }

    /// 완료된 사이클 수
    pub fn completed_cycles(&self) -> u64 {
        self.ctx.completed.load(Ordering::Relaxed)
    }

    /// 시작 (이미 실행 중이면 무시)
    ///
    /// 즉시 사이클 1회를 끝낸 뒤 타이머를 무장한다. 즉시 사이클의 실패는
    /// 에러 이벤트로만 보고되고 타이머 무장을 막지 않는다. 즉시 사이클 동안에는
    /// 상태 잠금을 풀어 두므로 `stop`/`update_config`가 기다리지 않으며,
    /// 그 사이 정지되었다면 타이머를 무장하지 않는다.
    pub async fn start(&self, config: Option<CaptureConfig>) {
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.state == SchedulerState::Running {
                debug!("스케줄러 이미 실행 중");
                return;
            }
            if let Some(config) = config {
                *self.ctx.config.write().await = config.normalized();
            }
            inner.state = SchedulerState::Running;
            inner.generation += 1;
            inner.generation
        };
        info!(
            "캡처 스케줄러 시작: 주기 {}ms",
            self.ctx.config.read().await.interval_ms
        );

        match self.ctx.in_flight.try_begin() {
            Some(_guard) => self.ctx.run_cycle().await,
            None => debug!("이전 세션 사이클 진행 중, 즉시 캡처 생략"),
        }

        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.state != SchedulerState::Running {
            debug!("즉시 사이클 중 정지됨, 타이머 무장 생략");
            return;
        }
        // 즉시 사이클 중 바뀐 주기 반영
        let period = self.ctx.config.read().await.interval();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.timer = Some(self.ctx.spawn_timer(period));
    }

    /// 정지 (멱등). 타이머를 취소하고 직전 프레임 캐시를 비운다.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        if inner.state == SchedulerState::Running {
            info!("캡처 스케줄러 정지");
            inner.generation += 1;
        }
        inner.state = SchedulerState::Idle;
        self.ctx.pipeline.cache().clear();
    }

    /// 설정 부분 업데이트
    ///
    /// 실행 중에 주기나 대상 서피스가 바뀌면 타이머만 새로 무장한다 (즉시 캡처 없음).
    pub async fn update_config(&self, patch: CaptureConfigPatch) -> CaptureConfigChange {
        let mut inner = self.inner.lock().await;

        let (change, snapshot) = {
            let mut config = self.ctx.config.write().await;
            let change = config.merge(patch);
            (change, config.clone())
        };

        if change.surfaces_changed {
            self.prune_cache(&snapshot).await;
        }

        if inner.state == SchedulerState::Running && change.requires_restart() {
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            inner.timer = Some(self.ctx.spawn_timer(snapshot.interval()));
            info!(
                "캡처 타이머 재무장: 주기 {}ms, 서피스 {:?}",
                snapshot.interval_ms, snapshot.active_surface_ids
            );
        }

        if let Some(store) = &self.config_store {
            match serde_json::to_value(&snapshot) {
                Ok(value) => {
                    if let Err(e) = store.save(CAPTURE_KEY, value) {
                        warn!("캡처 설정 저장 실패: {e}");
                    }
                }
                Err(e) => warn!("캡처 설정 직렬화 실패: {e}"),
            }
        }

        change
    }

    /// 더 이상 활성이 아닌 서피스의 캐시 제거
    async fn prune_cache(&self, config: &CaptureConfig) {
        let keep: BTreeSet<String> = match self.ctx.pipeline.resolve_targets(config).await {
            Ok(targets) => targets.into_iter().collect(),
            Err(e) => {
                debug!("활성 서피스 해석 실패, 캐시 전체 제거: {e}");
                BTreeSet::new()
            }
        };
        let removed = self.ctx.pipeline.cache().retain_surfaces(&keep);
        if removed > 0 {
            debug!("비활성 서피스 캐시 {removed}개 제거");
        }
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.get_mut().timer.take() {
            timer.abort();
        }
    }
}

//! 캡처 파이프라인.
//!
//! 서피스 하나: 캡처 → 처리 → (선택) 변경 감지 → 캐시 교체 → `CapturedFrame`.
//! 사이클 하나: 대상 서피스 해석 후 서피스별 파이프라인을 동시성 제한 안에서 실행.
//!
//! 스케줄러와 온디맨드 경로가 같은 파이프라인(같은 캐시)을 공유한다.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use image::GrayImage;
use scenecap_core::config::CaptureConfig;
use scenecap_core::error::{CoreError, UnavailableReason};
use scenecap_core::models::event::{CaptureErrorEvent, CaptureEvent};
use scenecap_core::models::frame::{CapturedFrame, FrameMetadata};
use scenecap_core::models::surface::{primary_surface, DisplaySurface};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capture::FrameCapturer;
use crate::delta;
use crate::frame_cache::LastFrameCache;
use crate::processor::{ImageProcessor, ProcessedImage};

/// 캡처 트리거 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTrigger {
    /// 타이머 틱
    Scheduled,
    /// 핫키/수동 요청
    OnDemand { triggered_at: DateTime<Utc> },
}

/// 서피스 단위 실패
#[derive(Debug)]
pub struct SurfaceFailure {
    pub surface_id: Option<String>,
    pub error: CoreError,
}

/// 사이클 결과
#[derive(Debug, Default)]
pub struct CycleReport {
    pub frames: Vec<CapturedFrame>,
    pub failures: Vec<SurfaceFailure>,
}

impl CycleReport {
    /// 이벤트 싱크로 보낼 이벤트 목록 (프레임 먼저, 실패는 뒤)
    pub fn to_events(&self) -> Vec<CaptureEvent> {
        let mut events: Vec<CaptureEvent> = self
            .frames
            .iter()
            .map(|f| CaptureEvent::Frame(Arc::new(f.clone())))
            .collect();
        events.extend(self.failures.iter().map(|f| {
            CaptureEvent::Error(CaptureErrorEvent::from_error(
                f.surface_id.as_deref(),
                &f.error,
            ))
        }));
        events
    }

    /// 권한 거부가 있었는지
    pub fn permission_denied(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_permission_denied())
    }
}

/// 캡처 파이프라인
pub struct CapturePipeline {
    capturer: FrameCapturer,
    processor: ImageProcessor,
    cache: Arc<LastFrameCache>,
}

impl CapturePipeline {
    pub fn new(capturer: FrameCapturer, processor: ImageProcessor) -> Self {
        Self {
            capturer,
            processor,
            cache: Arc::new(LastFrameCache::new()),
        }
    }

    /// 공유 캐시
    pub fn cache(&self) -> &Arc<LastFrameCache> {
        &self.cache
    }

    pub fn processor(&self) -> &ImageProcessor {
        &self.processor
    }

    /// 서피스 목록
    pub async fn list_surfaces(&self) -> Result<Vec<DisplaySurface>, CoreError> {
        self.capturer.list_surfaces().await
    }

    /// 사이클 대상 서피스 해석 (빈 집합 → 주 서피스)
    pub async fn resolve_targets(&self, config: &CaptureConfig) -> Result<Vec<String>, CoreError> {
        if !config.active_surface_ids.is_empty() {
            return Ok(config.active_surface_ids.iter().cloned().collect());
        }

        let surfaces = self.capturer.list_surfaces().await?;
        primary_surface(&surfaces)
            .map(|s| vec![s.id.clone()])
            .ok_or_else(|| CoreError::CaptureUnavailable {
                surface_id: "primary".to_string(),
                reason: UnavailableReason::SurfaceMissing,
                message: "캡처 가능한 서피스 없음".to_string(),
            })
    }

    /// 캡처 사이클 1회
    ///
    /// 서피스별 실패는 보고서에 모이고 나머지 서피스는 계속 진행한다.
    pub async fn run_cycle(&self, config: &CaptureConfig, trigger: CaptureTrigger) -> CycleReport {
        let epoch = self.cache.epoch();
        let mut report = CycleReport::default();

        let targets = match self.resolve_targets(config).await {
            Ok(targets) => targets,
            Err(error) => {
                warn!("캡처 대상 해석 실패: {error}");
                report.failures.push(SurfaceFailure {
                    surface_id: None,
                    error,
                });
                return report;
            }
        };

        let limit = config.max_concurrent_captures.max(1);
        let results: Vec<(String, Result<CapturedFrame, CoreError>)> = stream::iter(targets)
            .map(|surface_id| async move {
                let result = self.capture_surface(&surface_id, config, trigger, epoch).await;
                (surface_id, result)
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        for (surface_id, result) in results {
            match result {
                Ok(frame) => report.frames.push(frame),
                Err(error) => {
                    warn!("서피스 캡처 실패 ({surface_id}): {error}");
                    report.failures.push(SurfaceFailure {
                        surface_id: Some(surface_id),
                        error,
                    });
                }
            }
        }

        debug!(
            "캡처 사이클 완료: 프레임 {}, 실패 {}",
            report.frames.len(),
            report.failures.len()
        );
        report
    }

    /// 서피스 하나 캡처
    pub async fn capture_surface(
        &self,
        surface_id: &str,
        config: &CaptureConfig,
        trigger: CaptureTrigger,
        epoch: u64,
    ) -> Result<CapturedFrame, CoreError> {
        let raw = self.capturer.capture(surface_id).await?;
        let timestamp = Utc::now();

        let processor = self.processor;
        let (format, quality) = (config.output_format, config.quality);
        let detect = config.change_detection_enabled;

        // 디코딩/리사이즈/인코딩은 블로킹 풀에서
        let (processed, signature): (ProcessedImage, Option<GrayImage>) =
            tokio::task::spawn_blocking(move || {
                let image = processor.decode(&raw)?;
                let processed = processor.render(&image, format, quality)?;
                let signature = if detect {
                    Some(delta::prepare(&image)?)
                } else {
                    None
                };
                Ok::<_, CoreError>((processed, signature))
            })
            .await
            .map_err(|e| CoreError::Internal(format!("이미지 처리 태스크 실패: {e}")))??;

        let change_score = match signature {
            Some(signature) => {
                let signature = Arc::new(signature);
                match self.cache.exchange(surface_id, signature.clone(), epoch) {
                    Some(prev) => Some(delta::score(&prev, &signature)?),
                    None => None,
                }
            }
            None => None,
        };
        let is_scene_change = change_score
            .map(|s| delta::is_scene_change(s, config.change_threshold))
            .unwrap_or(false);

        let (is_on_demand, triggered_at) = match trigger {
            CaptureTrigger::Scheduled => (false, None),
            CaptureTrigger::OnDemand { triggered_at } => (true, Some(triggered_at)),
        };

        debug!(
            "프레임: {surface_id} {}x{} score={:?} scene_change={is_scene_change}",
            processed.width, processed.height, change_score
        );

        Ok(CapturedFrame {
            buffer: processed.bytes,
            metadata: FrameMetadata {
                surface_id: surface_id.to_string(),
                timestamp,
                width: processed.width,
                height: processed.height,
                format: processed.format,
                is_scene_change,
                change_score,
                is_on_demand,
                triggered_at,
            },
        })
    }
}

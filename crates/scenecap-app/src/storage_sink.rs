//! 저장소 싱크.
//!
//! 이벤트 버스의 프레임을 받아 저장소에 기록하고, 주기적으로 보존 정책을 적용한다.
//! 저장 포맷이 캡처 포맷과 다르면 저장 전에 변환한다.

use scenecap_core::error::CoreError;
use scenecap_core::models::event::CaptureEvent;
use scenecap_core::models::frame::{CapturedFrame, FrameMetadata, ImageFormat};
use scenecap_core::models::stored_item::StoredItem;
use scenecap_storage::frame_storage::FrameStorage;
use scenecap_vision::processor::ImageProcessor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// 저장 대상 여부
///
/// 온디맨드 프레임, 장면 변경 프레임, 비교 기준이 없는 프레임(첫 프레임/감지 비활성)을 저장한다.
pub fn should_store(metadata: &FrameMetadata) -> bool {
    metadata.is_on_demand || metadata.is_scene_change || metadata.change_score.is_none()
}

/// 저장소 싱크
pub struct StorageSink {
    storage: Arc<FrameStorage>,
    processor: ImageProcessor,
}

impl StorageSink {
    pub fn new(storage: Arc<FrameStorage>) -> Self {
        Self {
            storage,
            processor: ImageProcessor::new(),
        }
    }

    /// 프레임 하나 처리 (저장 대상이 아니면 `None`)
    pub async fn handle_frame(&self, frame: &CapturedFrame) -> Result<Option<StoredItem>, CoreError> {
        if !should_store(&frame.metadata) {
            debug!("변경 없는 프레임, 저장 생략: {}", frame.surface_id());
            return Ok(None);
        }

        let config = self.storage.config().await;
        let item = if config.format == frame.metadata.format {
            self.storage.save(frame, None).await?
        } else {
            let converted = self.transcode(frame, config.format, config.quality).await?;
            self.storage.save(&converted, None).await?
        };
        Ok(Some(item))
    }

    async fn transcode(
        &self,
        frame: &CapturedFrame,
        format: ImageFormat,
        quality: u8,
    ) -> Result<CapturedFrame, CoreError> {
        let processor = self.processor;
        let buffer = frame.buffer.clone();
        let bytes = tokio::task::spawn_blocking(move || processor.transcode(&buffer, format, quality))
            .await
            .map_err(|e| CoreError::Internal(format!("포맷 변환 태스크 실패: {e}")))??;

        let mut metadata = frame.metadata.clone();
        metadata.format = format;
        Ok(CapturedFrame {
            buffer: bytes,
            metadata,
        })
    }

    /// 싱크 태스크 시작
    ///
    /// 프레임 이벤트를 저장하고 `cleanup_interval`마다 보존 정책을 적용한다.
    /// 종료 신호를 받거나 버스가 닫히면 끝난다.
    pub fn spawn(
        self,
        mut events: broadcast::Receiver<CaptureEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
        cleanup_interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // 초기화 때 이미 한 번 정리했으므로 첫 틱은 한 주기 뒤
            let mut cleanup = interval_at(Instant::now() + cleanup_interval, cleanup_interval);
            cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    received = events.recv() => match received {
                        Ok(CaptureEvent::Frame(frame)) => {
                            match self.handle_frame(&frame).await {
                                Ok(Some(item)) => debug!("프레임 저장됨: {}", item.id),
                                Ok(None) => {}
                                Err(e) => warn!("프레임 저장 실패: {e}"),
                            }
                        }
                        Ok(CaptureEvent::Error(_)) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("저장소 싱크 지연: 프레임 {skipped}개 누락");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = cleanup.tick() => {
                        match self.storage.cleanup().await {
                            Ok(0) => {}
                            Ok(n) => info!("보존 정책 정리: {n}개 삭제"),
                            Err(e) => warn!("보존 정책 정리 실패: {e}"),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("저장소 싱크 종료");
        })
    }
}

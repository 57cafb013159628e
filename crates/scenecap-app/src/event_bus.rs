//! 캡처 이벤트 버스.
//!
//! `tokio::broadcast` 기반. 세션(스케줄러/온디맨드)이 발행하고
//! 저장소 싱크와 외부 소비자가 구독한다. 수신기를 drop하면 구독이 해제된다.

use scenecap_core::models::event::CaptureEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// 캡처 이벤트 버스
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CaptureEvent>,
}

impl EventBus {
    /// 새 이벤트 버스 생성
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// 이벤트 발행 (구독자가 없으면 버림)
    pub fn publish(&self, event: CaptureEvent) {
        match &event {
            CaptureEvent::Frame(frame) => debug!(
                "프레임 이벤트: {} ({} bytes)",
                frame.surface_id(),
                frame.size_bytes()
            ),
            CaptureEvent::Error(err) => debug!("에러 이벤트: {} {}", err.kind, err.message),
        }
        let _ = self.tx.send(event);
    }

    /// 여러 이벤트를 순서대로 발행
    pub fn publish_all(&self, events: impl IntoIterator<Item = CaptureEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// 구독자 생성
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.tx.subscribe()
    }

    /// 현재 구독자 수
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

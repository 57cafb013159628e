//! 캡처 이벤트 모델.
//!
//! 스케줄러/온디맨드 경로가 이벤트 싱크로 내보내는 이벤트.

use serde::Serialize;
use std::sync::Arc;

use super::frame::{CapturedFrame, FrameMetadata};
use crate::error::CoreError;

/// 캡처 이벤트
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// 수락된 프레임 (`capture-frame`)
    Frame(Arc<CapturedFrame>),
    /// 캡처/처리 실패 (`error`)
    Error(CaptureErrorEvent),
}

/// 에러 이벤트 본문
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureErrorEvent {
    /// 에러 분류 (`CoreError::kind`)
    pub kind: String,
    /// 대상 서피스 (알 수 있는 경우)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface_id: Option<String>,
    /// 사람이 읽을 메시지
    pub message: String,
    /// 권한 요청이 필요한 실패인지
    pub permission_required: bool,
}

impl CaptureErrorEvent {
    /// 코어 에러로부터 이벤트 생성
    pub fn from_error(surface_id: Option<&str>, error: &CoreError) -> Self {
        Self {
            kind: error.kind().to_string(),
            surface_id: surface_id.map(str::to_string),
            message: error.to_string(),
            permission_required: error.is_permission_denied(),
        }
    }
}

/// 외부 소비자(UI/IPC)용 직렬화 형태
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum WireEvent<'a> {
    /// `capture-frame {imageData, metadata}`
    CaptureFrame {
        #[serde(rename = "imageData")]
        image_data: &'a [u8],
        metadata: &'a FrameMetadata,
    },
    /// `error {message}`
    Error {
        #[serde(flatten)]
        body: &'a CaptureErrorEvent,
    },
}

impl CaptureEvent {
    /// 소비자 전달용 형태로 변환
    pub fn to_wire(&self) -> WireEvent<'_> {
        match self {
            Self::Frame(frame) => WireEvent::CaptureFrame {
                image_data: &frame.buffer,
                metadata: &frame.metadata,
            },
            Self::Error(body) => WireEvent::Error { body },
        }
    }
}

//! 캡처 프레임 모델.
//!
//! 처리 파이프라인이 생성하는 불변 프레임과 그 메타데이터,
//! 저장 시 함께 기록되는 컨텍스트 태그를 정의.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 출력 이미지 포맷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// 파일 확장자
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// MIME 타입
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        })
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            other => Err(format!("알 수 없는 이미지 포맷: {other}")),
        }
    }
}

/// 프레임 메타데이터 (이벤트/저장소 공용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// 캡처 대상 서피스 ID
    pub surface_id: String,
    /// 캡처 시각
    pub timestamp: DateTime<Utc>,
    /// 인코딩된 이미지 너비 (픽셀)
    pub width: u32,
    /// 인코딩된 이미지 높이 (픽셀)
    pub height: u32,
    /// 인코딩 포맷
    pub format: ImageFormat,
    /// 장면 변경 여부 (변경 감지 비활성 시 항상 false)
    pub is_scene_change: bool,
    /// 변경 점수 (0.0 ~ 1.0, 이전 프레임이 없거나 감지 비활성이면 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_score: Option<f32>,
    /// 온디맨드(핫키/수동) 캡처 여부
    pub is_on_demand: bool,
    /// 온디맨드 트리거 시각 (하위 분석 라우팅용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
}

/// 캡처 프레임: 생성 후 불변
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// 인코딩된 이미지 바이트
    pub buffer: Vec<u8>,
    /// 메타데이터
    pub metadata: FrameMetadata,
}

impl CapturedFrame {
    /// 서피스 ID
    pub fn surface_id(&self) -> &str {
        &self.metadata.surface_id
    }

    /// 인코딩 바이트 크기
    pub fn size_bytes(&self) -> usize {
        self.buffer.len()
    }
}

/// 저장 시 함께 기록하는 컨텍스트 태그 (분석 계층이 채움)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTags {
    /// 컨텍스트 이름 (게임/앱)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 장면 설명
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
    /// 자유 태그
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

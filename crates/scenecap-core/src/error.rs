//! SCENECAP 핵심 에러 타입.
//!
//! 캡처/이미지/저장소 어댑터 crate는 모두 `CoreError`를 반환한다.

use std::path::PathBuf;
use thiserror::Error;

/// 캡처 불가 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// OS 화면 기록 권한 거부 또는 미확인
    PermissionDenied,
    /// 서피스가 더 이상 존재하지 않음
    SurfaceMissing,
    /// OS 캡처 백엔드 실패
    Backend,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PermissionDenied => "권한 거부",
            Self::SurfaceMissing => "서피스 없음",
            Self::Backend => "백엔드 실패",
        };
        f.write_str(s)
    }
}

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 캡처 불가 (권한 거부, 서피스 소실, 백엔드 실패)
    #[error("캡처 불가 ({reason}) {surface_id}: {message}")]
    CaptureUnavailable {
        /// 대상 서피스 ID
        surface_id: String,
        /// 사유
        reason: UnavailableReason,
        /// 상세 메시지
        message: String,
    },

    /// 이미지 디코딩/인코딩 실패
    #[error("지원하지 않는 이미지: {0}")]
    UnsupportedImage(String),

    /// 변경 감지 입력 크기 불일치 (배선 결함)
    #[error("이미지 크기 불일치: {expected:?} != {actual:?}")]
    DimensionMismatch {
        /// 이전 이미지 크기
        expected: (u32, u32),
        /// 현재 이미지 크기
        actual: (u32, u32),
    },

    /// 초기화 전 호출
    #[error("초기화되지 않음: {0}")]
    NotInitialized(String),

    /// 저장소 파일 I/O 실패
    #[error("저장소 I/O 에러 ({}): {source}", path.display())]
    StorageIo {
        /// 대상 경로
        path: PathBuf,
        /// 원본 에러
        #[source]
        source: std::io::Error,
    },

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "StoredItem")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 경로 정보를 포함한 저장소 I/O 에러 생성
    pub fn storage_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageIo {
            path: path.into(),
            source,
        }
    }

    /// 권한 거부 여부: 호출자가 재시도 대신 권한 요청을 띄울 수 있도록 구분
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            Self::CaptureUnavailable {
                reason: UnavailableReason::PermissionDenied,
                ..
            }
        )
    }

    /// 이벤트 싱크에 실을 에러 분류 문자열
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CaptureUnavailable { .. } => "capture_unavailable",
            Self::UnsupportedImage(_) => "unsupported_image",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::NotInitialized(_) => "not_initialized",
            Self::StorageIo { .. } | Self::Io(_) => "storage_io",
            Self::Serialization(_) => "serialization",
            Self::Config(_) | Self::Validation { .. } => "config",
            Self::NotFound { .. } => "not_found",
            Self::Internal(_) => "internal",
        }
    }
}

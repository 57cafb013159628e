//! # scenecap-vision
//!
//! 캡처/이미지 처리 크레이트.
//! 스크린 캡처(xcap), 권한 조회, 미리보기 리사이즈와 인코딩,
//! 장면 변경 감지, 서피스별 직전 프레임 캐시, 캡처 파이프라인을 담당한다.

pub mod capture;
pub mod delta;
pub mod encoder;
pub mod frame_cache;
pub mod permission;
pub mod pipeline;
pub mod processor;
pub mod thumbnail;
pub mod trigger;

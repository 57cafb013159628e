//! # scenecap-storage
//!
//! 로컬 프레임 저장소 어댑터.
//! 수락된 프레임을 파일로 저장하고 JSON 메타데이터 인덱스로 추적하며,
//! 용량 한도(오래된 순 삭제)와 보존 기간(기본 30일)을 관리한다.
//!
//! ## 모듈
//! - `frame_storage`: 프레임 파일 저장소 (`FrameStore` 구현)
//! - `index`: `index.json` 로드/저장
//! - `naming`: 파일명 패턴과 폴더 정리 규칙

pub mod frame_storage;
pub mod index;
pub mod naming;

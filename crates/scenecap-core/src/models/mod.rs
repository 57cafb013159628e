//! SCENECAP 도메인 모델.
//!
//! 캡처 파이프라인, 이벤트 싱크, 저장소가 공유하는 데이터 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod event;
pub mod frame;
pub mod stored_item;
pub mod surface;

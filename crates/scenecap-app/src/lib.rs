//! SCENECAP 앱 오케스트레이션.
//!
//! 바이너리(`scenecap`)와 통합 테스트가 함께 쓰는 구성 요소.

pub mod event_bus;
pub mod in_flight;
pub mod lifecycle;
pub mod on_demand;
pub mod scheduler;
pub mod storage_sink;

//! scenecap-storage 성능 벤치마크
//!
//! 실행: cargo bench -p scenecap-storage
//!
//! 벤치마크 대상:
//! - 프레임 저장 (파일 쓰기 + 인덱스 기록)
//! - 용량 한도 적용 (오래된 순 삭제)
//! - 목록/통계 조회

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scenecap_core::config::{StorageConfig, StorageConfigPatch};
use scenecap_core::models::frame::{CapturedFrame, FrameMetadata, ImageFormat};
use scenecap_storage::frame_storage::FrameStorage;
use std::hint::black_box;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// 테스트용 프레임 생성
fn create_test_frame(size: usize) -> CapturedFrame {
    CapturedFrame {
        buffer: vec![0xAB; size],
        metadata: FrameMetadata {
            surface_id: "screen:1".to_string(),
            timestamp: Utc::now(),
            width: 1920,
            height: 1080,
            format: ImageFormat::Jpeg,
            is_scene_change: true,
            change_score: Some(0.4),
            is_on_demand: false,
            triggered_at: None,
        },
    }
}

/// 임시 저장소 생성
fn create_temp_storage(rt: &Runtime, max_total_bytes: u64) -> (FrameStorage, TempDir) {
    let temp_dir = TempDir::new().expect("임시 디렉토리 생성 실패");
    let storage = FrameStorage::new(StorageConfig {
        base_path: temp_dir.path().to_path_buf(),
        max_total_bytes,
        ..StorageConfig::default()
    });
    rt.block_on(storage.initialize()).expect("저장소 초기화 실패");
    (storage, temp_dir)
}

/// 저장 벤치마크 (인덱스 크기별)
fn bench_save(c: &mut Criterion) {
    let rt = Runtime::new().expect("런타임 생성 실패");
    let mut group = c.benchmark_group("frame_save");
    group.sample_size(20);

    for existing in [0usize, 100, 1000] {
        let (storage, _temp) = create_temp_storage(&rt, u64::MAX);
        let small = create_test_frame(1024);
        for _ in 0..existing {
            rt.block_on(storage.save(&small, None)).unwrap();
        }

        let frame = create_test_frame(200 * 1024);
        group.throughput(Throughput::Bytes(frame.buffer.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("200KB", format!("index_{existing}")),
            &frame,
            |b, frame| {
                b.iter(|| black_box(rt.block_on(storage.save(frame, None)).unwrap()));
            },
        );
    }

    group.finish();
}

/// 한도 축소 후 일괄 삭제 벤치마크
fn bench_enforce_limits(c: &mut Criterion) {
    let rt = Runtime::new().expect("런타임 생성 실패");
    let mut group = c.benchmark_group("enforce_limits");
    group.sample_size(10);

    for count in [100usize, 500] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::new("evict_half", count), |b| {
            b.iter_batched(
                || {
                    let (storage, temp) = create_temp_storage(&rt, u64::MAX);
                    let frame = create_test_frame(1024);
                    for _ in 0..count {
                        rt.block_on(storage.save(&frame, None)).unwrap();
                    }
                    (storage, temp)
                },
                |(storage, _temp)| {
                    let patch = StorageConfigPatch {
                        max_total_bytes: Some((count as u64 / 2) * 1024),
                        ..StorageConfigPatch::default()
                    };
                    rt.block_on(storage.update_config(patch)).unwrap();
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// 목록/통계 조회 벤치마크
fn bench_queries(c: &mut Criterion) {
    let rt = Runtime::new().expect("런타임 생성 실패");
    let (storage, _temp) = create_temp_storage(&rt, u64::MAX);
    let frame = create_test_frame(512);
    for _ in 0..1000 {
        rt.block_on(storage.save(&frame, None)).unwrap();
    }

    let mut group = c.benchmark_group("queries");
    group.bench_function("list_1000", |b| {
        b.iter(|| black_box(rt.block_on(storage.list()).unwrap()));
    });
    group.bench_function("stats_1000", |b| {
        b.iter(|| black_box(rt.block_on(storage.stats()).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_save, bench_enforce_limits, bench_queries);
criterion_main!(benches);

//! # scenecap
//!
//! 화면 캡처 에이전트 바이너리 진입점.
//! 구성 요소 조립, 스케줄러/온디맨드/저장소 싱크 오케스트레이션, 라이프사이클 관리.

use anyhow::{Context, Result};
use clap::Parser;
use scenecap_app::event_bus::EventBus;
use scenecap_app::lifecycle::LifecycleManager;
use scenecap_app::on_demand::OnDemandCapture;
use scenecap_app::scheduler::CaptureScheduler;
use scenecap_app::storage_sink::StorageSink;
use scenecap_core::config::{AppConfig, CaptureConfig};
use scenecap_core::config_manager::ConfigManager;
use scenecap_core::models::event::CaptureEvent;
use scenecap_storage::frame_storage::FrameStorage;
use scenecap_vision::capture::{FrameCapturer, ScreenCapture};
use scenecap_vision::permission::SystemPermissionProbe;
use scenecap_vision::pipeline::{CapturePipeline, CaptureTrigger};
use scenecap_vision::processor::ImageProcessor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// SCENECAP 화면 캡처 에이전트
///
/// 주기적으로 화면을 캡처하고 장면 변경을 감지해 저장한다
#[derive(Parser, Debug)]
#[command(name = "scenecap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 캡처 저장 경로 (설정의 storage.base_path 대체)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 캡처 주기 (밀리초)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// 캡처 대상 서피스 ID (반복 지정 가능, 예: screen:1)
    #[arg(long = "surface")]
    surfaces: Vec<String>,

    /// 캡처 가능한 서피스 목록 출력 후 종료
    #[arg(long)]
    list_surfaces: bool,

    /// 사이클 1회만 실행 후 종료
    #[arg(long)]
    once: bool,

    /// 저장하지 않음 (캡처/감지만)
    #[arg(long)]
    no_store: bool,

    /// 핫키 모드로 시작 (Unix: SIGUSR1로 트리거)
    #[arg(long)]
    hotkey: bool,

    /// 창을 제외하고 모니터만 열거/캡처
    #[arg(long)]
    monitors_only: bool,
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}

/// 설정 로드 후 CLI 인자 반영
fn load_config(args: &Args) -> Result<(ConfigManager, AppConfig)> {
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("설정 로드 실패")?;

    let mut config = manager.app_config();
    if let Some(dir) = &args.data_dir {
        config.storage.base_path = dir.clone();
    }
    if let Some(interval_ms) = args.interval_ms {
        config.capture.interval_ms = interval_ms;
    }
    if !args.surfaces.is_empty() {
        config.capture.active_surface_ids = args.surfaces.iter().cloned().collect();
    }
    if args.hotkey {
        config.on_demand.hotkey_enabled = true;
    }
    config.capture = config.capture.normalized();

    info!("설정 파일: {}", manager.config_path().display());
    Ok((manager, config))
}

fn build_pipeline(monitors_only: bool) -> Arc<CapturePipeline> {
    let source = if monitors_only {
        ScreenCapture::monitors_only()
    } else {
        ScreenCapture::new()
    };
    let capturer = FrameCapturer::new(Arc::new(source), Arc::new(SystemPermissionProbe::new()));
    Arc::new(CapturePipeline::new(capturer, ImageProcessor::new()))
}

async fn open_storage(config: &AppConfig) -> Result<Arc<FrameStorage>> {
    let storage = Arc::new(FrameStorage::new(config.storage.clone()));
    storage.initialize().await.with_context(|| {
        format!(
            "저장소 초기화 실패: {}",
            config.storage.base_path.display()
        )
    })?;
    Ok(storage)
}

/// 에러 이벤트 로깅 태스크
fn spawn_error_logger(mut events: broadcast::Receiver<CaptureEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(CaptureEvent::Error(body)) if body.permission_required => {
                    warn!("화면 기록 권한이 필요합니다: {}", body.message);
                }
                Ok(CaptureEvent::Error(body)) => {
                    warn!(
                        "캡처 실패 [{}] {}: {}",
                        body.kind,
                        body.surface_id.as_deref().unwrap_or("-"),
                        body.message
                    );
                }
                Ok(CaptureEvent::Frame(_)) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn list_surfaces(pipeline: &CapturePipeline) -> Result<()> {
    let surfaces = pipeline
        .list_surfaces()
        .await
        .context("서피스 열거 실패")?;
    for surface in &surfaces {
        println!("{}", serde_json::to_string(surface)?);
    }
    Ok(())
}

/// 사이클 1회 실행 (스케줄러 없이)
async fn run_once(
    pipeline: &CapturePipeline,
    capture: &CaptureConfig,
    storage: Option<Arc<FrameStorage>>,
) -> Result<()> {
    let report = pipeline.run_cycle(capture, CaptureTrigger::Scheduled).await;
    for failure in &report.failures {
        warn!(
            "캡처 실패 {}: {}",
            failure.surface_id.as_deref().unwrap_or("-"),
            failure.error
        );
    }

    if let Some(storage) = storage {
        let sink = StorageSink::new(storage);
        for frame in &report.frames {
            if let Some(item) = sink.handle_frame(frame).await? {
                println!("{}", item.file_path.display());
            }
        }
    }

    info!(
        "1회 캡처 완료: 프레임 {}, 실패 {}",
        report.frames.len(),
        report.failures.len()
    );
    if report.frames.is_empty() && report.permission_denied() {
        anyhow::bail!("화면 기록 권한 없음");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("SCENECAP 시작 (v{})", env!("CARGO_PKG_VERSION"));

    let (config_manager, config) = load_config(&args)?;
    let pipeline = build_pipeline(args.monitors_only);

    if args.list_surfaces {
        return list_surfaces(&pipeline).await;
    }

    let storage = if args.no_store {
        info!("저장 비활성 (--no-store)");
        None
    } else {
        Some(open_storage(&config).await?)
    };

    if args.once {
        return run_once(&pipeline, &config.capture, storage).await;
    }

    let lifecycle = LifecycleManager::new();
    let bus = EventBus::default();

    let error_logger = spawn_error_logger(bus.subscribe());
    let sink_task = storage.map(|storage| {
        StorageSink::new(storage).spawn(
            bus.subscribe(),
            lifecycle.subscribe(),
            config.cleanup_interval(),
        )
    });

    let scheduler = CaptureScheduler::new(pipeline.clone(), bus.clone(), config.capture.clone())
        .with_config_store(Arc::new(config_manager));
    let on_demand = Arc::new(OnDemandCapture::new(
        pipeline.clone(),
        bus.clone(),
        scheduler.shared_config(),
        &config.on_demand,
    ));

    let hotkey_task = match lifecycle.watch_hotkey_signal(on_demand.clone()) {
        Ok(task) => Some(task),
        Err(e) => {
            warn!("핫키 시그널 등록 실패: {e}");
            None
        }
    };

    scheduler.start(None).await;

    if let Err(e) = lifecycle.wait_for_signal().await {
        error!("시그널 대기 실패: {e}");
        lifecycle.shutdown();
    }

    scheduler.stop().await;
    if let Some(task) = hotkey_task {
        let _ = task.await;
    }
    if let Some(task) = sink_task {
        if let Err(e) = task.await {
            error!("저장소 싱크 종료 실패: {e}");
        }
    }
    error_logger.abort();

    info!(
        "SCENECAP 종료 (완료된 사이클 {})",
        scheduler.completed_cycles()
    );
    Ok(())
}

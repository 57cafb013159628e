//! 라이프사이클 관리.
//!
//! 시작/종료, 시그널 핸들링. Unix에서는 SIGUSR1을 핫키 트리거로 사용한다.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::on_demand::OnDemandCapture;

/// 라이프사이클 관리자
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl LifecycleManager {
    /// 새 라이프사이클 관리자 생성
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    /// 종료 수신기 복제
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// 종료 신호 발송
    pub fn shutdown(&self) {
        info!("종료 신호 발송");
        let _ = self.shutdown_tx.send(true);
    }

    /// OS 시그널 대기 (SIGINT, SIGTERM)
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigterm = signal(SignalKind::terminate())?;

            tokio::select! {
                _ = sigint.recv() => {
                    info!("SIGINT 수신");
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM 수신");
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            info!("Ctrl+C 수신");
        }

        self.shutdown();
        Ok(())
    }

    /// SIGUSR1 → 핫키 트리거 (종료 신호까지)
    #[cfg(unix)]
    pub fn watch_hotkey_signal(
        &self,
        on_demand: Arc<OnDemandCapture>,
    ) -> std::io::Result<JoinHandle<()>> {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigusr1 = signal(SignalKind::user_defined1())?;
        let mut shutdown_rx = self.subscribe();

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = sigusr1.recv() => {
                        if received.is_none() {
                            break;
                        }
                        debug!("SIGUSR1 수신");
                        let frames = on_demand.handle_hotkey().await;
                        debug!("핫키 캡처 프레임 {}개", frames.len());
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        }))
    }

    /// 핫키 시그널이 없는 플랫폼
    #[cfg(not(unix))]
    pub fn watch_hotkey_signal(
        &self,
        _on_demand: Arc<OnDemandCapture>,
    ) -> std::io::Result<JoinHandle<()>> {
        debug!("이 플랫폼에서는 핫키 시그널 미지원");
        Ok(tokio::spawn(async {}))
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

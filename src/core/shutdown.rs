//! 优雅关闭
//!
//! Ctrl+C / SIGTERM 触发取消 token；主流程结束后停止全部轮询，正在执行的 tick 自然结束，
//! 之后不再安排新的 tick。

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::core::PollingControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM
    Signal,
    /// 主流程自行结束（如 Store 已释放）
    Finished,
}

/// 关闭信号：取消 token + 首次触发的原因
#[derive(Clone, Default)]
pub struct ShutdownManager {
    token: CancellationToken,
    reason: Arc<Mutex<Option<ShutdownReason>>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用于取消正在进行的任务
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 触发关闭；只记录第一次的原因
    pub fn shutdown(&self, reason: ShutdownReason) {
        let mut recorded = self.reason.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if recorded.is_none() {
            tracing::info!(?reason, "shutdown requested");
            *recorded = Some(reason);
        }
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.reason.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                manager.shutdown(ShutdownReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let manager = self.clone();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    manager.shutdown(ShutdownReason::Signal);
                }
            });
        }
    }
}

/// 关闭时终止全部 Scheduler；此后 resume（包括进行中的 halt / resume 结束时）不会再恢复轮询
pub fn stop_polling(polling: &PollingControl) {
    polling.stop();
    tracing::info!("Polling stopped");
}

/// 运行主流程直到其结束或收到关闭信号，执行清理后返回关闭原因
pub async fn run_with_graceful_shutdown<F, Fut>(
    shutdown: Arc<ShutdownManager>,
    app: F,
    cleanup: impl FnOnce() -> Fut,
) -> ShutdownReason
where
    F: Future<Output = ()>,
    Fut: Future<Output = ()>,
{
    shutdown.install_signal_handlers();

    tokio::select! {
        _ = app => shutdown.shutdown(ShutdownReason::Finished),
        _ = shutdown.token.cancelled() => {}
    }

    cleanup().await;
    shutdown.reason().unwrap_or(ShutdownReason::Finished)
}

//! Orca - 编排平台管理台的远端数据同步核心
//!
//! 入口：加载配置、初始化日志、组装依赖，持续轮询当前环境的服务目录、实例、agent 与编译报告，
//! 记录每次状态变化，直到收到关闭信号。

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use orca::config::load_config;
use orca::core::{run_with_graceful_shutdown, stop_polling, Injector, ShutdownManager};
use orca::domain::{GetAgents, GetCompileReports, GetServiceInstances, GetServices};
use orca::query::{indicator_text, Query, QueryHandle};
use tokio_util::sync::CancellationToken;

/// 等待句柄状态变化并记录，直到取消
async fn watch<Q: Query>(
    mut handle: QueryHandle<Q>,
    token: CancellationToken,
    describe: impl Fn(&Q::Usage) -> String,
) {
    loop {
        handle.data().fold(
            || tracing::debug!(kind = Q::KIND, "not asked"),
            || tracing::debug!(kind = Q::KIND, "loading"),
            |e| tracing::warn!(kind = Q::KIND, error = %e, "failed"),
            |usage| tracing::info!(kind = Q::KIND, "{}", describe(&usage)),
        );
        tokio::select! {
            changed = handle.changed() => {
                if !changed {
                    break;
                }
            }
            _ = token.cancelled() => break,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orca::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;
    let injector = Injector::from_config(&config).context("Failed to build injector")?;
    if injector.environment.current().is_none() {
        tracing::warn!("No environment selected; set api.environment or ORCA__API__ENVIRONMENT");
    }

    let services = injector
        .queries
        .use_continuous(GetServices)
        .context("Failed to poll services")?;
    let agents = injector
        .queries
        .use_continuous(GetAgents::default())
        .context("Failed to poll agents")?;
    let reports = injector
        .queries
        .use_continuous(GetCompileReports::default())
        .context("Failed to poll compile reports")?;

    let shutdown = Arc::new(ShutdownManager::new());
    let token = shutdown.token();
    let polling = injector.polling.clone();

    let app = async move {
        tokio::spawn(watch(agents, token.clone(), |paged| {
            format!("agents {}", indicator_text(&paged.metadata))
        }));
        tokio::spawn(watch(reports, token.clone(), |paged| {
            let failed = paged
                .data
                .iter()
                .filter(|r| r.status() == orca::domain::CompileStatus::Failed)
                .count();
            format!("compile reports {} ({failed} failed)", indicator_text(&paged.metadata))
        }));

        // 服务目录出现新服务时开始轮询其实例
        let mut services = services;
        let mut watched = HashSet::new();
        loop {
            if let Some(catalog) = services.data().success_ref() {
                for service in catalog {
                    if !watched.insert(service.name.clone()) {
                        continue;
                    }
                    match injector
                        .queries
                        .use_continuous(GetServiceInstances::new(service.name.clone()))
                    {
                        Ok(handle) => {
                            let name = service.name.clone();
                            tokio::spawn(watch(handle, token.clone(), move |paged| {
                                format!("{name} instances {}", indicator_text(&paged.metadata))
                            }));
                        }
                        Err(e) => tracing::warn!(service = %service.name, error = %e, "skip instances"),
                    }
                }
            }
            tokio::select! {
                changed = services.changed() => {
                    if !changed {
                        break;
                    }
                }
                _ = token.cancelled() => break,
            }
        }
    };

    let reason =
        run_with_graceful_shutdown(shutdown, app, || async move { stop_polling(&polling) }).await;
    tracing::info!(?reason, "orca stopped");
    Ok(())
}

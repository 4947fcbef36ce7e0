//! 依赖组装：统一创建 ApiHelper、Store、Scheduler 与全部 Manager
//!
//! 所有 Manager 共享同一个 Store 与 EnvironmentHandler；轮询分两档：
//! 快档（实例、agent、编译报告等）和慢档（服务目录、环境详情）。

use std::sync::Arc;

use crate::api::{ApiHelper, HttpApiHelper};
use crate::command::{Command, CommandManagerImpl, CommandResolver};
use crate::config::AppConfig;
use crate::core::{CoreError, EnvironmentHandler, PollingControl, Scheduler, Store};
use crate::domain::{
    ControlAgent, CreateInstance, DeleteInstance, GetAgents, GetCompileReports,
    GetEnvironmentDetails, GetServiceInstances, GetServices, HaltEnvironment, ResumeEnvironment,
    TriggerInstanceUpdate, TriggerSetState, UpdateInstanceAttribute,
};
use crate::query::{
    ContinuousQueryManager, OneTimeQueryManager, Query, QueryResolver, ReadOnlyQueryManager,
};

/// 组装完成的依赖
#[derive(Clone)]
pub struct Injector {
    pub api: Arc<dyn ApiHelper>,
    pub store: Store,
    pub environment: EnvironmentHandler,
    pub scheduler: Scheduler,
    pub slow_scheduler: Scheduler,
    pub polling: PollingControl,
    pub queries: QueryResolver,
    pub commands: CommandResolver,
}

impl Injector {
    /// 用真实 HTTP 客户端组装
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let api = Arc::new(HttpApiHelper::from_config(&config.api)?);
        Ok(Self::with_api(api, config))
    }

    /// 用给定的 ApiHelper 组装（测试时传入 Mock）
    pub fn with_api(api: Arc<dyn ApiHelper>, config: &AppConfig) -> Self {
        let store = Store::new();
        let environment = EnvironmentHandler::new(config.api.environment.clone());
        let scheduler = Scheduler::new("main", config.polling.delay());
        let slow_scheduler = Scheduler::new("slow", config.polling.slow_delay());
        let polling = PollingControl::new(vec![scheduler.clone(), slow_scheduler.clone()]);

        let mut injector = Self {
            api,
            store,
            environment,
            scheduler,
            slow_scheduler,
            polling,
            queries: QueryResolver::new(),
            commands: CommandResolver::new(),
        };

        let fast = injector.scheduler.clone();
        let slow = injector.slow_scheduler.clone();
        injector.register_query::<GetServices>(&slow);
        injector.register_query::<GetEnvironmentDetails>(&slow);
        injector.register_query::<GetServiceInstances>(&fast);
        injector.register_query::<GetAgents>(&fast);
        injector.register_query::<GetCompileReports>(&fast);

        injector.register_command::<CreateInstance>();
        injector.register_command::<TriggerInstanceUpdate>();
        injector.register_command::<UpdateInstanceAttribute>();
        injector.register_command::<DeleteInstance>();
        injector.register_command::<TriggerSetState>();
        injector.register_command::<ControlAgent>();
        injector.register_command::<HaltEnvironment>();
        injector.register_command::<ResumeEnvironment>();

        tracing::info!(
            queries = injector.queries.len(),
            commands = injector.commands.len(),
            environment = ?injector.environment.current(),
            "injector ready"
        );
        injector
    }

    /// 为一种 Query 注册三种读取方式
    fn register_query<Q: Query>(&mut self, scheduler: &Scheduler) {
        self.queries.register(OneTimeQueryManager::<Q>::new(
            Arc::clone(&self.api),
            self.store.clone(),
            self.environment.clone(),
        ));
        self.queries.register(ContinuousQueryManager::<Q>::new(
            Arc::clone(&self.api),
            self.store.clone(),
            self.environment.clone(),
            scheduler.clone(),
        ));
        self.queries.register(ReadOnlyQueryManager::<Q>::new(
            self.store.clone(),
            self.environment.clone(),
        ));
    }

    fn register_command<C: Command>(&mut self) {
        self.commands.register(CommandManagerImpl::<C>::new(
            Arc::clone(&self.api),
            self.environment.clone(),
            self.polling.clone(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::api::MockApiHelper;
    use crate::domain::AgentAction;

    #[test]
    fn test_every_kind_is_registered() {
        let injector = Injector::with_api(Arc::new(MockApiHelper::new()), &AppConfig::default());
        assert_eq!(injector.queries.len(), 15);
        assert_eq!(injector.commands.len(), 8);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.polling.delay_ms = 0;
        assert!(matches!(
            Injector::from_config(&config),
            Err(CoreError::InvalidOption { .. })
        ));
    }

    #[tokio::test]
    async fn test_commands_use_current_environment() {
        let api = MockApiHelper::new();
        api.respond("POST", "/api/v2/agent/internal/unpause", Ok(json!(null)));
        let mut config = AppConfig::default();
        config.api.environment = Some("env-1".to_string());
        let injector = Injector::with_api(Arc::new(api.clone()), &config);

        let trigger = injector
            .commands
            .get_trigger(ControlAgent {
                name: "internal".to_string(),
            })
            .unwrap();
        assert!(trigger(AgentAction::Unpause).await.is_ok());
        assert_eq!(api.calls()[0].environment.as_deref(), Some("env-1"));
    }
}

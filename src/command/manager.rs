//! 命令 Manager：把一种 Command 绑定到 ApiHelper、当前环境与轮询控制

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::api::ApiHelper;
use crate::command::{Command, CommandContext, Trigger};
use crate::core::{EnvironmentHandler, PollingControl};

/// Resolver 线性扫描时看到的统一接口
pub trait CommandManager: Send + Sync {
    fn matches(&self, kind: &str) -> bool;

    fn as_any(&self) -> &dyn Any;
}

pub struct CommandManagerImpl<C: Command> {
    api: Arc<dyn ApiHelper>,
    environment: EnvironmentHandler,
    polling: PollingControl,
    _command: PhantomData<fn() -> C>,
}

impl<C: Command> CommandManagerImpl<C> {
    pub fn new(
        api: Arc<dyn ApiHelper>,
        environment: EnvironmentHandler,
        polling: PollingControl,
    ) -> Self {
        Self {
            api,
            environment,
            polling,
            _command: PhantomData,
        }
    }

    /// 环境在取 trigger 时确定，之后切换环境不影响已取得的 trigger
    pub fn get_trigger(&self, command: C) -> Trigger<C::Input, C::Data> {
        let ctx = CommandContext {
            api: Arc::clone(&self.api),
            environment: self.environment.current(),
            polling: self.polling.clone(),
        };
        let command = Arc::new(command);
        Arc::new(move |input| {
            let command = Arc::clone(&command);
            let ctx = ctx.clone();
            async move {
                tracing::info!(kind = C::KIND, environment = ?ctx.environment, "trigger command");
                let result = command.execute(&ctx, input).await;
                if let Err(e) = &result {
                    tracing::warn!(kind = C::KIND, error = %e, "command failed");
                }
                result
            }
            .boxed()
        })
    }
}

impl<C: Command> CommandManager for CommandManagerImpl<C> {
    fn matches(&self, kind: &str) -> bool {
        kind == C::KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

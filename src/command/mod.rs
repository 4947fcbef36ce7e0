//! 命令层：写操作（创建 / 更新 / 删除 / 触发）的定义、Manager 与 Resolver
//!
//! 每个 Command 产出一个 Trigger：`Fn(Input) -> Future<Result<Data, ApiError>>`，调用方决定何时触发。

pub mod manager;
pub mod resolver;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::api::ApiHelper;
use crate::core::{ApiError, PollingControl};

pub use manager::{CommandManager, CommandManagerImpl};
pub use resolver::CommandResolver;

/// 触发函数
pub type Trigger<I, D> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<D, ApiError>> + Send + Sync>;

/// 命令执行时可用的依赖
#[derive(Clone)]
pub struct CommandContext {
    pub api: Arc<dyn ApiHelper>,
    pub environment: Option<String>,
    pub polling: PollingControl,
}

/// 一种写操作
#[async_trait]
pub trait Command: Send + Sync + 'static {
    const KIND: &'static str;

    /// 触发时传入的参数
    type Input: Send + 'static;
    type Data: Send + 'static;

    async fn execute(&self, ctx: &CommandContext, input: Self::Input) -> Result<Self::Data, ApiError>;
}

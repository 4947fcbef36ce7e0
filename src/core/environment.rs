//! 当前环境：按环境作用域的查询与命令从这里取环境 id

use std::sync::{Arc, RwLock};

#[derive(Clone, Debug, Default)]
pub struct EnvironmentHandler {
    current: Arc<RwLock<Option<String>>>,
}

impl EnvironmentHandler {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.current
            .read()
            .map(|env| env.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// 切换环境；已有句柄保持原环境，新的 use_* 调用使用新环境
    pub fn set(&self, environment: Option<String>) {
        tracing::info!(environment = ?environment, "switch environment");
        match self.current.write() {
            Ok(mut env) => *env = environment,
            Err(poisoned) => *poisoned.into_inner() = environment,
        }
    }
}

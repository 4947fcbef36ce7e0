//! 核心错误类型
//!
//! 两类错误严格分开：
//! - **ApiError**：远端失败（HTTP 错误、网络、解码），作为值放进 `Result` / `RemoteData::Failed`，从不 panic；
//! - **CoreError**：使用方式错误（重复注册任务、找不到 Manager、非法配置），同步返回给调用方，开发期即暴露。

use thiserror::Error;

use crate::query::FetchMode;

/// 远端请求失败（可恢复，由 UI 渲染重试入口）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 服务端返回非 2xx；message 取自响应体的 message 字段（没有则为原始文本）
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

/// 编程 / 配置错误（不可恢复，直接返回给调用方）
#[derive(Error, Debug)]
pub enum CoreError {
    /// 同一 id 重复注册轮询任务
    #[error("Task with id '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Can't find {mode}QueryManager for query {kind}")]
    NoQueryManager { kind: String, mode: FetchMode },

    #[error("Can't find CommandManager for command {0}")]
    NoCommandManager(String),

    /// matches 返回 true，但 Manager 的具体类型与请求的 Query / Command 不一致
    #[error("Manager matched {0} but has an unexpected type")]
    ManagerMismatch(String),

    #[error("Invalid option {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_query_manager_message() {
        let err = CoreError::NoQueryManager {
            kind: "GetAgents".to_string(),
            mode: FetchMode::Continuous,
        };
        assert_eq!(
            err.to_string(),
            "Can't find ContinuousQueryManager for query GetAgents"
        );
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Http {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: not found");
    }
}

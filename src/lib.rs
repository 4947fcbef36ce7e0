//! Orca - 编排平台管理台的远端数据同步核心
//!
//! 模块划分：
//! - **api**: API 客户端抽象与实现（reqwest / Mock）
//! - **command**: 写操作：Command、Trigger、Manager 与 Resolver
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: RemoteData、错误、共享状态、轮询调度、依赖组装、优雅关闭
//! - **domain**: 具体资源：服务目录、实例、agent、编译报告、环境；属性清洗与差异
//! - **observability**: 日志初始化
//! - **query**: 读操作：Query、三种 Manager、Resolver 与分页

pub mod api;
pub mod command;
pub mod config;
pub mod core;
pub mod domain;
pub mod observability;
pub mod query;

pub use crate::core::{ApiError, CoreError, Injector, RemoteData};

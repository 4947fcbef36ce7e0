//! 具体的 Query / Command 种类：服务目录、服务实例、agent、编译报告、环境
//!
//! 核心层（core / query / command）只依赖 trait，这里提供编排平台的具体资源。

pub mod agents;
pub mod attributes;
pub mod compile;
pub mod environment;
pub mod instance;
pub mod service;

use serde::{Deserialize, Serialize};

use crate::api::decode;
use crate::core::ApiError;

pub use agents::{Agent, AgentAction, AgentStatus, ControlAgent, GetAgents};
pub use attributes::{
    attribute_diff, create_instance_attributes, ensure_attribute_type, sanitize_attributes,
    Attributes, Field, MAX_NESTING_DEPTH,
};
pub use compile::{CompileReport, CompileStatus, GetCompileReports};
pub use environment::{EnvironmentDetails, GetEnvironmentDetails, HaltEnvironment, ResumeEnvironment};
pub use instance::{
    AttributeSet, CreateInstance, DeleteInstance, GetServiceInstances, ServiceInstance,
    TriggerInstanceUpdate, TriggerSetState, UpdateInstanceAttribute,
};
pub use service::{AttributeModel, EmbeddedEntity, FieldPurpose, GetServices, ServiceModel};

/// 非分页接口的响应外壳：`{ "data": ... }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// 解码 `{ "data": ... }` 并取出 data
pub(crate) fn unwrap_envelope<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> Result<T, ApiError> {
    decode::<Envelope<T>>(value).map(|envelope| envelope.data)
}

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: u32 = 20;

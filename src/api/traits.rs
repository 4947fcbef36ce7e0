//! API 客户端抽象
//!
//! 所有后端（HTTP / Mock）实现 ApiHelper：get / post / patch / delete，可选携带环境 id。
//! 远端失败一律以 `Err(ApiError)` 返回，不 panic。

use async_trait::async_trait;
use serde_json::Value;

use crate::core::ApiError;

#[async_trait]
pub trait ApiHelper: Send + Sync {
    async fn get(&self, url: &str, environment: Option<&str>) -> Result<Value, ApiError>;

    async fn post(
        &self,
        url: &str,
        environment: Option<&str>,
        body: Value,
    ) -> Result<Value, ApiError>;

    async fn patch(
        &self,
        url: &str,
        environment: Option<&str>,
        body: Value,
    ) -> Result<Value, ApiError>;

    async fn delete(&self, url: &str, environment: Option<&str>) -> Result<Value, ApiError>;
}

/// 把 JSON 解码成具体类型，失败转为 ApiError::Decode
pub fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

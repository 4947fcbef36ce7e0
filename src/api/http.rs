//! 基于 reqwest 的 ApiHelper 实现
//!
//! 所有请求拼接 base_url，带超时；有环境 id 时通过可配置的请求头传递。
//! 非 2xx 响应转为 ApiError::Http，message 优先取响应体 JSON 的 message 字段。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;

use crate::api::ApiHelper;
use crate::config::ApiSection;
use crate::core::{ApiError, CoreError};

pub struct HttpApiHelper {
    client: Client,
    base_url: String,
    environment_header: String,
}

impl HttpApiHelper {
    pub fn new(base_url: &str, timeout_secs: u64, environment_header: &str) -> Result<Self, CoreError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CoreError::InvalidOption {
                name: "api.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CoreError::InvalidOption {
                name: "api".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url,
            environment_header: environment_header.to_string(),
        })
    }

    pub fn from_config(api: &ApiSection) -> Result<Self, CoreError> {
        Self::new(&api.base_url, api.timeout_secs, &api.environment_header)
    }

    fn full_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        environment: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let full_url = self.full_url(url);
        let mut request = self.client.request(method.clone(), &full_url);
        if let Some(env) = environment {
            request = request.header(self.environment_header.as_str(), env);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request.send().await.map_err(|e| {
            tracing::warn!(%method, url = %full_url, error = %e, "request failed");
            ApiError::Network(e.to_string())
        })?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(%method, url = %full_url, status = status.as_u16(), "request rejected");
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// 错误响应体：{"message": "..."} 取 message，否则原样返回
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ApiHelper for HttpApiHelper {
    async fn get(&self, url: &str, environment: Option<&str>) -> Result<Value, ApiError> {
        self.send(Method::GET, url, environment, None).await
    }

    async fn post(
        &self,
        url: &str,
        environment: Option<&str>,
        body: Value,
    ) -> Result<Value, ApiError> {
        self.send(Method::POST, url, environment, Some(body)).await
    }

    async fn patch(
        &self,
        url: &str,
        environment: Option<&str>,
        body: Value,
    ) -> Result<Value, ApiError> {
        self.send(Method::PATCH, url, environment, Some(body)).await
    }

    async fn delete(&self, url: &str, environment: Option<&str>) -> Result<Value, ApiError> {
        self.send(Method::DELETE, url, environment, None).await
    }
}

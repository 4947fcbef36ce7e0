//! Mock API（用于测试，无需服务端）
//!
//! 按 (方法, URL) 返回预设响应，并记录每次调用；未预设的请求返回 HTTP 404。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::api::ApiHelper;
use crate::core::ApiError;

/// 一次被记录的调用
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub environment: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct MockState {
    responses: HashMap<(&'static str, String), Result<Value, ApiError>>,
    calls: Vec<RecordedCall>,
}

#[derive(Clone, Default)]
pub struct MockApiHelper {
    state: Arc<Mutex<MockState>>,
}

impl MockApiHelper {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 预设响应；同一 (方法, URL) 再次调用会覆盖
    pub fn respond(&self, method: &'static str, url: &str, result: Result<Value, ApiError>) {
        self.state().responses.insert((method, url.to_string()), result);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, method: &str, url: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.method == method && c.url == url)
            .count()
    }

    fn handle(
        &self,
        method: &'static str,
        url: &str,
        environment: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut state = self.state();
        state.calls.push(RecordedCall {
            method,
            url: url.to_string(),
            environment: environment.map(String::from),
            body,
        });
        state
            .responses
            .get(&(method, url.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Http {
                    status: 404,
                    message: format!("No mock response for {method} {url}"),
                })
            })
    }
}

#[async_trait]
impl ApiHelper for MockApiHelper {
    async fn get(&self, url: &str, environment: Option<&str>) -> Result<Value, ApiError> {
        self.handle("GET", url, environment, None)
    }

    async fn post(
        &self,
        url: &str,
        environment: Option<&str>,
        body: Value,
    ) -> Result<Value, ApiError> {
        self.handle("POST", url, environment, Some(body))
    }

    async fn patch(
        &self,
        url: &str,
        environment: Option<&str>,
        body: Value,
    ) -> Result<Value, ApiError> {
        self.handle("PATCH", url, environment, Some(body))
    }

    async fn delete(&self, url: &str, environment: Option<&str>) -> Result<Value, ApiError> {
        self.handle("DELETE", url, environment, None)
    }
}

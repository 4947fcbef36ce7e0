//! 环境：详情查询与 halt / resume
//!
//! halt / resume 请求期间暂停全部轮询，避免在环境状态切换的中途读到不一致的数据。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandContext};
use crate::core::ApiError;
use crate::domain::Envelope;
use crate::query::{Query, Scope, UsageContext};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDetails {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub repo_branch: String,
    #[serde(default)]
    pub halted: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// 环境详情；key 不按当前环境区分
#[derive(Clone, Debug, Serialize)]
pub struct GetEnvironmentDetails {
    pub id: String,
}

impl Query for GetEnvironmentDetails {
    const KIND: &'static str = "GetEnvironmentDetails";
    const SCOPE: Scope = Scope::Global;
    type Data = Envelope<EnvironmentDetails>;
    type Usage = EnvironmentDetails;

    fn url(&self) -> String {
        format!("/api/v2/environment/{}?details=true", self.id)
    }

    fn to_usage(&self, data: Self::Data, _ctx: &UsageContext) -> Self::Usage {
        data.data
    }
}

async fn environment_action(ctx: &CommandContext, action: &str) -> Result<(), ApiError> {
    let url = format!("/api/v2/actions/environment/{action}");
    let request = ctx
        .api
        .post(&url, ctx.environment.as_deref(), serde_json::json!({}));
    ctx.polling.pause_while(request).await?;
    Ok(())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HaltEnvironment;

#[async_trait]
impl Command for HaltEnvironment {
    const KIND: &'static str = "HaltEnvironment";
    type Input = ();
    type Data = ();

    async fn execute(&self, ctx: &CommandContext, _input: ()) -> Result<(), ApiError> {
        environment_action(ctx, "halt").await
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ResumeEnvironment;

#[async_trait]
impl Command for ResumeEnvironment {
    const KIND: &'static str = "ResumeEnvironment";
    type Input = ();
    type Data = ();

    async fn execute(&self, ctx: &CommandContext, _input: ()) -> Result<(), ApiError> {
        environment_action(ctx, "resume").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::{json, Value};

    use crate::api::ApiHelper;
    use crate::core::{PollingControl, Scheduler};

    /// 记录请求发出时轮询是否处于暂停
    struct ObservingApi {
        polling: PollingControl,
        paused_during_call: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl ApiHelper for ObservingApi {
        async fn get(&self, _url: &str, _env: Option<&str>) -> Result<Value, ApiError> {
            Ok(Value::Null)
        }

        async fn post(&self, url: &str, _env: Option<&str>, _body: Value) -> Result<Value, ApiError> {
            self.paused_during_call
                .lock()
                .unwrap()
                .push(self.polling.is_paused());
            if url.ends_with("resume") {
                return Err(ApiError::Network("connection reset".to_string()));
            }
            Ok(json!({}))
        }

        async fn patch(&self, _url: &str, _env: Option<&str>, _body: Value) -> Result<Value, ApiError> {
            Ok(Value::Null)
        }

        async fn delete(&self, _url: &str, _env: Option<&str>) -> Result<Value, ApiError> {
            Ok(Value::Null)
        }
    }

    fn setup() -> (Arc<ObservingApi>, CommandContext) {
        let polling = PollingControl::new(vec![
            Scheduler::new("fast", Duration::from_millis(5000)),
            Scheduler::new("slow", Duration::from_millis(30000)),
        ]);
        let api = Arc::new(ObservingApi {
            polling: polling.clone(),
            paused_during_call: Mutex::new(Vec::new()),
        });
        let ctx = CommandContext {
            api: api.clone(),
            environment: Some("env-1".to_string()),
            polling,
        };
        (api, ctx)
    }

    #[tokio::test]
    async fn test_halt_pauses_polling_while_in_flight() {
        let (api, ctx) = setup();
        assert!(!ctx.polling.is_paused());

        HaltEnvironment.execute(&ctx, ()).await.unwrap();

        assert_eq!(*api.paused_during_call.lock().unwrap(), vec![true]);
        assert!(!ctx.polling.is_paused());
    }

    #[tokio::test]
    async fn test_resume_restores_polling_on_failure() {
        let (api, ctx) = setup();
        let result = ResumeEnvironment.execute(&ctx, ()).await;
        assert!(matches!(result, Err(ApiError::Network(_))));
        assert_eq!(*api.paused_during_call.lock().unwrap(), vec![true]);
        assert!(!ctx.polling.is_paused());
    }

    #[test]
    fn test_details_key_ignores_environment() {
        let query = GetEnvironmentDetails {
            id: "env-1".to_string(),
        };
        assert_eq!(query.url(), "/api/v2/environment/env-1?details=true");
        assert_eq!(
            crate::core::canonical_key(&query, Some("a")),
            crate::core::canonical_key(&query, Some("b"))
        );
    }
}

//! Agent：分页列表与暂停 / 恢复

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandContext};
use crate::core::ApiError;
use crate::domain::DEFAULT_PAGE_SIZE;
use crate::query::{PageCursor, PagedData, Paginated, Query, UrlHelper, UsageContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Up,
    Down,
    Paused,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    pub environment: String,
    pub status: AgentStatus,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub process_name: Option<String>,
    #[serde(default)]
    pub last_failover: Option<String>,
    #[serde(default)]
    pub unpause_on_resume: Option<bool>,
}

/// 当前环境的 agent 列表（分页）
#[derive(Clone, Debug, Serialize)]
pub struct GetAgents {
    pub page: Option<PageCursor>,
    pub page_size: u32,
    pub status: Option<AgentStatus>,
}

impl Default for GetAgents {
    fn default() -> Self {
        Self {
            page: None,
            page_size: DEFAULT_PAGE_SIZE,
            status: None,
        }
    }
}

impl Query for GetAgents {
    const KIND: &'static str = "GetAgents";
    type Data = Paginated<Agent>;
    type Usage = PagedData<Agent>;

    fn url(&self) -> String {
        const BASE: &str = "/api/v2/agents";
        if self.page.is_some() {
            return UrlHelper::with_page(BASE, self.page.as_ref());
        }
        let mut url = format!("{BASE}?limit={}&sort=name.asc", self.page_size);
        if let Some(status) = self.status {
            let status = match status {
                AgentStatus::Up => "up",
                AgentStatus::Down => "down",
                AgentStatus::Paused => "paused",
            };
            url.push_str(&format!("&filter.status={status}"));
        }
        url
    }

    fn to_usage(&self, data: Self::Data, ctx: &UsageContext) -> Self::Usage {
        PagedData::from_response(data, ctx)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentAction {
    Pause,
    Unpause,
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentAction::Pause => f.write_str("pause"),
            AgentAction::Unpause => f.write_str("unpause"),
        }
    }
}

/// 暂停 / 恢复单个 agent；输入为动作
#[derive(Clone, Debug)]
pub struct ControlAgent {
    pub name: String,
}

#[async_trait]
impl Command for ControlAgent {
    const KIND: &'static str = "ControlAgent";
    type Input = AgentAction;
    type Data = ();

    async fn execute(&self, ctx: &CommandContext, action: AgentAction) -> Result<(), ApiError> {
        let url = format!("/api/v2/agent/{}/{action}", self.name);
        ctx.api
            .post(&url, ctx.environment.as_deref(), serde_json::json!({}))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::api::MockApiHelper;
    use crate::core::PollingControl;

    #[test]
    fn test_agents_url() {
        assert_eq!(GetAgents::default().url(), "/api/v2/agents?limit=20&sort=name.asc");
        let down = GetAgents {
            status: Some(AgentStatus::Down),
            ..GetAgents::default()
        };
        assert_eq!(down.url(), "/api/v2/agents?limit=20&sort=name.asc&filter.status=down");
        let paged = GetAgents {
            page: Some(PageCursor("limit=20&start=b".to_string())),
            ..GetAgents::default()
        };
        assert_eq!(paged.url(), "/api/v2/agents?limit=20&start=b");
    }

    #[test]
    fn test_usage_carries_handlers() {
        let response: Paginated<Agent> = serde_json::from_value(json!({
            "data": [{"name": "internal", "environment": "env-1", "status": "up"}],
            "links": {"next": "/api/v2/agents?limit=1&start=internal"},
            "metadata": {"total": 2, "before": 0, "after": 1, "page_size": 1}
        }))
        .unwrap();
        let usage = GetAgents::default().to_usage(response, &UsageContext::detached());
        assert_eq!(usage.data[0].status, AgentStatus::Up);
        assert!(usage.handlers.next.is_some());
        assert!(usage.handlers.prev.is_none());
    }

    #[tokio::test]
    async fn test_control_agent_url() {
        let api = MockApiHelper::new();
        api.respond("POST", "/api/v2/agent/internal/pause", Ok(json!(null)));
        let ctx = CommandContext {
            api: Arc::new(api.clone()),
            environment: Some("env-1".to_string()),
            polling: PollingControl::default(),
        };
        let command = ControlAgent {
            name: "internal".to_string(),
        };
        assert!(command.execute(&ctx, AgentAction::Pause).await.is_ok());
        assert_eq!(api.call_count("POST", "/api/v2/agent/internal/pause"), 1);
    }
}

//! 编译报告（分页）

use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_PAGE_SIZE;
use crate::query::{PageCursor, PagedData, Paginated, Query, UrlHelper, UsageContext};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompileReport {
    pub id: String,
    pub environment: String,
    pub requested: String,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub completed: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub do_export: bool,
    #[serde(default)]
    pub force_update: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompileStatus {
    Queued,
    InProgress,
    Success,
    Failed,
}

impl CompileReport {
    pub fn status(&self) -> CompileStatus {
        match (&self.started, &self.completed, self.success) {
            (_, Some(_), Some(true)) => CompileStatus::Success,
            (_, Some(_), _) => CompileStatus::Failed,
            (Some(_), None, _) => CompileStatus::InProgress,
            (None, None, _) => CompileStatus::Queued,
        }
    }
}

/// 当前环境的编译报告，按请求时间倒序
#[derive(Clone, Debug, Serialize)]
pub struct GetCompileReports {
    pub page: Option<PageCursor>,
    pub page_size: u32,
}

impl Default for GetCompileReports {
    fn default() -> Self {
        Self {
            page: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Query for GetCompileReports {
    const KIND: &'static str = "GetCompileReports";
    type Data = Paginated<CompileReport>;
    type Usage = PagedData<CompileReport>;

    fn url(&self) -> String {
        const BASE: &str = "/api/v2/compilereport";
        match &self.page {
            Some(_) => UrlHelper::with_page(BASE, self.page.as_ref()),
            None => format!("{BASE}?limit={}&sort=requested.desc", self.page_size),
        }
    }

    fn to_usage(&self, data: Self::Data, ctx: &UsageContext) -> Self::Usage {
        PagedData::from_response(data, ctx)
    }
}

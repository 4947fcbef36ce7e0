//! 服务实例：分页列表查询与创建 / 更新 / 删除 / 状态迁移命令

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::command::{Command, CommandContext};
use crate::core::ApiError;
use crate::domain::attributes::{attribute_diff, create_instance_attributes, Attributes, Field};
use crate::domain::{unwrap_envelope, DEFAULT_PAGE_SIZE};
use crate::query::{PageCursor, PagedData, Paginated, Query, UrlHelper, UsageContext};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: String,
    pub service_entity: String,
    pub version: u64,
    pub state: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub candidate_attributes: Option<Attributes>,
    #[serde(default)]
    pub active_attributes: Option<Attributes>,
    #[serde(default)]
    pub rollback_attributes: Option<Attributes>,
    #[serde(default)]
    pub deleted: bool,
}

/// 实例的三组属性
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeSet {
    Candidate,
    Active,
    Rollback,
}

impl AttributeSet {
    /// 接口路径中的名称，与字段名一致
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeSet::Candidate => "candidate_attributes",
            AttributeSet::Active => "active_attributes",
            AttributeSet::Rollback => "rollback_attributes",
        }
    }
}

impl ServiceInstance {
    pub fn attributes(&self, set: AttributeSet) -> Attributes {
        let attributes = match set {
            AttributeSet::Candidate => &self.candidate_attributes,
            AttributeSet::Active => &self.active_attributes,
            AttributeSet::Rollback => &self.rollback_attributes,
        };
        attributes.clone().unwrap_or_default()
    }

    /// 编辑时的基准属性：candidate 非空时取 candidate，否则取 active
    pub fn current_attributes(&self) -> Attributes {
        match &self.candidate_attributes {
            Some(candidate) if !candidate.is_empty() => candidate.clone(),
            _ => self.active_attributes.clone().unwrap_or_default(),
        }
    }
}

fn inventory_url(service_entity: &str) -> String {
    format!("/lsm/v1/service_inventory/{service_entity}")
}

fn instance_url(service_entity: &str, id: &str) -> String {
    format!("{}/{id}", inventory_url(service_entity))
}

/// 某个服务的实例列表（分页）
#[derive(Clone, Debug, Serialize)]
pub struct GetServiceInstances {
    pub service_entity: String,
    pub page: Option<PageCursor>,
    pub page_size: u32,
    /// 如 `state.asc`
    pub sort: Option<String>,
}

impl GetServiceInstances {
    pub fn new(service_entity: impl Into<String>) -> Self {
        Self {
            service_entity: service_entity.into(),
            page: None,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }

    pub fn with_page(mut self, page: PageCursor) -> Self {
        self.page = Some(page);
        self
    }
}

impl Query for GetServiceInstances {
    const KIND: &'static str = "GetServiceInstances";
    type Data = Paginated<ServiceInstance>;
    type Usage = PagedData<ServiceInstance>;

    fn url(&self) -> String {
        // 带页面游标时，游标已包含 limit / sort
        if self.page.is_some() {
            return UrlHelper::with_page(&inventory_url(&self.service_entity), self.page.as_ref());
        }
        let mut url = format!(
            "{}?include_deployment_progress=True&limit={}",
            inventory_url(&self.service_entity),
            self.page_size
        );
        if let Some(sort) = &self.sort {
            url.push_str(&format!("&sort={sort}"));
        }
        url
    }

    fn to_usage(&self, data: Self::Data, ctx: &UsageContext) -> Self::Usage {
        PagedData::from_response(data, ctx)
    }
}

/// 创建实例；可选属性为空时省略
#[derive(Clone, Debug)]
pub struct CreateInstance {
    pub service_entity: String,
    pub fields: Vec<Field>,
}

#[async_trait]
impl Command for CreateInstance {
    const KIND: &'static str = "CreateInstance";
    type Input = Attributes;
    type Data = ServiceInstance;

    async fn execute(&self, ctx: &CommandContext, input: Attributes) -> Result<ServiceInstance, ApiError> {
        let attributes = create_instance_attributes(&self.fields, &input);
        let body = json!({ "attributes": attributes });
        let value = ctx
            .api
            .post(&inventory_url(&self.service_entity), ctx.environment.as_deref(), body)
            .await?;
        unwrap_envelope(value)
    }
}

/// 更新实例：只发送与 current 不同的属性
#[derive(Clone, Debug)]
pub struct TriggerInstanceUpdate {
    pub service_entity: String,
    pub id: String,
    pub version: u64,
    pub fields: Vec<Field>,
    pub current: Attributes,
}

impl TriggerInstanceUpdate {
    /// 以实例当前属性为基准
    pub fn for_instance(instance: &ServiceInstance, fields: Vec<Field>) -> Self {
        Self {
            service_entity: instance.service_entity.clone(),
            id: instance.id.clone(),
            version: instance.version,
            fields,
            current: instance.current_attributes(),
        }
    }
}

#[async_trait]
impl Command for TriggerInstanceUpdate {
    const KIND: &'static str = "TriggerInstanceUpdate";
    type Input = Attributes;
    type Data = ();

    async fn execute(&self, ctx: &CommandContext, input: Attributes) -> Result<(), ApiError> {
        let diff = attribute_diff(&self.fields, &self.current, &input);
        let url = format!(
            "{}?current_version={}",
            instance_url(&self.service_entity, &self.id),
            self.version
        );
        ctx.api
            .patch(&url, ctx.environment.as_deref(), json!({ "attributes": diff }))
            .await?;
        Ok(())
    }
}

/// 直接编辑某一组属性：每个变化的属性生成一条 replace 操作
#[derive(Clone, Debug)]
pub struct UpdateInstanceAttribute {
    pub service_entity: String,
    pub id: String,
    pub version: u64,
    pub attribute_set: AttributeSet,
    pub fields: Vec<Field>,
    pub current: Attributes,
}

impl UpdateInstanceAttribute {
    pub fn for_instance(instance: &ServiceInstance, attribute_set: AttributeSet, fields: Vec<Field>) -> Self {
        Self {
            service_entity: instance.service_entity.clone(),
            id: instance.id.clone(),
            version: instance.version,
            attribute_set,
            fields,
            current: instance.attributes(attribute_set),
        }
    }
}

/// diff 转为操作列表；显式 null 生成 value 为 null 的操作
fn replace_operations(diff: Attributes) -> Vec<Value> {
    diff.into_iter()
        .map(|(target, value)| json!({ "operation": "replace", "target": target, "value": value }))
        .collect()
}

#[async_trait]
impl Command for UpdateInstanceAttribute {
    const KIND: &'static str = "UpdateInstanceAttribute";
    type Input = Attributes;
    type Data = ();

    async fn execute(&self, ctx: &CommandContext, input: Attributes) -> Result<(), ApiError> {
        let diff = attribute_diff(&self.fields, &self.current, &input);
        if diff.is_empty() {
            tracing::debug!(id = %self.id, set = self.attribute_set.as_str(), "no attribute changed");
            return Ok(());
        }
        let url = format!(
            "{}/{}?current_version={}",
            instance_url(&self.service_entity, &self.id),
            self.attribute_set.as_str(),
            self.version
        );
        let body = json!({ "operations": replace_operations(diff) });
        ctx.api.patch(&url, ctx.environment.as_deref(), body).await?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct DeleteInstance {
    pub service_entity: String,
    pub id: String,
    pub version: u64,
}

#[async_trait]
impl Command for DeleteInstance {
    const KIND: &'static str = "DeleteInstance";
    type Input = ();
    type Data = ();

    async fn execute(&self, ctx: &CommandContext, _input: ()) -> Result<(), ApiError> {
        let url = format!(
            "{}?current_version={}",
            instance_url(&self.service_entity, &self.id),
            self.version
        );
        ctx.api.delete(&url, ctx.environment.as_deref()).await?;
        Ok(())
    }
}

/// 触发状态迁移；输入为目标状态
#[derive(Clone, Debug)]
pub struct TriggerSetState {
    pub service_entity: String,
    pub id: String,
    pub version: u64,
}

#[async_trait]
impl Command for TriggerSetState {
    const KIND: &'static str = "TriggerSetState";
    type Input = String;
    type Data = ();

    async fn execute(&self, ctx: &CommandContext, target_state: String) -> Result<(), ApiError> {
        let url = format!("{}/state", instance_url(&self.service_entity, &self.id));
        let body = json!({
            "current_version": self.version,
            "target_state": target_state,
            "message": "Triggered a set state event",
        });
        ctx.api.post(&url, ctx.environment.as_deref(), body).await?;
        Ok(())
    }
}

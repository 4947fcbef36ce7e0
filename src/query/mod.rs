//! 查询层：Query 定义、Manager（OneTime / Continuous / ReadOnly）与 Resolver
//!
//! Query 是不可变的值对象：kind + 参数。参数序列化后的规范 JSON 决定缓存 key 与轮询身份。

pub mod manager;
pub mod pagination;
pub mod resolver;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use manager::{
    ContinuousQueryManager, OneTimeQueryManager, QueryHandle, QueryManager, ReadOnlyQueryManager,
};
pub use pagination::{
    get_pagination_handlers, indicator_text, page_info, Links, Metadata, PageCursor, PageInfo,
    PagedData, Paginated, PaginationHandlers, UrlHelper,
};
pub use resolver::QueryResolver;

/// 缓存作用域：是否按环境区分
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Global,
    Environment,
}

/// 读取方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// 每次挂载请求一次
    OneTime,
    /// 初次请求 + 定时轮询
    Continuous,
    /// 只读，复用其它 Manager 已写入的状态
    ReadOnly,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchMode::OneTime => "OneTime",
            FetchMode::Continuous => "Continuous",
            FetchMode::ReadOnly => "ReadOnly",
        };
        f.write_str(name)
    }
}

/// 一种读操作：kind、URL 构造、响应形状与派生形状
pub trait Query: Serialize + Clone + Send + Sync + 'static {
    const KIND: &'static str;
    const SCOPE: Scope = Scope::Environment;

    /// API 响应体
    type Data: DeserializeOwned + Clone + Send + Sync + 'static;
    /// 供消费方使用的派生数据（如附加分页 handler）
    type Usage: Clone + Send + Sync + 'static;

    fn url(&self) -> String;

    fn to_usage(&self, data: Self::Data, ctx: &UsageContext) -> Self::Usage;
}

type UrlSetter = Arc<dyn Fn(String) + Send + Sync>;

/// to_usage 的上下文：目前只携带「切换页面 URL」的回调
#[derive(Clone)]
pub struct UsageContext {
    set_url: UrlSetter,
}

impl UsageContext {
    pub fn new(set_url: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self {
            set_url: Arc::new(set_url),
        }
    }

    /// 丢弃所有 URL 变更
    pub fn detached() -> Self {
        Self::new(|_| {})
    }

    pub fn set_url(&self, url: String) {
        (self.set_url)(url)
    }

    pub fn url_setter(&self) -> UrlSetter {
        Arc::clone(&self.set_url)
    }
}

impl Default for UsageContext {
    fn default() -> Self {
        Self::detached()
    }
}

impl fmt::Debug for UsageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageContext").finish_non_exhaustive()
    }
}

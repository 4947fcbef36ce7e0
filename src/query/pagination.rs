//! 分页：把服务端返回的不透明 links 转成前进 / 后退 handler
//!
//! 服务端分页响应形如 `{ data, links: { next, prev, ... }, metadata: { total, before, after, page_size } }`。
//! handler 只在对应方向确实还有数据时存在：prev 需要 `before > 0`，next 需要 `after > 0`。

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::RemoteData;
use crate::query::UsageContext;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self", default)]
    pub self_: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub total: u64,
    pub before: u64,
    pub after: u64,
    pub page_size: u64,
}

/// 分页接口的原始响应
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub links: Links,
    pub metadata: Metadata,
}

/// 页面游标：link 中 `?` 之后的部分，原样拼回请求 URL
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(pub String);

impl PageCursor {
    pub fn from_link(link: &str) -> Self {
        Self(UrlHelper::page_of(link))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub struct UrlHelper;

impl UrlHelper {
    /// 取出 link 的 query 部分；没有 `?` 时为空串
    pub fn page_of(link: &str) -> String {
        link.split_once('?')
            .map(|(_, query)| query.to_string())
            .unwrap_or_default()
    }

    /// 把可选的页面游标拼到 base URL 上
    pub fn with_page(base: &str, page: Option<&PageCursor>) -> String {
        match page {
            Some(cursor) if !cursor.0.is_empty() => {
                let separator = if base.contains('?') { '&' } else { '?' };
                format!("{base}{separator}{}", cursor.0)
            }
            _ => base.to_string(),
        }
    }
}

pub type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub struct PaginationHandlers {
    pub next: Option<Handler>,
    pub prev: Option<Handler>,
}

impl fmt::Debug for PaginationHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginationHandlers")
            .field("next", &self.next.is_some())
            .field("prev", &self.prev.is_some())
            .finish()
    }
}

pub fn get_pagination_handlers(
    links: &Links,
    metadata: &Metadata,
    set_url: Arc<dyn Fn(String) + Send + Sync>,
) -> PaginationHandlers {
    let handler = |link: &str| -> Handler {
        let page = UrlHelper::page_of(link);
        let set_url = Arc::clone(&set_url);
        let handler: Handler = Arc::new(move || set_url(page.clone()));
        handler
    };
    PaginationHandlers {
        next: links
            .next
            .as_deref()
            .filter(|_| metadata.after > 0)
            .map(&handler),
        prev: links
            .prev
            .as_deref()
            .filter(|_| metadata.before > 0)
            .map(&handler),
    }
}

/// 分页查询的 Usage：数据 + handler + 元数据
#[derive(Clone, Debug)]
pub struct PagedData<T> {
    pub data: Vec<T>,
    pub handlers: PaginationHandlers,
    pub metadata: Metadata,
}

impl<T> PagedData<T> {
    pub fn from_response(response: Paginated<T>, ctx: &UsageContext) -> Self {
        let handlers = get_pagination_handlers(&response.links, &response.metadata, ctx.url_setter());
        Self {
            data: response.data,
            handlers,
            metadata: response.metadata,
        }
    }
}

/// 分页控件需要的信息
#[derive(Clone, Debug)]
pub struct PageInfo {
    pub handlers: PaginationHandlers,
    pub metadata: Metadata,
}

/// 从分页数据中取出控件信息，状态保持不变
pub fn page_info<E: Clone, T>(data: &RemoteData<E, PagedData<T>>) -> RemoteData<E, PageInfo> {
    data.as_ref()
        .map_failed(|e| e.clone())
        .map_success(|paged| PageInfo {
            handlers: paged.handlers.clone(),
            metadata: paged.metadata,
        })
}

/// 分页指示文本，如 "1 - 20 of 100"；当前页为空时只显示总数
pub fn indicator_text(metadata: &Metadata) -> String {
    let count = metadata
        .total
        .saturating_sub(metadata.before)
        .saturating_sub(metadata.after);
    if count == 0 {
        return format!("0 of {}", metadata.total);
    }
    let from = metadata.before + 1;
    let to = metadata.before + count;
    format!("{from} - {to} of {}", metadata.total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn metadata(before: u64, total: u64, page_size: u64, after: u64) -> Metadata {
        Metadata {
            total,
            before,
            after,
            page_size,
        }
    }

    #[test]
    fn test_indicator_text() {
        assert_eq!(indicator_text(&metadata(0, 0, 10, 0)), "0 of 0");
        assert_eq!(indicator_text(&metadata(0, 100, 20, 80)), "1 - 20 of 100");
        assert_eq!(indicator_text(&metadata(20, 22, 20, 0)), "21 - 22 of 22");
    }

    #[test]
    fn test_indicator_text_for_page_past_the_end() {
        // 最后一条记录在翻页间被删除时，before 可能等于 total
        assert_eq!(indicator_text(&metadata(22, 22, 20, 0)), "0 of 22");
        assert_eq!(indicator_text(&metadata(30, 22, 20, 5)), "0 of 22");
    }

    fn links() -> Links {
        Links {
            next: Some("/api/v2/resource?limit=20&start=abc".to_string()),
            prev: Some("/api/v2/resource?limit=20&end=xyz".to_string()),
            ..Links::default()
        }
    }

    #[test]
    fn test_handlers_follow_metadata() {
        let noop: Arc<dyn Fn(String) + Send + Sync> = Arc::new(|_: String| {});

        let first_page = get_pagination_handlers(&links(), &metadata(0, 100, 20, 80), noop.clone());
        assert!(first_page.next.is_some());
        assert!(first_page.prev.is_none());

        let last_page = get_pagination_handlers(&links(), &metadata(80, 100, 20, 0), noop.clone());
        assert!(last_page.next.is_none());
        assert!(last_page.prev.is_some());

        let no_links = get_pagination_handlers(&Links::default(), &metadata(20, 100, 20, 60), noop);
        assert!(no_links.next.is_none() && no_links.prev.is_none());
    }

    #[test]
    fn test_handler_sets_query_part_of_link() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let set_url: Arc<dyn Fn(String) + Send + Sync> =
            Arc::new(move |url: String| sink.lock().unwrap().push(url));

        let handlers = get_pagination_handlers(&links(), &metadata(20, 100, 20, 60), set_url);
        (handlers.next.unwrap())();
        (handlers.prev.unwrap())();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["limit=20&start=abc".to_string(), "limit=20&end=xyz".to_string()]
        );
    }

    #[test]
    fn test_with_page() {
        let cursor = PageCursor::from_link("/api/v2/agents?limit=20&start=a");
        assert_eq!(
            UrlHelper::with_page("/api/v2/agents", Some(&cursor)),
            "/api/v2/agents?limit=20&start=a"
        );
        assert_eq!(
            UrlHelper::with_page("/api/v2/agents?sort=name.asc", Some(&cursor)),
            "/api/v2/agents?sort=name.asc&limit=20&start=a"
        );
        assert_eq!(UrlHelper::with_page("/api/v2/agents", None), "/api/v2/agents");
    }

    #[test]
    fn test_page_info_keeps_state() {
        let loading: RemoteData<String, PagedData<u32>> = RemoteData::Loading;
        assert!(page_info(&loading).is_loading());

        let paged = PagedData {
            data: vec![1, 2],
            handlers: PaginationHandlers::default(),
            metadata: metadata(0, 2, 20, 0),
        };
        let info = page_info(&RemoteData::<String, _>::Success(paged));
        assert_eq!(info.success_ref().map(|i| i.metadata.total), Some(2));
    }
}

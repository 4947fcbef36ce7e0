//! 查询 Manager：把一种 Query 绑定到 StateHelper、ApiHelper 与（可选的）Scheduler
//!
//! - OneTimeQueryManager：每次 use_one_time 请求一次
//! - ContinuousQueryManager：初次请求 + 注册轮询任务，句柄 drop 时注销
//! - ReadOnlyQueryManager：只读，不发请求
//!
//! 所有 use_* 在发请求前先同步写入 Loading，保证读方不会看到上一个 key 的旧 Success。

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::watch;

use crate::api::{decode, ApiHelper};
use crate::core::{
    ApiError, CoreError, EnvironmentHandler, RemoteData, Scheduler, StateHelper, Store,
    Subscription, Task,
};
use crate::query::{FetchMode, Query, UsageContext};

/// Resolver 线性扫描时看到的统一接口
pub trait QueryManager: Send + Sync {
    fn matches(&self, kind: &str, mode: FetchMode) -> bool;

    fn as_any(&self) -> &dyn Any;
}

type Refetch = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// 请求一次并解码
async fn fetch<Q: Query>(
    api: Arc<dyn ApiHelper>,
    query: Q,
    environment: Option<String>,
) -> Result<Q::Data, ApiError> {
    let value = api.get(&query.url(), environment.as_deref()).await?;
    decode(value)
}

fn log_failure<Q: Query>(result: &Result<Q::Data, ApiError>) {
    if let Err(e) = result {
        tracing::warn!(kind = Q::KIND, error = %e, "query failed");
    }
}

/// 三种 Manager 共用的依赖
struct ManagerCore<Q: Query> {
    api: Arc<dyn ApiHelper>,
    state: StateHelper<Q>,
    environment: EnvironmentHandler,
}

impl<Q: Query> ManagerCore<Q> {
    fn new(api: Arc<dyn ApiHelper>, store: Store, environment: EnvironmentHandler) -> Self {
        Self {
            api,
            state: StateHelper::new(store),
            environment,
        }
    }

    /// 请求并把结果写回 StateHelper 的闭包（refetch 与初次请求共用）
    fn refetcher(&self, query: Q, environment: Option<String>) -> Refetch {
        let api = Arc::clone(&self.api);
        let state = self.state.clone();
        Arc::new(move || {
            let api = Arc::clone(&api);
            let state = state.clone();
            let query = query.clone();
            let environment = environment.clone();
            async move {
                let result = fetch(api, query.clone(), environment.clone()).await;
                log_failure::<Q>(&result);
                state.set(result.into(), &query, environment.as_deref());
            }
            .boxed()
        })
    }

    fn handle(
        &self,
        query: Q,
        environment: Option<String>,
        refetch: Option<Refetch>,
        polling: Option<PollingGuard>,
    ) -> QueryHandle<Q> {
        let subscription = self.state.get_hooked(&query, environment.as_deref());
        let (url_tx, requested_url) = watch::channel(None);
        let context = UsageContext::new(move |url| {
            url_tx.send_replace(Some(url));
        });
        QueryHandle {
            query,
            environment,
            subscription,
            refetch,
            context,
            requested_url,
            _polling: polling,
        }
    }
}

/// 句柄 drop 时注销轮询任务（相当于组件卸载）
struct PollingGuard {
    scheduler: Scheduler,
    id: String,
}

impl Drop for PollingGuard {
    fn drop(&mut self) {
        self.scheduler.unregister(&self.id);
    }
}

/// use_* 的返回值：当前数据 + refetch
pub struct QueryHandle<Q: Query> {
    query: Q,
    environment: Option<String>,
    subscription: Subscription<RemoteData<ApiError, Q::Data>>,
    refetch: Option<Refetch>,
    context: UsageContext,
    requested_url: watch::Receiver<Option<String>>,
    _polling: Option<PollingGuard>,
}

impl<Q: Query> QueryHandle<Q> {
    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// 当前数据（已转换为 Usage）
    pub fn data(&self) -> RemoteData<ApiError, Q::Usage> {
        self.subscription
            .current()
            .map_success(|data| self.query.to_usage(data, &self.context))
    }

    /// 当前数据（API 原始形状）
    pub fn raw(&self) -> RemoteData<ApiError, Q::Data> {
        self.subscription.current()
    }

    /// 等待下一次状态写入
    pub async fn changed(&mut self) -> bool {
        self.subscription.changed().await
    }

    /// 后台重新请求；只读句柄为 no-op
    pub fn refetch(&self) {
        if let Some(refetch) = &self.refetch {
            tokio::spawn(refetch());
        }
    }

    /// 重新请求并等待结果写入
    pub async fn refetch_now(&self) {
        if let Some(refetch) = &self.refetch {
            refetch().await;
        }
    }

    /// 分页 handler 最近一次请求切换到的 URL（query 部分）
    pub fn requested_url(&self) -> Option<String> {
        self.requested_url.borrow().clone()
    }
}

pub struct OneTimeQueryManager<Q: Query> {
    core: ManagerCore<Q>,
}

impl<Q: Query> OneTimeQueryManager<Q> {
    pub fn new(api: Arc<dyn ApiHelper>, store: Store, environment: EnvironmentHandler) -> Self {
        Self {
            core: ManagerCore::new(api, store, environment),
        }
    }

    pub fn use_one_time(&self, query: Q) -> QueryHandle<Q> {
        let environment = self.core.environment.current();
        self.core
            .state
            .set(RemoteData::loading(), &query, environment.as_deref());
        let refetch = self.core.refetcher(query.clone(), environment.clone());
        let handle = self.core.handle(query, environment, Some(Arc::clone(&refetch)), None);
        tokio::spawn(refetch());
        handle
    }
}

impl<Q: Query> QueryManager for OneTimeQueryManager<Q> {
    fn matches(&self, kind: &str, mode: FetchMode) -> bool {
        kind == Q::KIND && mode == FetchMode::OneTime
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct ContinuousQueryManager<Q: Query> {
    core: ManagerCore<Q>,
    scheduler: Scheduler,
}

impl<Q: Query> ContinuousQueryManager<Q> {
    pub fn new(
        api: Arc<dyn ApiHelper>,
        store: Store,
        environment: EnvironmentHandler,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            core: ManagerCore::new(api, store, environment),
            scheduler,
        }
    }

    /// 初次请求并注册轮询任务（任务 id 即缓存 key）；同一 key 已在轮询时返回 DuplicateTask
    pub fn use_continuous(&self, query: Q) -> Result<QueryHandle<Q>, CoreError> {
        let environment = self.core.environment.current();
        let id = self.core.state.key(&query, environment.as_deref());

        let api = Arc::clone(&self.core.api);
        let state = self.core.state.clone();
        let (effect_query, effect_env) = (query.clone(), environment.clone());
        let (update_query, update_env) = (query.clone(), environment.clone());
        let task = Task::new(
            move || fetch(Arc::clone(&api), effect_query.clone(), effect_env.clone()),
            move |result: Result<Q::Data, ApiError>| {
                log_failure::<Q>(&result);
                state.set(result.into(), &update_query, update_env.as_deref());
            },
        );
        self.scheduler.register(id.clone(), task)?;

        self.core
            .state
            .set(RemoteData::loading(), &query, environment.as_deref());
        let refetch = self.core.refetcher(query.clone(), environment.clone());
        let guard = PollingGuard {
            scheduler: self.scheduler.clone(),
            id,
        };
        let handle = self
            .core
            .handle(query, environment, Some(Arc::clone(&refetch)), Some(guard));
        tokio::spawn(refetch());
        Ok(handle)
    }
}

impl<Q: Query> QueryManager for ContinuousQueryManager<Q> {
    fn matches(&self, kind: &str, mode: FetchMode) -> bool {
        kind == Q::KIND && mode == FetchMode::Continuous
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct ReadOnlyQueryManager<Q: Query> {
    state: StateHelper<Q>,
    environment: EnvironmentHandler,
    _query: PhantomData<fn() -> Q>,
}

impl<Q: Query> ReadOnlyQueryManager<Q> {
    pub fn new(store: Store, environment: EnvironmentHandler) -> Self {
        Self {
            state: StateHelper::new(store),
            environment,
            _query: PhantomData,
        }
    }

    pub fn use_read_only(&self, query: Q) -> QueryHandle<Q> {
        let environment = self.environment.current();
        let subscription = self.state.get_hooked(&query, environment.as_deref());
        let (_, requested_url) = watch::channel(None);
        QueryHandle {
            query,
            environment,
            subscription,
            refetch: None,
            context: UsageContext::detached(),
            requested_url,
            _polling: None,
        }
    }
}

impl<Q: Query> QueryManager for ReadOnlyQueryManager<Q> {
    fn matches(&self, kind: &str, mode: FetchMode) -> bool {
        kind == Q::KIND && mode == FetchMode::ReadOnly
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use crate::api::MockApiHelper;

    #[derive(Clone, Debug, Serialize)]
    struct Agents {
        page: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Deserialize)]
    struct AgentList {
        data: Vec<String>,
    }

    impl Query for Agents {
        const KIND: &'static str = "Agents";
        type Data = AgentList;
        type Usage = usize;

        fn url(&self) -> String {
            match &self.page {
                Some(page) => format!("/agents?{page}"),
                None => "/agents".to_string(),
            }
        }

        fn to_usage(&self, data: Self::Data, _ctx: &UsageContext) -> Self::Usage {
            data.data.len()
        }
    }

    async fn flush() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn setup() -> (MockApiHelper, Store, EnvironmentHandler) {
        let api = MockApiHelper::new();
        api.respond("GET", "/agents", Ok(json!({"data": ["a", "b"]})));
        (api, Store::new(), EnvironmentHandler::new(Some("env-1".to_string())))
    }

    #[tokio::test]
    async fn test_one_time_sets_loading_then_success() {
        let (api, store, env) = setup();
        let manager = OneTimeQueryManager::<Agents>::new(Arc::new(api.clone()), store, env);

        let mut handle = manager.use_one_time(Agents { page: None });
        assert!(handle.data().is_loading());

        assert!(handle.changed().await);
        assert_eq!(handle.data(), RemoteData::Success(2));
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].environment.as_deref(), Some("env-1"));
    }

    #[tokio::test]
    async fn test_failed_fetch_becomes_failed_state() {
        let (api, store, env) = setup();
        let manager = OneTimeQueryManager::<Agents>::new(Arc::new(api), store, env);

        let mut handle = manager.use_one_time(Agents {
            page: Some("start=x".to_string()),
        });
        handle.changed().await;
        assert!(matches!(
            handle.data(),
            RemoteData::Failed(ApiError::Http { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_refetch_now_hits_api_again() {
        let (api, store, env) = setup();
        let manager = OneTimeQueryManager::<Agents>::new(Arc::new(api.clone()), store, env);
        let handle = manager.use_one_time(Agents { page: None });
        handle.refetch_now().await;
        flush().await;
        assert_eq!(api.call_count("GET", "/agents"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_polls_until_dropped() {
        let (api, store, env) = setup();
        let scheduler = Scheduler::new("test", Duration::from_millis(5000));
        let manager =
            ContinuousQueryManager::<Agents>::new(Arc::new(api.clone()), store, env, scheduler.clone());

        let handle = manager.use_continuous(Agents { page: None }).unwrap();
        flush().await;
        assert_eq!(api.call_count("GET", "/agents"), 1);
        assert_eq!(handle.data(), RemoteData::Success(2));

        tokio::time::advance(Duration::from_millis(5000)).await;
        flush().await;
        assert_eq!(api.call_count("GET", "/agents"), 2);

        drop(handle);
        assert!(scheduler.is_empty());
        tokio::time::advance(Duration::from_millis(5000)).await;
        flush().await;
        assert_eq!(api.call_count("GET", "/agents"), 2);
    }

    #[tokio::test]
    async fn test_continuous_same_query_twice_is_duplicate() {
        let (api, store, env) = setup();
        let scheduler = Scheduler::new("test", Duration::from_millis(5000));
        let manager = ContinuousQueryManager::<Agents>::new(Arc::new(api), store, env, scheduler);

        let _first = manager.use_continuous(Agents { page: None }).unwrap();
        let second = manager.use_continuous(Agents { page: None });
        assert!(matches!(second, Err(CoreError::DuplicateTask(_))));
    }

    #[tokio::test]
    async fn test_read_only_follows_other_manager() {
        let (api, store, env) = setup();
        let one_time = OneTimeQueryManager::<Agents>::new(Arc::new(api), store.clone(), env.clone());
        let read_only = ReadOnlyQueryManager::<Agents>::new(store, env);

        let mut reader = read_only.use_read_only(Agents { page: None });
        assert!(reader.data().is_not_asked());

        let _writer = one_time.use_one_time(Agents { page: None });
        assert!(reader.data().is_loading());
        while !reader.data().is_success() {
            assert!(reader.changed().await);
        }
        assert_eq!(reader.data(), RemoteData::Success(2));
    }

    #[test]
    fn test_matches_kind_and_mode() {
        let (_, store, env) = setup();
        let manager = ReadOnlyQueryManager::<Agents>::new(store, env);
        assert!(manager.matches("Agents", FetchMode::ReadOnly));
        assert!(!manager.matches("Agents", FetchMode::OneTime));
        assert!(!manager.matches("Services", FetchMode::ReadOnly));
    }
}

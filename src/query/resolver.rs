//! 查询 Resolver：按注册顺序线性扫描，取第一个 matches(kind, mode) 的 Manager
//!
//! 注册顺序即优先级：同一 (kind, mode) 注册了多个 Manager 时，只有最先注册的会被使用。
//! 找不到 Manager 属于编程错误，直接返回 CoreError。

use std::sync::Arc;

use crate::core::CoreError;
use crate::query::{
    ContinuousQueryManager, FetchMode, OneTimeQueryManager, Query, QueryHandle, QueryManager,
    ReadOnlyQueryManager,
};

#[derive(Clone, Default)]
pub struct QueryResolver {
    managers: Vec<Arc<dyn QueryManager>>,
}

impl QueryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, manager: impl QueryManager + 'static) {
        self.managers.push(Arc::new(manager));
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    fn find<M: 'static>(&self, kind: &str, mode: FetchMode) -> Result<&M, CoreError> {
        let manager = self
            .managers
            .iter()
            .find(|m| m.matches(kind, mode))
            .ok_or_else(|| CoreError::NoQueryManager {
                kind: kind.to_string(),
                mode,
            })?;
        manager
            .as_any()
            .downcast_ref::<M>()
            .ok_or_else(|| CoreError::ManagerMismatch(kind.to_string()))
    }

    pub fn use_one_time<Q: Query>(&self, query: Q) -> Result<QueryHandle<Q>, CoreError> {
        let manager = self.find::<OneTimeQueryManager<Q>>(Q::KIND, FetchMode::OneTime)?;
        Ok(manager.use_one_time(query))
    }

    pub fn use_continuous<Q: Query>(&self, query: Q) -> Result<QueryHandle<Q>, CoreError> {
        let manager = self.find::<ContinuousQueryManager<Q>>(Q::KIND, FetchMode::Continuous)?;
        manager.use_continuous(query)
    }

    pub fn use_read_only<Q: Query>(&self, query: Q) -> Result<QueryHandle<Q>, CoreError> {
        let manager = self.find::<ReadOnlyQueryManager<Q>>(Q::KIND, FetchMode::ReadOnly)?;
        Ok(manager.use_read_only(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use crate::api::MockApiHelper;
    use crate::core::{EnvironmentHandler, RemoteData, StateHelper, Store};
    use crate::query::UsageContext;

    #[derive(Clone, Debug, Serialize)]
    struct Services;

    #[derive(Clone, Debug, Deserialize)]
    struct ServiceList {
        data: Vec<String>,
    }

    impl Query for Services {
        const KIND: &'static str = "Services";
        type Data = ServiceList;
        type Usage = Vec<String>;

        fn url(&self) -> String {
            "/lsm/v1/service_catalog".to_string()
        }

        fn to_usage(&self, data: Self::Data, _ctx: &UsageContext) -> Self::Usage {
            data.data
        }
    }

    fn api() -> Arc<MockApiHelper> {
        let api = MockApiHelper::new();
        api.respond("GET", "/lsm/v1/service_catalog", Ok(json!({"data": ["vlan"]})));
        Arc::new(api)
    }

    #[tokio::test]
    async fn test_missing_manager_is_descriptive_error() {
        let resolver = QueryResolver::new();
        let err = resolver.use_continuous(Services).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Can't find ContinuousQueryManager for query Services"
        );
    }

    #[tokio::test]
    async fn test_mode_must_match() {
        let mut resolver = QueryResolver::new();
        resolver.register(OneTimeQueryManager::<Services>::new(
            api(),
            Store::new(),
            EnvironmentHandler::default(),
        ));
        assert!(resolver.use_one_time(Services).is_ok());
        assert!(matches!(
            resolver.use_read_only(Services),
            Err(CoreError::NoQueryManager {
                mode: FetchMode::ReadOnly,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_first_registered_manager_wins() {
        let (first_store, second_store) = (Store::new(), Store::new());
        let env = EnvironmentHandler::default();
        let mut resolver = QueryResolver::new();
        resolver.register(OneTimeQueryManager::<Services>::new(api(), first_store.clone(), env.clone()));
        resolver.register(OneTimeQueryManager::<Services>::new(api(), second_store.clone(), env));

        let mut handle = resolver.use_one_time(Services).unwrap();
        handle.changed().await;
        assert_eq!(handle.data(), RemoteData::Success(vec!["vlan".to_string()]));

        let first = StateHelper::<Services>::new(first_store);
        let second = StateHelper::<Services>::new(second_store);
        assert!(first.get_once(&Services, None).is_success());
        assert!(second.get_once(&Services, None).is_not_asked());
    }
}

//! 共享状态：Store（按 key 存放、可订阅）与 StateHelper（按 Query 类型化的读写适配）
//!
//! 每个 key 对应一个 watch 通道；写入为后写覆盖（last-writer-wins），不做版本检查。
//! key 由 Query 的 kind、（可选的）环境与参数的规范 JSON 组成：结构相同的 Query 共用一项，结构不同的互不冲突。
//! 最后一个订阅者释放时该项被移除；此后迟到的写入会重新建项，直到下一次订阅并释放。

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;

use crate::core::{ApiError, RemoteData};
use crate::query::{Query, Scope};

type Slot = Option<Arc<dyn Any + Send + Sync>>;
type Entries = Mutex<HashMap<String, watch::Sender<Slot>>>;

/// 响应式 key-value 容器：get / set / subscribe
#[derive(Clone, Default)]
pub struct Store {
    entries: Arc<Entries>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<Slot>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: &str, value: T) {
        let mut entries = self.entries();
        let sender = entries
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(None).0);
        sender.send_replace(Some(Arc::new(value)));
    }

    /// 读取快照；key 不存在或类型不符时返回 None
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let entries = self.entries();
        let sender = entries.get(key)?;
        let slot = sender.borrow();
        let value = slot.as_deref().and_then(|value| value.downcast_ref::<T>()).cloned();
        value
    }

    pub fn subscribe<T: Clone + Default + 'static>(&self, key: &str) -> Subscription<T> {
        let mut entries = self.entries();
        let sender = entries
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(None).0);
        Subscription {
            receiver: sender.subscribe(),
            entries: Arc::downgrade(&self.entries),
            key: key.to_string(),
            _value: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 订阅某个 key：current() 取最新值，changed() 等待下一次写入
pub struct Subscription<T> {
    receiver: watch::Receiver<Slot>,
    // 弱引用：Store 释放后 changed() 才能返回 false
    entries: Weak<Entries>,
    key: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let Some(entries) = self.entries.upgrade() else {
            return;
        };
        let mut entries = entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // 计数包含自身
        if entries
            .get(&self.key)
            .is_some_and(|sender| sender.receiver_count() <= 1)
        {
            entries.remove(&self.key);
        }
    }
}

impl<T: Clone + Default + 'static> Subscription<T> {
    /// 最新值；尚未写入时为 T::default()
    pub fn current(&self) -> T {
        let slot = self.receiver.borrow();
        let value = slot.as_deref().and_then(|value| value.downcast_ref::<T>()).cloned();
        value.unwrap_or_default()
    }

    /// 等待下一次写入；Store 已释放时返回 false
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

/// 由 kind、环境与参数组成规范 key
pub fn canonical_key<Q: Query>(query: &Q, environment: Option<&str>) -> String {
    // serde_json::Value 的对象按 key 排序，字段顺序不影响结果
    let params = serde_json::to_value(query)
        .map(|value| value.to_string())
        .unwrap_or_default();
    match Q::SCOPE {
        Scope::Global => format!("{}|{}", Q::KIND, params),
        Scope::Environment => format!("{}|{}|{}", Q::KIND, environment.unwrap_or(""), params),
    }
}

/// 某一种 Query 的类型化存取
pub struct StateHelper<Q: Query> {
    store: Store,
    _query: PhantomData<fn() -> Q>,
}

impl<Q: Query> Clone for StateHelper<Q> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _query: PhantomData,
        }
    }
}

impl<Q: Query> StateHelper<Q> {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            _query: PhantomData,
        }
    }

    pub fn key(&self, query: &Q, environment: Option<&str>) -> String {
        canonical_key(query, environment)
    }

    pub fn set(&self, data: RemoteData<ApiError, Q::Data>, query: &Q, environment: Option<&str>) {
        self.store.set(&self.key(query, environment), data);
    }

    /// 一次性读取（不订阅）；未写入时为 NotAsked
    pub fn get_once(&self, query: &Q, environment: Option<&str>) -> RemoteData<ApiError, Q::Data> {
        self.store
            .get(&self.key(query, environment))
            .unwrap_or_default()
    }

    /// 订阅式读取：值变化时 changed() 返回
    pub fn get_hooked(
        &self,
        query: &Q,
        environment: Option<&str>,
    ) -> Subscription<RemoteData<ApiError, Q::Data>> {
        self.store.subscribe(&self.key(query, environment))
    }
}

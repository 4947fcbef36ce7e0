//! RemoteData：异步值的四态生命周期
//!
//! `NotAsked | Loading | Failed(F) | Success(S)`，任何时刻某个 key 只处于其中一种状态。
//! Failed 是正常的终态（本轮），不是异常；所有操作都不会 panic。

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum RemoteData<F, S> {
    /// 尚未发起请求
    NotAsked,
    /// 请求进行中
    Loading,
    Failed(F),
    Success(S),
}

impl<F, S> Default for RemoteData<F, S> {
    fn default() -> Self {
        RemoteData::NotAsked
    }
}

impl<F, S> RemoteData<F, S> {
    pub fn not_asked() -> Self {
        RemoteData::NotAsked
    }

    pub fn loading() -> Self {
        RemoteData::Loading
    }

    pub fn failed(value: F) -> Self {
        RemoteData::Failed(value)
    }

    pub fn success(value: S) -> Self {
        RemoteData::Success(value)
    }

    pub fn is_not_asked(&self) -> bool {
        matches!(self, RemoteData::NotAsked)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, RemoteData::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RemoteData::Failed(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RemoteData::Success(_))
    }

    /// 穷尽式分派：每个变体对应一个回调，恰好调用其中一个。
    ///
    /// 新增变体时这里的 `match` 无法编译，所有调用方随之被迫更新。
    pub fn fold<R>(
        self,
        not_asked: impl FnOnce() -> R,
        loading: impl FnOnce() -> R,
        failed: impl FnOnce(F) -> R,
        success: impl FnOnce(S) -> R,
    ) -> R {
        match self {
            RemoteData::NotAsked => not_asked(),
            RemoteData::Loading => loading(),
            RemoteData::Failed(f) => failed(f),
            RemoteData::Success(s) => success(s),
        }
    }

    /// 仅变换 Success 的载荷，其余变体原样返回
    pub fn map_success<T>(self, f: impl FnOnce(S) -> T) -> RemoteData<F, T> {
        match self {
            RemoteData::NotAsked => RemoteData::NotAsked,
            RemoteData::Loading => RemoteData::Loading,
            RemoteData::Failed(e) => RemoteData::Failed(e),
            RemoteData::Success(s) => RemoteData::Success(f(s)),
        }
    }

    pub fn map_failed<G>(self, f: impl FnOnce(F) -> G) -> RemoteData<G, S> {
        match self {
            RemoteData::NotAsked => RemoteData::NotAsked,
            RemoteData::Loading => RemoteData::Loading,
            RemoteData::Failed(e) => RemoteData::Failed(f(e)),
            RemoteData::Success(s) => RemoteData::Success(s),
        }
    }

    /// Err → Failed，Ok → Success
    pub fn from_result(result: Result<S, F>) -> Self {
        match result {
            Ok(s) => RemoteData::Success(s),
            Err(e) => RemoteData::Failed(e),
        }
    }

    /// Success 时取出载荷，否则返回 default
    pub fn with_fallback(self, default: S) -> S {
        match self {
            RemoteData::Success(s) => s,
            _ => default,
        }
    }

    pub fn as_ref(&self) -> RemoteData<&F, &S> {
        match self {
            RemoteData::NotAsked => RemoteData::NotAsked,
            RemoteData::Loading => RemoteData::Loading,
            RemoteData::Failed(e) => RemoteData::Failed(e),
            RemoteData::Success(s) => RemoteData::Success(s),
        }
    }

    pub fn success_ref(&self) -> Option<&S> {
        match self {
            RemoteData::Success(s) => Some(s),
            _ => None,
        }
    }

    /// 合并两个 RemoteData。
    ///
    /// 优先级 `NotAsked > Loading > Failed > Success`：按此顺序在两个操作数中查找，先命中的胜出
    /// （同级时第一个操作数优先）；只有两边都是 Success 时才把载荷合成二元组。
    pub fn merge<S2>(self, other: RemoteData<F, S2>) -> RemoteData<F, (S, S2)> {
        match (self, other) {
            (RemoteData::NotAsked, _) | (_, RemoteData::NotAsked) => RemoteData::NotAsked,
            (RemoteData::Loading, _) | (_, RemoteData::Loading) => RemoteData::Loading,
            (RemoteData::Failed(e), _) | (_, RemoteData::Failed(e)) => RemoteData::Failed(e),
            (RemoteData::Success(a), RemoteData::Success(b)) => RemoteData::Success((a, b)),
        }
    }
}

impl<F, S> From<Result<S, F>> for RemoteData<F, S> {
    fn from(result: Result<S, F>) -> Self {
        RemoteData::from_result(result)
    }
}

/// 两个独立 RemoteData 的联合状态，供 UI 一次性渲染两份异步数据
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DualState<F1, S1, F2, S2> {
    BothNotAsked,
    BothLoading,
    BothFailed(F1, F2),
    BothSuccess(S1, S2),
    /// 两边状态不同
    Incompatible(RemoteData<F1, S1>, RemoteData<F2, S2>),
}

/// 同时 fold 两个 RemoteData：两边同态时走对应分支，否则走 Incompatible
pub fn dual_fold<F1, S1, F2, S2, R>(
    first: RemoteData<F1, S1>,
    second: RemoteData<F2, S2>,
    handle: impl FnOnce(DualState<F1, S1, F2, S2>) -> R,
) -> R {
    let state = match (first, second) {
        (RemoteData::NotAsked, RemoteData::NotAsked) => DualState::BothNotAsked,
        (RemoteData::Loading, RemoteData::Loading) => DualState::BothLoading,
        (RemoteData::Failed(a), RemoteData::Failed(b)) => DualState::BothFailed(a, b),
        (RemoteData::Success(a), RemoteData::Success(b)) => DualState::BothSuccess(a, b),
        (a, b) => DualState::Incompatible(a, b),
    };
    handle(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Data = RemoteData<String, i32>;

    fn variants() -> Vec<Data> {
        vec![
            RemoteData::not_asked(),
            RemoteData::loading(),
            RemoteData::failed("boom".to_string()),
            RemoteData::success(7),
        ]
    }

    #[test]
    fn test_fold_calls_exactly_one_handler() {
        let calls = std::cell::RefCell::new(Vec::new());
        for data in variants() {
            data.fold(
                || calls.borrow_mut().push("not_asked".to_string()),
                || calls.borrow_mut().push("loading".to_string()),
                |e| calls.borrow_mut().push(format!("failed:{e}")),
                |s| calls.borrow_mut().push(format!("success:{s}")),
            );
        }
        assert_eq!(
            calls.into_inner(),
            vec!["not_asked", "loading", "failed:boom", "success:7"]
        );
    }

    #[test]
    fn test_predicates() {
        let [not_asked, loading, failed, success]: [Data; 4] =
            variants().try_into().unwrap();
        assert!(not_asked.is_not_asked() && !not_asked.is_loading());
        assert!(loading.is_loading() && !loading.is_success());
        assert!(failed.is_failed() && !failed.is_success());
        assert!(success.is_success() && !success.is_failed());
    }

    #[test]
    fn test_merge_priority() {
        let merged = Data::not_asked().merge(RemoteData::<String, i32>::success(1));
        assert_eq!(merged, RemoteData::NotAsked);

        let merged = Data::loading().merge(RemoteData::<String, i32>::failed("e".into()));
        assert_eq!(merged, RemoteData::Loading);

        let merged = Data::failed("e".into()).merge(RemoteData::<String, i32>::success(1));
        assert_eq!(merged, RemoteData::Failed("e".to_string()));

        let merged = Data::success(1).merge(RemoteData::<String, &str>::success("b"));
        assert_eq!(merged, RemoteData::Success((1, "b")));
    }

    #[test]
    fn test_merge_priority_is_symmetric_in_state() {
        let merged = Data::success(1).merge(RemoteData::<String, i32>::not_asked());
        assert!(merged.is_not_asked());
        let merged = Data::failed("a".into()).merge(RemoteData::<String, i32>::loading());
        assert!(merged.is_loading());
        let merged = Data::failed("a".into()).merge(RemoteData::<String, i32>::failed("b".into()));
        assert_eq!(merged, RemoteData::Failed("a".to_string()));
    }

    #[test]
    fn test_map_success_is_identity_on_other_variants() {
        assert_eq!(Data::loading().map_success(|n| n * 2), RemoteData::Loading);
        assert_eq!(
            Data::failed("x".into()).map_success(|n| n * 2),
            RemoteData::Failed("x".to_string())
        );
        assert_eq!(Data::success(2).map_success(|n| n * 2), RemoteData::Success(4));
    }

    #[test]
    fn test_from_result_and_fallback() {
        let ok: Data = Ok(3).into();
        assert_eq!(ok, RemoteData::Success(3));
        let err: Data = Err("bad".to_string()).into();
        assert_eq!(err.clone(), RemoteData::Failed("bad".to_string()));
        assert_eq!(err.with_fallback(0), 0);
        assert_eq!(Data::success(5).with_fallback(0), 5);
    }

    #[test]
    fn test_dual_fold() {
        let label = |a: Data, b: Data| {
            dual_fold(a, b, |state| match state {
                DualState::BothNotAsked => "not_asked".to_string(),
                DualState::BothLoading => "loading".to_string(),
                DualState::BothFailed(a, b) => format!("failed:{a},{b}"),
                DualState::BothSuccess(a, b) => format!("success:{}", a + b),
                DualState::Incompatible(_, _) => "incompatible".to_string(),
            })
        };
        assert_eq!(label(Data::success(1), Data::success(2)), "success:3");
        assert_eq!(
            label(Data::failed("a".into()), Data::failed("b".into())),
            "failed:a,b"
        );
        assert_eq!(label(Data::loading(), Data::loading()), "loading");
        assert_eq!(label(Data::success(1), Data::loading()), "incompatible");
    }
}

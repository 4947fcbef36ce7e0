//! 轮询调度：定时批量重跑已注册任务
//!
//! 每个 Scheduler 只有一个逻辑定时器（一个 tokio 任务）。每次 tick：
//! 1. 按注册顺序快照当前任务；
//! 2. 并发执行所有 effect（join_all），全部完成后
//! 3. 按注册顺序依次调用各自的 update；
//! 4. 仍有任务且未暂停时，以相同间隔重新计时。
//!
//! tick 之间严格串行；单个任务没有超时，挂起的 effect 会拖住该 Scheduler 之后的所有 tick。
//! unregister 只影响之后的 tick，已在执行中的 effect 结果仍会投递一次。
//! 最后一个任务被移除时定时器立即撤销，之后的 register 从注册时刻重新计时。

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::CoreError;

/// effect 完成后得到的「待投递」更新
type Delivery = Box<dyn FnOnce() + Send>;

type Effect = Arc<dyn Fn() -> BoxFuture<'static, Delivery> + Send + Sync>;

/// 轮询任务：effect 产生结果，update 消费结果
///
/// 结果类型在构造时被擦除，因此不同类型的任务可以放在同一个 Scheduler 里。
#[derive(Clone)]
pub struct Task {
    effect: Effect,
}

impl Task {
    pub fn new<R, Fut, E, U>(effect: E, update: U) -> Self
    where
        R: Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        E: Fn() -> Fut + Send + Sync + 'static,
        U: Fn(R) + Send + Sync + 'static,
    {
        let update = Arc::new(update);
        let effect: Effect = Arc::new(move || {
            let update = Arc::clone(&update);
            let pending = effect();
            async move {
                let result = pending.await;
                Box::new(move || update(result)) as Delivery
            }
            .boxed()
        });
        Self { effect }
    }
}

struct SchedulerState {
    /// 保持注册顺序
    tasks: Vec<(String, Task)>,
    /// 当前定时器；None 表示空闲
    timer: Option<CancellationToken>,
    /// 嵌套暂停计数，归零才恢复
    pause_depth: usize,
    /// 终止（关闭时），resume 不会清除
    stopped: bool,
}

impl SchedulerState {
    fn is_paused(&self) -> bool {
        self.stopped || self.pause_depth > 0
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

struct Inner {
    name: String,
    delay: Duration,
    state: Mutex<SchedulerState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 定时任务注册表，clone 后共享同一组任务与定时器
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                delay,
                state: Mutex::new(SchedulerState {
                    tasks: Vec::new(),
                    timer: None,
                    pause_depth: 0,
                    stopped: false,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// 注册任务；id 已存在时返回 DuplicateTask，新任务不会被执行。
    ///
    /// 定时器空闲时立即开始计时；定时器已在运行时，新任务加入下一次 tick（共享节奏）。
    pub fn register(&self, id: impl Into<String>, task: Task) -> Result<(), CoreError> {
        let id = id.into();
        let mut state = self.inner.state();
        if state.tasks.iter().any(|(existing, _)| *existing == id) {
            return Err(CoreError::DuplicateTask(id));
        }
        tracing::debug!(scheduler = %self.inner.name, task = %id, "register polling task");
        state.tasks.push((id, task));
        self.arm(&mut state);
        Ok(())
    }

    /// 移除任务；未知 id 为 no-op。移除最后一个任务时撤销定时器。
    pub fn unregister(&self, id: &str) {
        let mut state = self.inner.state();
        let before = state.tasks.len();
        state.tasks.retain(|(existing, _)| existing != id);
        if state.tasks.len() == before {
            return;
        }
        tracing::debug!(scheduler = %self.inner.name, task = %id, "unregister polling task");
        if state.tasks.is_empty() {
            state.disarm();
        }
    }

    /// 暂停一层：停止安排之后的 tick，已注册任务保留。每次 pause 需要一次 resume 抵消。
    pub fn pause(&self) {
        let mut state = self.inner.state();
        state.pause_depth += 1;
        tracing::debug!(scheduler = %self.inner.name, depth = state.pause_depth, "polling paused");
    }

    /// 抵消一层 pause；全部抵消且未 stop 时恢复计时（有任务时）
    pub fn resume(&self) {
        let mut state = self.inner.state();
        state.pause_depth = state.pause_depth.saturating_sub(1);
        if !state.is_paused() {
            self.arm(&mut state);
            tracing::debug!(scheduler = %self.inner.name, "polling resumed");
        }
    }

    /// 永久停止（关闭时）：撤销定时器，之后的 resume / register 都不再计时
    pub fn stop(&self) {
        let mut state = self.inner.state();
        state.stopped = true;
        state.disarm();
        tracing::debug!(scheduler = %self.inner.name, "polling stopped");
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state().is_paused()
    }

    pub fn len(&self) -> usize {
        self.inner.state().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.state().tasks.iter().any(|(existing, _)| existing == id)
    }

    fn arm(&self, state: &mut SchedulerState) {
        if state.timer.is_some() || state.is_paused() || state.tasks.is_empty() {
            return;
        }
        let timer = CancellationToken::new();
        state.timer = Some(timer.clone());
        // 截止时间在注册时刻确定，不受 spawn 后首次 poll 的时机影响
        let deadline = Instant::now() + self.inner.delay;
        tokio::spawn(run(Arc::clone(&self.inner), timer, deadline));
    }
}

/// 定时器主循环：一个 Scheduler 同时最多一个未撤销的
async fn run(inner: Arc<Inner>, timer: CancellationToken, first_deadline: Instant) {
    let mut deadline = first_deadline;
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => {}
            _ = timer.cancelled() => return,
        }

        let tasks: Vec<Task> = {
            let mut state = inner.state();
            // 撤销发生在锁内，这里看到的状态与 timer 一致
            if timer.is_cancelled() {
                return;
            }
            if state.is_paused() || state.tasks.is_empty() {
                state.timer = None;
                return;
            }
            state.tasks.iter().map(|(_, task)| task.clone()).collect()
        };

        tracing::trace!(scheduler = %inner.name, tasks = tasks.len(), "tick");
        let deliveries = join_all(tasks.iter().map(|task| (task.effect)())).await;
        for deliver in deliveries {
            deliver();
        }

        {
            let mut state = inner.state();
            if timer.is_cancelled() {
                return;
            }
            if state.is_paused() || state.tasks.is_empty() {
                state.timer = None;
                return;
            }
        }
        deadline = Instant::now() + inner.delay;
    }
}

/// 统一暂停 / 恢复多个不同节奏的 Scheduler（如环境 halt / resume 期间冻结全部轮询）
#[derive(Clone, Default)]
pub struct PollingControl {
    schedulers: Vec<Scheduler>,
}

/// 持有期间全部轮询暂停，drop 时抵消这一层暂停
#[must_use = "polling resumes as soon as the guard is dropped"]
pub struct PauseGuard {
    control: PollingControl,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        self.control.resume();
    }
}

impl PollingControl {
    pub fn new(schedulers: Vec<Scheduler>) -> Self {
        Self { schedulers }
    }

    pub fn pause(&self) {
        for scheduler in &self.schedulers {
            scheduler.pause();
        }
    }

    pub fn resume(&self) {
        for scheduler in &self.schedulers {
            scheduler.resume();
        }
    }

    /// 终止全部轮询，不可恢复
    pub fn stop(&self) {
        for scheduler in &self.schedulers {
            scheduler.stop();
        }
    }

    pub fn is_paused(&self) -> bool {
        !self.schedulers.is_empty() && self.schedulers.iter().all(Scheduler::is_paused)
    }

    pub fn pause_guard(&self) -> PauseGuard {
        self.pause();
        PauseGuard {
            control: self.clone(),
        }
    }

    /// 在 future 执行期间暂停全部轮询；完成或被取消时都会抵消这一层暂停
    pub async fn pause_while<T>(&self, work: impl Future<Output = T>) -> T {
        let _guard = self.pause_guard();
        work.await
    }
}

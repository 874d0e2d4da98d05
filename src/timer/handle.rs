//! 定时器与定时器句柄
//! Timer and timer handle
//!
//! `Timer` 拥有分发循环的生命周期；`TimerHandle` 可以任意克隆，
//! 并可在任何线程或回调内部调用 add/set/del。
//!
//! `Timer` owns the lifetime of the dispatch loop; `TimerHandle` can be cloned
//! freely and used to add/set/del from any thread, including from inside a
//! callback.

use crate::config::TimerConfig;
use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, trace};

use super::alarm::{TokioAlarm, WakeUp};
use super::coordinator::{Shared, dispatch_loop};
use super::stats::TimerStats;
use super::task::TaskId;

/// 定时器句柄，用于添加、重设和删除任务
/// Timer handle, used to add, reschedule and delete tasks
pub struct TimerHandle<W = TokioAlarm> {
    shared: Arc<Shared<W>>,
}

impl<W> Clone for TimerHandle<W> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<W: WakeUp> TimerHandle<W> {
    /// 添加任务，在 `expire` 时刻或之后执行 `callback`
    /// Add a task that runs `callback` at or after `expire`
    ///
    /// 不会失败；已经过期的时间点会在分发循环下次运行时立即触发。
    /// Never fails; an expiry in the past fires as soon as the dispatch loop runs.
    ///
    /// 定时器关闭或被丢弃后仍会接受任务，但这些任务既不会触发也不会被回收，
    /// 调用方可用 [`TimerHandle::is_running`] 检查。
    /// Once the timer is shut down or dropped, tasks are still accepted but
    /// never fire and are never reclaimed; check [`TimerHandle::is_running`].
    pub fn add<F>(&self, expire: Instant, callback: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock();
        let id = state.add(expire, Some(Box::new(callback)));
        self.shared.rearm(&state);
        trace!(
            task_id = id,
            delay_ms = expire.saturating_duration_since(Instant::now()).as_millis() as u64,
            "Task added"
        );
        id
    }

    /// 重设任务的到期时间
    /// Reschedule a task
    ///
    /// # Errors
    /// 任务不存在（从未添加、已触发或已删除）时返回 [`Error::UnknownTask`]，且不修改任何状态。
    /// Returns [`Error::UnknownTask`] without touching any state when the task
    /// was never added, has fired, or was deleted.
    pub fn set(&self, id: TaskId, expire: Instant) -> Result<()> {
        let mut state = self.shared.lock();
        state
            .set(id, expire)
            .inspect_err(|_| trace!(task_id = id, "Reschedule of unknown task"))?;
        self.shared.rearm(&state);
        trace!(task_id = id, "Task rescheduled");
        Ok(())
    }

    /// 删除任务；未知ID静默忽略
    /// Delete a task; unknown IDs are silently ignored
    pub fn del(&self, id: TaskId) {
        let detached = {
            let mut state = self.shared.lock();
            let detached = state.del(id);
            if detached.is_some() {
                self.shared.rearm(&state);
            }
            detached
        };

        // The callback is dropped here, after the lock is released.
        if detached.is_some() {
            trace!(task_id = id, "Task deleted");
        }
    }

    /// 获取统计信息
    /// Get statistics
    pub fn stats(&self) -> TimerStats {
        self.shared.stats()
    }

    /// 待执行任务数
    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.shared.lock().pending()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 分发循环是否仍在运行
    /// Whether the dispatch loop is still running
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }
}

/// 定时器：拥有分发循环
/// Timer: owns the dispatch loop
///
/// 丢弃 `Timer` 会停止分发循环；已克隆的句柄仍可修改任务，但不会再有任务触发。
/// Dropping the `Timer` stops the dispatch loop. Cloned handles can still edit
/// tasks, but nothing fires any more.
pub struct Timer<W = TokioAlarm> {
    handle: TimerHandle<W>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl Timer<TokioAlarm> {
    /// 使用 tokio 时钟创建定时器，并在当前运行时上启动分发循环
    /// Create a timer on the tokio clock and start its dispatch loop on the current runtime
    ///
    /// # Errors
    /// 配置无效时返回 [`Error::InvalidConfig`]；不在 tokio 运行时内调用时返回 [`Error::NoRuntime`]。
    /// Returns [`Error::InvalidConfig`] for an invalid configuration and
    /// [`Error::NoRuntime`] when called outside a tokio runtime.
    pub fn new(config: TimerConfig) -> Result<Self> {
        Self::with_wake_up(config, TokioAlarm::new())
    }
}

impl<W: WakeUp> Timer<W> {
    /// 使用自定义唤醒原语创建定时器
    /// Create a timer with a custom wake-up primitive
    pub fn with_wake_up(config: TimerConfig, alarm: W) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let shared = Arc::new(Shared::new(&config, alarm));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let dispatcher = runtime.spawn(dispatch_loop(shared.clone(), shutdown_rx));

        info!(
            growth_batch_size = config.growth_batch_size,
            "Timer created"
        );

        Ok(Self {
            handle: TimerHandle { shared },
            shutdown_tx: Some(shutdown_tx),
            dispatcher: Some(dispatcher),
        })
    }

    /// 获取可克隆的句柄
    /// Get a cloneable handle
    pub fn handle(&self) -> TimerHandle<W> {
        self.handle.clone()
    }

    /// See [`TimerHandle::add`].
    pub fn add<F>(&self, expire: Instant, callback: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.add(expire, callback)
    }

    /// See [`TimerHandle::set`].
    pub fn set(&self, id: TaskId, expire: Instant) -> Result<()> {
        self.handle.set(id, expire)
    }

    /// See [`TimerHandle::del`].
    pub fn del(&self, id: TaskId) {
        self.handle.del(id)
    }

    /// 获取统计信息
    /// Get statistics
    pub fn stats(&self) -> TimerStats {
        self.handle.stats()
    }

    /// 待执行任务数
    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.handle.len()
    }

    /// 是否没有待执行任务
    /// Whether no task is pending
    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    /// 关闭分发循环并等待其结束；未触发的任务不会再执行
    /// Stop the dispatch loop and wait for it; pending tasks never fire
    ///
    /// 正在执行的回调会先完成。
    /// A callback already running completes first.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            // The loop may already be gone; that is fine.
            let _ = shutdown_tx.send(());
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.await?;
        }
        Ok(())
    }
}

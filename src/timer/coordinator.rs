//! 定时器协调器核心实现
//! Timer coordinator core implementation
//!
//! 本模块持有到期链表、空闲栈与任务ID计数器，所有修改都在同一把互斥锁下进行，
//! 并在每次结构性修改后重新编程唤醒原语。分发循环在唤醒时取出到期任务，
//! 释放锁之后再执行其回调。
//!
//! This module owns the expiry chain, the free stack and the task ID counter.
//! Every mutation happens under one mutex and reprograms the wake-up primitive
//! before the lock is released. The dispatch loop pops due tasks when woken and
//! runs their callbacks after dropping the lock.

use crate::config::TimerConfig;
use crate::error::{Error, Result};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use super::alarm::WakeUp;
use super::chain::ExpiryChain;
use super::free_list::FreeList;
use super::stats::TimerStats;
use super::task::{Callback, SlotKey, TaskArena, TaskId, TaskSlot};

/// 从链表中摘下的任务，其回调必须在锁外执行或释放
/// A task detached from the chain; its callback must be run or dropped outside the lock
pub(crate) struct Detached {
    pub(crate) id: TaskId,
    pub(crate) callback: Option<Callback>,
}

/// 单次分发的结果
/// Outcome of a single dispatch step
pub(crate) enum Dispatch {
    /// 链表为空
    /// Chain is empty
    Idle,
    /// 链表头尚未到期
    /// Head is not yet due
    NotDue(Duration),
    /// 链表头已取出
    /// Head was taken
    Due(Detached),
}

/// 受锁保护的定时器状态
/// Lock-protected timer state
#[derive(Debug)]
pub(crate) struct TimerState {
    arena: TaskArena,
    tasks: ExpiryChain,
    free: FreeList,
    growth_batch_size: usize,
    max_pooled: usize,
    /// 自增主键
    /// Auto-increment key
    last_id: TaskId,
    fired: u64,
    cancelled: u64,
    rescheduled: u64,
}

impl TimerState {
    /// 创建状态并预先填充一批空闲槽位
    /// Create the state and pre-populate one batch of free slots
    pub(crate) fn new(config: &TimerConfig) -> Self {
        let mut state = Self {
            arena: TaskArena::with_capacity(config.growth_batch_size),
            tasks: ExpiryChain::new(),
            free: FreeList::new(),
            growth_batch_size: config.growth_batch_size,
            max_pooled: config.max_pooled(),
            last_id: 0,
            fired: 0,
            cancelled: 0,
            rescheduled: 0,
        };
        state.grow();
        state
    }

    /// 扩容：批量分配空闲槽位
    /// Grow: allocate a batch of free slots
    fn grow(&mut self) {
        self.arena.reserve(self.growth_batch_size);
        for _ in 0..self.growth_batch_size {
            let key = self.arena.insert(TaskSlot::vacant());
            self.free.push(&mut self.arena, key);
        }
        debug!(
            batch = self.growth_batch_size,
            allocated = self.arena.len(),
            "Task pool grown"
        );
    }

    fn get_free(&mut self) -> SlotKey {
        if self.free.is_empty() {
            self.grow();
        }
        match self.free.pop(&mut self.arena) {
            Some(key) => key,
            None => self.arena.insert(TaskSlot::vacant()),
        }
    }

    /// 放回空闲栈，超过上限时直接释放
    /// Return to the free stack, releasing the slot once the ceiling is reached
    fn put_free(&mut self, key: SlotKey) {
        if self.free.len() >= self.max_pooled {
            self.arena.remove(key);
            debug!(pooled = self.free.len(), "Task slot discarded");
            return;
        }
        self.free.push(&mut self.arena, key);
    }

    pub(crate) fn add(&mut self, expire: Instant, callback: Option<Callback>) -> TaskId {
        self.last_id = self.last_id.wrapping_add(1);
        let key = self.get_free();
        self.arena[key].assign(self.last_id, expire, callback);
        self.tasks.insert(&mut self.arena, key);
        self.last_id
    }

    /// 修改到期时间；重新插入到相同到期时间任务的末尾
    /// Change the expiry; re-enters behind tasks with the same expiry
    pub(crate) fn set(&mut self, id: TaskId, expire: Instant) -> Result<()> {
        let key = self
            .tasks
            .del(&mut self.arena, id)
            .ok_or(Error::UnknownTask(id))?;
        self.arena[key].expire = expire;
        self.tasks.insert(&mut self.arena, key);
        self.rescheduled += 1;
        Ok(())
    }

    pub(crate) fn del(&mut self, id: TaskId) -> Option<Detached> {
        let key = self.tasks.del(&mut self.arena, id)?;
        let callback = self.arena[key].callback.take();
        self.put_free(key);
        self.cancelled += 1;
        Some(Detached { id, callback })
    }

    /// 取出已到期的链表头
    /// Take the head if it is due
    pub(crate) fn pop_due(&mut self, now: Instant) -> Dispatch {
        let Some(expire) = self.tasks.peek(&self.arena) else {
            return Dispatch::Idle;
        };
        if now < expire {
            return Dispatch::NotDue(expire - now);
        }
        let Some(key) = self.tasks.pop(&mut self.arena) else {
            return Dispatch::Idle;
        };

        let slot = &mut self.arena[key];
        let detached = Detached {
            id: slot.id,
            callback: slot.callback.take(),
        };
        self.put_free(key);
        self.fired += 1;
        Dispatch::Due(detached)
    }

    /// 距离下一次唤醒的延迟；`None` 表示没有待执行任务
    /// Delay until the next wake-up; `None` when nothing is pending
    pub(crate) fn next_wake(&self, now: Instant) -> Option<Duration> {
        self.tasks
            .peek(&self.arena)
            .map(|expire| expire.saturating_duration_since(now))
    }

    pub(crate) fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn stats(&self) -> TimerStats {
        TimerStats {
            pending: self.tasks.len(),
            pooled: self.free.len(),
            allocated: self.arena.len(),
            last_id: self.last_id,
            fired: self.fired,
            cancelled: self.cancelled,
            rescheduled: self.rescheduled,
            panicked: 0,
        }
    }
}

/// 定时器句柄与分发循环共享的部分
/// The part shared between timer handles and the dispatch loop
pub(crate) struct Shared<W> {
    state: Mutex<TimerState>,
    pub(crate) alarm: W,
    panicked: AtomicU64,
    /// 分发循环退出后置位
    /// Set once the dispatch loop has exited
    stopped: AtomicBool,
}

impl<W: WakeUp> Shared<W> {
    pub(crate) fn new(config: &TimerConfig, alarm: W) -> Self {
        Self {
            state: Mutex::new(TimerState::new(config)),
            alarm,
            panicked: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }

    /// 加锁；回调从不在锁内执行，因此中毒的锁仍然保持一致
    /// Lock; callbacks never run under the lock, so a poisoned lock is still consistent
    pub(crate) fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 按链表头重新编程唤醒原语，调用方必须持有锁
    /// Reprogram the wake-up from the chain head; the caller must hold the lock
    pub(crate) fn rearm(&self, state: &TimerState) {
        match state.next_wake(Instant::now()) {
            Some(delay) => self.alarm.reset(delay),
            None => self.alarm.disarm(),
        }
    }

    pub(crate) fn stats(&self) -> TimerStats {
        let mut stats = self.lock().stats();
        stats.panicked = self.panicked.load(Ordering::Relaxed);
        stats
    }

    /// 执行一次分发：最多触发一个任务，返回其ID
    /// Run one dispatch step: fire at most one task and return its ID
    pub(crate) fn dispatch_once(&self) -> Option<TaskId> {
        let detached = {
            let mut state = self.lock();
            match state.pop_due(Instant::now()) {
                Dispatch::Idle => {
                    trace!("Spurious wake-up with no pending tasks");
                    return None;
                }
                Dispatch::NotDue(remaining) => {
                    trace!(
                        remaining_ms = remaining.as_millis() as u64,
                        "Woken before head task is due"
                    );
                    self.rearm(&state);
                    return None;
                }
                Dispatch::Due(detached) => {
                    self.rearm(&state);
                    detached
                }
            }
        };

        let task_id = detached.id;
        if let Some(callback) = detached.callback {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
                self.panicked.fetch_add(1, Ordering::Relaxed);
                error!(
                    task_id,
                    panic = panic_message(payload.as_ref()),
                    "Timer callback panicked"
                );
            } else {
                trace!(task_id, "Timer task fired");
            }
        }
        Some(task_id)
    }

    /// 连续分发，直到链表为空或链表头尚未到期，返回触发的任务数
    /// Dispatch repeatedly until the chain is empty or its head is not yet due;
    /// returns the number of tasks fired
    pub(crate) fn dispatch_due(&self) -> usize {
        let mut fired = 0;
        while self.dispatch_once().is_some() {
            fired += 1;
        }
        fired
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// 运行分发循环，直到收到关闭信号或发送端被丢弃
/// Run the dispatch loop until shutdown is signalled or the sender is dropped
pub(crate) async fn dispatch_loop<W: WakeUp>(
    shared: Arc<Shared<W>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    info!("Timer dispatch loop started");

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => break,

            _ = shared.alarm.fired() => {
                let fired = shared.dispatch_due();
                if fired > 1 {
                    trace!(fired, "Drained due tasks");
                }
            }
        }
    }

    shared.stopped.store(true, Ordering::Release);
    info!(pending = shared.lock().pending(), "Timer dispatch loop stopped");
}

//! 定时任务槽定义
//! Scheduled task slot definitions
//!
//! 任务槽存放在一个 slab 竞技场中，并通过稳定的整数键寻址。到期链表与空闲栈
//! 都只保存键，同一个 `next` 字段由当前持有该槽的链表使用。
//!
//! Task slots live in a slab arena and are addressed by stable integer keys.
//! Both the expiry chain and the free stack store keys only; the single `next`
//! field belongs to whichever list currently holds the slot.

use slab::Slab;
use std::fmt;
use tokio::time::Instant;

/// 任务ID，添加时分配，单调递增
/// Task ID, assigned on add, monotonically increasing
pub type TaskId = u64;

/// 到期时执行的回调
/// Callback invoked on expiry
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// 任务槽在竞技场中的键
/// Key of a task slot in the arena
pub(crate) type SlotKey = usize;

/// 任务槽竞技场
/// Task slot arena
pub(crate) type TaskArena = Slab<TaskSlot>;

/// 一个可复用的任务槽
/// A reusable task slot
pub(crate) struct TaskSlot {
    pub(crate) id: TaskId,
    pub(crate) expire: Instant,
    pub(crate) callback: Option<Callback>,
    /// 后继槽位，由当前所属链表解释
    /// Successor slot, interpreted by the owning list
    pub(crate) next: Option<SlotKey>,
}

impl TaskSlot {
    /// 创建一个空闲槽位
    /// Create a vacant slot
    pub(crate) fn vacant() -> Self {
        Self {
            id: 0,
            expire: Instant::now(),
            callback: None,
            next: None,
        }
    }

    /// 用新任务填充槽位
    /// Fill the slot with a new task
    pub(crate) fn assign(&mut self, id: TaskId, expire: Instant, callback: Option<Callback>) {
        self.id = id;
        self.expire = expire;
        self.callback = callback;
        self.next = None;
    }
}

impl fmt::Debug for TaskSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSlot")
            .field("id", &self.id)
            .field("expire", &self.expire)
            .field("callback", &self.callback.as_ref().map(|_| "<closure>"))
            .field("next", &self.next)
            .finish()
    }
}

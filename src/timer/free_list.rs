//! 空闲任务槽栈
//! Free task slot stack
//!
//! 后进先出的任务槽池，用于避免每次调度都分配新的任务记录。
//! A last-in-first-out pool of task slots, so scheduling does not allocate a
//! fresh task record every time.

use super::task::{SlotKey, TaskArena};

/// 空闲任务槽栈
/// Free task slot stack
#[derive(Debug, Default)]
pub(crate) struct FreeList {
    head: Option<SlotKey>,
    size: usize,
}

impl FreeList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 压入槽位
    /// Push a slot
    pub(crate) fn push(&mut self, arena: &mut TaskArena, key: SlotKey) {
        arena[key].next = self.head;
        self.head = Some(key);
        self.size += 1;
    }

    /// 弹出最近压入的槽位
    /// Pop the most recently pushed slot
    pub(crate) fn pop(&mut self, arena: &mut TaskArena) -> Option<SlotKey> {
        let key = self.head?;
        self.head = arena[key].next.take();
        self.size -= 1;
        Some(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.size
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

//! 到期链表
//! Expiry chain
//!
//! 按到期时间升序排列的单链表。相同到期时间的任务保持插入顺序，
//! 不按任务ID排序。
//!
//! A singly-linked list ordered by ascending expiry. Tasks with equal expiry
//! keep their insertion order; they are never ordered by task id.

use super::task::{SlotKey, TaskArena, TaskId};
use tokio::time::Instant;

/// 待执行任务的到期链表
/// Expiry chain of pending tasks
#[derive(Debug, Default)]
pub(crate) struct ExpiryChain {
    head: Option<SlotKey>,
    len: usize,
}

impl ExpiryChain {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 按到期时间插入
    /// Insert by expiry
    ///
    /// 新任务排在所有到期时间不晚于它的任务之后。
    /// The new task goes after every task that expires no later than it.
    pub(crate) fn insert(&mut self, arena: &mut TaskArena, key: SlotKey) {
        self.len += 1;
        let expire = arena[key].expire;

        let head = match self.head {
            Some(head) if expire >= arena[head].expire => head,
            _ => {
                arena[key].next = self.head;
                self.head = Some(key);
                return;
            }
        };

        let mut curr = head;
        while let Some(next) = arena[curr].next {
            if expire < arena[next].expire {
                break;
            }
            curr = next;
        }

        arena[key].next = arena[curr].next;
        arena[curr].next = Some(key);
    }

    /// 按ID删除，返回被删除的槽位
    /// Delete by ID, returning the removed slot
    pub(crate) fn del(&mut self, arena: &mut TaskArena, id: TaskId) -> Option<SlotKey> {
        let mut prev: Option<SlotKey> = None;
        let mut curr = self.head;

        while let Some(key) = curr {
            if arena[key].id == id {
                let next = arena[key].next.take();
                match prev {
                    Some(prev) => arena[prev].next = next,
                    None => self.head = next,
                }
                self.len -= 1;
                return Some(key);
            }
            prev = Some(key);
            curr = arena[key].next;
        }

        None
    }

    /// 取出链表头，不检查是否到期
    /// Take the head without checking whether it is due
    pub(crate) fn pop(&mut self, arena: &mut TaskArena) -> Option<SlotKey> {
        let key = self.head?;
        self.head = arena[key].next.take();
        self.len -= 1;
        Some(key)
    }

    /// 最早的到期时间
    /// Earliest expiry
    pub(crate) fn peek(&self, arena: &TaskArena) -> Option<Instant> {
        self.head.map(|key| arena[key].expire)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

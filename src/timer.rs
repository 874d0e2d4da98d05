//! 定时器模块
//! Timer Module
//!
//! 该模块实现了一个基于有序到期链表的内存定时器：调用者注册在某个绝对时间点
//! 执行的回调，可以按ID取消或重设，后台分发循环按到期顺序触发回调。
//! 任务槽从一个可回收的空闲栈中分配，以摊销分配开销。
//!
//! This module implements an in-memory timer built on an ordered expiry chain:
//! callers register a callback for an absolute point in time, may cancel or
//! reschedule it by ID, and a background dispatch loop fires callbacks in
//! expiry order. Task slots come from a recycling free stack so that
//! scheduling amortizes allocation.

pub mod alarm;
mod chain;
mod coordinator;
mod free_list;
pub mod handle;
pub mod stats;
pub mod task;


pub use alarm::{TokioAlarm, WakeUp};
pub use handle::{Timer, TimerHandle};
pub use stats::TimerStats;
pub use task::{Callback, TaskId};

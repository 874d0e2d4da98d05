//! 定时器统计信息
//! Timer statistics

use super::task::TaskId;

/// 定时器统计信息快照
/// Timer statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// 待执行任务数
    /// Number of pending tasks
    pub pending: usize,
    /// 空闲池中的槽位数
    /// Number of slots in the free pool
    pub pooled: usize,
    /// 竞技场中已分配的槽位总数
    /// Total slots allocated in the arena
    pub allocated: usize,
    /// 最近分配的任务ID
    /// Most recently assigned task ID
    pub last_id: TaskId,
    /// 已触发的任务数
    /// Number of fired tasks
    pub fired: u64,
    /// 已取消的任务数
    /// Number of cancelled tasks
    pub cancelled: u64,
    /// 已重新设定时间的任务数
    /// Number of rescheduled tasks
    pub rescheduled: u64,
    /// 发生 panic 的回调数
    /// Number of callbacks that panicked
    pub panicked: u64,
}

impl std::fmt::Display for TimerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimerStats {{ pending: {}, pool: {}/{}, last_id: {}, fired: {}, cancelled: {}, rescheduled: {}, panicked: {} }}",
            self.pending,
            self.pooled,
            self.allocated,
            self.last_id,
            self.fired,
            self.cancelled,
            self.rescheduled,
            self.panicked
        )
    }
}

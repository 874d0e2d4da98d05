//! 定义了定时器的可配置参数。
//! Defines configurable parameters for the timer.

use crate::error::{Error, Result};

/// Default number of task slots allocated per pool growth.
/// 每次扩容时分配的默认任务槽数量。
pub const DEFAULT_GROWTH_BATCH_SIZE: usize = 32;

/// A structure containing all configurable parameters for a timer.
///
/// 包含定时器所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Number of task slots allocated in bulk whenever the free pool runs dry.
    /// Twice this value is the ceiling on slots the pool keeps for reuse;
    /// slots returned beyond it are released.
    ///
    /// 空闲池耗尽时批量分配的任务槽数量。该值的两倍是空闲池保留槽位的上限，
    /// 超出上限归还的槽位会被释放。
    pub growth_batch_size: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            growth_batch_size: DEFAULT_GROWTH_BATCH_SIZE,
        }
    }
}

impl TimerConfig {
    /// Sets the growth batch size.
    /// 设置扩容批量大小。
    pub fn with_growth_batch_size(mut self, growth_batch_size: usize) -> Self {
        self.growth_batch_size = growth_batch_size;
        self
    }

    /// Checks the configuration, rejecting a zero batch size.
    /// 校验配置，拒绝为零的批量大小。
    pub fn validate(&self) -> Result<()> {
        if self.growth_batch_size == 0 {
            return Err(Error::InvalidConfig("growth_batch_size must be greater than 0"));
        }
        Ok(())
    }

    /// The most slots the free pool retains.
    /// 空闲池最多保留的槽位数。
    pub fn max_pooled(&self) -> usize {
        self.growth_batch_size.saturating_mul(2)
    }
}

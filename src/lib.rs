#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the expiry timer library: an in-memory scheduler that fires
//! callbacks at absolute deadlines, in deadline order.
//! 到期定时器库的根：一个在绝对截止时间按顺序触发回调的内存调度器。

pub mod config;
pub mod error;
pub mod timer;

pub use config::TimerConfig;
pub use error::{Error, Result};
pub use timer::{TaskId, Timer, TimerHandle, TimerStats, TokioAlarm, WakeUp};

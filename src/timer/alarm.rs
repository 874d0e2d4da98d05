//! 可重置的单次唤醒原语
//! Resettable single-shot wake-up primitive
//!
//! 分发循环只在唤醒原语就绪时运行。每次重置后原语恰好就绪一次；
//! 在触发之前或之后都可以再次重置，重置会取消尚未触发的唤醒。
//!
//! The dispatch loop runs only when the wake-up primitive becomes ready. After
//! each reset the primitive is ready exactly once; it may be reset again before
//! or after firing, and a reset cancels any firing still pending.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, sleep_until};

/// 唤醒原语 trait
/// Wake-up primitive trait
///
/// `reset` 与 `disarm` 在持有定时器状态锁时调用，必须是非阻塞的。
/// `fired` 只被一个分发循环消费。
///
/// `reset` and `disarm` are called while the timer state lock is held and must
/// not block. `fired` is consumed by a single dispatch loop.
#[async_trait]
pub trait WakeUp: Send + Sync + 'static {
    /// 重新编程：在 `delay` 之后就绪，取消之前未触发的唤醒
    /// Reprogram: become ready after `delay`, cancelling any pending firing
    fn reset(&self, delay: Duration);

    /// 取消唤醒，相当于无限延迟
    /// Cancel the wake-up, equivalent to an infinite delay
    fn disarm(&self);

    /// 等待下一次就绪
    /// Wait until the next firing
    async fn fired(&self);
}

/// 基于 tokio 时钟的唤醒原语
/// Wake-up primitive backed by the tokio clock
#[derive(Debug, Default)]
pub struct TokioAlarm {
    deadline: Mutex<Option<Instant>>,
    rearmed: Notify,
}

impl TokioAlarm {
    /// 创建未设置截止时间的唤醒原语
    /// Create an alarm with no deadline set
    pub fn new() -> Self {
        Self::default()
    }

    fn set_deadline(&self, deadline: Option<Instant>) {
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner) = deadline;
        // A stored permit wakes `fired` even if it is not polling yet.
        self.rearmed.notify_one();
    }

    fn current_deadline(&self) -> Option<Instant> {
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 若截止时间仍是 `at`，则消费本次唤醒
    /// Consume the firing if the deadline is still `at`
    fn take_if_current(&self, at: Instant) -> bool {
        let mut deadline = self.deadline.lock().unwrap_or_else(PoisonError::into_inner);
        if *deadline == Some(at) {
            *deadline = None;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl WakeUp for TokioAlarm {
    fn reset(&self, delay: Duration) {
        self.set_deadline(Some(Instant::now() + delay.min(FAR_FUTURE)));
    }

    fn disarm(&self) {
        self.set_deadline(None);
    }

    async fn fired(&self) {
        loop {
            match self.current_deadline() {
                // An elapsed deadline fires without waiting for a timer tick.
                Some(at) if at <= Instant::now() => {
                    if self.take_if_current(at) {
                        return;
                    }
                }
                Some(at) => {
                    tokio::select! {
                        _ = sleep_until(at) => {
                            if self.take_if_current(at) {
                                return;
                            }
                        }
                        _ = self.rearmed.notified() => {}
                    }
                }
                None => self.rearmed.notified().await,
            }
        }
    }
}

/// 过长的延迟被截断到此值，避免 `Instant` 溢出
/// Longer delays are clamped to this so `Instant` cannot overflow
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

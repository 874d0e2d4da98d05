//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::timer::TaskId;
use thiserror::Error;

/// The primary error type for the expiry timer library.
/// 到期定时器库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// A construction option was rejected. Raised immediately by the
    /// constructor, never deferred.
    ///
    /// 构造参数无效。由构造函数立即返回，不会延迟。
    #[error("invalid timer configuration: {0}")]
    InvalidConfig(&'static str),

    /// `set` was called with an id that is not pending: it was never added,
    /// has already fired, or was deleted.
    ///
    /// 对一个不处于待执行状态的任务ID调用了 `set`：从未添加、已触发或已删除。
    #[error("timer: task {0} does not exist")]
    UnknownTask(TaskId),

    /// The timer was constructed outside a tokio runtime, so the dispatch
    /// loop could not be spawned.
    ///
    /// 定时器在 tokio 运行时之外构造，无法启动分发循环。
    #[error("no tokio runtime available to spawn the dispatch loop")]
    NoRuntime,

    /// The dispatch loop ended abnormally and could not be joined.
    /// 分发循环异常结束，无法回收。
    #[error("dispatch loop failed: {0}")]
    DispatcherFailed(#[from] tokio::task::JoinError),
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

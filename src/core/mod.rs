//! 核心层：远端数据状态、错误、共享状态、轮询调度、环境与依赖组装

pub mod environment;
pub mod error;
pub mod injector;
pub mod remote_data;
pub mod scheduler;
pub mod shutdown;
pub mod state;

pub use environment::EnvironmentHandler;
pub use error::{ApiError, CoreError};
pub use injector::Injector;
pub use remote_data::{dual_fold, DualState, RemoteData};
pub use scheduler::{PauseGuard, PollingControl, Scheduler, Task};
pub use shutdown::{run_with_graceful_shutdown, stop_polling, ShutdownManager, ShutdownReason};
pub use state::{canonical_key, StateHelper, Store, Subscription};

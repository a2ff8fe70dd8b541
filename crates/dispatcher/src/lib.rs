//! 消息路由与完成跟踪
//!
//! [`Dispatcher`] 负责把每条投递路由到回放策略并确认消息，
//! [`JobTracker`] 保存探测超时的任务，[`Supervisor`] 驱动消费循环和周期性回收。

pub mod controller;
pub mod job_tracker;
pub mod supervisor;

#[cfg(test)]
pub mod test_utils;



pub use controller::{DispatchOutcome, Dispatcher, DispatcherStats};
pub use job_tracker::{JobTracker, ReapFailure, ReapReport};
pub use supervisor::{LoopExit, Supervisor};

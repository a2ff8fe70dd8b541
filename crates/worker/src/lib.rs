pub mod components;
pub mod executor_factory;
pub mod executors;

pub use components::{ProbeOutcome, TaskHandle, WorkerPool};
pub use executor_factory::StrategySet;
pub use executors::CommandReplayer;

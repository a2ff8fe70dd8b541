pub mod amqp;
pub mod app_config;
pub mod dispatcher;
pub mod observability;
pub mod replayer;

pub use amqp::AmqpConfig;
pub use app_config::AppConfig;
pub use dispatcher::{DispatcherConfig, PoolConfig, TaskFailurePolicy, UnknownKindPolicy};
pub use observability::{LogFormat, ObservabilityConfig};
pub use replayer::{ReplayerCommandConfig, ReplayersConfig};

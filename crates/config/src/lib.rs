//! graccreq 配置模型
//!
//! 配置在启动时加载一次，之后以 `Arc<AppConfig>` 的形式只读共享给所有组件。
//! 加载顺序：TOML 配置文件，然后是 `GRACCREQ_` 前缀的环境变量覆盖。

pub mod models;

pub use models::{
    AmqpConfig, AppConfig, DispatcherConfig, LogFormat, ObservabilityConfig, PoolConfig,
    ReplayerCommandConfig, ReplayersConfig, TaskFailurePolicy, UnknownKindPolicy,
};

#[cfg(test)]
mod tests;

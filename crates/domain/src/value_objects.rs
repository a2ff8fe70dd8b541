use graccreq_config::AmqpConfig;
use serde::{Deserialize, Serialize};

/// 被跟踪任务的合成标识，进程内单调递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// 传给回放策略的 broker 连接参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub url: String,
    pub exchange: String,
    pub queue: String,
}

impl From<&AmqpConfig> for ConnectionParams {
    fn from(config: &AmqpConfig) -> Self {
        Self {
            url: config.url.clone(),
            exchange: config.exchange.clone(),
            queue: config.queue.clone(),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 任务失败（探测期间或回收期间）时的处理策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskFailurePolicy {
    /// 记录日志并确认消息，消费者继续运行
    #[default]
    Isolate,
    /// 任务失败终止消费循环，进程以非零状态退出
    Abort,
}

/// 未识别 `kind` 的消息处理策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKindPolicy {
    /// 确认并丢弃
    #[default]
    Ignore,
    /// 拒绝且不重新入队，交给死信交换机处理
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_reap_interval_seconds")]
    pub reap_interval_seconds: u64,
    #[serde(default)]
    pub task_failure_policy: TaskFailurePolicy,
    #[serde(default)]
    pub unknown_kind_policy: UnknownKindPolicy,
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_reap_interval_seconds() -> u64 {
    10
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            reap_interval_seconds: default_reap_interval_seconds(),
            task_failure_policy: TaskFailurePolicy::default(),
            unknown_kind_policy: UnknownKindPolicy::default(),
        }
    }
}

impl DispatcherConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_seconds)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.probe_timeout_ms == 0 {
            return Err(anyhow::anyhow!("probe_timeout_ms必须大于0"));
        }

        if self.reap_interval_seconds == 0 {
            return Err(anyhow::anyhow!("reap_interval_seconds必须大于0"));
        }

        if self.probe_timeout() >= self.reap_interval() {
            return Err(anyhow::anyhow!(
                "探测超时({}ms)必须小于回收周期({}s)",
                self.probe_timeout_ms,
                self.reap_interval_seconds
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_pool_size")]
    pub size: usize,
}

fn default_pool_size() -> usize {
    4
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: default_pool_size(),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.size == 0 {
            return Err(anyhow::anyhow!("工作池大小必须大于0"));
        }

        if self.size > 256 {
            return Err(anyhow::anyhow!("工作池大小不能超过256: {}", self.size));
        }

        Ok(())
    }
}

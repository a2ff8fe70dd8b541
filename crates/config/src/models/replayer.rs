use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 外部回放程序的启动参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayerCommandConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<String>,
}

impl ReplayerCommandConfig {
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            working_dir: None,
        }
    }

    fn validate(&self, kind: &str) -> anyhow::Result<()> {
        if self.command.trim().is_empty() {
            return Err(anyhow::anyhow!("回放程序 {kind} 的command不能为空"));
        }
        Ok(())
    }
}

/// 每种消息类型对应的回放程序，未配置的类型使用默认命令
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayersConfig {
    #[serde(default = "default_raw_replayer")]
    pub raw: ReplayerCommandConfig,
    #[serde(default = "default_summary_replayer")]
    pub summary: ReplayerCommandConfig,
    #[serde(default = "default_transfer_summary_replayer")]
    pub transfer_summary: ReplayerCommandConfig,
}

fn default_raw_replayer() -> ReplayerCommandConfig {
    ReplayerCommandConfig::new("gracc-raw-replayer")
}

fn default_summary_replayer() -> ReplayerCommandConfig {
    ReplayerCommandConfig::new("gracc-summary-replayer")
}

fn default_transfer_summary_replayer() -> ReplayerCommandConfig {
    ReplayerCommandConfig::new("gracc-transfer-summary-replayer")
}

impl Default for ReplayersConfig {
    fn default() -> Self {
        Self {
            raw: default_raw_replayer(),
            summary: default_summary_replayer(),
            transfer_summary: default_transfer_summary_replayer(),
        }
    }
}

impl ReplayersConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.raw.validate("raw")?;
        self.summary.validate("summary")?;
        self.transfer_summary.validate("transfer_summary")?;
        Ok(())
    }
}

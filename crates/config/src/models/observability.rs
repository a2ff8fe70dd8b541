use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {s}. Valid formats: pretty, json")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus 指标监听地址，未设置时不导出
    #[serde(default)]
    pub metrics_listen: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_listen: None,
        }
    }
}

impl ObservabilityConfig {
    pub fn metrics_addr(&self) -> anyhow::Result<Option<SocketAddr>> {
        match &self.metrics_listen {
            Some(addr) => addr
                .parse()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("无效的指标监听地址 {addr}: {e}")),
            None => Ok(None),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(anyhow::anyhow!(
                "无效的日志级别: {}. 可选: {:?}",
                self.log_level,
                valid_levels
            ));
        }

        self.metrics_addr()?;
        Ok(())
    }
}

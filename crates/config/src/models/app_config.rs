use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{
    amqp::AmqpConfig,
    dispatcher::{DispatcherConfig, PoolConfig},
    observability::ObservabilityConfig,
    replayer::ReplayersConfig,
};

/// 默认配置文件查找路径
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/graccreq.toml",
    "graccreq.toml",
    "/etc/graccreq/config.toml",
];

/// 显式路径必须存在；未指定时取候选路径中第一个存在的文件
pub fn resolve_config_path(
    explicit: Option<&str>,
    candidates: &[&str],
) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
            Ok(Some(PathBuf::from(path)))
        }
        None => Ok(candidates
            .iter()
            .find(|path| Path::new(path).exists())
            .map(PathBuf::from)),
    }
}

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, alias = "AMQP")]
    pub amqp: AmqpConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub replayers: ReplayersConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// 配置文件来源，回放程序通过 GRACCREQ_CONFIG 读取同一份配置
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Config file (TOML format), or the first of [`DEFAULT_CONFIG_PATHS`] that exists
    /// 2. Built-in defaults for anything the file leaves out
    /// 3. Environment variable overrides (prefix: GRACCREQ_, nested keys joined by `__`)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();
        let source_path = resolve_config_path(config_path, &DEFAULT_CONFIG_PATHS)?;

        if let Some(path) = &source_path {
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("GRACCREQ")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;
        config.source_path = source_path;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    /// 消费者预取数量，未配置时与工作池大小一致
    pub fn prefetch_count(&self) -> u16 {
        self.amqp
            .prefetch_count
            .unwrap_or_else(|| u16::try_from(self.pool.size).unwrap_or(u16::MAX))
    }

    pub fn validate(&self) -> Result<()> {
        self.amqp.validate().context("AMQP配置验证失败")?;
        self.pool.validate().context("工作池配置验证失败")?;
        self.dispatcher
            .validate()
            .context("Dispatcher配置验证失败")?;
        self.replayers.validate().context("回放程序配置验证失败")?;
        self.observability
            .validate()
            .context("可观测性配置验证失败")?;
        Ok(())
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use graccreq_config::{AppConfig, LogFormat};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod shutdown;

use app::Application;
use shutdown::ShutdownManager;

/// 收到信号后等待应用退出的时间
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("graccreq")
        .version(env!("CARGO_PKG_VERSION"))
        .about("GRACC 回放请求监听服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时依次查找 config/graccreq.toml、graccreq.toml、/etc/graccreq/config.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);

    // 加载配置
    let config = AppConfig::load(config_path)
        .with_context(|| format!("加载配置失败: {}", config_path.unwrap_or("<默认路径>")))?;

    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.observability.log_level.clone());
    let log_format = match matches.get_one::<String>("log-format") {
        Some(format) => format
            .parse::<LogFormat>()
            .map_err(|e| anyhow::anyhow!(e))?,
        None => config.observability.log_format,
    };

    // 初始化日志系统
    init_logging(&log_level, log_format)?;

    info!("启动 graccreq {}", env!("CARGO_PKG_VERSION"));
    match &config.source_path {
        Some(path) => info!("配置文件: {}", path.display()),
        None => warn!("未找到配置文件，使用内置默认值与环境变量"),
    }

    if let Some(addr) = config.observability.metrics_addr()? {
        graccreq_infrastructure::init_metrics(addr)?;
    }

    let app = Application::new(config).await?;

    // 创建优雅关闭管理器
    let shutdown_manager = ShutdownManager::new();
    let shutdown_rx = shutdown_manager.subscribe();
    let mut app_handle = tokio::spawn(app.run(shutdown_rx));

    tokio::select! {
        joined = &mut app_handle => {
            // 消费循环自行结束只可能是出错
            let result = joined.context("应用任务异常退出")?;
            if let Err(e) = &result {
                error!("应用运行失败: {e:#}");
            }
            return result;
        }
        _ = wait_for_shutdown_signal() => {
            info!("收到关闭信号，开始优雅关闭...");
        }
    }

    shutdown_manager.shutdown();

    // 等待应用关闭，设置超时
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, app_handle).await {
        Ok(Ok(Ok(()))) => info!("应用已优雅关闭"),
        Ok(Ok(Err(e))) => error!("应用关闭时发生错误: {e:#}"),
        Ok(Err(e)) => error!("应用任务异常退出: {e}"),
        Err(_) => warn!("应用关闭超时，强制退出"),
    }

    info!("graccreq 已退出");
    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},lapin=warn")));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        LogFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}

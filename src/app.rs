use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use graccreq_config::AppConfig;
use graccreq_dispatcher::{Dispatcher, Supervisor};
use graccreq_infrastructure::{ConsumerSettings, RabbitMqConsumer};
use graccreq_worker::{StrategySet, WorkerPool};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// 关闭时等待正在运行的回放任务的时间
const POOL_DRAIN_GRACE: Duration = Duration::from_secs(20);

/// 主应用程序
pub struct Application {
    pool: Arc<WorkerPool>,
    consumer: RabbitMqConsumer,
    supervisor: Supervisor,
}

impl Application {
    /// 连接 broker 并组装工作池、分发器和消费循环
    pub async fn new(config: AppConfig) -> Result<Self> {
        let config = Arc::new(config);

        let pool = Arc::new(WorkerPool::new(config.pool.size));
        info!("工作池已创建，大小: {}", pool.size());

        let strategies = StrategySet::from_config(&config);
        let dispatcher = Dispatcher::new(Arc::clone(&pool), strategies, Arc::clone(&config));
        let supervisor = Supervisor::new(dispatcher, config.dispatcher.reap_interval());

        let consumer = RabbitMqConsumer::connect(
            &config.amqp.url,
            ConsumerSettings::from_config(&config),
        )
        .await
        .context("初始化RabbitMQ消费者失败")?;

        Ok(Self {
            pool,
            consumer,
            supervisor,
        })
    }

    /// 运行消费循环，返回后释放工作池和连接
    pub async fn run(mut self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let deliveries = self
            .consumer
            .start_consuming()
            .await
            .context("启动消费失败")?;

        let result = self.supervisor.run(deliveries, shutdown_rx).await;
        if let Err(e) = &result {
            error!("消费循环异常结束: {e}");
        }

        if self.pool.shutdown(POOL_DRAIN_GRACE).await {
            info!("工作池已排空");
        }

        if let Err(e) = self.consumer.close().await {
            warn!("关闭RabbitMQ连接失败: {e}");
        }

        result.context("消费循环失败")
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use graccreq_config::AppConfig;
use graccreq_errors::GraccreqResult;

use crate::{ConnectionParams, InboundMessage};

/// 一次回放所需的全部参数
#[derive(Debug, Clone)]
pub struct ReplayRequest {
    pub message: InboundMessage,
    pub connection: ConnectionParams,
    pub config: Arc<AppConfig>,
}

/// 回放策略接口
///
/// 策略自身的错误对调度核心不透明，只会被记录或上报。
#[async_trait]
pub trait ReplayStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn replay(
        &self,
        message: &InboundMessage,
        connection: &ConnectionParams,
        config: &AppConfig,
    ) -> GraccreqResult<()>;
}

use std::sync::Arc;

use graccreq_config::AppConfig;
use graccreq_domain::{MessageKind, ReplayStrategy};
use tracing::info;

use super::executors::CommandReplayer;

/// 消息类型到回放策略的映射
#[derive(Clone)]
pub struct StrategySet {
    raw: Arc<dyn ReplayStrategy>,
    summary: Arc<dyn ReplayStrategy>,
    transfer_summary: Arc<dyn ReplayStrategy>,
}

impl StrategySet {
    pub fn new(
        raw: Arc<dyn ReplayStrategy>,
        summary: Arc<dyn ReplayStrategy>,
        transfer_summary: Arc<dyn ReplayStrategy>,
    ) -> Self {
        Self {
            raw,
            summary,
            transfer_summary,
        }
    }

    /// 按配置为每种消息类型创建外部回放程序
    pub fn from_config(config: &AppConfig) -> Self {
        let replayers = &config.replayers;
        let set = Self::new(
            Arc::new(CommandReplayer::new(MessageKind::Raw, replayers.raw.clone())),
            Arc::new(CommandReplayer::new(
                MessageKind::Summary,
                replayers.summary.clone(),
            )),
            Arc::new(CommandReplayer::new(
                MessageKind::TransferSummary,
                replayers.transfer_summary.clone(),
            )),
        );

        for kind in MessageKind::ALL {
            info!("注册回放策略: {} -> {}", kind, set.get(kind).name());
        }
        set
    }

    pub fn get(&self, kind: MessageKind) -> Arc<dyn ReplayStrategy> {
        match kind {
            MessageKind::Raw => Arc::clone(&self.raw),
            MessageKind::Summary => Arc::clone(&self.summary),
            MessageKind::TransferSummary => Arc::clone(&self.transfer_summary),
        }
    }
}

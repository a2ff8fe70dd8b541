use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use graccreq_config::AppConfig;
use graccreq_domain::{ConnectionParams, Delivery, InboundMessage, ReplayRequest, ReplayStrategy};
use graccreq_errors::{GraccreqError, GraccreqResult};

/// 按消息内容执行的回放策略：`delay_ms` 控制耗时，`fail: true` 使其失败
#[derive(Default)]
pub struct ScriptedStrategy {
    calls: AtomicUsize,
}

impl ScriptedStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplayStrategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn replay(
        &self,
        message: &InboundMessage,
        _connection: &ConnectionParams,
        _config: &AppConfig,
    ) -> GraccreqResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay_ms = message
            .get("delay_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        if message.get("fail").and_then(|v| v.as_bool()) == Some(true) {
            return Err(GraccreqError::task_execution(format!(
                "scripted failure for {}",
                message.kind_str()
            )));
        }
        Ok(())
    }
}

pub fn request(body: &str) -> ReplayRequest {
    let config = Arc::new(AppConfig::default());
    ReplayRequest {
        message: InboundMessage::decode(body.as_bytes()).unwrap(),
        connection: ConnectionParams::from(&config.amqp),
        config,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Ack,
    Reject,
}

/// 记录确认调用的投递
pub struct MockDelivery {
    tag: u64,
    body: Vec<u8>,
    settlements: Arc<Mutex<Vec<(u64, Settlement)>>>,
    fail_ack: bool,
}

impl MockDelivery {
    pub fn ack_failing(mut self) -> Self {
        self.fail_ack = true;
        self
    }
}

#[async_trait]
impl Delivery for MockDelivery {
    fn delivery_tag(&self) -> u64 {
        self.tag
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    async fn ack(&self) -> GraccreqResult<()> {
        if self.fail_ack {
            return Err(GraccreqError::message_queue("channel closed"));
        }
        self.settlements
            .lock()
            .unwrap()
            .push((self.tag, Settlement::Ack));
        Ok(())
    }

    async fn reject(&self) -> GraccreqResult<()> {
        self.settlements
            .lock()
            .unwrap()
            .push((self.tag, Settlement::Reject));
        Ok(())
    }
}

/// 为测试生成投递并汇总确认记录
#[derive(Default, Clone)]
pub struct DeliveryLog {
    next_tag: Arc<AtomicUsize>,
    settlements: Arc<Mutex<Vec<(u64, Settlement)>>>,
}

impl DeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivery(&self, body: &str) -> MockDelivery {
        let tag = self.next_tag.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        MockDelivery {
            tag,
            body: body.as_bytes().to_vec(),
            settlements: Arc::clone(&self.settlements),
            fail_ack: false,
        }
    }

    pub fn settlements(&self) -> Vec<(u64, Settlement)> {
        self.settlements.lock().unwrap().clone()
    }

    pub fn settlement_of(&self, tag: u64) -> Vec<Settlement> {
        self.settlements()
            .into_iter()
            .filter(|(t, _)| *t == tag)
            .map(|(_, s)| s)
            .collect()
    }
}

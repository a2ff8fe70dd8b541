use async_trait::async_trait;
use graccreq_errors::GraccreqResult;

/// 一条待确认的 broker 投递
///
/// 每条成功解码且未导致致命错误的投递恰好确认一次。
#[async_trait]
pub trait Delivery: Send + Sync {
    fn delivery_tag(&self) -> u64;
    fn body(&self) -> &[u8];
    async fn ack(&self) -> GraccreqResult<()>;
    /// 拒绝且不重新入队
    async fn reject(&self) -> GraccreqResult<()>;
}

use std::time::Duration;

use futures::{Stream, StreamExt};
use graccreq_config::TaskFailurePolicy;
use graccreq_domain::Delivery;
use graccreq_errors::{GraccreqError, GraccreqResult};
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::controller::Dispatcher;

/// 消费循环的退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// 收到关闭信号
    Shutdown,
    /// `abort` 策略下回放任务失败
    TaskFailure,
    /// broker 连接、消费者流或确认出错
    Fatal,
    /// 其他未分类的错误
    Other,
}

impl LoopExit {
    pub fn classify(error: &GraccreqError, policy: TaskFailurePolicy) -> Self {
        if error.is_task_failure() && policy == TaskFailurePolicy::Abort {
            LoopExit::TaskFailure
        } else if error.is_fatal() {
            LoopExit::Fatal
        } else {
            LoopExit::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoopExit::Shutdown => "shutdown",
            LoopExit::TaskFailure => "task_failure",
            LoopExit::Fatal => "fatal",
            LoopExit::Other => "other",
        }
    }
}

/// 消费循环
///
/// 在同一个任务里依次处理投递和周期性回收，二者从不并发执行，
/// 因此 [`Dispatcher`] 持有的跟踪集合无需加锁。
pub struct Supervisor {
    dispatcher: Dispatcher,
    reap_interval: Duration,
    exit: Option<LoopExit>,
}

impl Supervisor {
    pub fn new(dispatcher: Dispatcher, reap_interval: Duration) -> Self {
        Self {
            dispatcher,
            reap_interval,
            exit: None,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// 最近一次 [`Supervisor::run`] 的退出原因
    pub fn exit(&self) -> Option<LoopExit> {
        self.exit
    }

    /// 运行直到收到关闭信号
    ///
    /// 投递流出错或结束、确认失败，以及 `abort` 策略下的任务失败都会以 `Err` 结束循环。
    pub async fn run<S, D>(
        &mut self,
        mut deliveries: S,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> GraccreqResult<()>
    where
        S: Stream<Item = GraccreqResult<D>> + Unpin,
        D: Delivery,
    {
        let mut reap_timer = interval_at(Instant::now() + self.reap_interval, self.reap_interval);
        reap_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("消费循环启动，回收周期: {:?}", self.reap_interval);

        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("消费循环收到关闭信号");
                    break Ok(());
                }
                _ = reap_timer.tick() => {
                    debug!("开始回收后台任务，当前跟踪数: {}", self.dispatcher.tracker().len());
                    if let Err(e) = self.dispatcher.reap().await {
                        error!("回收后台任务时遇到失败，终止消费循环: {}", e);
                        break Err(e);
                    }
                }
                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => {
                        if let Err(e) = self.dispatcher.handle_message(&delivery).await {
                            error!(
                                delivery_tag = delivery.delivery_tag(),
                                "处理消息失败，终止消费循环: {}", e
                            );
                            break Err(e);
                        }
                    }
                    Some(Err(e)) => {
                        error!("接收消息失败: {}", e);
                        break Err(e);
                    }
                    None => {
                        warn!("消费者已被broker取消");
                        break Err(GraccreqError::message_queue("消费者流已结束"));
                    }
                },
            }
        };

        let exit = match &result {
            Ok(()) => LoopExit::Shutdown,
            Err(e) => LoopExit::classify(e, self.dispatcher.failure_policy()),
        };
        self.exit = Some(exit);
        metrics::counter!("graccreq_loop_exits_total", "reason" => exit.as_str()).increment(1);

        let abandoned = self.dispatcher.abandon_pending();
        let stats = self.dispatcher.stats();
        info!(
            reason = exit.as_str(),
            "消费循环退出: received={}, tracked={}, reaped={}, task_failures={}, abandoned={}",
            stats.received, stats.tracked, stats.reaped, stats.task_failures, abandoned
        );
        result
    }
}

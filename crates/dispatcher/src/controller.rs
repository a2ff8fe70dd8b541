use std::sync::Arc;
use std::time::Duration;

use graccreq_config::{AppConfig, TaskFailurePolicy, UnknownKindPolicy};
use graccreq_domain::{
    ConnectionParams, Delivery, InboundMessage, JobId, MessageKind, ReplayRequest,
};
use graccreq_errors::{GraccreqError, GraccreqResult};
use graccreq_worker::{ProbeOutcome, StrategySet, WorkerPool};
use tracing::{debug, error, info, warn};

use crate::job_tracker::{JobTracker, ReapReport};

/// 单条消息的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 无法解码，已确认并丢弃
    Malformed,
    /// 只投递不等待（raw）
    Dispatched(MessageKind),
    /// 在探测期内成功完成
    Resolved(MessageKind),
    /// 在探测期内失败，已按隔离策略记录
    Failed(MessageKind),
    /// 探测超时，转入后台跟踪
    Tracked(JobId),
    /// 未识别的 kind，已确认
    Ignored(String),
    /// 未识别的 kind，已拒绝
    Rejected(String),
}

impl DispatchOutcome {
    fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Malformed => "malformed",
            DispatchOutcome::Dispatched(_) => "dispatched",
            DispatchOutcome::Resolved(_) => "resolved",
            DispatchOutcome::Failed(_) => "failed",
            DispatchOutcome::Tracked(_) => "tracked",
            DispatchOutcome::Ignored(_) => "ignored",
            DispatchOutcome::Rejected(_) => "rejected",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatcherStats {
    pub received: u64,
    pub malformed: u64,
    pub dispatched: u64,
    pub resolved_inline: u64,
    pub tracked: u64,
    pub reap_cycles: u64,
    pub reaped: u64,
    pub task_failures: u64,
    pub unrouted: u64,
}

/// 消息路由与完成跟踪
///
/// 每条消息：解码，按 `kind` 交给工作池，对 summary 类消息做一次有界等待，
/// 未完成的句柄移入 [`JobTracker`]，最后确认消息。
pub struct Dispatcher {
    pool: Arc<WorkerPool>,
    strategies: StrategySet,
    config: Arc<AppConfig>,
    connection: ConnectionParams,
    tracker: JobTracker,
    probe_timeout: Duration,
    failure_policy: TaskFailurePolicy,
    unknown_kind_policy: UnknownKindPolicy,
    stats: DispatcherStats,
}

impl Dispatcher {
    pub fn new(pool: Arc<WorkerPool>, strategies: StrategySet, config: Arc<AppConfig>) -> Self {
        let dispatcher_config = &config.dispatcher;
        Self {
            pool,
            strategies,
            connection: ConnectionParams::from(&config.amqp),
            tracker: JobTracker::new(),
            probe_timeout: dispatcher_config.probe_timeout(),
            failure_policy: dispatcher_config.task_failure_policy,
            unknown_kind_policy: dispatcher_config.unknown_kind_policy,
            stats: DispatcherStats::default(),
            config,
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }

    pub fn failure_policy(&self) -> TaskFailurePolicy {
        self.failure_policy
    }

    /// 处理一条投递
    ///
    /// 返回 `Err` 时消息未被确认，调用方应终止消费循环：
    /// 确认本身失败，或者在 `abort` 策略下任务在探测期内失败。
    pub async fn handle_message<D: Delivery + ?Sized>(
        &mut self,
        delivery: &D,
    ) -> GraccreqResult<DispatchOutcome> {
        self.stats.received += 1;
        let delivery_tag = delivery.delivery_tag();

        let message = match InboundMessage::decode(delivery.body()) {
            Ok(message) => message,
            Err(e) => {
                warn!(delivery_tag, "无法解析消息体，确认并丢弃: {}", e);
                delivery.ack().await?;
                self.stats.malformed += 1;
                return Ok(self.record(None, DispatchOutcome::Malformed));
            }
        };

        debug!(delivery_tag, kind = message.kind_str(), "收到消息: {:?}", message.body());

        let Some(kind) = message.kind() else {
            return self.handle_unknown_kind(delivery, message.kind_str()).await;
        };

        let strategy = self.strategies.get(kind);
        let request = ReplayRequest {
            message,
            connection: self.connection.clone(),
            config: Arc::clone(&self.config),
        };

        let outcome = if kind.is_probed() {
            debug!(delivery_tag, kind = %kind, "提交回放任务并等待 {:?}", self.probe_timeout);
            let handle = self.pool.submit(kind, strategy, request);
            match handle.probe(self.probe_timeout).await {
                ProbeOutcome::Resolved(Ok(())) => {
                    self.stats.resolved_inline += 1;
                    DispatchOutcome::Resolved(kind)
                }
                ProbeOutcome::Resolved(Err(e)) => {
                    self.stats.task_failures += 1;
                    report_task_failure(kind, "probe", None, &e);
                    if self.failure_policy == TaskFailurePolicy::Abort {
                        return Err(e);
                    }
                    DispatchOutcome::Failed(kind)
                }
                ProbeOutcome::TimedOut(handle) => {
                    let job_id = self.tracker.track(handle);
                    self.stats.tracked += 1;
                    metrics::gauge!("graccreq_tracked_jobs").set(self.tracker.len() as f64);
                    info!(delivery_tag, job_id = %job_id, kind = %kind, "回放任务未在探测期内完成，转入后台跟踪");
                    DispatchOutcome::Tracked(job_id)
                }
            }
        } else {
            debug!(delivery_tag, kind = %kind, "投递回放任务");
            self.pool.dispatch(kind, strategy, request);
            self.stats.dispatched += 1;
            DispatchOutcome::Dispatched(kind)
        };

        delivery.ack().await?;
        Ok(self.record(Some(kind), outcome))
    }

    async fn handle_unknown_kind<D: Delivery + ?Sized>(
        &mut self,
        delivery: &D,
        kind: &str,
    ) -> GraccreqResult<DispatchOutcome> {
        self.stats.unrouted += 1;
        let delivery_tag = delivery.delivery_tag();
        let outcome = match self.unknown_kind_policy {
            UnknownKindPolicy::Ignore => {
                warn!(delivery_tag, kind, "未识别的消息类型，确认并忽略");
                delivery.ack().await?;
                DispatchOutcome::Ignored(kind.to_string())
            }
            UnknownKindPolicy::Reject => {
                warn!(delivery_tag, kind, "未识别的消息类型，拒绝且不重新入队");
                delivery.reject().await?;
                DispatchOutcome::Rejected(kind.to_string())
            }
        };
        Ok(self.record(None, outcome))
    }

    /// 回收已结束的后台任务
    ///
    /// 失败的任务总是先被移出并记录；`abort` 策略下随后返回第一个失败。
    pub async fn reap(&mut self) -> GraccreqResult<ReapReport> {
        let mut report = self.tracker.reap().await;
        self.stats.reap_cycles += 1;
        self.stats.reaped += (report.completed + report.failed.len()) as u64;
        self.stats.task_failures += report.failed.len() as u64;
        metrics::gauge!("graccreq_tracked_jobs").set(self.tracker.len() as f64);

        if !report.is_noop() {
            info!(
                "回收后台任务: completed={}, failed={}, pending={}",
                report.completed,
                report.failed.len(),
                report.pending
            );
        }

        for failure in &report.failed {
            report_task_failure(failure.kind, "reap", Some(failure.job_id), &failure.error);
        }

        if self.failure_policy == TaskFailurePolicy::Abort && !report.failed.is_empty() {
            let first = report.failed.remove(0);
            return Err(first.error);
        }

        Ok(report)
    }

    /// 关闭时调用：记录仍在运行的任务，它们的结果将会丢失
    pub fn abandon_pending(&mut self) -> usize {
        let pending = self.tracker.drain();
        for (job_id, handle) in &pending {
            warn!(
                job_id = %job_id,
                kind = %handle.kind(),
                "关闭时回放任务仍在运行，已运行 {:?}",
                handle.elapsed()
            );
        }
        metrics::gauge!("graccreq_tracked_jobs").set(0.0);
        pending.len()
    }

    fn record(&self, kind: Option<MessageKind>, outcome: DispatchOutcome) -> DispatchOutcome {
        metrics::counter!(
            "graccreq_messages_total",
            "kind" => kind.map(|k| k.as_str()).unwrap_or("unknown"),
            "outcome" => outcome.label()
        )
        .increment(1);
        outcome
    }
}

fn report_task_failure(kind: MessageKind, stage: &'static str, job_id: Option<JobId>, e: &GraccreqError) {
    match job_id {
        Some(job_id) => error!(job_id = %job_id, kind = %kind, stage, "回放任务失败: {}", e),
        None => error!(kind = %kind, stage, "回放任务失败: {}", e),
    }
    metrics::counter!(
        "graccreq_task_failures_total",
        "kind" => kind.as_str(),
        "stage" => stage
    )
    .increment(1);
}

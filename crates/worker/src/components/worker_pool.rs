use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use graccreq_domain::{MessageKind, ReplayRequest, ReplayStrategy};
use graccreq_errors::{GraccreqError, GraccreqResult};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 固定大小的回放工作池
///
/// 每个提交的回放都在独立的 tokio 任务中运行，同时执行的数量受信号量限制，
/// 超出部分排队等待空闲 worker。提交本身从不阻塞调用方。
pub struct WorkerPool {
    size: usize,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
}

/// 一次提交的回放任务句柄
///
/// 句柄只能被消费一次：探测结束或取回结果后即被丢弃，
/// 只有探测超时的句柄会被原样交还给调用方。
pub struct TaskHandle {
    kind: MessageKind,
    strategy: String,
    submitted_at: Instant,
    inner: JoinHandle<GraccreqResult<()>>,
}

/// 有界等待的结果
pub enum ProbeOutcome {
    /// 任务在等待期内结束，携带任务自身的结果
    Resolved(GraccreqResult<()>),
    /// 等待超时，任务仍在后台运行
    TimedOut(TaskHandle),
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        info!("创建回放工作池，大小: {}", size);
        Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 已提交但尚未结束的任务数（包含排队中的）
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// 提交回放任务并返回句柄
    pub fn submit(
        &self,
        kind: MessageKind,
        strategy: Arc<dyn ReplayStrategy>,
        request: ReplayRequest,
    ) -> TaskHandle {
        let strategy_name = strategy.name().to_string();
        let permits = Arc::clone(&self.permits);
        let in_flight = Arc::clone(&self.in_flight);

        in_flight.fetch_add(1, Ordering::Relaxed);
        let inner = tokio::spawn(async move {
            let _guard = InFlightGuard(in_flight);
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| GraccreqError::WorkerPool("工作池已关闭".to_string()))?;

            debug!("开始执行回放任务: kind={}", kind);
            strategy
                .replay(&request.message, &request.connection, &request.config)
                .await
        });

        TaskHandle {
            kind,
            strategy: strategy_name,
            submitted_at: Instant::now(),
            inner,
        }
    }

    /// 只投递不跟踪：不返回句柄，失败只记录日志和指标
    pub fn dispatch(
        &self,
        kind: MessageKind,
        strategy: Arc<dyn ReplayStrategy>,
        request: ReplayRequest,
    ) {
        let handle = self.submit(kind, strategy, request);
        tokio::spawn(async move {
            let kind = handle.kind();
            let strategy = handle.strategy().to_string();
            if let Err(e) = handle.into_result().await {
                error!(kind = %kind, strategy = %strategy, "回放任务执行失败: {}", e);
                metrics::counter!(
                    "graccreq_task_failures_total",
                    "kind" => kind.as_str(),
                    "stage" => "dispatch"
                )
                .increment(1);
            }
        });
    }

    /// 等待正在执行的任务结束，最多等待 `grace`，然后关闭工作池
    ///
    /// 关闭后仍在排队的任务会以 `WorkerPool` 错误结束。返回是否在期限内排空。
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let all = u32::try_from(self.size).unwrap_or(u32::MAX);
        let drained = tokio::time::timeout(grace, self.permits.acquire_many(all))
            .await
            .map(|permit| permit.is_ok())
            .unwrap_or(false);

        if !drained {
            warn!(
                "工作池在 {:?} 内未能排空，仍有 {} 个任务未结束",
                grace,
                self.in_flight()
            );
        }
        self.permits.close();
        info!("回放工作池已关闭");
        drained
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl TaskHandle {
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// 非阻塞的就绪检查
    pub fn is_ready(&self) -> bool {
        self.inner.is_finished()
    }

    /// 最多等待 `timeout`；超时不会取消任务
    pub async fn probe(mut self, timeout: Duration) -> ProbeOutcome {
        match tokio::time::timeout(timeout, &mut self.inner).await {
            Ok(joined) => ProbeOutcome::Resolved(flatten(joined)),
            Err(_) => ProbeOutcome::TimedOut(self),
        }
    }

    /// 等待任务结束并取回结果；对已就绪的句柄立即返回
    pub async fn into_result(self) -> GraccreqResult<()> {
        flatten(self.inner.await)
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("kind", &self.kind)
            .field("strategy", &self.strategy)
            .field("elapsed", &self.elapsed())
            .field("ready", &self.is_ready())
            .finish()
    }
}

fn flatten(joined: Result<GraccreqResult<()>, tokio::task::JoinError>) -> GraccreqResult<()> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(GraccreqError::WorkerPool(format!("回放任务异常终止: {e}"))),
        Err(e) => Err(GraccreqError::WorkerPool(format!("回放任务被取消: {e}"))),
    }
}

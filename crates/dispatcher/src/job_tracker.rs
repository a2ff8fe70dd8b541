use std::collections::BTreeMap;

use graccreq_domain::{JobId, MessageKind};
use graccreq_errors::GraccreqError;
use graccreq_worker::TaskHandle;
use tracing::debug;

/// 探测超时后仍在运行的回放任务集合
///
/// 只由消费循环所在的任务访问，因此不需要加锁。
/// 一个句柄只会被跟踪一次：`track` 取得句柄的所有权，回收时移出。
#[derive(Debug, Default)]
pub struct JobTracker {
    next_id: u64,
    jobs: BTreeMap<JobId, TaskHandle>,
}

#[derive(Debug)]
pub struct ReapFailure {
    pub job_id: JobId,
    pub kind: MessageKind,
    pub error: GraccreqError,
}

/// 一次回收的结果
#[derive(Debug, Default)]
pub struct ReapReport {
    pub completed: usize,
    pub failed: Vec<ReapFailure>,
    pub pending: usize,
}

impl ReapReport {
    pub fn is_noop(&self) -> bool {
        self.completed == 0 && self.failed.is_empty()
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, handle: TaskHandle) -> JobId {
        self.next_id += 1;
        let job_id = JobId(self.next_id);
        debug!(job_id = %job_id, kind = %handle.kind(), "开始跟踪回放任务");
        self.jobs.insert(job_id, handle);
        job_id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.jobs.contains_key(&job_id)
    }

    /// 移出所有已就绪的任务并取回结果，未就绪的留待下个周期
    pub async fn reap(&mut self) -> ReapReport {
        let ready: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|(_, handle)| handle.is_ready())
            .map(|(job_id, _)| *job_id)
            .collect();

        let mut report = ReapReport::default();
        for job_id in ready {
            let Some(handle) = self.jobs.remove(&job_id) else {
                continue;
            };
            let kind = handle.kind();
            match handle.into_result().await {
                Ok(()) => {
                    debug!(job_id = %job_id, kind = %kind, "回放任务已完成");
                    report.completed += 1;
                }
                Err(error) => report.failed.push(ReapFailure {
                    job_id,
                    kind,
                    error,
                }),
            }
        }

        report.pending = self.jobs.len();
        report
    }

    /// 关闭时取出所有仍在运行的任务
    pub fn drain(&mut self) -> Vec<(JobId, TaskHandle)> {
        std::mem::take(&mut self.jobs).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{request, ScriptedStrategy};
    use graccreq_worker::{ProbeOutcome, WorkerPool};
    use std::sync::Arc;
    use std::time::Duration;

    async fn pending_handle(pool: &WorkerPool, body: &str) -> TaskHandle {
        let request = request(body);
        let kind = request.message.kind().unwrap();
        let handle = pool.submit(kind, Arc::new(ScriptedStrategy::new()), request);
        match handle.probe(Duration::from_millis(1)).await {
            ProbeOutcome::TimedOut(handle) => handle,
            ProbeOutcome::Resolved(_) => panic!("handle resolved before being tracked"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_empty_tracker_is_noop() {
        let mut tracker = JobTracker::new();
        let report = tracker.reap().await;
        assert!(report.is_noop());
        assert_eq!(report.pending, 0);
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_removes_only_ready_jobs() {
        let pool = WorkerPool::new(4);
        let mut tracker = JobTracker::new();
        let fast = tracker.track(pending_handle(&pool, r#"{"kind":"summary","delay_ms":5000}"#).await);
        let slow = tracker.track(pending_handle(&pool, r#"{"kind":"summary","delay_ms":60000}"#).await);
        assert_ne!(fast, slow);
        assert_eq!(tracker.len(), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        let report = tracker.reap().await;

        assert_eq!(report.completed, 1);
        assert!(report.failed.is_empty());
        assert_eq!(report.pending, 1);
        assert!(!tracker.contains(fast));
        assert!(tracker.contains(slow));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_collects_failures() {
        let pool = WorkerPool::new(2);
        let mut tracker = JobTracker::new();
        let failing = tracker.track(
            pending_handle(&pool, r#"{"kind":"transfer_summary","delay_ms":2000,"fail":true}"#)
                .await,
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        let report = tracker.reap().await;

        assert_eq!(report.completed, 0);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].job_id, failing);
        assert_eq!(report.failed[0].kind, MessageKind::TransferSummary);
        assert!(matches!(report.failed[0].error, GraccreqError::TaskExecution(_)));
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_empties_tracker() {
        let pool = WorkerPool::new(1);
        let mut tracker = JobTracker::new();
        tracker.track(pending_handle(&pool, r#"{"kind":"summary","delay_ms":60000}"#).await);

        let drained = tracker.drain();
        assert_eq!(drained.len(), 1);
        assert!(tracker.is_empty());
    }
}

use anyhow::Result;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// 安装 Prometheus 导出器，需在 tokio 运行时内调用
pub fn init_metrics(listen: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .map_err(|e| anyhow::anyhow!("安装Prometheus导出器失败: {e}"))?;

    describe_metrics();
    info!("Prometheus指标导出已启动: {listen}");
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "graccreq_messages_total",
        "按类型与处理结果统计的请求消息数"
    );
    describe_counter!(
        "graccreq_task_failures_total",
        "回放任务失败数，stage 标签区分探测、回收与直接派发"
    );
    describe_gauge!("graccreq_tracked_jobs", "当前被跟踪的未完成回放任务数");
    describe_counter!("graccreq_loop_exits_total", "消费循环退出次数，reason 标签为退出原因");
}

use crate::*;

#[test]
fn test_graccreq_error_display() {
    let mq_error = GraccreqError::MessageQueue("Connection failed".to_string());
    assert_eq!(mq_error.to_string(), "消息队列错误: Connection failed");

    let serial_error = GraccreqError::Serialization("JSON parse error".to_string());
    assert_eq!(serial_error.to_string(), "序列化错误: JSON parse error");

    let exec_error = GraccreqError::TaskExecution("exit status 2".to_string());
    assert_eq!(exec_error.to_string(), "任务执行错误: exit status 2");

    let pool_error = GraccreqError::WorkerPool("closed".to_string());
    assert_eq!(pool_error.to_string(), "工作池错误: closed");
}

#[test]
fn test_error_classification() {
    assert!(GraccreqError::message_queue("channel closed").is_fatal());
    assert!(GraccreqError::Internal("invariant broken".to_string()).is_fatal());
    assert!(!GraccreqError::task_execution("boom").is_fatal());
    assert!(!GraccreqError::Serialization("bad body".to_string()).is_fatal());

    assert!(GraccreqError::task_execution("boom").is_task_failure());
    assert!(GraccreqError::WorkerPool("panicked".to_string()).is_task_failure());
    assert!(!GraccreqError::message_queue("closed").is_task_failure());
}

#[test]
fn test_error_conversions() {
    let json_err = serde_json::from_str::<serde_json::Value>("not-json").unwrap_err();
    let err: GraccreqError = json_err.into();
    assert!(matches!(err, GraccreqError::Serialization(_)));

    let err: GraccreqError = anyhow::anyhow!("wrapped").into();
    assert!(matches!(err, GraccreqError::Internal(ref m) if m == "wrapped"));
}

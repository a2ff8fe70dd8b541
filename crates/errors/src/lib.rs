use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraccreqError {
    #[error("消息队列错误: {0}")]
    MessageQueue(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("任务执行错误: {0}")]
    TaskExecution(String),
    #[error("工作池错误: {0}")]
    WorkerPool(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type GraccreqResult<T> = Result<T, GraccreqError>;

impl GraccreqError {
    pub fn message_queue<S: Into<String>>(msg: S) -> Self {
        Self::MessageQueue(msg.into())
    }
    pub fn task_execution<S: Into<String>>(msg: S) -> Self {
        Self::TaskExecution(msg.into())
    }
    /// 致命错误会终止消费循环，由外部进程管理器负责重启
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GraccreqError::MessageQueue(_) | GraccreqError::Internal(_)
        )
    }
    /// 任务自身产生的错误，不代表监督进程本身出现问题
    pub fn is_task_failure(&self) -> bool {
        matches!(
            self,
            GraccreqError::TaskExecution(_) | GraccreqError::WorkerPool(_)
        )
    }
}

impl From<serde_json::Error> for GraccreqError {
    fn from(err: serde_json::Error) -> Self {
        GraccreqError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for GraccreqError {
    fn from(err: anyhow::Error) -> Self {
        GraccreqError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests;

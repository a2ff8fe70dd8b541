use graccreq_errors::{GraccreqError, GraccreqResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 入站消息的类型标签，决定由哪个回放策略处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Raw,
    Summary,
    TransferSummary,
}

impl MessageKind {
    pub const ALL: [MessageKind; 3] = [
        MessageKind::Raw,
        MessageKind::Summary,
        MessageKind::TransferSummary,
    ];

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "raw" => Some(MessageKind::Raw),
            "summary" => Some(MessageKind::Summary),
            "transfer_summary" => Some(MessageKind::TransferSummary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Raw => "raw",
            MessageKind::Summary => "summary",
            MessageKind::TransferSummary => "transfer_summary",
        }
    }

    /// 提交后是否需要短暂等待结果；raw 类型只投递不等待
    pub fn is_probed(&self) -> bool {
        !matches!(self, MessageKind::Raw)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解码后的入站消息
///
/// 除 `kind` 之外的字段对调度核心不透明，原样交给回放策略。
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    kind: String,
    body: Map<String, Value>,
}

impl InboundMessage {
    /// 将消息体解码为 JSON 对象
    ///
    /// 非 JSON、非对象或缺少字符串类型 `kind` 字段的消息体都视为格式错误。
    pub fn decode(data: &[u8]) -> GraccreqResult<Self> {
        let value: Value = serde_json::from_slice(data)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> GraccreqResult<Self> {
        let body = match value {
            Value::Object(body) => body,
            other => {
                return Err(GraccreqError::Serialization(format!(
                    "消息体必须是JSON对象，实际为: {}",
                    json_type_name(&other)
                )))
            }
        };

        let kind = match body.get("kind") {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(GraccreqError::Serialization(format!(
                    "kind字段必须是字符串，实际为: {}",
                    json_type_name(other)
                )))
            }
            None => {
                return Err(GraccreqError::Serialization(
                    "消息缺少kind字段".to_string(),
                ))
            }
        };

        Ok(Self { kind, body })
    }

    /// 原始 `kind` 字符串，可能不属于已知类型
    pub fn kind_str(&self) -> &str {
        &self.kind
    }

    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::parse(&self.kind)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn to_json(&self) -> GraccreqResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.body)?)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

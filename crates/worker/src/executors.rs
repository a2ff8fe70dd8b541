use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use graccreq_config::{AppConfig, ReplayerCommandConfig};
use graccreq_domain::{ConnectionParams, InboundMessage, MessageKind, ReplayStrategy};
use graccreq_errors::{GraccreqError, GraccreqResult};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// stderr 中保留到错误信息里的最大行数
const STDERR_TAIL_LINES: usize = 20;

/// 以外部进程运行的回放程序
///
/// 消息体以 JSON 写入子进程的 stdin，broker 连接参数和配置文件路径通过
/// 环境变量传递。退出码非零即视为回放失败。
pub struct CommandReplayer {
    name: String,
    kind: MessageKind,
    command: ReplayerCommandConfig,
}

impl CommandReplayer {
    pub fn new(kind: MessageKind, command: ReplayerCommandConfig) -> Self {
        Self {
            name: format!("{kind}-replayer"),
            kind,
            command,
        }
    }

    fn build_command(&self, connection: &ConnectionParams, config: &AppConfig) -> Command {
        let mut cmd = Command::new(&self.command.command);
        cmd.args(&self.command.args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        if let Some(ref dir) = self.command.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &self.command.env {
            cmd.env(key, value);
        }

        cmd.env("GRACCREQ_KIND", self.kind.as_str());
        cmd.env("GRACCREQ_AMQP_URL", &connection.url);
        cmd.env("GRACCREQ_EXCHANGE", &connection.exchange);
        cmd.env("GRACCREQ_QUEUE", &connection.queue);
        match config.source_path {
            Some(ref path) => cmd.env("GRACCREQ_CONFIG", path),
            None => cmd.env_remove("GRACCREQ_CONFIG"),
        };

        cmd
    }
}

#[async_trait]
impl ReplayStrategy for CommandReplayer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn replay(
        &self,
        message: &InboundMessage,
        connection: &ConnectionParams,
        config: &AppConfig,
    ) -> GraccreqResult<()> {
        let start_time = Instant::now();
        let payload = message.to_json()?;

        info!(
            "启动回放程序: replayer={}, command={}, args={:?}",
            self.name, self.command.command, self.command.args
        );

        let mut child = self
            .build_command(connection, config)
            .spawn()
            .map_err(|e| {
                GraccreqError::task_execution(format!(
                    "启动回放程序 {} 失败: {e}",
                    self.command.command
                ))
            })?;

        // 写 stdin 与读取输出同时进行，子进程可以先写满输出管道再读取 stdin
        let stdin = child.stdin.take();
        let write_payload = async {
            if let Some(mut stdin) = stdin {
                // 子进程可能不读取 stdin 就退出，此时以退出码为准
                if let Err(e) = stdin.write_all(&payload).await {
                    warn!("写入回放程序stdin失败: replayer={}, error={}", self.name, e);
                }
            }
        };

        let ((), output) = tokio::join!(write_payload, child.wait_with_output());
        let output = output.map_err(|e| {
            GraccreqError::task_execution(format!("等待回放程序 {} 结束失败: {e}", self.name))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!(replayer = %self.name, "{}", line);
        }

        let duration = start_time.elapsed();
        if output.status.success() {
            info!(
                "回放程序执行完成: replayer={}, duration={}ms",
                self.name,
                duration.as_millis()
            );
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");

        Err(GraccreqError::task_execution(format!(
            "回放程序 {} 执行失败，退出码: {:?}{}",
            self.name,
            output.status.code(),
            if tail.is_empty() {
                String::new()
            } else {
                format!("\n{tail}")
            }
        )))
    }
}

use crate::runtime::shutdown_requested;
use crate::tracker::SignalTracker;
use aurum_core::common::Instrument;
use aurum_core::notify::port::{CommandSource, Notifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 拉取失败后的重试间隔
const RETRY_PAUSE: Duration = Duration::from_secs(5);

/// # Summary
/// 支持的聊天命令。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // 就绪检查
    Start,
    // 查询最近一次信号
    Status,
}

impl Command {
    /// # Summary
    /// 从消息文本解析命令。
    ///
    /// # Logic
    /// 1. 取第一个空白分隔的词，必须以 `/` 开头。
    /// 2. 去掉群聊中附带的 `@botname` 后缀，忽略大小写匹配。
    ///
    /// # Returns
    /// 无法识别时返回 None。
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name.to_lowercase().as_str() {
            "start" => Some(Command::Start),
            "status" => Some(Command::Status),
            _ => None,
        }
    }
}

/// # Summary
/// 命令应答服务，只读访问去抖状态。
pub struct CommandService {
    instrument: Instrument,
    tracker: Arc<SignalTracker>,
}

impl CommandService {
    pub fn new(instrument: Instrument, tracker: Arc<SignalTracker>) -> Self {
        Self {
            instrument,
            tracker,
        }
    }

    /// # Summary
    /// 生成命令的回复文本。
    ///
    /// # Logic
    /// - `Start`: 固定的就绪消息，包含标的名称。
    /// - `Status`: 最近一次发出的判定，尚无时回复 none yet。
    pub async fn respond(&self, command: Command) -> String {
        match command {
            Command::Start => format!(
                "✅ Bot is running 24/7.\nSignals for: {}",
                self.instrument.display_name
            ),
            Command::Status => match self.tracker.last_verdict() {
                Some(verdict) => format!("Last signal: {}", verdict),
                None => "Last signal: none yet".to_string(),
            },
        }
    }
}

/// # Summary
/// 命令监听循环。
///
/// # Logic
/// 1. 从命令来源拉取新消息。
/// 2. 对可识别的命令生成回复，并发回原会话。
/// 3. 拉取失败时记录日志并暂停后重试；回复失败只记录日志。
/// 4. 收到停机信号后退出。
///
/// # Arguments
/// * `source`: 命令来源。
/// * `notifier`: 用于发送回复的通知通道。
/// * `service`: 命令应答服务。
/// * `shutdown`: 值变为 true 时停止。
pub async fn run_command_loop(
    source: Arc<dyn CommandSource>,
    notifier: Arc<dyn Notifier>,
    service: CommandService,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Command listener started");
    loop {
        let batch = tokio::select! {
            batch = source.poll_commands() => batch,
            _ = shutdown_requested(&mut shutdown) => break,
        };

        match batch {
            Ok(messages) => {
                for message in messages {
                    let Some(command) = Command::parse(&message.text) else {
                        debug!("Ignoring message from {}: {}", message.chat_id, message.text);
                        continue;
                    };
                    let reply = service.respond(command).await;
                    if let Err(err) = notifier.send(&message.chat_id, &reply).await {
                        warn!("Failed to reply to {:?} from {}: {}", command, message.chat_id, err);
                    }
                }
            }
            Err(err) => {
                warn!("Polling commands failed: {}", err);
                tokio::select! {
                    _ = tokio::time::sleep(RETRY_PAUSE) => {}
                    _ = shutdown_requested(&mut shutdown) => break,
                }
            }
        }
    }
    info!("Command listener stopped");
}

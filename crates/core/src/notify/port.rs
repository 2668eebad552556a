use crate::notify::entity::IncomingCommand;
use crate::notify::error::NotifyError;
use async_trait::async_trait;

/// # Summary
/// 发送通知到外部系统的接口定义。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync` 以支持并发调用。
/// - 单次发送必须在有限时间内返回。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Summary
    /// 向指定收件人发送一条文本消息。
    ///
    /// # Logic
    /// 1. 根据目标平台要求封装消息。
    /// 2. 通过底层传输协议发送消息。
    /// 3. 返回成功或失败状态。
    ///
    /// # Arguments
    /// * `recipient` - 平台侧的收件人标识 (如 Telegram chat id)。
    /// * `text` - 已格式化的消息正文。
    ///
    /// # Returns
    /// * 成功返回 `Ok(())`。
    /// * 失败返回 `Err(NotifyError)`。
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError>;
}

/// # Summary
/// 入站命令来源接口。
///
/// # Invariants
/// - 同一条消息只会被返回一次。
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// # Summary
    /// 拉取自上次调用以来收到的新消息。
    ///
    /// # Returns
    /// 成功返回消息列表（可能为空），失败返回 NotifyError。
    async fn poll_commands(&self) -> Result<Vec<IncomingCommand>, NotifyError>;
}

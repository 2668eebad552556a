use serde::{Deserialize, Serialize};

/// # Summary
/// 从消息平台收到的一条入站文本。
///
/// # Invariants
/// - `chat_id` 是回复时使用的收件人标识。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingCommand {
    // 发起会话的标识
    pub chat_id: String,
    // 原始消息文本
    pub text: String,
}

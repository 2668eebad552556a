use thiserror::Error;

/// # Summary
/// 消息推送错误，发送信号与回复命令共用。
#[derive(Error, Debug)]
pub enum NotifyError {
    /// 请求未能到达平台，或连接中断
    #[error("Network error: {0}")]
    Network(String),

    /// 凭据缺失或客户端无法构建，重试无意义
    #[error("Configuration error: {0}")]
    Config(String),

    /// 平台已收到请求但拒绝处理 (如 chat 不存在、Token 失效)
    #[error("Platform error: {0}")]
    Platform(String),
}

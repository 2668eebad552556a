use crate::market::error::MarketError;
use crate::notify::error::NotifyError;
use thiserror::Error;

/// # Summary
/// 信号流水线错误枚举。
///
/// # Invariants
/// - `DataSourceUnavailable` 与 `EmptyData` 只中止当前轮询周期。
/// - `IndeterminateIndicator` 由分类器内部消化为观望判定，不会向外传播。
/// - `NotificationDeliveryFailed` 只记录日志，不回滚去抖状态。
#[derive(Error, Debug)]
pub enum SignalError {
    // 数据源连接、初始化失败或超时
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),
    // 数据源返回了零根 K 线
    #[error("Data source returned no bars")]
    EmptyData,
    // 指标在评估位置尚不可计算 (预热不足或除零)
    #[error("Indicator {indicator} is indeterminate at index {index}")]
    IndeterminateIndicator {
        indicator: &'static str,
        index: usize,
    },
    // 通知投递失败
    #[error("Notification delivery failed: {0}")]
    NotificationDeliveryFailed(String),
}

impl From<MarketError> for SignalError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::NotFound => SignalError::EmptyData,
            other => SignalError::DataSourceUnavailable(other.to_string()),
        }
    }
}

impl From<NotifyError> for SignalError {
    fn from(err: NotifyError) -> Self {
        SignalError::NotificationDeliveryFailed(err.to_string())
    }
}

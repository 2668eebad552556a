use thiserror::Error;

/// # Summary
/// 行情数据源错误。轮询编排器把它们统一视为“本轮数据不可用”。
#[derive(Error, Debug)]
pub enum MarketError {
    // 连接失败或 HTTP 非成功状态
    #[error("Network error: {0}")]
    Network(String),
    // 响应体无法解读
    #[error("Parse error: {0}")]
    Parse(String),
    // 数据源没有该标的或该区间的数据
    #[error("Data not found")]
    NotFound,
    // 拉取超过了配置的时限
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    // 数据源自身报告的错误
    #[error("Data source error: {0}")]
    Unknown(String),
}

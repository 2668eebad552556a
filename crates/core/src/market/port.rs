use crate::common::{Instrument, TimeFrame};
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 市场行情数据提供者接口（原始数据源）。
///
/// # Invariants
/// - 返回的 K 线序列必须按时间严格递增且无重复。
/// - 实现者自行约束单次请求的网络耗时，调用方另有总超时兜底。
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// # Summary
    /// 获取特定标的最近的若干根 K 线。
    ///
    /// # Logic
    /// 1. 根据周期与数量推算回溯窗口。
    /// 2. 执行网络请求并解析响应数据。
    /// 3. 整理序列并截取最后 `count` 根。
    ///
    /// # Arguments
    /// * `instrument`: 标的身份。
    /// * `timeframe`: K 线周期。
    /// * `count`: 最多返回的 K 线数量。
    ///
    /// # Returns
    /// 成功返回 K 线列表（可能为空），失败返回 MarketError。
    async fn fetch_latest(
        &self,
        instrument: &Instrument,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError>;
}

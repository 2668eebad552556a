use aurum_core::config::StrategyConfig;
use aurum_core::market::entity::{Candle, closes};
use aurum_core::signal::entity::{Evaluation, SignalMeta, Verdict};
use aurum_core::signal::error::SignalError;
use aurum_indicator::{MacdPoint, Series, ema, macd, rsi};
use tracing::debug;

/// # Summary
/// 做出判定所需的全部指标读数（最近两根 K 线）。
///
/// # Invariants
/// - 所有字段都是已完成预热的有效数值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    // 上一根 K 线的 MACD 读数
    pub prev: MacdPoint,
    // 最新 K 线的 MACD 读数
    pub last: MacdPoint,
    // 最新收盘价
    pub price: f64,
    // 最新趋势 EMA
    pub trend: f64,
    // 最新 RSI
    pub rsi: f64,
}

impl IndicatorSnapshot {
    /// MACD 线自下而上穿越信号线。
    pub fn macd_bull_cross(&self) -> bool {
        self.prev.macd < self.prev.signal && self.last.macd > self.last.signal
    }

    /// MACD 线自上而下穿越信号线。
    pub fn macd_bear_cross(&self) -> bool {
        self.prev.macd > self.prev.signal && self.last.macd < self.last.signal
    }
}

/// # Summary
/// 根据指标读数给出判定。
///
/// # Logic
/// 1. 金叉、价格在趋势线上方、RSI 未超买 -> BUY。
/// 2. 死叉、价格在趋势线下方、RSI 未超卖 -> SELL。
/// 3. 其余情况 -> HOLD。BUY 先于 SELL 判定。
pub fn decide(snapshot: &IndicatorSnapshot, config: &StrategyConfig) -> Verdict {
    if snapshot.macd_bull_cross()
        && snapshot.price > snapshot.trend
        && snapshot.rsi < config.rsi_overbought
    {
        Verdict::Buy
    } else if snapshot.macd_bear_cross()
        && snapshot.price < snapshot.trend
        && snapshot.rsi > config.rsi_oversold
    {
        Verdict::Sell
    } else {
        Verdict::Hold
    }
}

/// # Summary
/// 信号分类器：把 K 线序列归类为 BUY / SELL / HOLD。
///
/// # Invariants
/// - 无内部状态，相同输入与参数总是得到相同输出。
/// - 指标不可计算时退化为 HOLD，绝不向外报错。
#[derive(Debug, Clone)]
pub struct SignalClassifier {
    config: StrategyConfig,
}

impl SignalClassifier {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// # Summary
    /// 对序列的最新一根 K 线分类。
    ///
    /// # Logic
    /// 1. 空序列返回 `EmptyData`。
    /// 2. 不足两根时返回 HOLD，RSI 为 None。
    /// 3. 计算 MACD、RSI、趋势 EMA 并取最近两根的读数。
    /// 4. 任一读数不可计算时返回 HOLD，元数据原样透传。
    ///
    /// # Arguments
    /// * `candles`: 时间严格递增的 K 线序列。
    ///
    /// # Returns
    /// 判定与最新价格、最新 RSI。
    pub fn classify(&self, candles: &[Candle]) -> Result<Evaluation, SignalError> {
        let closes = closes(candles);
        let Some(&price) = closes.last() else {
            return Err(SignalError::EmptyData);
        };
        if closes.len() < 2 {
            return Ok(Evaluation::hold(price, None));
        }

        let rsi_series = rsi(&closes, self.config.rsi_period);
        let last = closes.len() - 1;
        let rsi_now = rsi_series[last];

        match self.snapshot(&closes, &rsi_series) {
            Ok(snapshot) => Ok(Evaluation {
                verdict: decide(&snapshot, &self.config),
                meta: SignalMeta {
                    price,
                    rsi: rsi_now,
                },
            }),
            Err(err) => {
                debug!("Falling back to HOLD: {}", err);
                Ok(Evaluation::hold(price, rsi_now))
            }
        }
    }

    /// 收集最近两根 K 线的指标读数，缺失时返回 `IndeterminateIndicator`。
    fn snapshot(&self, closes: &[f64], rsi_series: &Series) -> Result<IndicatorSnapshot, SignalError> {
        let cfg = &self.config;
        let last = closes.len() - 1;
        let prev = last - 1;

        let macd_out = macd(closes, cfg.ema_fast, cfg.ema_slow, cfg.ema_signal);
        let trend = ema(closes, cfg.ema_trend_period);

        let indeterminate = |indicator: &'static str, index: usize| {
            SignalError::IndeterminateIndicator { indicator, index }
        };

        Ok(IndicatorSnapshot {
            prev: macd_out.point(prev).ok_or_else(|| indeterminate("macd", prev))?,
            last: macd_out.point(last).ok_or_else(|| indeterminate("macd", last))?,
            price: closes[last],
            trend: trend[last].ok_or_else(|| indeterminate("trend_ema", last))?,
            rsi: rsi_series[last].ok_or_else(|| indeterminate("rsi", last))?,
        })
    }
}

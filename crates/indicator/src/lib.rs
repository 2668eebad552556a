//! 技术指标库：对有序数值序列计算 EMA、RSI、MACD。
//!
//! 所有函数都是纯函数，输出与输入等长；预热窗口内的位置为 `None`。

pub mod ema;
pub mod macd;
pub mod rsi;

pub use ema::ema;
pub use macd::{Macd, MacdPoint, macd};
pub use rsi::rsi;

/// 与输入逐位对齐的指标序列，`None` 表示该位置尚不可计算。
pub type Series = Vec<Option<f64>>;

/// 周期对应的窗口长度。
pub(crate) fn window(period: u32) -> usize {
    usize::try_from(period).unwrap_or(usize::MAX)
}

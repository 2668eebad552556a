use crate::ema::{ema, ema_recursive};
use crate::{Series, window};
use serde::Serialize;

/// # Summary
/// 单个位置上的 MACD 三元组。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdPoint {
    // 快慢 EMA 之差
    pub macd: f64,
    // MACD 线的 EMA
    pub signal: f64,
    // macd - signal
    pub histogram: f64,
}

/// # Summary
/// MACD 计算结果，三条序列与输入逐位对齐。
///
/// # Invariants
/// - `line[i] == ema(fast)[i] - ema(slow)[i]`，两者均可计算时成立。
/// - `signal[i]` 可计算时 `line[i]` 必可计算。
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Series,
    pub signal: Series,
    pub histogram: Series,
}

impl Macd {
    /// # Summary
    /// 读取指定位置的三元组。
    ///
    /// # Returns
    /// 越界或任一分量不可计算时返回 None。
    pub fn point(&self, index: usize) -> Option<MacdPoint> {
        let macd = (*self.line.get(index)?)?;
        let signal = (*self.signal.get(index)?)?;
        let histogram = (*self.histogram.get(index)?)?;
        Some(MacdPoint {
            macd,
            signal,
            histogram,
        })
    }
}

/// # Summary
/// 计算 MACD 指标。
///
/// # Logic
/// 1. `line = ema(fast) - ema(slow)`，仅在两条 EMA 都完成预热后可计算。
/// 2. 信号线对 MACD 线的完整递推结果做 `signal` 周期的 EMA，
///    从 MACD 线首个有效位置起再预热 `signal - 1` 个位置。
/// 3. `histogram = line - signal`。
///
/// # Arguments
/// * `series`: 按时间升序的价格序列。
/// * `fast`: 快线周期。
/// * `slow`: 慢线周期。
/// * `signal`: 信号线周期。
///
/// # Returns
/// 三条对齐序列组成的 `Macd`；任一周期为 0 时全部不可计算。
pub fn macd(series: &[f64], fast: u32, slow: u32, signal: u32) -> Macd {
    let n = series.len();
    if fast == 0 || slow == 0 || signal == 0 {
        return Macd {
            line: vec![None; n],
            signal: vec![None; n],
            histogram: vec![None; n],
        };
    }

    let fast_ema = ema(series, fast);
    let slow_ema = ema(series, slow);
    let line: Series = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let raw_line: Vec<f64> = ema_recursive(series, fast)
        .into_iter()
        .zip(ema_recursive(series, slow))
        .map(|(f, s)| f - s)
        .collect();
    let raw_signal = ema_recursive(&raw_line, signal);
    let signal_start = (window(fast.max(slow)) - 1).saturating_add(window(signal) - 1);

    let signal_line: Series = raw_signal
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i >= signal_start).then_some(v))
        .collect();
    let histogram: Series = line
        .iter()
        .zip(signal_line.iter())
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_warmup_positions() {
        let series: Vec<f64> = (0..20).map(|i| 100.0 + f64::from(i)).collect();
        let out = macd(&series, 3, 5, 4);
        assert_eq!(out.line.len(), 20);
        // 慢线在 index 4 完成预热，信号线再需要 3 个位置
        assert!(out.line[3].is_none());
        assert!(out.line[4].is_some());
        assert!(out.signal[6].is_none());
        assert!(out.signal[7].is_some());
        assert!(out.point(6).is_none());
        assert!(out.point(7).is_some());
        assert!(out.point(20).is_none());
    }

    #[test]
    fn test_macd_histogram_is_line_minus_signal() {
        let series = [10.0, 12.0, 11.0, 13.0, 15.0, 14.0, 16.0, 18.0, 17.0, 19.0];
        let out = macd(&series, 2, 4, 3);
        for i in 0..out.line.len() {
            if let Some(p) = out.point(i) {
                assert_eq!(p.histogram, p.macd - p.signal);
            }
        }
    }

    #[test]
    fn test_macd_constant_series_is_flat() {
        let out = macd(&[50.0; 40], 12, 26, 9);
        let p = out.point(39).unwrap();
        assert_eq!(p.macd, 0.0);
        assert_eq!(p.signal, 0.0);
        assert_eq!(p.histogram, 0.0);
    }

    #[test]
    fn test_macd_zero_period() {
        let out = macd(&[1.0, 2.0, 3.0], 0, 26, 9);
        assert!(out.line.iter().all(Option::is_none));
        assert!(out.point(2).is_none());
    }
}

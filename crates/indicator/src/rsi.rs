use crate::{Series, window};

/// # Summary
/// 计算相对强弱指数 (RSI)，使用简单滚动均值。
///
/// # Logic
/// 1. 逐步差分得到涨跌幅，`up = max(Δ, 0)`，`down = max(-Δ, 0)`。
/// 2. 位置 `i` 需要以 `i` 结尾的 `period` 个差分，故 `i < period` 不可计算。
/// 3. 每个窗口独立求和，下跌均值恰为 0 时输出 `None` 而非 100。
/// 4. `rs = mean_up / mean_down`，`rsi = 100 - 100 / (1 + rs)`。
///
/// # Arguments
/// * `series`: 按时间升序的价格序列。
/// * `period`: 滚动窗口长度，为 0 时整个序列不可计算。
///
/// # Returns
/// 与输入等长、取值在 [0, 100) 的指标序列。
pub fn rsi(series: &[f64], period: u32) -> Series {
    let mut out: Series = vec![None; series.len()];
    if period == 0 {
        return out;
    }
    let span = window(period);
    let deltas: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let divisor = f64::from(period);

    for (i, slot) in out.iter_mut().enumerate().skip(span) {
        // deltas[k] 是位置 k+1 相对位置 k 的变化
        let (up, down) = deltas[i - span..i]
            .iter()
            .fold((0.0_f64, 0.0_f64), |(up, down), &d| {
                (up + d.max(0.0), down + (-d).max(0.0))
            });
        if down == 0.0 {
            continue;
        }
        let rs = (up / divisor) / (down / divisor);
        *slot = Some(100.0 - 100.0 / (1.0 + rs));
    }
    out
}

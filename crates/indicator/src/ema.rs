use crate::{Series, window};

/// # Summary
/// 指数移动平均的完整递推结果（不做预热屏蔽）。
///
/// # Logic
/// 1. `value[0] = input[0]`。
/// 2. `value[i] = value[i-1] + α·(input[i] - value[i-1])`，`α = 2/(period+1)`。
pub(crate) fn ema_recursive(series: &[f64], period: u32) -> Vec<f64> {
    let alpha = 2.0 / (f64::from(period) + 1.0);
    let mut out = Vec::with_capacity(series.len());
    let mut prev: Option<f64> = None;
    for &x in series {
        let value = match prev {
            None => x,
            Some(p) => p + alpha * (x - p),
        };
        out.push(value);
        prev = Some(value);
    }
    out
}

/// # Summary
/// 计算指数移动平均。
///
/// # Logic
/// 1. 以首个输入为种子做递推平滑，O(n)，无前视。
/// 2. 前 `period - 1` 个位置视为预热期，输出 `None`。
///
/// # Arguments
/// * `series`: 按时间升序的输入序列。
/// * `period`: 平滑周期，为 0 时整个序列不可计算。
///
/// # Returns
/// 与输入等长的指标序列。
pub fn ema(series: &[f64], period: u32) -> Series {
    if period == 0 {
        return vec![None; series.len()];
    }
    let warmup = window(period) - 1;
    ema_recursive(series, period)
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i >= warmup).then_some(v))
        .collect()
}

use serde::{Deserialize, Serialize};

/// # Summary
/// 对最新一根 K 线的离散判定结果。
///
/// # Invariants
/// - 每次评估恰好产生一个判定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    // 买入
    Buy,
    // 卖出
    Sell,
    // 观望
    Hold,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Buy => write!(f, "BUY"),
            Verdict::Sell => write!(f, "SELL"),
            Verdict::Hold => write!(f, "HOLD"),
        }
    }
}

/// # Summary
/// 产生判定的那根 K 线的上下文数据。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalMeta {
    // 最新收盘价
    pub price: f64,
    // 最新 RSI，未能计算时为 None
    pub rsi: Option<f64>,
}

/// # Summary
/// 一次分类的完整输出：判定 + 元数据。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub meta: SignalMeta,
}

impl Evaluation {
    /// 构造观望判定。
    pub fn hold(price: f64, rsi: Option<f64>) -> Self {
        Self {
            verdict: Verdict::Hold,
            meta: SignalMeta { price, rsi },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_display_and_serde() {
        assert_eq!(Verdict::Buy.to_string(), "BUY");
        assert_eq!(serde_json::to_string(&Verdict::Sell).unwrap(), "\"SELL\"");
        let parsed: Verdict = serde_json::from_str("\"HOLD\"").unwrap();
        assert_eq!(parsed, Verdict::Hold);
    }
}

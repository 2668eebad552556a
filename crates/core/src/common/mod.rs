pub mod time;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 交易标的实体，代表系统跟踪的特定品种（如黄金）。
///
/// # Invariants
/// - `symbol` 必须是数据源可识别的交易代码。
/// - `display_name` 仅用于面向用户的消息，不参与数据请求。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instrument {
    // 数据源代码 (例如: GC=F)
    pub symbol: String,
    // 展示名称 (例如: XAUUSD)
    pub display_name: String,
}

impl Instrument {
    /// # Summary
    /// 创建标的实体，展示名称为空时回退到交易代码。
    pub fn new(symbol: impl Into<String>, display_name: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            symbol.clone()
        } else {
            display_name
        };
        Self {
            symbol,
            display_name,
        }
    }
}

/// # Summary
/// 交易时间周期枚举，定义 K 线的时间跨度。
///
/// # Invariants
/// - 只接受数据源支持的固定周期，分钟数与枚举一一对应。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeFrame {
    // 1分钟
    Minute1,
    // 5分钟
    Minute5,
    // 15分钟
    Minute15,
    // 30分钟
    Minute30,
    // 1小时
    Hour1,
    // 4小时
    Hour4,
    // 1日
    Day1,
}

impl TimeFrame {
    /// # Summary
    /// 根据分钟数解析周期。
    ///
    /// # Arguments
    /// * `minutes`: 周期分钟数 (1, 5, 15, 30, 60, 240, 1440)。
    ///
    /// # Returns
    /// 受支持的分钟数返回对应周期，否则返回 None。
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            1 => Some(TimeFrame::Minute1),
            5 => Some(TimeFrame::Minute5),
            15 => Some(TimeFrame::Minute15),
            30 => Some(TimeFrame::Minute30),
            60 => Some(TimeFrame::Hour1),
            240 => Some(TimeFrame::Hour4),
            1440 => Some(TimeFrame::Day1),
            _ => None,
        }
    }

    /// 周期对应的分钟数。
    pub fn minutes(&self) -> u32 {
        match self {
            TimeFrame::Minute1 => 1,
            TimeFrame::Minute5 => 5,
            TimeFrame::Minute15 => 15,
            TimeFrame::Minute30 => 30,
            TimeFrame::Hour1 => 60,
            TimeFrame::Hour4 => 240,
            TimeFrame::Day1 => 1440,
        }
    }

    /// 周期对应的秒数。
    pub fn seconds(&self) -> i64 {
        i64::from(self.minutes()) * 60
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "minute1" => Ok(TimeFrame::Minute1),
            "5m" | "minute5" => Ok(TimeFrame::Minute5),
            "15m" | "minute15" => Ok(TimeFrame::Minute15),
            "30m" | "minute30" => Ok(TimeFrame::Minute30),
            "1h" | "hour1" => Ok(TimeFrame::Hour1),
            "4h" | "hour4" => Ok(TimeFrame::Hour4),
            "1d" | "day1" => Ok(TimeFrame::Day1),
            _ => Err(format!("Unknown TimeFrame: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Minute1 => write!(f, "1m"),
            TimeFrame::Minute5 => write!(f, "5m"),
            TimeFrame::Minute15 => write!(f, "15m"),
            TimeFrame::Minute30 => write!(f, "30m"),
            TimeFrame::Hour1 => write!(f, "1h"),
            TimeFrame::Hour4 => write!(f, "4h"),
            TimeFrame::Day1 => write!(f, "1d"),
        }
    }
}

use crate::common::{Instrument, TimeFrame};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 单次拉取的 K 线上限
pub const MAX_HISTORY_BARS: usize = 10_000;

/// # Summary
/// 配置加载与校验错误。
#[derive(Error, Debug)]
pub enum ConfigError {
    // 配置源读取或反序列化失败
    #[error("Failed to load configuration: {0}")]
    Load(String),
    // 字段取值不合法
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// 全局应用配置，进程生命周期内只读。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub schedule: ScheduleConfig,
    pub strategy: StrategyConfig,
    pub telegram: TelegramConfig,
    pub log: LogConfig,
    pub supervisor: SupervisorConfig,
}

/// 行情数据源相关配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub symbol: String,
    pub display_name: String,
    pub timeframe_minutes: u32,
    pub history_bars: usize,
    pub fetch_timeout_seconds: u64,
}

/// 轮询调度配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub poll_interval_seconds: u64,
    pub initial_delay_seconds: u64,
}

/// # Summary
/// 分类器与去抖参数。
///
/// # Invariants
/// - 所有周期大于 0，且 `ema_fast < ema_slow`。
/// - `0 <= rsi_oversold < rsi_overbought <= 100`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub ema_fast: u32,
    pub ema_slow: u32,
    pub ema_signal: u32,
    pub ema_trend_period: u32,
    pub rsi_period: u32,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub debounce_seconds: i64,
}

/// Telegram 推送与命令配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub commands_enabled: bool,
}

/// 日志输出配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    // 为 None 时只输出到标准输出
    pub directory: Option<String>,
}

/// 进程守护配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub restart_delay_seconds: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            symbol: "GC=F".to_string(),
            display_name: "XAUUSD".to_string(),
            timeframe_minutes: 60,
            history_bars: 500,
            fetch_timeout_seconds: 30,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 900,
            initial_delay_seconds: 5,
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            ema_fast: 12,
            ema_slow: 26,
            ema_signal: 9,
            ema_trend_period: 200,
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            debounce_seconds: 3600,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            commands_enabled: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: Some("logs".to_string()),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_seconds: 10,
        }
    }
}

impl MarketConfig {
    /// 将配置中的分钟数解析为周期枚举。
    pub fn timeframe(&self) -> Result<TimeFrame, ConfigError> {
        TimeFrame::from_minutes(self.timeframe_minutes).ok_or_else(|| {
            ConfigError::invalid(
                "market.timeframe_minutes",
                format!(
                    "{} is not one of 1, 5, 15, 30, 60, 240, 1440",
                    self.timeframe_minutes
                ),
            )
        })
    }

    /// 构造被跟踪的标的。
    pub fn instrument(&self) -> Instrument {
        Instrument::new(self.symbol.clone(), self.display_name.clone())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_seconds)
    }
}

impl StrategyConfig {
    /// # Summary
    /// 校验分类器参数。
    ///
    /// # Logic
    /// 1. 所有周期必须为正。
    /// 2. 快线周期必须小于慢线周期。
    /// 3. 超卖阈值必须小于超买阈值，且都在 [0, 100] 内。
    /// 4. 去抖窗口不能为负，且必须能表示为时间间隔。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("strategy.ema_fast", self.ema_fast),
            ("strategy.ema_slow", self.ema_slow),
            ("strategy.ema_signal", self.ema_signal),
            ("strategy.ema_trend_period", self.ema_trend_period),
            ("strategy.rsi_period", self.rsi_period),
        ];
        for (field, period) in periods {
            if period == 0 {
                return Err(ConfigError::invalid(field, "period must be positive"));
            }
        }
        if self.ema_fast >= self.ema_slow {
            return Err(ConfigError::invalid(
                "strategy.ema_fast",
                format!(
                    "fast period {} must be shorter than slow period {}",
                    self.ema_fast, self.ema_slow
                ),
            ));
        }
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.rsi_oversold) || !in_range(self.rsi_overbought) {
            return Err(ConfigError::invalid(
                "strategy.rsi_oversold",
                "RSI thresholds must lie within [0, 100]",
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(ConfigError::invalid(
                "strategy.rsi_oversold",
                format!(
                    "oversold {} must be below overbought {}",
                    self.rsi_oversold, self.rsi_overbought
                ),
            ));
        }
        if self.debounce_seconds < 0 {
            return Err(ConfigError::invalid(
                "strategy.debounce_seconds",
                "must not be negative",
            ));
        }
        if chrono::Duration::try_seconds(self.debounce_seconds).is_none() {
            return Err(ConfigError::invalid(
                "strategy.debounce_seconds",
                format!("{} seconds is out of range", self.debounce_seconds),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// # Summary
    /// 在启动前校验全部配置项。
    ///
    /// # Returns
    /// 第一个不合法的字段以 `ConfigError::Invalid` 返回。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.market.symbol.trim().is_empty() {
            return Err(ConfigError::invalid("market.symbol", "must not be empty"));
        }
        self.market.timeframe()?;
        if self.market.history_bars < 2 {
            return Err(ConfigError::invalid(
                "market.history_bars",
                "at least 2 bars are needed to detect a crossover",
            ));
        }
        if self.market.history_bars > MAX_HISTORY_BARS {
            return Err(ConfigError::invalid(
                "market.history_bars",
                format!("must not exceed {}", MAX_HISTORY_BARS),
            ));
        }
        if self.market.fetch_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "market.fetch_timeout_seconds",
                "must be positive",
            ));
        }
        if self.schedule.poll_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "schedule.poll_interval_seconds",
                "must be positive",
            ));
        }
        self.strategy.validate()?;
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::invalid("telegram.bot_token", "must be set"));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(ConfigError::invalid("telegram.chat_id", "must be set"));
        }
        Ok(())
    }
}

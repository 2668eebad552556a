use crate::classifier::SignalClassifier;
use crate::tracker::SignalTracker;
use aurum_core::common::time::TimeProvider;
use aurum_core::common::{Instrument, TimeFrame};
use aurum_core::config::{AppConfig, ConfigError};
use aurum_core::market::entity::Candle;
use aurum_core::market::error::MarketError;
use aurum_core::market::port::MarketDataProvider;
use aurum_core::notify::port::Notifier;
use aurum_core::signal::entity::Evaluation;
use aurum_core::signal::error::SignalError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// # Summary
/// 轮询编排器的运行参数。
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    // 被跟踪的标的
    pub instrument: Instrument,
    // K 线周期
    pub timeframe: TimeFrame,
    // 每次拉取的历史 K 线数量
    pub history_bars: usize,
    // 单次拉取的总时限
    pub fetch_timeout: Duration,
    // 轮询间隔
    pub poll_interval: Duration,
    // 首次轮询前的等待
    pub initial_delay: Duration,
    // 信号接收方
    pub recipient: String,
}

impl RuntimeSettings {
    /// 从全局配置中提取编排器参数。
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            instrument: config.market.instrument(),
            timeframe: config.market.timeframe()?,
            history_bars: config.market.history_bars,
            fetch_timeout: config.market.fetch_timeout(),
            poll_interval: config.schedule.poll_interval(),
            initial_delay: config.schedule.initial_delay(),
            recipient: config.telegram.chat_id.clone(),
        })
    }
}

/// # Summary
/// 单次轮询的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    // 拉取失败或无数据，本轮跳过，状态未变
    Skipped { reason: String },
    // 判定被去抖抑制
    Suppressed(Evaluation),
    // 判定已发出；`delivered` 表示通知是否投递成功
    Emitted {
        evaluation: Evaluation,
        delivered: bool,
    },
}

/// # Summary
/// 信号轮询编排器。
///
/// # Invariants
/// - 拉取、分类、去抖、推送四步在跟踪器守卫内串行执行。
/// - 任何单轮失败只记录日志，不会终止轮询循环。
pub struct SignalRuntime {
    // 行情数据源
    provider: Arc<dyn MarketDataProvider>,
    // 通知通道
    notifier: Arc<dyn Notifier>,
    // 去抖使用的时钟
    clock: Arc<dyn TimeProvider>,
    // 无状态分类器
    classifier: SignalClassifier,
    // 去抖状态，与命令服务共享
    tracker: Arc<SignalTracker>,
    settings: RuntimeSettings,
}

impl SignalRuntime {
    /// # Summary
    /// 组装编排器。
    ///
    /// # Arguments
    /// * `provider`: 行情数据源。
    /// * `notifier`: 通知通道。
    /// * `clock`: 时钟。
    /// * `classifier`: 信号分类器。
    /// * `tracker`: 去抖状态跟踪器。
    /// * `settings`: 运行参数。
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn TimeProvider>,
        classifier: SignalClassifier,
        tracker: Arc<SignalTracker>,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            provider,
            notifier,
            clock,
            classifier,
            tracker,
            settings,
        }
    }

    pub fn tracker(&self) -> Arc<SignalTracker> {
        self.tracker.clone()
    }

    /// # Summary
    /// 执行一轮完整的评估。
    ///
    /// # Logic
    /// 1. 获取跟踪器守卫，与其他轮次互斥。
    /// 2. 在时限内拉取行情；失败或为空则跳过本轮。
    /// 3. 分类得到判定，交由去抖状态机决定是否发出。
    /// 4. 发出时先更新状态，再格式化消息并推送；推送失败只记录日志。
    ///
    /// # Returns
    /// 本轮的结果。
    pub async fn tick(&self) -> TickOutcome {
        let mut guard = self.tracker.lock().await;
        let symbol = &self.settings.instrument.symbol;

        let candles = match self.fetch().await {
            Ok(candles) => candles,
            Err(err) => {
                warn!("Skipping tick for {}: {}", symbol, err);
                return TickOutcome::Skipped {
                    reason: err.to_string(),
                };
            }
        };

        let evaluation = match self.classifier.classify(&candles) {
            Ok(evaluation) => evaluation,
            Err(err) => {
                warn!("Skipping tick for {}: {}", symbol, err);
                return TickOutcome::Skipped {
                    reason: err.to_string(),
                };
            }
        };

        let now = self.clock.now();
        if !guard.observe(evaluation.verdict, now) {
            debug!(
                "Suppressed repeated {} for {} within debounce window",
                evaluation.verdict, symbol
            );
            return TickOutcome::Suppressed(evaluation);
        }

        let text = format_signal_message(&self.settings.instrument, &evaluation);
        let delivered = match self.notifier.send(&self.settings.recipient, &text).await {
            Ok(()) => {
                info!(
                    "Sent signal: {} at {:.2}",
                    evaluation.verdict, evaluation.meta.price
                );
                true
            }
            Err(err) => {
                error!("{}", SignalError::from(err));
                false
            }
        };

        TickOutcome::Emitted {
            evaluation,
            delivered,
        }
    }

    /// 在时限内拉取最新 K 线，超时视为数据源不可用。
    async fn fetch(&self) -> Result<Vec<Candle>, SignalError> {
        let request = self.provider.fetch_latest(
            &self.settings.instrument,
            self.settings.timeframe,
            self.settings.history_bars,
        );
        let candles = match tokio::time::timeout(self.settings.fetch_timeout, request).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(MarketError::Timeout(self.settings.fetch_timeout.as_secs()).into());
            }
        };
        if candles.is_empty() {
            return Err(SignalError::EmptyData);
        }
        Ok(candles)
    }

    /// # Summary
    /// 周期性轮询主循环。
    ///
    /// # Logic
    /// 1. 等待初始延迟，期间收到停机信号则直接返回。
    /// 2. 以固定间隔执行 `tick`，错过的节拍顺延而非补发。
    /// 3. 停机信号只在两轮之间生效，进行中的一轮总会完整结束。
    ///
    /// # Arguments
    /// * `shutdown`: 值变为 true 时停止。
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Signal runtime started for {} ({}) every {:?}",
            self.settings.instrument.display_name,
            self.settings.timeframe,
            self.settings.poll_interval
        );

        tokio::select! {
            _ = tokio::time::sleep(self.settings.initial_delay) => {}
            _ = shutdown_requested(&mut shutdown) => {
                info!("Signal runtime stopped before first tick");
                return;
            }
        }

        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = self.tick().await;
                    debug!("Tick finished: {:?}", outcome);
                }
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        info!("Signal runtime stopped");
    }
}

/// 等待停机信号；发送端被丢弃同样视为停机。
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    match shutdown.wait_for(|stop| *stop).await {
        Ok(_) => debug!("Shutdown requested"),
        Err(_) => debug!("Shutdown channel closed"),
    }
}

/// # Summary
/// 生成面向用户的信号消息 (Telegram HTML)。
///
/// # Logic
/// 价格保留两位小数，RSI 保留一位小数，不可计算时显示 n/a。
pub fn format_signal_message(instrument: &Instrument, evaluation: &Evaluation) -> String {
    let rsi = match evaluation.meta.rsi {
        Some(value) => format!("{:.1}", value),
        None => "n/a".to_string(),
    };
    format!(
        "<b>{} signal:</b> {}\n💰 Price: {:.2}\n📊 RSI: {}\n<i>Not financial advice</i>",
        instrument.display_name, evaluation.verdict, evaluation.meta.price, rsi
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_core::signal::entity::{SignalMeta, Verdict};

    #[test]
    fn test_format_signal_message() {
        let gold = Instrument::new("GC=F", "XAUUSD");
        let evaluation = Evaluation {
            verdict: Verdict::Buy,
            meta: SignalMeta {
                price: 2345.678,
                rsi: Some(55.56),
            },
        };
        assert_eq!(
            format_signal_message(&gold, &evaluation),
            "<b>XAUUSD signal:</b> BUY\n💰 Price: 2345.68\n📊 RSI: 55.6\n<i>Not financial advice</i>"
        );
    }

    #[test]
    fn test_format_signal_message_without_rsi() {
        let gold = Instrument::new("GC=F", "XAUUSD");
        let text = format_signal_message(&gold, &Evaluation::hold(2000.0, None));
        assert!(text.contains("HOLD"));
        assert!(text.contains("RSI: n/a"));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = AppConfig::default();
        config.telegram.chat_id = "42".to_string();
        let settings = RuntimeSettings::from_config(&config).unwrap();
        assert_eq!(settings.timeframe, TimeFrame::Hour1);
        assert_eq!(settings.poll_interval, Duration::from_secs(900));
        assert_eq!(settings.initial_delay, Duration::from_secs(5));
        assert_eq!(settings.recipient, "42");
        assert_eq!(settings.instrument.display_name, "XAUUSD");
    }
}

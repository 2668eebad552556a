use async_trait::async_trait;
use aurum_core::common::time::FakeClockProvider;
use aurum_core::common::{Instrument, TimeFrame};
use aurum_core::config::StrategyConfig;
use aurum_core::market::entity::Candle;
use aurum_core::market::error::MarketError;
use aurum_core::market::port::MarketDataProvider;
use aurum_core::notify::entity::IncomingCommand;
use aurum_core::notify::error::NotifyError;
use aurum_core::notify::port::{CommandSource, Notifier};
use aurum_core::signal::entity::Verdict;
use aurum_engine::classifier::SignalClassifier;
use aurum_engine::command::{Command, CommandService, run_command_loop};
use aurum_engine::runtime::{RuntimeSettings, SignalRuntime, TickOutcome};
use aurum_engine::tracker::{SignalState, SignalTracker};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// # Summary
/// 按脚本依次返回结果的模拟行情驱动；脚本耗尽后重复默认结果。
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Vec<Candle>, MarketError>>>,
    fallback: Vec<Candle>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn repeating(candles: Vec<Candle>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: candles,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn scripted(script: Vec<Result<Vec<Candle>, MarketError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Vec::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn fetch_latest(
        &self,
        _: &Instrument,
        _: TimeFrame,
        _: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// # Summary
/// 记录所有发送请求的模拟通知通道，可配置为总是失败。
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        if self.fail {
            return Err(NotifyError::Platform("Telegram API error: 502".into()));
        }
        Ok(())
    }
}

/// # Summary
/// 先返回预设批次、随后永久挂起的模拟命令来源。
struct QueuedCommands {
    batches: Mutex<VecDeque<Vec<IncomingCommand>>>,
}

#[async_trait]
impl CommandSource for QueuedCommands {
    async fn poll_commands(&self) -> Result<Vec<IncomingCommand>, NotifyError> {
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => Ok(batch),
            None => std::future::pending().await,
        }
    }
}

fn strategy() -> StrategyConfig {
    StrategyConfig {
        ema_fast: 3,
        ema_slow: 6,
        ema_signal: 3,
        ema_trend_period: 5,
        rsi_period: 5,
        rsi_oversold: 30.0,
        rsi_overbought: 70.0,
        debounce_seconds: 3600,
    }
}

fn candles(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            time: start + ChronoDuration::hours(i64::try_from(i).unwrap()),
            open: close,
            high: close,
            low: close,
            close,
            volume: 10.0,
        })
        .collect()
}

/// 最后一根出现 MACD 金叉、分类为 BUY 的序列。
fn buy_series() -> Vec<Candle> {
    let mut closes: Vec<f64> = (0..10).map(|i| 100.0 - f64::from(i)).collect();
    closes.push(96.0);
    candles(&closes)
}

fn settings() -> RuntimeSettings {
    RuntimeSettings {
        instrument: Instrument::new("GC=F", "XAUUSD"),
        timeframe: TimeFrame::Hour1,
        history_bars: 500,
        fetch_timeout: Duration::from_secs(30),
        poll_interval: Duration::from_secs(900),
        initial_delay: Duration::from_secs(5),
        recipient: "5399".to_string(),
    }
}

struct Harness {
    runtime: Arc<SignalRuntime>,
    provider: Arc<ScriptedProvider>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<FakeClockProvider>,
}

fn harness(provider: ScriptedProvider, notifier: RecordingNotifier) -> Harness {
    let provider = Arc::new(provider);
    let notifier = Arc::new(notifier);
    let clock = Arc::new(FakeClockProvider::new(
        Utc.with_ymd_and_hms(2024, 5, 7, 9, 0, 0).unwrap(),
    ));
    let runtime = Arc::new(SignalRuntime::new(
        provider.clone(),
        notifier.clone(),
        clock.clone(),
        SignalClassifier::new(strategy()),
        Arc::new(SignalTracker::new(strategy().debounce_seconds)),
        settings(),
    ));
    Harness {
        runtime,
        provider,
        notifier,
        clock,
    }
}

#[tokio::test]
async fn test_empty_fetch_skips_without_state_change() {
    let h = harness(
        ScriptedProvider::scripted(vec![Ok(vec![])]),
        RecordingNotifier::default(),
    );

    let outcome = h.runtime.tick().await;
    assert!(matches!(outcome, TickOutcome::Skipped { .. }));
    assert!(h.notifier.sent().is_empty());
    assert_eq!(h.runtime.tracker().snapshot().await, SignalState::default());
}

#[tokio::test]
async fn test_fetch_failure_skips_tick() {
    let h = harness(
        ScriptedProvider::scripted(vec![Err(MarketError::Network("connection refused".into()))]),
        RecordingNotifier::default(),
    );

    match h.runtime.tick().await {
        TickOutcome::Skipped { reason } => assert!(reason.contains("connection refused")),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(h.notifier.sent().is_empty());
    assert_eq!(h.runtime.tracker().last_verdict(), None);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_timeout_is_treated_as_unavailable() {
    let h = harness(
        ScriptedProvider::repeating(buy_series()).with_delay(Duration::from_secs(120)),
        RecordingNotifier::default(),
    );

    match h.runtime.tick().await {
        TickOutcome::Skipped { reason } => assert!(reason.contains("timed out"), "{}", reason),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_repeated_buy_within_window_is_sent_once() {
    let h = harness(
        ScriptedProvider::repeating(buy_series()),
        RecordingNotifier::default(),
    );

    let first = h.runtime.tick().await;
    assert!(matches!(
        first,
        TickOutcome::Emitted { delivered: true, ref evaluation } if evaluation.verdict == Verdict::Buy
    ));

    h.clock.advance_secs(100);
    let second = h.runtime.tick().await;
    assert!(matches!(second, TickOutcome::Suppressed(e) if e.verdict == Verdict::Buy));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "5399");
    assert_eq!(
        sent[0].1,
        "<b>XAUUSD signal:</b> BUY\n💰 Price: 96.00\n📊 RSI: 55.6\n<i>Not financial advice</i>"
    );

    // 窗口过后同一判定再次发出
    h.clock.advance_secs(3600);
    assert!(matches!(h.runtime.tick().await, TickOutcome::Emitted { .. }));
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_delivery_failure_still_updates_state() {
    let h = harness(
        ScriptedProvider::repeating(buy_series()),
        RecordingNotifier::failing(),
    );

    let outcome = h.runtime.tick().await;
    assert!(matches!(outcome, TickOutcome::Emitted { delivered: false, .. }));
    assert_eq!(h.runtime.tracker().last_verdict(), Some(Verdict::Buy));

    // 未重试：窗口内的相同判定被抑制
    h.clock.advance_secs(60);
    assert!(matches!(h.runtime.tick().await, TickOutcome::Suppressed(_)));
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_single_bar_emits_hold_with_unknown_rsi() {
    let h = harness(
        ScriptedProvider::repeating(candles(&[2345.678])),
        RecordingNotifier::default(),
    );

    let outcome = h.runtime.tick().await;
    assert!(matches!(
        outcome,
        TickOutcome::Emitted { ref evaluation, .. } if evaluation.verdict == Verdict::Hold && evaluation.meta.rsi.is_none()
    ));
    let sent = h.notifier.sent();
    assert!(sent[0].1.contains("Price: 2345.68"));
    assert!(sent[0].1.contains("RSI: n/a"));
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_ticks_are_serialized() {
    let h = harness(
        ScriptedProvider::repeating(buy_series()).with_delay(Duration::from_millis(50)),
        RecordingNotifier::default(),
    );

    let (a, b) = tokio::join!(h.runtime.tick(), h.runtime.tick());
    let emitted = [&a, &b]
        .iter()
        .filter(|o| matches!(o, TickOutcome::Emitted { .. }))
        .count();
    let suppressed = [&a, &b]
        .iter()
        .filter(|o| matches!(o, TickOutcome::Suppressed(_)))
        .count();
    assert_eq!(emitted, 1);
    assert_eq!(suppressed, 1);
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_ticks_on_schedule_until_shutdown() {
    let h = harness(
        ScriptedProvider::repeating(buy_series()),
        RecordingNotifier::default(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let runtime = h.runtime.clone();
    let handle = tokio::spawn(async move { runtime.run(shutdown_rx).await });

    // 初始延迟 5s 后首轮，随后每 900s 一轮：t = 5, 905, 1805
    tokio::time::sleep(Duration::from_secs(2000)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(h.provider.calls(), 3);
    // 虚拟时钟未前进，后两轮被去抖抑制
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_stops_during_initial_delay() {
    let h = harness(
        ScriptedProvider::repeating(buy_series()),
        RecordingNotifier::default(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runtime = h.runtime.clone();
    let handle = tokio::spawn(async move { runtime.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_command_loop_replies_to_start_and_status() {
    let h = harness(
        ScriptedProvider::repeating(buy_series()),
        RecordingNotifier::default(),
    );
    assert!(matches!(h.runtime.tick().await, TickOutcome::Emitted { .. }));

    let replies = Arc::new(RecordingNotifier::default());
    let source = Arc::new(QueuedCommands {
        batches: Mutex::new(VecDeque::from(vec![vec![
            IncomingCommand {
                chat_id: "7".into(),
                text: "/start".into(),
            },
            IncomingCommand {
                chat_id: "7".into(),
                text: "hello".into(),
            },
            IncomingCommand {
                chat_id: "8".into(),
                text: "/status".into(),
            },
        ]])),
    });
    let service = CommandService::new(Instrument::new("GC=F", "XAUUSD"), h.runtime.tracker());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_command_loop(
        source,
        replies.clone(),
        service,
        shutdown_rx,
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let sent = replies.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "7");
    assert!(sent[0].1.contains("XAUUSD"));
    assert_eq!(sent[1], ("8".to_string(), "Last signal: BUY".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_status_answers_while_tick_in_flight() {
    let h = harness(
        ScriptedProvider::repeating(buy_series()).with_delay(Duration::from_secs(25)),
        RecordingNotifier::default(),
    );
    let service = CommandService::new(Instrument::new("GC=F", "XAUUSD"), h.runtime.tracker());

    let runtime = h.runtime.clone();
    let tick = tokio::spawn(async move { runtime.tick().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.provider.calls(), 1);

    // 拉取仍在进行，回复不应等待本轮结束
    let started = tokio::time::Instant::now();
    let reply = tokio::time::timeout(Duration::from_secs(1), service.respond(Command::Status))
        .await
        .unwrap();
    assert_eq!(reply, "Last signal: none yet");
    assert!(started.elapsed() < Duration::from_secs(1));

    assert!(matches!(tick.await.unwrap(), TickOutcome::Emitted { .. }));
    assert_eq!(service.respond(Command::Status).await, "Last signal: BUY");
}

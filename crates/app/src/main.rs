mod logging;
mod settings;
mod supervisor;

use anyhow::anyhow;
use aurum_core::common::time::RealTimeProvider;
use aurum_core::config::AppConfig;
use aurum_engine::classifier::SignalClassifier;
use aurum_engine::command::{CommandService, run_command_loop};
use aurum_engine::runtime::{RuntimeSettings, SignalRuntime};
use aurum_engine::tracker::SignalTracker;
use aurum_feed::yahoo::YahooProvider;
use aurum_notify::telegram::{TelegramCommandSource, TelegramNotifier};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// # Summary
/// 组装并运行一次完整的服务。
///
/// # Logic
/// 1. 实例化基础设施层 (Yahoo 行情、Telegram 通知)。
/// 2. 构造分类器与轮询编排器，注入共享的去抖状态。
/// 3. 启用命令时，与轮询循环并发运行命令监听。
/// 4. 两者都在停机信号后返回。
async fn serve(
    config: Arc<AppConfig>,
    tracker: Arc<SignalTracker>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let settings = RuntimeSettings::from_config(&config)?;
    let provider = Arc::new(YahooProvider::new()?);
    let notifier = Arc::new(TelegramNotifier::new(config.telegram.bot_token.clone())?);

    let commands = if config.telegram.commands_enabled {
        let source = Arc::new(TelegramCommandSource::new(
            config.telegram.bot_token.clone(),
        )?);
        let service = CommandService::new(settings.instrument.clone(), tracker.clone());
        Some((source, service))
    } else {
        None
    };

    let runtime = SignalRuntime::new(
        provider,
        notifier.clone(),
        Arc::new(RealTimeProvider),
        SignalClassifier::new(config.strategy.clone()),
        tracker,
        settings,
    );

    let listener = {
        let shutdown = shutdown.clone();
        async move {
            if let Some((source, service)) = commands {
                run_command_loop(source, notifier, service, shutdown).await;
            }
        }
    };

    tokio::join!(runtime.run(shutdown), listener);
    Ok(())
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
///
/// # Logic
/// 1. 加载并校验配置，初始化全局日志。
/// 2. 安装 TLS 加密提供者。
/// 3. 在守护循环中运行服务，异常退出后自动重启。
/// 4. 挂起等待 Ctrl-C，广播停机信号并等待服务结束。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("AURUM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(settings::DEFAULT_CONFIG_PATH));
    let config = Arc::new(settings::load_config(&config_path)?);
    let _log_guard = logging::init(&config.log)?;
    info!(
        "Aurum starting: {} ({}) on {}m bars",
        config.market.display_name, config.market.symbol, config.market.timeframe_minutes
    );

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    // 去抖状态跨重启保留
    let tracker = Arc::new(SignalTracker::new(config.strategy.debounce_seconds));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let restart_delay = Duration::from_secs(config.supervisor.restart_delay_seconds);

    let service_rx = shutdown_rx.clone();
    let supervisor = tokio::spawn(supervisor::supervise(
        move || serve(config.clone(), tracker.clone(), service_rx.clone()),
        restart_delay,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Stopping...");
    if shutdown_tx.send(true).is_err() {
        warn!("Service already stopped");
    }

    let restarts = supervisor.await?;
    info!("Aurum stopped after {} restarts", restarts);
    Ok(())
}

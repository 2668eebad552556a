use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// # Summary
/// 进程守护循环。
///
/// # Logic
/// 1. 把服务作为独立任务启动并等待其结束。
/// 2. 已请求停机时直接返回。
/// 3. 服务返回错误、panic 或意外退出时记录日志，等待 `restart_delay` 后重启。
/// 4. 等待期间收到停机信号则不再重启。
///
/// # Arguments
/// * `service`: 每次调用产生一个新的服务实例。
/// * `restart_delay`: 两次启动之间的间隔。
/// * `shutdown`: 值变为 true 时停止。
///
/// # Returns
/// 重启次数。
pub async fn supervise<F, Fut>(
    mut service: F,
    restart_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let mut restarts = 0;
    loop {
        let outcome = tokio::spawn(service()).await;
        if *shutdown.borrow() {
            info!("Service stopped");
            return restarts;
        }

        match outcome {
            Ok(Ok(())) => warn!("Service exited without a shutdown request"),
            Ok(Err(err)) => error!("Service failed: {:#}", err),
            Err(err) if err.is_panic() => error!("Service panicked: {}", err),
            Err(err) => error!("Service task aborted: {}", err),
        }

        info!("Restarting in {:?}", restart_delay);
        tokio::select! {
            _ = tokio::time::sleep(restart_delay) => {}
            _ = shutdown.wait_for(|stop| *stop) => {
                info!("Service stopped");
                return restarts;
            }
        }
        restarts += 1;
    }
}

use aurum_core::signal::entity::Verdict;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, MutexGuard, watch};

/// # Summary
/// 最近一次发出的信号及其时间。
///
/// # Invariants
/// - `last_verdict` 为 None 时处于空闲态，`last_emit_time` 同样为 None。
/// - 仅在决定发出信号时被修改，只存在于内存中。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalState {
    pub last_verdict: Option<Verdict>,
    pub last_emit_time: Option<DateTime<Utc>>,
}

impl SignalState {
    /// # Summary
    /// 判断新判定是否值得发出。
    ///
    /// # Logic
    /// 判定与上次不同，或距上次发出已严格超过去抖窗口。
    pub fn should_emit(&self, verdict: Verdict, now: DateTime<Utc>, debounce: Duration) -> bool {
        if self.last_verdict != Some(verdict) {
            return true;
        }
        match self.last_emit_time {
            Some(at) => now - at > debounce,
            None => true,
        }
    }

    /// # Summary
    /// 去抖状态机的单步迁移。
    ///
    /// # Returns
    /// 需要发出时迁移到 Holding(verdict, now) 并返回 true；否则状态不变并返回 false。
    pub fn observe(&mut self, verdict: Verdict, now: DateTime<Utc>, debounce: Duration) -> bool {
        if !self.should_emit(verdict, now, debounce) {
            return false;
        }
        self.last_verdict = Some(verdict);
        self.last_emit_time = Some(now);
        true
    }
}

/// # Summary
/// 去抖状态跟踪器，独占持有 `SignalState`。
///
/// # Invariants
/// - 同一时刻只有一个持有者可以执行"评估并可能发出"的序列。
/// - 最近发出的判定另行发布，读取方无需等待进行中的一轮。
pub struct SignalTracker {
    state: Mutex<SignalState>,
    debounce: Duration,
    published: watch::Sender<Option<Verdict>>,
}

/// # Summary
/// 跟踪器的独占访问守卫，持有期间其他评估会排队等待。
pub struct TrackerGuard<'a> {
    state: MutexGuard<'a, SignalState>,
    debounce: Duration,
    published: &'a watch::Sender<Option<Verdict>>,
}

impl SignalTracker {
    /// # Summary
    /// 以空闲态创建跟踪器。
    ///
    /// # Arguments
    /// * `debounce_seconds`: 同一判定重复发出的最短间隔（秒），超出可表示范围时视为永不重发。
    pub fn new(debounce_seconds: i64) -> Self {
        Self {
            state: Mutex::new(SignalState::default()),
            debounce: Duration::try_seconds(debounce_seconds).unwrap_or(Duration::MAX),
            published: watch::Sender::new(None),
        }
    }

    /// 获取独占守卫，在上一个持有者释放前挂起。
    pub async fn lock(&self) -> TrackerGuard<'_> {
        TrackerGuard {
            state: self.state.lock().await,
            debounce: self.debounce,
            published: &self.published,
        }
    }

    /// 最近一次发出的判定，不等待守卫。
    pub fn last_verdict(&self) -> Option<Verdict> {
        *self.published.borrow()
    }

    /// 当前状态快照。
    pub async fn snapshot(&self) -> SignalState {
        self.state.lock().await.clone()
    }
}

impl TrackerGuard<'_> {
    /// 在守卫内执行一次去抖判定，返回是否应发出。
    pub fn observe(&mut self, verdict: Verdict, now: DateTime<Utc>) -> bool {
        let debounce = self.debounce;
        let emitted = self.state.observe(verdict, now, debounce);
        if emitted {
            self.published.send_replace(Some(verdict));
        }
        emitted
    }
}

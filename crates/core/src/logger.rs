//! 메시지 수 제한 로거 -- 작업별 진단 메시지 폭주 방지
//!
//! 파싱에 실패한 라인마다 경고를 남기면 잘못 설정된 작업 하나가 로그를
//! 가득 채울 수 있습니다. [`Logger`]는 초기화 주기마다 내보낼 수 있는
//! 메시지 수를 제한하고, [`MsgCountWatcher`]는 등록된 모든 로거의
//! 카운터를 주기적으로 0으로 되돌립니다.
//!
//! ```text
//! Logger(job=a) ──┐
//! Logger(job=b) ──┼── MsgCountWatcher ── tokio interval(reset_every) ── reset_count()
//! Logger(job=c) ──┘
//! ```

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

static NEXT_LOGGER_ID: AtomicU64 = AtomicU64::new(1);

/// 메시지 수 제한 로거
///
/// 메시지는 `tracing` 이벤트로 내보내며 `logger` 필드에 로거 이름을 담습니다.
/// `limit`이 0이면 제한하지 않습니다.
#[derive(Debug)]
pub struct Logger {
    id: u64,
    name: String,
    limit: u64,
    msg_count: AtomicU64,
}

impl Logger {
    /// 제한 없는 로거를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_limit(name, 0)
    }

    /// 초기화 주기당 `limit`개까지만 메시지를 내보내는 로거를 생성합니다.
    pub fn with_limit(name: impl Into<String>, limit: u64) -> Self {
        Self {
            id: NEXT_LOGGER_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            limit,
            msg_count: AtomicU64::new(0),
        }
    }

    /// 프로세스 안에서 유일한 로거 식별자
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 로거 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 마지막 초기화 이후 시도된 메시지 수 (억제된 메시지 포함)
    pub fn msg_count(&self) -> u64 {
        self.msg_count.load(Ordering::Relaxed)
    }

    /// 메시지 카운터를 0으로 되돌립니다.
    pub fn reset_count(&self) {
        self.msg_count.store(0, Ordering::Relaxed);
    }

    fn allow(&self) -> bool {
        let count = self.msg_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.limit == 0 || count <= self.limit
    }

    /// error 레벨 메시지
    pub fn error(&self, msg: impl Display) {
        if self.allow() {
            error!(logger = %self.name, "{msg}");
        }
    }

    /// warn 레벨 메시지
    pub fn warn(&self, msg: impl Display) {
        if self.allow() {
            warn!(logger = %self.name, "{msg}");
        }
    }

    /// info 레벨 메시지
    pub fn info(&self, msg: impl Display) {
        if self.allow() {
            info!(logger = %self.name, "{msg}");
        }
    }

    /// debug 레벨 메시지
    pub fn debug(&self, msg: impl Display) {
        if self.allow() {
            debug!(logger = %self.name, "{msg}");
        }
    }
}

type Registry = Arc<Mutex<HashMap<u64, Arc<Logger>>>>;

fn lock(items: &Registry) -> MutexGuard<'_, HashMap<u64, Arc<Logger>>> {
    // 리셋 루프는 패닉하지 않으므로 poison 상태여도 맵 자체는 유효합니다.
    items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 등록된 로거의 메시지 카운터를 주기적으로 초기화합니다.
///
/// 등록은 로거 id 기준으로 멱등적이며 여러 태스크에서 동시에 호출해도 안전합니다.
pub struct MsgCountWatcher {
    items: Registry,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MsgCountWatcher {
    /// 감시자를 생성하고 초기화 루프를 tokio 태스크로 시작합니다.
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    pub fn new(reset_every: Duration) -> Self {
        let items: Registry = Arc::new(Mutex::new(HashMap::new()));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reset_loop(Arc::clone(&items), reset_every, cancel.clone()));

        Self {
            items,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// 로거를 등록합니다. 같은 로거를 다시 등록해도 항목은 하나입니다.
    pub fn register(&self, logger: &Arc<Logger>) {
        lock(&self.items).insert(logger.id(), Arc::clone(logger));
    }

    /// 로거 등록을 해제합니다.
    pub fn unregister(&self, logger: &Logger) {
        lock(&self.items).remove(&logger.id());
    }

    /// 등록된 로거 수
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    /// 등록된 로거가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 초기화 루프를 멈추고 종료될 때까지 기다립니다.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "msg count watcher task ended abnormally");
        }
    }

    /// 초기화 루프가 이미 종료되었는지 확인합니다.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for MsgCountWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn reset_loop(items: Registry, reset_every: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(reset_every);
    // 첫 tick은 즉시 완료되므로 건너뜁니다.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for logger in lock(&items).values() {
                    logger.reset_count();
                }
            }
            _ = cancel.cancelled() => {
                debug!("msg count watcher stopped");
                break;
            }
        }
    }
}

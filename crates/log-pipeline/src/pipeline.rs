//! 파이프라인 오케스트레이션 -- 작업 하나의 수집 주기를 tokio 태스크로 구동합니다.
//!
//! [`LogPipeline`]은 core의 [`Pipeline`] trait을 구현하여 `weblog-daemon`에서
//! 다른 작업과 동일한 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! interval(update_every) -> spawn_blocking(WebLog::collect) -> mpsc<JobSnapshot> -> host
//!                                   |
//!                          CancellationToken (stop)
//! ```
//!
//! - `stop`은 토큰을 취소합니다. 진행 중인 수집 주기는 스냅샷을 내보내지 않습니다.
//! - 소스가 끝나면 마지막 스냅샷을 보낸 뒤 태스크가 끝나고 상태는
//!   `Unhealthy("source exhausted")`가 됩니다.
//! - 소스 I/O 에러는 기록 후 태스크를 끝냅니다.

use std::io::BufReader;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use weblog_core::error::{PipelineError, WeblogError};
use weblog_core::logger::{Logger, MsgCountWatcher};
use weblog_core::metrics as m;
use weblog_core::pipeline::{HealthStatus, Pipeline};

use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::metric::Snapshot;
use crate::parser::LineSource;
use crate::weblog::{Tick, WebLog};

/// 마지막 주기의 미매칭 비율이 이 값을 넘으면 `Degraded`입니다.
const DEGRADED_UNMATCHED_RATIO: f64 = 0.5;

/// 작업 이름이 붙은 스냅샷
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    /// 작업 이름
    pub job: String,
    /// 평탄한 키 -> 값
    pub snapshot: Snapshot,
}

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 수집 태스크가 기록하는 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum TaskStatus {
    Collecting,
    Exhausted,
    Failed(String),
}

/// 파이프라인과 수집 태스크가 공유하는 상태
#[derive(Debug)]
struct Shared {
    status: Mutex<TaskStatus>,
    lines_read: AtomicU64,
    lines_unmatched: AtomicU64,
    ticks: AtomicU64,
    last_unmatched_ratio_bits: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            status: Mutex::new(TaskStatus::Collecting),
            lines_read: AtomicU64::new(0),
            lines_unmatched: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            last_unmatched_ratio_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    fn status(&self) -> MutexGuard<'_, TaskStatus> {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_status(&self, status: TaskStatus) {
        *self.status() = status;
    }

    fn record(&self, tick: &Tick) {
        self.lines_read.fetch_add(tick.lines_read, Ordering::Relaxed);
        self.lines_unmatched
            .fetch_add(tick.lines_unmatched, Ordering::Relaxed);
        self.ticks.fetch_add(1, Ordering::Relaxed);
        let ratio = if tick.lines_read == 0 {
            0.0
        } else {
            tick.lines_unmatched as f64 / tick.lines_read as f64
        };
        self.last_unmatched_ratio_bits
            .store(ratio.to_bits(), Ordering::Relaxed);
    }

    fn last_unmatched_ratio(&self) -> f64 {
        f64::from_bits(self.last_unmatched_ratio_bits.load(Ordering::Relaxed))
    }
}

/// 웹 로그 파이프라인 -- 작업 하나의 읽기/파싱/분류/스냅샷 흐름을 관리합니다.
///
/// # 사용 예시
/// ```ignore
/// use weblog_log_pipeline::{LogPipeline, LogPipelineBuilder};
///
/// let (mut pipeline, snapshot_rx) = LogPipelineBuilder::new()
///     .config(config)
///     .watcher(watcher)
///     .build()?;
///
/// pipeline.start().await?;
/// while let Some(job_snapshot) = snapshot_rx.recv().await { /* ... */ }
/// ```
pub struct LogPipeline {
    /// 파이프라인 설정
    config: PipelineConfig,
    /// 현재 상태
    state: PipelineState,
    /// 주입된 라인 소스 (없으면 `config.path`를 엽니다)
    source: Mutex<Option<LineSource>>,
    /// 스냅샷 전송 채널
    snapshot_tx: mpsc::Sender<JobSnapshot>,
    /// 진단 메시지 로거
    logger: Arc<Logger>,
    /// 메시지 카운터 초기화 감시자
    watcher: Option<Arc<MsgCountWatcher>>,
    /// 수집 태스크 취소 토큰
    cancel: CancellationToken,
    /// 수집 태스크 핸들
    task: Option<JoinHandle<()>>,
    /// 태스크와 공유하는 상태
    shared: Arc<Shared>,
}

impl LogPipeline {
    /// 현재 상태를 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 작업 이름
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// 파이프라인 설정
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 지금까지 읽은 라인 수
    pub fn lines_read(&self) -> u64 {
        self.shared.lines_read.load(Ordering::Relaxed)
    }

    /// 지금까지 파싱/검증에 실패한 라인 수
    pub fn lines_unmatched(&self) -> u64 {
        self.shared.lines_unmatched.load(Ordering::Relaxed)
    }

    /// 완료된 수집 주기 수
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    async fn open_source(&mut self) -> Result<LineSource, LogPipelineError> {
        let injected = self
            .source
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(source) = injected {
            return Ok(source);
        }
        let file = tokio::fs::File::open(&self.config.path).await?;
        Ok(Box::new(BufReader::new(file.into_std().await)))
    }
}

impl Pipeline for LogPipeline {
    async fn start(&mut self) -> Result<(), WeblogError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(job = %self.config.name, path = %self.config.path, "starting log pipeline");

        let source = self.open_source().await?;

        // auto 형식은 첫 라인을 읽으므로 블로킹 풀에서 생성합니다.
        let config = self.config.clone();
        let logger = Arc::clone(&self.logger);
        let weblog = tokio::task::spawn_blocking(move || WebLog::new(&config, source, logger))
            .await
            .map_err(|e| PipelineError::InitFailed(e.to_string()))??;

        info!(
            job = %self.config.name,
            parser = %weblog.parser_info(),
            "log parser ready"
        );

        if let Some(watcher) = &self.watcher {
            watcher.register(&self.logger);
        }

        self.shared = Arc::new(Shared::new());
        self.cancel = CancellationToken::new();
        self.task = Some(tokio::spawn(run_collector(
            weblog,
            self.config.update_every(),
            self.cancel.clone(),
            self.snapshot_tx.clone(),
            Arc::clone(&self.shared),
        )));

        self.state = PipelineState::Running;
        info!(job = %self.config.name, "log pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), WeblogError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!(job = %self.config.name, "stopping log pipeline");

        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(job = %self.config.name, error = %e, "collector task ended abnormally");
        }

        if let Some(watcher) = &self.watcher {
            watcher.unregister(&self.logger);
        }

        self.state = PipelineState::Stopped;
        info!(job = %self.config.name, "log pipeline stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => match &*self.shared.status() {
                TaskStatus::Collecting => {
                    let ratio = self.shared.last_unmatched_ratio();
                    if ratio > DEGRADED_UNMATCHED_RATIO {
                        HealthStatus::Degraded(format!(
                            "unmatched lines high: {:.1}%",
                            ratio * 100.0
                        ))
                    } else {
                        HealthStatus::Healthy
                    }
                }
                TaskStatus::Exhausted => HealthStatus::Unhealthy("source exhausted".to_owned()),
                TaskStatus::Failed(reason) => HealthStatus::Unhealthy(reason.clone()),
            },
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 수집 태스크 본체
///
/// 주기마다 `WebLog`를 블로킹 풀로 옮겨 `collect`를 실행하고 다시 돌려받습니다.
async fn run_collector(
    mut weblog: WebLog,
    every: Duration,
    cancel: CancellationToken,
    tx: mpsc::Sender<JobSnapshot>,
    shared: Arc<Shared>,
) {
    let job = weblog.name().to_owned();
    let format = weblog.format_name();
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        let deadline = started + every;
        let token = cancel.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let result = weblog.collect(deadline, &token);
            (weblog, result)
        })
        .await;

        let result = match joined {
            Ok((returned, result)) => {
                weblog = returned;
                result
            }
            Err(e) => {
                error!(job = %job, error = %e, "collector worker panicked");
                let err = PipelineError::SourceFailed(format!("collector worker panicked: {e}"));
                shared.set_status(TaskStatus::Failed(err.to_string()));
                return;
            }
        };

        let tick = match result {
            Ok(Some(tick)) => tick,
            Ok(None) => {
                debug!(job = %job, "collection cancelled, dropping partial tick");
                break;
            }
            Err(e) => {
                error!(job = %job, error = %e, "log source failed, stopping collector");
                metrics::counter!(m::PIPELINE_SOURCE_ERRORS_TOTAL, m::LABEL_JOB => job.clone())
                    .increment(1);
                let err = PipelineError::SourceFailed(e.to_string());
                shared.set_status(TaskStatus::Failed(err.to_string()));
                return;
            }
        };

        shared.record(&tick);
        metrics::counter!(
            m::PIPELINE_LINES_READ_TOTAL,
            m::LABEL_JOB => job.clone(),
            m::LABEL_PARSER_FORMAT => format
        )
        .increment(tick.lines_read);
        metrics::counter!(m::PIPELINE_LINES_UNMATCHED_TOTAL, m::LABEL_JOB => job.clone())
            .increment(tick.lines_unmatched);
        metrics::counter!(m::PIPELINE_TICKS_TOTAL, m::LABEL_JOB => job.clone()).increment(1);
        metrics::histogram!(m::PIPELINE_TICK_DURATION_SECONDS, m::LABEL_JOB => job.clone())
            .record(started.elapsed().as_secs_f64());
        metrics::gauge!(m::PIPELINE_SNAPSHOT_KEYS, m::LABEL_JOB => job.clone())
            .set(tick.snapshot.len() as f64);

        debug!(
            job = %job,
            lines = tick.lines_read,
            unmatched = tick.lines_unmatched,
            keys = tick.snapshot.len(),
            "collection tick complete"
        );

        let exhausted = tick.exhausted;
        let message = JobSnapshot {
            job: job.clone(),
            snapshot: tick.snapshot,
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(message) => {
                if sent.is_err() {
                    warn!(job = %job, "snapshot receiver dropped, stopping collector");
                    break;
                }
            }
        }

        if exhausted {
            info!(job = %job, "log source exhausted, collector finished");
            shared.set_status(TaskStatus::Exhausted);
            break;
        }
    }
}

/// 로그 파이프라인 빌더
///
/// 파이프라인을 구성하고 스냅샷 채널을 생성합니다.
pub struct LogPipelineBuilder {
    config: PipelineConfig,
    source: Option<LineSource>,
    snapshot_tx: Option<mpsc::Sender<JobSnapshot>>,
    watcher: Option<Arc<MsgCountWatcher>>,
}

impl LogPipelineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            source: None,
            snapshot_tx: None,
            watcher: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 라인 소스를 직접 지정합니다. 지정하지 않으면 시작할 때 `config.path`를 엽니다.
    pub fn source(mut self, source: LineSource) -> Self {
        self.source = Some(source);
        self
    }

    /// 외부 스냅샷 전송 채널을 설정합니다.
    ///
    /// 여러 작업이 채널 하나를 공유할 때 사용합니다. 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn snapshot_sender(mut self, tx: mpsc::Sender<JobSnapshot>) -> Self {
        self.snapshot_tx = Some(tx);
        self
    }

    /// 메시지 카운터 초기화 감시자를 설정합니다.
    pub fn watcher(mut self, watcher: Arc<MsgCountWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `LogPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<JobSnapshot>>`: 스냅샷 수신 채널
    ///   (외부 snapshot_sender를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(LogPipeline, Option<mpsc::Receiver<JobSnapshot>>), LogPipelineError> {
        self.config.validate()?;

        let (snapshot_tx, snapshot_rx) = match self.snapshot_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.config.channel_capacity);
                (tx, Some(rx))
            }
        };

        let logger = Arc::new(Logger::with_limit(
            format!("weblog[{}]", self.config.name),
            self.config.msg_limit,
        ));

        let pipeline = LogPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            source: Mutex::new(self.source),
            snapshot_tx,
            logger,
            watcher: self.watcher,
            cancel: CancellationToken::new(),
            task: None,
            shared: Arc::new(Shared::new()),
        };

        Ok((pipeline, snapshot_rx))
    }
}

impl Default for LogPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

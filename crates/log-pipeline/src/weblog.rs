//! 수집기 -- 파서 하나, 재사용 `LogLine` 하나, `MetricData` 하나를 소유하는 동기 루프
//!
//! [`WebLog::collect`]는 수집 주기 하나를 실행합니다.
//!
//! 1. 마감 시각까지 또는 소스가 끝날 때까지 라인을 읽습니다.
//! 2. 라인마다 레코드를 초기화하고 읽은 뒤 검증에 통과하면 분류기에 넘깁니다.
//!    파싱/검증 실패는 `req_unmatched`로 집계하고, I/O 에러는 호출자에게 올립니다.
//! 3. 메트릭 상태를 스냅샷으로 내보내고 주기 단위 값을 초기화합니다.
//!
//! 취소 토큰이 취소되면 부분 스냅샷을 내보내지 않고 `None`을 반환합니다.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use weblog_core::logger::Logger;

use crate::aggregator::Aggregator;
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::logline::LogLine;
use crate::metric::{MetricData, Snapshot};
use crate::parser::{self, LineSource, LogParser};
use crate::pattern::{new_custom_fields, new_user_patterns};

/// 수집 주기 하나의 결과
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// 이번 주기의 스냅샷
    pub snapshot: Snapshot,
    /// 이번 주기에 읽은 라인 수
    pub lines_read: u64,
    /// 이번 주기에 파싱/검증에 실패한 라인 수
    pub lines_unmatched: u64,
    /// 소스가 끝났는지 여부
    pub exhausted: bool,
}

/// 웹 로그 수집기
pub struct WebLog {
    name: String,
    parser: Box<dyn LogParser>,
    line: LogLine,
    data: MetricData,
    aggregator: Aggregator,
    logger: Arc<Logger>,
    exhausted: bool,
}

impl std::fmt::Debug for WebLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebLog")
            .field("name", &self.name)
            .field("parser", &self.parser.info())
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl WebLog {
    /// 설정과 라인 소스로 수집기를 생성합니다.
    ///
    /// 패턴, 히스토그램, 파서 생성 실패는 모두 `Config` 계열 에러입니다.
    /// `auto` 형식은 이 시점에 소스의 첫 라인을 읽습니다.
    pub fn new(
        config: &PipelineConfig,
        source: LineSource,
        logger: Arc<Logger>,
    ) -> Result<Self, LogPipelineError> {
        let url_patterns = new_user_patterns(&config.url_patterns, "url_patterns")?;
        let custom_fields = new_custom_fields(&config.custom_fields)?;
        let custom_names = config.custom_field_names();

        let aggregator = Aggregator::new(url_patterns, custom_fields, config.group_resp_codes);
        let data = aggregator.new_data(&config.histogram)?;
        let parser = parser::new_parser(&config.parser, &custom_names, source)?;
        let line = LogLine::new(config.effective_time_scale()).with_custom_fields(custom_names);

        Ok(Self {
            name: config.name.clone(),
            parser,
            line,
            data,
            aggregator,
            logger,
            exhausted: false,
        })
    }

    /// 작업 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 파서 형식 이름
    pub fn format_name(&self) -> &'static str {
        self.parser.format_name()
    }

    /// 파서 설명
    pub fn parser_info(&self) -> String {
        self.parser.info()
    }

    /// 소스가 끝났는지 확인합니다.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// 현재 메트릭 상태
    pub fn data(&self) -> &MetricData {
        &self.data
    }

    /// 라인 하나를 처리합니다. 소스가 끝났으면 `Ok(false)`입니다.
    ///
    /// 파싱/검증 실패는 `req_unmatched`로 집계하고 `Ok(true)`를 반환합니다.
    fn process_line(&mut self, unmatched: &mut u64) -> Result<bool, LogPipelineError> {
        self.line.reset();
        let failure = match self.parser.read_line(&mut self.line) {
            Ok(false) => return Ok(false),
            Ok(true) => match self.line.verify() {
                Ok(()) => {
                    self.aggregator.observe(&self.line, &mut self.data);
                    return Ok(true);
                }
                Err(e) => LogPipelineError::Verify(e),
            },
            Err(e) if e.is_recoverable() => e,
            Err(e) => return Err(e),
        };

        *unmatched += 1;
        self.aggregator.unmatched(&mut self.data);
        self.logger.warn(format_args!("{}: unmatched line: {failure}", self.name));
        Ok(true)
    }

    /// 수집 주기 하나를 실행합니다.
    ///
    /// 취소되면 `Ok(None)`, 그 외에는 스냅샷을 담은 `Tick`을 반환합니다.
    /// 소스 I/O 에러는 그대로 반환되며 이번 주기의 스냅샷은 버려집니다.
    pub fn collect(
        &mut self,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Option<Tick>, LogPipelineError> {
        let mut lines_read = 0u64;
        let mut lines_unmatched = 0u64;

        while !self.exhausted {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if Instant::now() >= deadline {
                break;
            }
            if self.process_line(&mut lines_unmatched)? {
                lines_read += 1;
            } else {
                self.exhausted = true;
            }
        }

        if cancel.is_cancelled() {
            return Ok(None);
        }

        let snapshot = self.data.snapshot();
        self.data.reset();
        Ok(Some(Tick {
            snapshot,
            lines_read,
            lines_unmatched,
            exhausted: self.exhausted,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use crate::config::PipelineConfigBuilder;

    const FORMAT: &str = r#"$remote_addr - - [$time_local] "$request" $status $body_bytes_sent $request_time"#;

    fn weblog(text: &str) -> WebLog {
        let config = PipelineConfigBuilder::new()
            .name("test")
            .csv_format(FORMAT)
            .url_pattern("api", "~ ^/api/")
            .build()
            .unwrap();
        let source: LineSource = Box::new(Cursor::new(text.as_bytes().to_vec()));
        WebLog::new(&config, source, Arc::new(Logger::with_limit("test", 5))).unwrap()
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[test]
    fn collect_aggregates_until_end_of_source() {
        let text = concat!(
            "10.0.0.1 - - [10/Oct/2000:13:55:36 -0700] \"GET /api/a HTTP/1.1\" 200 100 0.250\n",
            "10.0.0.2 - - [10/Oct/2000:13:55:36 -0700] \"GET /b HTTP/1.1\" 500 50 0.125\n",
            "garbage\n",
        );
        let mut w = weblog(text);
        let tick = w
            .collect(far_deadline(), &CancellationToken::new())
            .unwrap()
            .unwrap();

        assert!(tick.exhausted);
        assert_eq!(tick.lines_read, 3);
        assert_eq!(tick.lines_unmatched, 1);
        let snap = &tick.snapshot;
        assert_eq!(snap["requests"], 2);
        assert_eq!(snap["req_unmatched"], 1);
        assert_eq!(snap["req_error"], 1);
        assert_eq!(snap["bytes_sent"], 150);
        assert_eq!(snap["req_proc_time_max"], 250);
        assert_eq!(snap["req_url_ptn_api"], 1);
        assert_eq!(snap["uniq_ipv4"], 2);
    }

    #[test]
    fn next_tick_resets_interval_metrics() {
        let text = "10.0.0.1 - - [10/Oct/2000:13:55:36 -0700] \"GET / HTTP/1.1\" 200 1 0.5\n";
        let mut w = weblog(text);
        let cancel = CancellationToken::new();
        w.collect(far_deadline(), &cancel).unwrap().unwrap();

        let tick = w.collect(far_deadline(), &cancel).unwrap().unwrap();
        assert_eq!(tick.lines_read, 0);
        assert_eq!(tick.snapshot["requests"], 1);
        assert_eq!(tick.snapshot["uniq_ipv4"], 0);
        assert_eq!(tick.snapshot["req_proc_time_min"], 0);
        assert_eq!(tick.snapshot["req_proc_time_max"], 0);
        assert_eq!(tick.snapshot["req_proc_time_avg"], 0);
    }

    #[test]
    fn verify_failure_counts_as_unmatched() {
        let text = "10.0.0.1 - - [10/Oct/2000:13:55:36 -0700] \"GET / HTTP/1.1\" 700 1 0.5\n";
        let mut w = weblog(text);
        let tick = w
            .collect(far_deadline(), &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(tick.snapshot["req_unmatched"], 1);
        assert_eq!(tick.snapshot["requests"], 0);
    }

    #[test]
    fn cancelled_collect_emits_nothing() {
        let mut w = weblog("10.0.0.1 - - [x y] \"GET / HTTP/1.1\" 200 1 0.5\n");
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(w.collect(far_deadline(), &cancel).unwrap().is_none());
    }

    #[test]
    fn past_deadline_emits_without_reading() {
        let mut w = weblog("10.0.0.1 - - [x y] \"GET / HTTP/1.1\" 200 1 0.5\n");
        let tick = w
            .collect(Instant::now(), &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(tick.lines_read, 0);
        assert!(!tick.exhausted);
        assert!(!w.is_exhausted());
    }

    #[test]
    fn unmatched_warnings_are_rate_limited() {
        let text = "bad\n".repeat(20);
        let config = PipelineConfigBuilder::new()
            .csv_format(FORMAT)
            .build()
            .unwrap();
        let logger = Arc::new(Logger::with_limit("limited", 5));
        let source: LineSource = Box::new(Cursor::new(text.into_bytes()));
        let mut w = WebLog::new(&config, source, Arc::clone(&logger)).unwrap();
        let tick = w
            .collect(far_deadline(), &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(tick.lines_unmatched, 20);
        // 억제된 메시지도 카운트됩니다
        assert_eq!(logger.msg_count(), 20);
    }

    #[test]
    fn config_errors_surface_at_construction() {
        let mut config = PipelineConfig::default();
        config.parser.log_type = "csv".to_owned();
        let source: LineSource = Box::new(Cursor::new(Vec::new()));
        let err = WebLog::new(&config, source, Arc::new(Logger::new("x"))).unwrap_err();
        assert!(matches!(err, LogPipelineError::Config { .. }));
    }
}

//! 메트릭 상수 및 설명 등록
//!
//! weblog 자체 텔레메트리 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 로그에서 집계한 스냅샷 값은 [`WEBLOG_SNAPSHOT_VALUE`] 게이지 하나에
//! `job`, `key` 레이블을 붙여 내보냅니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `weblog_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(weblog_core::metrics::PIPELINE_LINES_READ_TOTAL, "job" => "nginx").increment(1);
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 작업 이름 레이블 키
pub const LABEL_JOB: &str = "job";

/// 스냅샷 키 레이블 키 (예: `resp_code_200`)
pub const LABEL_KEY: &str = "key";

/// 파서 형식 레이블 키 (csv, regex, ltsv, json)
pub const LABEL_PARSER_FORMAT: &str = "format";

// ─── Pipeline 메트릭 ────────────────────────────────────────────────

/// Pipeline: 읽은 전체 라인 수 (counter)
pub const PIPELINE_LINES_READ_TOTAL: &str = "weblog_pipeline_lines_read_total";

/// Pipeline: 파싱/검증에 실패한 라인 수 (counter)
pub const PIPELINE_LINES_UNMATCHED_TOTAL: &str = "weblog_pipeline_lines_unmatched_total";

/// Pipeline: 완료된 수집 주기 수 (counter)
pub const PIPELINE_TICKS_TOTAL: &str = "weblog_pipeline_ticks_total";

/// Pipeline: 수집 주기 하나의 처리 시간 (histogram, 초)
pub const PIPELINE_TICK_DURATION_SECONDS: &str = "weblog_pipeline_tick_duration_seconds";

/// Pipeline: 마지막 스냅샷의 키 수 (gauge)
pub const PIPELINE_SNAPSHOT_KEYS: &str = "weblog_pipeline_snapshot_keys";

/// Pipeline: 라인 소스 I/O 에러 수 (counter)
pub const PIPELINE_SOURCE_ERRORS_TOTAL: &str = "weblog_pipeline_source_errors_total";

/// 스냅샷 값 (gauge, label: job, key)
pub const WEBLOG_SNAPSHOT_VALUE: &str = "weblog_snapshot_value";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "weblog_daemon_uptime_seconds";

/// Daemon: 등록된 작업 수 (gauge)
pub const DAEMON_JOBS_REGISTERED: &str = "weblog_daemon_jobs_registered";

/// 수집 주기 처리 시간 히스토그램 버킷 (초)
pub const TICK_DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    describe_counter!(
        PIPELINE_LINES_READ_TOTAL,
        "Total number of access log lines read from all jobs"
    );
    describe_counter!(
        PIPELINE_LINES_UNMATCHED_TOTAL,
        "Total number of lines that failed to parse or verify"
    );
    describe_counter!(
        PIPELINE_TICKS_TOTAL,
        "Total number of completed collection ticks"
    );
    describe_histogram!(
        PIPELINE_TICK_DURATION_SECONDS,
        "Time to drain, classify and snapshot a single tick in seconds"
    );
    describe_gauge!(
        PIPELINE_SNAPSHOT_KEYS,
        "Number of keys in the most recent snapshot"
    );
    describe_counter!(
        PIPELINE_SOURCE_ERRORS_TOTAL,
        "Total number of line source read failures"
    );
    describe_gauge!(
        WEBLOG_SNAPSHOT_VALUE,
        "Access log metric value from the most recent snapshot"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "weblog daemon uptime in seconds");
    describe_gauge!(
        DAEMON_JOBS_REGISTERED,
        "Number of log jobs registered in the daemon"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        PIPELINE_LINES_READ_TOTAL,
        PIPELINE_LINES_UNMATCHED_TOTAL,
        PIPELINE_TICKS_TOTAL,
        PIPELINE_TICK_DURATION_SECONDS,
        PIPELINE_SNAPSHOT_KEYS,
        PIPELINE_SOURCE_ERRORS_TOTAL,
        WEBLOG_SNAPSHOT_VALUE,
        DAEMON_UPTIME_SECONDS,
        DAEMON_JOBS_REGISTERED,
    ];

    #[test]
    fn all_metrics_start_with_weblog_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("weblog_"),
                "Metric '{}' does not start with 'weblog_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        for name in [
            PIPELINE_LINES_READ_TOTAL,
            PIPELINE_LINES_UNMATCHED_TOTAL,
            PIPELINE_TICKS_TOTAL,
            PIPELINE_SOURCE_ERRORS_TOTAL,
        ] {
            assert!(name.ends_with("_total"), "{name}");
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_JOB, LABEL_KEY, LABEL_PARSER_FORMAT] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn tick_duration_buckets_are_sorted() {
        for pair in TICK_DURATION_BUCKETS.windows(2) {
            assert!(pair[1] > pair[0], "Bucket values must be in ascending order");
        }
    }
}

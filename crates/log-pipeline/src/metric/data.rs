//! 작업 하나의 전체 메트릭 상태

use super::{Counter, CounterVec, Histogram, Snapshot, Summary, UniqueCounter};
use crate::error::LogPipelineError;
use crate::pattern::{CustomField, UserPattern};

/// 시간 값 배율: 초 -> 밀리초
pub const TIME_MUL: i64 = 1000;
/// 시간 값 나눗수
pub const TIME_DIV: i64 = 1;

/// URL 패턴 하나에 대한 통계
#[derive(Debug, Clone, Default)]
pub struct PatternStats {
    /// 패턴 이름
    pub name: String,
    /// 응답 코드별 카운터 (`group_resp_codes`면 `2xx` 형태의 키)
    pub resp_code: CounterVec,
    /// 응답 바이트
    pub bytes_sent: Counter,
    /// 요청 바이트
    pub bytes_received: Counter,
    /// 응답 시간 요약 (수집 주기마다 초기화)
    pub req_proc_time: Summary,
}

impl PatternStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    fn write_to(&self, out: &mut Snapshot) {
        let prefix = format!("url_ptn_{}", self.name);
        self.resp_code
            .write_to(out, &format!("{prefix}_resp_code"), 1, 1);
        self.bytes_sent
            .write_to(out, &format!("{prefix}_bytes_sent"), 1, 1);
        self.bytes_received
            .write_to(out, &format!("{prefix}_bytes_received"), 1, 1);
        self.req_proc_time
            .write_to(out, &format!("{prefix}_req_proc_time"), TIME_MUL, TIME_DIV);
    }
}

/// 작업 하나의 메트릭 상태
///
/// 분류기가 라인마다 갱신하고, 수집 주기 경계에서 스냅샷으로 내보낸 뒤
/// [`reset`](Self::reset)으로 주기 단위 값만 초기화합니다.
#[derive(Debug, Clone)]
pub struct MetricData {
    pub requests: Counter,
    pub req_unmatched: Counter,

    pub resp_code: CounterVec,
    /// `resp_1xx` .. `resp_5xx`
    pub resp_class: [Counter; 5],
    pub req_success: Counter,
    pub req_redirect: Counter,
    pub req_bad: Counter,
    pub req_error: Counter,

    pub req_ipv4: Counter,
    pub req_ipv6: Counter,
    pub uniq_ipv4: UniqueCounter,
    pub uniq_ipv6: UniqueCounter,

    pub bytes_sent: Counter,
    pub bytes_received: Counter,

    pub req_http_scheme: Counter,
    pub req_https_scheme: Counter,

    pub req_vhost: CounterVec,
    pub req_port: CounterVec,
    pub req_method: CounterVec,
    pub req_version: CounterVec,
    pub req_ssl_proto: CounterVec,
    pub req_ssl_cipher_suite: CounterVec,

    pub req_proc_time: Summary,
    pub req_proc_time_hist: Option<Histogram>,
    pub upstream_resp_time: Summary,
    pub upstream_resp_time_hist: Option<Histogram>,

    pub req_url_ptn: CounterVec,
    /// URL 패턴 설정 순서와 같은 순서
    pub url_ptn_stats: Vec<PatternStats>,
    /// 사용자 정의 필드 설정 순서와 같은 순서: (필드 이름, 패턴별 카운터)
    pub req_custom_field: Vec<(String, CounterVec)>,
}

impl MetricData {
    /// 패턴 이름을 미리 채운 메트릭 상태를 생성합니다.
    ///
    /// `histogram`이 비어 있으면 히스토그램을 만들지 않습니다.
    pub fn new(
        url_patterns: &[UserPattern],
        custom_fields: &[CustomField],
        histogram: &[f64],
    ) -> Result<Self, LogPipelineError> {
        let (req_proc_time_hist, upstream_resp_time_hist) = if histogram.is_empty() {
            (None, None)
        } else {
            (
                Some(Histogram::new(histogram)?),
                Some(Histogram::new(histogram)?),
            )
        };

        Ok(Self {
            requests: Counter::default(),
            req_unmatched: Counter::default(),
            resp_code: CounterVec::new(),
            resp_class: [Counter::default(); 5],
            req_success: Counter::default(),
            req_redirect: Counter::default(),
            req_bad: Counter::default(),
            req_error: Counter::default(),
            req_ipv4: Counter::default(),
            req_ipv6: Counter::default(),
            uniq_ipv4: UniqueCounter::new(),
            uniq_ipv6: UniqueCounter::new(),
            bytes_sent: Counter::default(),
            bytes_received: Counter::default(),
            req_http_scheme: Counter::default(),
            req_https_scheme: Counter::default(),
            req_vhost: CounterVec::new(),
            req_port: CounterVec::new(),
            req_method: CounterVec::new(),
            req_version: CounterVec::new(),
            req_ssl_proto: CounterVec::new(),
            req_ssl_cipher_suite: CounterVec::new(),
            req_proc_time: Summary::new(),
            req_proc_time_hist,
            upstream_resp_time: Summary::new(),
            upstream_resp_time_hist,
            req_url_ptn: CounterVec::seeded(url_patterns.iter().map(|p| p.name.as_str())),
            url_ptn_stats: url_patterns
                .iter()
                .map(|p| PatternStats::new(&p.name))
                .collect(),
            req_custom_field: custom_fields
                .iter()
                .map(|f| {
                    (
                        f.name.clone(),
                        CounterVec::seeded(f.patterns.iter().map(|p| p.name.as_str())),
                    )
                })
                .collect(),
        })
    }

    /// 주기 단위 값(고유값 카운터, 요약, 패턴별 요약)을 초기화합니다.
    pub fn reset(&mut self) {
        self.uniq_ipv4.reset();
        self.uniq_ipv6.reset();
        self.req_proc_time.reset();
        self.upstream_resp_time.reset();
        for stats in &mut self.url_ptn_stats {
            stats.req_proc_time.reset();
        }
    }

    /// 모든 메트릭을 평탄한 키로 기록합니다. 시간 값은 밀리초입니다.
    pub fn write_to(&self, out: &mut Snapshot) {
        self.requests.write_to(out, "requests", 1, 1);
        self.req_unmatched.write_to(out, "req_unmatched", 1, 1);

        self.resp_code.write_to(out, "resp_code", 1, 1);
        for (i, counter) in self.resp_class.iter().enumerate() {
            counter.write_to(out, &format!("resp_{}xx", i + 1), 1, 1);
        }
        self.req_success.write_to(out, "req_success", 1, 1);
        self.req_redirect.write_to(out, "req_redirect", 1, 1);
        self.req_bad.write_to(out, "req_bad", 1, 1);
        self.req_error.write_to(out, "req_error", 1, 1);

        self.req_ipv4.write_to(out, "req_ipv4", 1, 1);
        self.req_ipv6.write_to(out, "req_ipv6", 1, 1);
        self.uniq_ipv4.write_to(out, "uniq_ipv4", 1, 1);
        self.uniq_ipv6.write_to(out, "uniq_ipv6", 1, 1);

        self.bytes_sent.write_to(out, "bytes_sent", 1, 1);
        self.bytes_received.write_to(out, "bytes_received", 1, 1);

        self.req_http_scheme.write_to(out, "req_http_scheme", 1, 1);
        self.req_https_scheme.write_to(out, "req_https_scheme", 1, 1);

        self.req_vhost.write_to(out, "req_vhost", 1, 1);
        self.req_port.write_to(out, "req_port", 1, 1);
        self.req_method.write_to(out, "req_method", 1, 1);
        self.req_version.write_to(out, "req_version", 1, 1);
        self.req_ssl_proto.write_to(out, "req_ssl_proto", 1, 1);
        self.req_ssl_cipher_suite
            .write_to(out, "req_ssl_cipher_suite", 1, 1);

        self.req_proc_time
            .write_to(out, "req_proc_time", TIME_MUL, TIME_DIV);
        if let Some(hist) = &self.req_proc_time_hist {
            hist.write_to(out, "req_proc_time_hist", TIME_MUL, TIME_DIV);
        }
        self.upstream_resp_time
            .write_to(out, "upstream_resp_time", TIME_MUL, TIME_DIV);
        if let Some(hist) = &self.upstream_resp_time_hist {
            hist.write_to(out, "upstream_resp_time_hist", TIME_MUL, TIME_DIV);
        }

        self.req_url_ptn.write_to(out, "req_url_ptn", 1, 1);
        for stats in &self.url_ptn_stats {
            stats.write_to(out);
        }
        for (field, counters) in &self.req_custom_field {
            counters.write_to(out, &format!("custom_field_{field}"), 1, 1);
        }
    }

    /// 새 스냅샷을 만들어 반환합니다.
    pub fn snapshot(&self) -> Snapshot {
        let mut out = Snapshot::new();
        self.write_to(&mut out);
        out
    }
}

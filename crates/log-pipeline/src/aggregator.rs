//! 분류기 -- 검증된 라인 하나를 메트릭 상태에 반영
//!
//! 분류기는 에러를 반환하지 않습니다. 파싱/검증 실패는 호출자가
//! [`Aggregator::unmatched`]로 집계합니다.

use std::fmt::Write as _;

use crate::logline::LogLine;
use crate::metric::MetricData;
use crate::pattern::{CustomField, UserPattern};

/// 응답 코드 클래스 키 (`group_resp_codes`일 때 패턴별 코드 키로 사용)
const RESP_CLASS_KEYS: [&str; 5] = ["1xx", "2xx", "3xx", "4xx", "5xx"];

/// 라인 분류기
#[derive(Debug, Clone)]
pub struct Aggregator {
    url_patterns: Vec<UserPattern>,
    custom_fields: Vec<CustomField>,
    group_resp_codes: bool,
    status_buf: String,
}

impl Aggregator {
    /// 패턴 목록으로 분류기를 생성합니다.
    pub fn new(
        url_patterns: Vec<UserPattern>,
        custom_fields: Vec<CustomField>,
        group_resp_codes: bool,
    ) -> Self {
        Self {
            url_patterns,
            custom_fields,
            group_resp_codes,
            status_buf: String::with_capacity(3),
        }
    }

    /// URL 패턴 목록
    pub fn url_patterns(&self) -> &[UserPattern] {
        &self.url_patterns
    }

    /// 사용자 정의 필드 목록
    pub fn custom_fields(&self) -> &[CustomField] {
        &self.custom_fields
    }

    /// 이 분류기에 맞는 빈 메트릭 상태를 만듭니다.
    pub fn new_data(&self, histogram: &[f64]) -> Result<MetricData, crate::error::LogPipelineError> {
        MetricData::new(&self.url_patterns, &self.custom_fields, histogram)
    }

    /// 파싱/검증에 실패한 라인을 집계합니다.
    pub fn unmatched(&self, data: &mut MetricData) {
        data.req_unmatched.inc();
    }

    /// 검증을 통과한 라인을 반영합니다.
    pub fn observe(&mut self, line: &LogLine, data: &mut MetricData) {
        data.requests.inc();

        let status = line.resp_status();
        if let Some(status) = status {
            self.observe_status(status, data);
        }

        if let Some(addr) = line.client_addr() {
            if addr.contains(':') {
                data.req_ipv6.inc();
                data.uniq_ipv6.insert(addr);
            } else {
                data.req_ipv4.inc();
                data.uniq_ipv4.insert(addr);
            }
        }

        if let Some(v) = line.vhost() {
            data.req_vhost.inc(v);
        }
        if let Some(v) = line.port() {
            data.req_port.inc(v);
        }
        if let Some(v) = line.req_method() {
            data.req_method.inc(v);
        }
        if let Some(v) = line.req_http_version() {
            data.req_version.inc(v);
        }
        match line.req_scheme() {
            Some("http") => data.req_http_scheme.inc(),
            Some("https") => data.req_https_scheme.inc(),
            _ => {}
        }
        if let Some(v) = line.ssl_proto() {
            data.req_ssl_proto.inc(v);
        }
        if let Some(v) = line.ssl_cipher_suite() {
            data.req_ssl_cipher_suite.inc(v);
        }

        if let Some(size) = line.req_size() {
            data.bytes_received.add(size);
        }
        if let Some(size) = line.resp_size() {
            data.bytes_sent.add(size);
        }

        if let Some(t) = line.resp_time() {
            data.req_proc_time.observe(t);
            if let Some(hist) = &mut data.req_proc_time_hist {
                hist.observe(t);
            }
        }
        if let Some(t) = line.upstream_resp_time() {
            data.upstream_resp_time.observe(t);
            if let Some(hist) = &mut data.upstream_resp_time_hist {
                hist.observe(t);
            }
        }

        if let Some(uri) = line.req_uri() {
            self.observe_url_patterns(uri, line, data);
        }

        for (field, counters) in self.custom_fields.iter().zip(&mut data.req_custom_field) {
            let Some(value) = line.custom_field(&field.name) else {
                continue;
            };
            for pattern in &field.patterns {
                if pattern.matcher.matches_str(value) {
                    counters.1.inc(&pattern.name);
                }
            }
        }
    }

    fn observe_status(&mut self, status: i64, data: &mut MetricData) {
        let class = (status / 100) as usize;
        if (1..=5).contains(&class) {
            data.resp_class[class - 1].inc();
        }
        match status {
            100..=299 => data.req_success.inc(),
            300..=399 => data.req_redirect.inc(),
            400..=499 => data.req_bad.inc(),
            500..=599 => data.req_error.inc(),
            _ => {}
        }
        self.status_buf.clear();
        let _ = write!(self.status_buf, "{status}");
        if !self.group_resp_codes {
            data.resp_code.inc(&self.status_buf);
        }
    }

    // status_buf는 observe_status가 채워 둔 상태입니다.
    fn observe_url_patterns(&self, uri: &str, line: &LogLine, data: &mut MetricData) {
        let Some(idx) = self
            .url_patterns
            .iter()
            .position(|p| p.matcher.matches_str(uri))
        else {
            return;
        };
        let name = &self.url_patterns[idx].name;
        data.req_url_ptn.inc(name);

        let Some(stats) = data.url_ptn_stats.get_mut(idx) else {
            return;
        };
        if let Some(status) = line.resp_status() {
            if self.group_resp_codes {
                let class = (status / 100) as usize;
                if let Some(key) = class.checked_sub(1).and_then(|i| RESP_CLASS_KEYS.get(i)) {
                    stats.resp_code.inc(key);
                }
            } else {
                stats.resp_code.inc(&self.status_buf);
            }
        }
        if let Some(size) = line.resp_size() {
            stats.bytes_sent.add(size);
        }
        if let Some(size) = line.req_size() {
            stats.bytes_received.add(size);
        }
        if let Some(t) = line.resp_time() {
            stats.req_proc_time.observe(t);
        }
    }
}

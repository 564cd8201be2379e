//! 로그 라인 레코드 -- 라인마다 재사용되는 타입 있는 가변 레코드
//!
//! [`LogLine`]은 파서가 토큰을 할당하는 대상입니다. 라인을 처리할 때마다
//! [`LogLine::reset`]으로 모든 필드를 "없음" 상태로 되돌리고 같은 인스턴스를
//! 다시 사용하므로, 텍스트 필드의 버퍼는 라인 사이에서 재할당되지 않습니다.
//!
//! "형식에 없음"과 "파싱했지만 0"은 구분됩니다. 크기 필드의 `-`는 0(있음)이 되고,
//! 상태 코드와 시간 필드, 요청 라인 전체의 `-`는 없음으로 남습니다.
//! 텍스트 필드의 `-`는 그대로 저장되어 [`LogLine::verify`]에서 걸러집니다.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::LineError;

/// 정규화된 필드 이름
pub mod field {
    /// 요청을 받은 서버 이름
    pub const VHOST: &str = "vhost";
    /// 클라이언트 주소
    pub const CLIENT_ADDR: &str = "client_addr";
    /// 서버 포트
    pub const PORT: &str = "port";
    /// 요청 스킴 (http, https)
    pub const REQ_SCHEME: &str = "req_scheme";
    /// `METHOD URI PROTOCOL` 형태의 요청 라인
    pub const REQUEST: &str = "request";
    /// 요청 메서드
    pub const REQ_METHOD: &str = "req_method";
    /// 요청 URI
    pub const REQ_URI: &str = "req_uri";
    /// 요청 프로토콜 (`HTTP/1.1`)
    pub const REQ_PROTOCOL: &str = "req_protocol";
    /// `req_protocol`의 별칭
    pub const PROTOCOL: &str = "protocol";
    /// 응답 상태 코드
    pub const RESP_STATUS: &str = "resp_status";
    /// 요청 크기 (바이트)
    pub const REQ_SIZE: &str = "req_size";
    /// 응답 크기 (바이트)
    pub const RESP_SIZE: &str = "resp_size";
    /// 응답 시간
    pub const RESP_TIME: &str = "resp_time";
    /// 업스트림 응답 시간
    pub const UPSTREAM_RESP_TIME: &str = "upstream_resp_time";
    /// SSL 프로토콜
    pub const SSL_PROTO: &str = "ssl_proto";
    /// SSL 암호 스위트
    pub const SSL_CIPHER_SUITE: &str = "ssl_cipher_suite";
    /// 분류 의미가 없는 자유 텍스트 필드
    pub const CUSTOM: &str = "custom";

    /// 모든 정규화된 필드 이름
    pub const ALL: &[&str] = &[
        VHOST,
        CLIENT_ADDR,
        PORT,
        REQ_SCHEME,
        REQUEST,
        REQ_METHOD,
        REQ_URI,
        REQ_PROTOCOL,
        PROTOCOL,
        RESP_STATUS,
        REQ_SIZE,
        RESP_SIZE,
        RESP_TIME,
        UPSTREAM_RESP_TIME,
        SSL_PROTO,
        SSL_CIPHER_SUITE,
        CUSTOM,
    ];

    /// 정규화된 필드 이름인지 확인합니다.
    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }
}

const HYPHEN: &str = "-";

/// 재사용 버퍼를 가진 텍스트 필드
#[derive(Debug, Clone, Default)]
struct TextField {
    buf: String,
    present: bool,
}

impl TextField {
    fn set(&mut self, value: &str) {
        self.buf.clear();
        self.buf.push_str(value);
        self.present = true;
    }

    fn clear(&mut self) {
        self.present = false;
    }

    fn get(&self) -> Option<&str> {
        self.present.then_some(self.buf.as_str())
    }
}

/// 파싱된 액세스 로그 라인
#[derive(Debug, Clone)]
pub struct LogLine {
    vhost: TextField,
    client_addr: TextField,
    port: TextField,
    req_scheme: TextField,
    req_method: TextField,
    req_uri: TextField,
    req_http_version: TextField,
    resp_status: Option<i64>,
    req_size: Option<i64>,
    resp_size: Option<i64>,
    resp_time: Option<f64>,
    upstream_resp_time: Option<f64>,
    ssl_proto: TextField,
    ssl_cipher_suite: TextField,
    custom: TextField,
    custom_fields: Vec<(String, TextField)>,
    time_scale: f64,
}

impl Default for LogLine {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LogLine {
    /// 시간 배율을 지정해 빈 레코드를 생성합니다.
    ///
    /// 초 단위 로그(nginx)는 1.0, 마이크로초 단위 로그(Apache `%D`)는 1e-6입니다.
    pub fn new(time_scale: f64) -> Self {
        Self {
            vhost: TextField::default(),
            client_addr: TextField::default(),
            port: TextField::default(),
            req_scheme: TextField::default(),
            req_method: TextField::default(),
            req_uri: TextField::default(),
            req_http_version: TextField::default(),
            resp_status: None,
            req_size: None,
            resp_size: None,
            resp_time: None,
            upstream_resp_time: None,
            ssl_proto: TextField::default(),
            ssl_cipher_suite: TextField::default(),
            custom: TextField::default(),
            custom_fields: Vec::new(),
            time_scale,
        }
    }

    /// 사용자 정의 필드 이름을 등록합니다. 등록된 이름만 할당할 수 있습니다.
    pub fn with_custom_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.custom_fields.iter().any(|(n, _)| *n == name) {
                self.custom_fields.push((name, TextField::default()));
            }
        }
        self
    }

    /// 시간 배율
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// 모든 필드를 없음 상태로 되돌립니다. 버퍼는 유지합니다.
    pub fn reset(&mut self) {
        self.vhost.clear();
        self.client_addr.clear();
        self.port.clear();
        self.req_scheme.clear();
        self.req_method.clear();
        self.req_uri.clear();
        self.req_http_version.clear();
        self.resp_status = None;
        self.req_size = None;
        self.resp_size = None;
        self.resp_time = None;
        self.upstream_resp_time = None;
        self.ssl_proto.clear();
        self.ssl_cipher_suite.clear();
        self.custom.clear();
        for (_, value) in &mut self.custom_fields {
            value.clear();
        }
    }

    /// 필드 이름에 따라 값을 할당합니다.
    ///
    /// 알 수 없는 이름은 무시합니다. 형식 문자열의 `$http_referer` 같은 토큰이
    /// 여기에 해당합니다.
    pub fn assign(&mut self, name: &str, value: &str) -> Result<(), LineError> {
        match name {
            field::VHOST => self.vhost.set(value),
            field::CLIENT_ADDR => self.client_addr.set(value),
            field::PORT => self.port.set(value),
            field::REQ_SCHEME => self.req_scheme.set(value),
            field::REQUEST => self.assign_request(value)?,
            field::REQ_METHOD => self.req_method.set(value),
            field::REQ_URI => self.req_uri.set(value),
            field::REQ_PROTOCOL | field::PROTOCOL => self.assign_protocol(value)?,
            field::RESP_STATUS => self.resp_status = parse_status(value)?,
            field::REQ_SIZE => self.req_size = Some(parse_size(field::REQ_SIZE, value)?),
            field::RESP_SIZE => self.resp_size = Some(parse_size(field::RESP_SIZE, value)?),
            field::RESP_TIME => {
                self.resp_time = parse_time(field::RESP_TIME, value, self.time_scale)?;
            }
            field::UPSTREAM_RESP_TIME => {
                let first = value.split([',', ':']).next().unwrap_or(value).trim();
                self.upstream_resp_time =
                    parse_time(field::UPSTREAM_RESP_TIME, first, self.time_scale)?;
            }
            field::SSL_PROTO => self.ssl_proto.set(value),
            field::SSL_CIPHER_SUITE => self.ssl_cipher_suite.set(value),
            field::CUSTOM => self.custom.set(value),
            other => {
                if let Some((_, slot)) = self.custom_fields.iter_mut().find(|(n, _)| n == other) {
                    slot.set(value);
                }
            }
        }
        Ok(())
    }

    fn assign_request(&mut self, request: &str) -> Result<(), LineError> {
        if request == HYPHEN {
            return Ok(());
        }
        let invalid = || LineError::InvalidRequest(request.to_owned());
        let (method, rest) = request.split_once(' ').ok_or_else(invalid)?;
        let (uri, proto) = rest.split_once(' ').ok_or_else(invalid)?;
        self.req_method.set(method);
        self.req_uri.set(uri);
        self.assign_protocol(proto)
    }

    fn assign_protocol(&mut self, proto: &str) -> Result<(), LineError> {
        match proto.strip_prefix("HTTP/") {
            Some(version) if !version.is_empty() => {
                self.req_http_version.set(version);
                Ok(())
            }
            _ => Err(LineError::InvalidProtocol(proto.to_owned())),
        }
    }

    /// 필드 값을 검증합니다.
    ///
    /// 필수 필드 `resp_status`(100..=599)를 먼저 확인하고, 값이 있는 선택 필드를
    /// 각각의 문자 규칙 또는 범위로 확인합니다.
    pub fn verify(&self) -> Result<(), LineError> {
        let status = self.resp_status.ok_or(LineError::MissingStatus)?;
        if !(100..600).contains(&status) {
            return Err(LineError::InvalidStatus(status));
        }

        check_text(field::VHOST, self.vhost(), is_valid_vhost)?;
        check_text(field::CLIENT_ADDR, self.client_addr(), is_valid_client_addr)?;
        check_text(field::REQ_METHOD, self.req_method(), is_valid_method)?;
        check_text(field::REQ_URI, self.req_uri(), is_valid_uri)?;
        check_text(field::REQ_PROTOCOL, self.req_http_version(), is_valid_version)?;

        for (name, value) in [
            (field::REQ_SIZE, self.req_size),
            (field::RESP_SIZE, self.resp_size),
        ] {
            if let Some(v) = value
                && v < 0
            {
                return Err(LineError::InvalidField {
                    field: name,
                    value: v.to_string(),
                });
            }
        }
        for (name, value) in [
            (field::RESP_TIME, self.resp_time),
            (field::UPSTREAM_RESP_TIME, self.upstream_resp_time),
        ] {
            if let Some(v) = value
                && v < 0.0
            {
                return Err(LineError::InvalidField {
                    field: name,
                    value: v.to_string(),
                });
            }
        }
        Ok(())
    }

    /// vhost
    pub fn vhost(&self) -> Option<&str> {
        self.vhost.get()
    }

    /// 클라이언트 주소
    pub fn client_addr(&self) -> Option<&str> {
        self.client_addr.get()
    }

    /// 서버 포트
    pub fn port(&self) -> Option<&str> {
        self.port.get()
    }

    /// 요청 스킴
    pub fn req_scheme(&self) -> Option<&str> {
        self.req_scheme.get()
    }

    /// 요청 메서드
    pub fn req_method(&self) -> Option<&str> {
        self.req_method.get()
    }

    /// 요청 URI
    pub fn req_uri(&self) -> Option<&str> {
        self.req_uri.get()
    }

    /// HTTP 버전 (`HTTP/` 뒤 부분)
    pub fn req_http_version(&self) -> Option<&str> {
        self.req_http_version.get()
    }

    /// 응답 상태 코드
    pub fn resp_status(&self) -> Option<i64> {
        self.resp_status
    }

    /// 요청 크기
    pub fn req_size(&self) -> Option<i64> {
        self.req_size
    }

    /// 응답 크기
    pub fn resp_size(&self) -> Option<i64> {
        self.resp_size
    }

    /// 응답 시간 (초, 배율 적용 후)
    pub fn resp_time(&self) -> Option<f64> {
        self.resp_time
    }

    /// 업스트림 응답 시간 (초, 배율 적용 후)
    pub fn upstream_resp_time(&self) -> Option<f64> {
        self.upstream_resp_time
    }

    /// SSL 프로토콜
    pub fn ssl_proto(&self) -> Option<&str> {
        self.ssl_proto.get()
    }

    /// SSL 암호 스위트
    pub fn ssl_cipher_suite(&self) -> Option<&str> {
        self.ssl_cipher_suite.get()
    }

    /// `custom` 필드
    pub fn custom(&self) -> Option<&str> {
        self.custom.get()
    }

    /// 등록된 사용자 정의 필드 값
    pub fn custom_field(&self, name: &str) -> Option<&str> {
        self.custom_fields
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.get())
    }

    /// 등록된 사용자 정의 필드 이름인지 확인합니다.
    pub fn is_custom_field(&self, name: &str) -> bool {
        self.custom_fields.iter().any(|(n, _)| n == name)
    }

    pub fn has_vhost(&self) -> bool {
        self.vhost.present
    }

    pub fn has_client_addr(&self) -> bool {
        self.client_addr.present
    }

    pub fn has_port(&self) -> bool {
        self.port.present
    }

    pub fn has_req_scheme(&self) -> bool {
        self.req_scheme.present
    }

    pub fn has_req_method(&self) -> bool {
        self.req_method.present
    }

    pub fn has_req_uri(&self) -> bool {
        self.req_uri.present
    }

    pub fn has_req_http_version(&self) -> bool {
        self.req_http_version.present
    }

    pub fn has_resp_status(&self) -> bool {
        self.resp_status.is_some()
    }

    pub fn has_req_size(&self) -> bool {
        self.req_size.is_some()
    }

    pub fn has_resp_size(&self) -> bool {
        self.resp_size.is_some()
    }

    pub fn has_resp_time(&self) -> bool {
        self.resp_time.is_some()
    }

    pub fn has_upstream_resp_time(&self) -> bool {
        self.upstream_resp_time.is_some()
    }

    pub fn has_ssl_proto(&self) -> bool {
        self.ssl_proto.present
    }

    pub fn has_ssl_cipher_suite(&self) -> bool {
        self.ssl_cipher_suite.present
    }

    pub fn has_custom(&self) -> bool {
        self.custom.present
    }
}

fn parse_status(value: &str) -> Result<Option<i64>, LineError> {
    if value == HYPHEN {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| LineError::InvalidNumber {
            field: field::RESP_STATUS,
            value: value.to_owned(),
        })
}

fn parse_size(name: &'static str, value: &str) -> Result<i64, LineError> {
    if value == HYPHEN {
        return Ok(0);
    }
    value.parse::<i64>().map_err(|_| LineError::InvalidNumber {
        field: name,
        value: value.to_owned(),
    })
}

fn parse_time(name: &'static str, value: &str, scale: f64) -> Result<Option<f64>, LineError> {
    if value == HYPHEN {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v * scale)),
        _ => Err(LineError::InvalidNumber {
            field: name,
            value: value.to_owned(),
        }),
    }
}

fn check_text(
    name: &'static str,
    value: Option<&str>,
    valid: fn(&str) -> bool,
) -> Result<(), LineError> {
    match value {
        Some(v) if !valid(v) => Err(LineError::InvalidField {
            field: name,
            value: v.to_owned(),
        }),
        _ => Ok(()),
    }
}

// `\s`와 `\d`는 ASCII 문자 집합으로 풀어 씁니다.
static VHOST_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-zA-Z0-9.:-]+$"));
static CLIENT_ADDR_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^([0-9a-f.:]+|localhost)$"));
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[A-Z]+$"));
static URI_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^/[^\t\n\x0C\r ]*$"));
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^[0-9]+(\.[0-9]+)?$"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("field pattern is a valid constant regex")
}

fn is_valid_vhost(s: &str) -> bool {
    VHOST_RE.is_match(s)
}

fn is_valid_client_addr(s: &str) -> bool {
    CLIENT_ADDR_RE.is_match(s)
}

fn is_valid_method(s: &str) -> bool {
    METHOD_RE.is_match(s)
}

fn is_valid_uri(s: &str) -> bool {
    URI_RE.is_match(s)
}

fn is_valid_version(s: &str) -> bool {
    VERSION_RE.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line() -> LogLine {
        LogLine::new(1.0)
    }

    fn assert_all_absent(l: &LogLine) {
        assert!(!l.has_vhost());
        assert!(!l.has_client_addr());
        assert!(!l.has_port());
        assert!(!l.has_req_scheme());
        assert!(!l.has_req_method());
        assert!(!l.has_req_uri());
        assert!(!l.has_req_http_version());
        assert!(!l.has_resp_status());
        assert!(!l.has_req_size());
        assert!(!l.has_resp_size());
        assert!(!l.has_resp_time());
        assert!(!l.has_upstream_resp_time());
        assert!(!l.has_ssl_proto());
        assert!(!l.has_ssl_cipher_suite());
        assert!(!l.has_custom());
    }

    #[test]
    fn new_line_has_no_fields() {
        assert_all_absent(&line());
    }

    #[test]
    fn reset_clears_every_field() {
        let mut l = line().with_custom_fields(["ua"]);
        l.assign("vhost", "example.com").unwrap();
        l.assign("client_addr", "1.2.3.4").unwrap();
        l.assign("port", "443").unwrap();
        l.assign("req_scheme", "https").unwrap();
        l.assign("request", "GET / HTTP/1.1").unwrap();
        l.assign("resp_status", "200").unwrap();
        l.assign("req_size", "10").unwrap();
        l.assign("resp_size", "20").unwrap();
        l.assign("resp_time", "0.5").unwrap();
        l.assign("upstream_resp_time", "0.4").unwrap();
        l.assign("ssl_proto", "TLSv1.3").unwrap();
        l.assign("ssl_cipher_suite", "TLS_AES_128_GCM_SHA256").unwrap();
        l.assign("custom", "x").unwrap();
        l.assign("ua", "curl/8.0").unwrap();

        l.reset();
        assert_all_absent(&l);
        assert_eq!(l.custom_field("ua"), None);
        assert!(l.is_custom_field("ua"));
    }

    #[test]
    fn request_is_split_into_three_parts() {
        let mut l = line();
        l.assign("request", "GET /api?x=1 HTTP/1.1").unwrap();
        assert_eq!(l.req_method(), Some("GET"));
        assert_eq!(l.req_uri(), Some("/api?x=1"));
        assert_eq!(l.req_http_version(), Some("1.1"));
    }

    #[test]
    fn request_hyphen_is_omitted() {
        let mut l = line();
        l.assign("request", "-").unwrap();
        assert!(!l.has_req_method());
        assert!(!l.has_req_uri());
    }

    #[test]
    fn request_with_too_few_parts_fails() {
        let mut l = line();
        assert_eq!(
            l.assign("request", "GET /"),
            Err(LineError::InvalidRequest("GET /".to_owned()))
        );
        assert!(l.assign("request", "GET").is_err());
    }

    #[test]
    fn protocol_must_start_with_http() {
        let mut l = line();
        l.assign("req_protocol", "HTTP/2.0").unwrap();
        assert_eq!(l.req_http_version(), Some("2.0"));
        assert!(l.assign("req_protocol", "HTTP/").is_err());
        assert!(l.assign("protocol", "SPDY/3").is_err());
        assert!(l.assign("request", "GET / FTP/1.0").is_err());
    }

    #[test]
    fn protocol_hyphen_is_rejected() {
        let mut l = line();
        assert_eq!(
            l.assign("req_protocol", "-"),
            Err(LineError::InvalidProtocol("-".to_owned()))
        );
        assert!(!l.has_req_http_version());
        assert_eq!(
            l.assign("request", "GET / -"),
            Err(LineError::InvalidProtocol("-".to_owned()))
        );
    }

    #[test]
    fn text_hyphen_is_kept_and_rejected_by_verify() {
        for name in ["vhost", "client_addr", "req_method", "req_uri"] {
            let mut l = line();
            l.assign("resp_status", "200").unwrap();
            l.assign(name, "-").unwrap();
            assert_eq!(
                l.verify(),
                Err(LineError::InvalidField {
                    field: name,
                    value: "-".to_owned(),
                }),
                "{name}"
            );
        }

        let mut l = line().with_custom_fields(["ua"]);
        l.assign("ssl_proto", "-").unwrap();
        l.assign("ua", "-").unwrap();
        assert_eq!(l.ssl_proto(), Some("-"));
        assert_eq!(l.custom_field("ua"), Some("-"));
    }

    #[test]
    fn status_hyphen_is_absent() {
        let mut l = line();
        l.assign("resp_status", "-").unwrap();
        assert!(!l.has_resp_status());
        assert_eq!(l.verify(), Err(LineError::MissingStatus));
    }

    #[test]
    fn status_must_be_a_number() {
        let mut l = line();
        assert!(matches!(
            l.assign("resp_status", "OK"),
            Err(LineError::InvalidNumber { field: "resp_status", .. })
        ));
    }

    #[test]
    fn sizes_hyphen_becomes_zero() {
        let mut l = line();
        l.assign("req_size", "-").unwrap();
        l.assign("resp_size", "-").unwrap();
        assert_eq!(l.req_size(), Some(0));
        assert_eq!(l.resp_size(), Some(0));
        assert!(l.assign("resp_size", "1k").is_err());
    }

    #[test]
    fn times_are_scaled() {
        let mut l = LogLine::new(0.000_001);
        l.assign("resp_time", "250000").unwrap();
        let t = l.resp_time().unwrap();
        assert!((t - 0.25).abs() < 1e-9);

        l.assign("resp_time", "-").unwrap();
        assert!(!l.has_resp_time());
        assert!(l.assign("resp_time", "NaN").is_err());
    }

    #[test]
    fn upstream_time_keeps_first_element() {
        let mut l = line();
        l.assign("upstream_resp_time", "0.034, 0.055").unwrap();
        assert_eq!(l.upstream_resp_time(), Some(0.034));
        l.assign("upstream_resp_time", "0.012 : 0.100").unwrap();
        assert_eq!(l.upstream_resp_time(), Some(0.012));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut l = line();
        l.assign("http_referer", "https://example.com/").unwrap();
        assert_all_absent(&l);
    }

    #[test]
    fn custom_fields_must_be_registered() {
        let mut l = line().with_custom_fields(["ua", "ua"]);
        l.assign("ua", "curl/8.0").unwrap();
        l.assign("other", "ignored").unwrap();
        assert_eq!(l.custom_field("ua"), Some("curl/8.0"));
        assert_eq!(l.custom_field("other"), None);
    }

    #[test]
    fn verify_checks_status_range() {
        let mut l = line();
        l.assign("resp_status", "99").unwrap();
        assert_eq!(l.verify(), Err(LineError::InvalidStatus(99)));
        l.assign("resp_status", "600").unwrap();
        assert_eq!(l.verify(), Err(LineError::InvalidStatus(600)));
        l.assign("resp_status", "599").unwrap();
        assert!(l.verify().is_ok());
        l.assign("resp_status", "100").unwrap();
        assert!(l.verify().is_ok());
    }

    #[test]
    fn verify_checks_optional_fields() {
        let cases = [
            ("vhost", "bad host"),
            ("client_addr", "10.0.0.X"),
            ("req_method", "get"),
            ("req_uri", "api"),
            ("req_uri", "/a b"),
            ("req_size", "-1"),
            ("resp_size", "-5"),
            ("resp_time", "-0.1"),
            ("upstream_resp_time", "-1"),
        ];
        for (name, value) in cases {
            let mut l = line();
            l.assign("resp_status", "200").unwrap();
            l.assign(name, value).unwrap();
            assert!(
                matches!(l.verify(), Err(LineError::InvalidField { .. })),
                "{name}={value}"
            );
        }
    }

    #[test]
    fn verify_accepts_valid_fields() {
        let mut l = line();
        l.assign("resp_status", "304").unwrap();
        l.assign("vhost", "api.example.com:8080").unwrap();
        l.assign("client_addr", "2001:db8::1").unwrap();
        l.assign("request", "POST /v1/items HTTP/2").unwrap();
        assert!(l.verify().is_ok());

        l.assign("client_addr", "localhost").unwrap();
        assert!(l.verify().is_ok());
    }

    #[test]
    fn uri_rule_rejects_ascii_whitespace_only() {
        assert!(is_valid_uri("/"));
        assert!(is_valid_uri("/a?b=c&d=%20"));
        assert!(!is_valid_uri("/a\tb"));
        assert!(!is_valid_uri("/a\rb"));
        assert!(!is_valid_uri("a/b"));
        assert!(is_valid_uri("/a\u{a0}b"));
    }

    #[test]
    fn vhost_and_addr_rules() {
        assert!(is_valid_vhost("my-host.example.com:8080"));
        assert!(!is_valid_vhost(""));
        assert!(is_valid_client_addr("::1"));
        assert!(!is_valid_client_addr("::G"));
        assert!(!is_valid_method("GeT"));
    }

    #[test]
    fn version_rule() {
        assert!(is_valid_version("1.1"));
        assert!(is_valid_version("2"));
        assert!(!is_valid_version("1."));
        assert!(!is_valid_version("1.1.1"));
        assert!(!is_valid_version(""));
    }

    proptest! {
        #[test]
        fn reset_always_clears(status in 100i64..600, size in 0i64..1_000_000, uri in "/[a-z0-9/]{0,20}") {
            let mut l = line();
            l.assign("resp_status", &status.to_string()).unwrap();
            l.assign("resp_size", &size.to_string()).unwrap();
            l.assign("req_uri", &uri).unwrap();
            prop_assert!(l.verify().is_ok());
            prop_assert!(l.has_resp_status() && l.has_resp_size() && l.has_req_uri());
            l.reset();
            prop_assert!(!l.has_resp_status() && !l.has_resp_size() && !l.has_req_uri());
        }

        #[test]
        fn assign_never_panics(name in "[a-z_]{1,20}", value in "\\PC{0,30}") {
            let mut l = line();
            let _ = l.assign(&name, &value);
            let _ = l.verify();
        }
    }
}

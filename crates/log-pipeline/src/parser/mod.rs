//! 로그 파싱 모듈 -- CSV, 정규식, LTSV, JSON 형식별 파서
//!
//! 모든 파서는 [`LogParser`] trait을 구현합니다. 파서는 라인 소스를 소유하고
//! [`LogParser::read_line`]으로 다음 라인을 읽어 [`LogLine`]에 할당합니다.
//!
//! # 지원 형식
//! - CSV 프레이밍 ([`CsvParser`]) -- nginx `log_format`, Apache `LogFormat` 문자열
//! - 명명된 캡처 정규식 ([`RegexParser`])
//! - LTSV ([`LtsvParser`])
//! - 평탄/중첩 JSON 객체 ([`JsonParser`])
//! - 자동 감지 ([`LogType::Auto`]) -- 첫 라인으로 형식을 추정
//!
//! # 사용 예시
//! ```ignore
//! use weblog_log_pipeline::parser::{new_parser, LogType};
//!
//! let source: LineSource = Box::new(std::io::BufReader::new(file));
//! let mut parser = new_parser(&config, &[], source)?;
//! let mut line = LogLine::new(1.0);
//! while parser.read_line(&mut line)? {
//!     line.verify()?;
//! }
//! ```

pub mod csv;
pub mod json;
pub mod ltsv;
pub mod regex;

pub use self::csv::{CsvFormat, CsvParser, CsvParserConfig, FieldCheck};
pub use self::json::JsonParser;
pub use self::ltsv::LtsvParser;
pub use self::regex::RegexParser;

use std::fmt;
use std::io::{self, BufRead, Cursor, Read};
use std::str::FromStr;

use tracing::debug;
use weblog_core::config::{CsvConfig, ParserConfig};

use crate::error::LogPipelineError;
use crate::logline::{LogLine, field};

/// 바이트 지향 라인 소스
pub type LineSource = Box<dyn BufRead + Send>;

/// 로그 파서 trait
///
/// `read_line`은 소스가 끝나면 `Ok(false)`를 반환합니다.
/// 구조적으로 잘못된 라인은 `Parse` 에러, 소스 읽기 실패는 `Io` 에러입니다.
pub trait LogParser: Send {
    /// 형식 이름 (csv, regex, ltsv, json)
    fn format_name(&self) -> &'static str;

    /// 소스에서 다음 라인을 읽어 `line`에 할당합니다.
    fn read_line(&mut self, line: &mut LogLine) -> Result<bool, LogPipelineError>;

    /// 원시 라인 하나를 파싱해 `line`에 할당합니다.
    fn parse(&mut self, raw: &[u8], line: &mut LogLine) -> Result<(), LogPipelineError>;

    /// 진단용 설명 (예: `csv: $remote_addr ...`)
    fn info(&self) -> String;
}

/// 로그 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    /// 첫 라인으로 추정
    Auto,
    /// CSV 프레이밍
    Csv,
    /// 명명된 캡처 정규식
    Regex,
    /// LTSV
    Ltsv,
    /// JSON
    Json,
}

impl FromStr for LogType {
    type Err = LogPipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "csv" => Ok(Self::Csv),
            "regex" => Ok(Self::Regex),
            "ltsv" => Ok(Self::Ltsv),
            "json" => Ok(Self::Json),
            other => Err(LogPipelineError::config(
                "parser.log_type",
                format!("unknown log type '{other}', expected one of: auto, csv, regex, ltsv, json"),
            )),
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::Csv => "csv",
            Self::Regex => "regex",
            Self::Ltsv => "ltsv",
            Self::Json => "json",
        };
        f.write_str(s)
    }
}

/// 서버 변수/레이블 이름을 정규화된 필드 이름으로 바꿉니다.
///
/// nginx 변수 이름(`remote_addr`, `status`, ...)과 정규화된 이름 자체를 받습니다.
pub fn canonical_field(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "host" | "http_host" | "server_name" => field::VHOST,
        "remote_addr" => field::CLIENT_ADDR,
        "server_port" => field::PORT,
        "scheme" => field::REQ_SCHEME,
        "request_method" => field::REQ_METHOD,
        "request_uri" => field::REQ_URI,
        "server_protocol" => field::REQ_PROTOCOL,
        "status" => field::RESP_STATUS,
        "request_length" => field::REQ_SIZE,
        "bytes_sent" | "body_bytes_sent" => field::RESP_SIZE,
        "request_time" => field::RESP_TIME,
        "upstream_response_time" => field::UPSTREAM_RESP_TIME,
        "ssl_protocol" => field::SSL_PROTO,
        "ssl_cipher" => field::SSL_CIPHER_SUITE,
        other => return field::ALL.iter().copied().find(|f| *f == other),
    };
    Some(canonical)
}

/// 형식에서 시간 배율을 추정합니다. Apache `%D`(마이크로초)만 1e-6입니다.
///
/// 토큰은 설정된 CSV 구분자로 나눕니다.
pub fn default_time_scale(log_type: LogType, csv: &CsvConfig) -> f64 {
    if log_type != LogType::Csv {
        return 1.0;
    }
    let is_micros = |t: &str| t.trim().trim_matches('"') == "%D";
    let found = match csv.delimiter.chars().next() {
        Some(delim) => csv.format.split(delim).any(is_micros),
        None => csv.format.split_whitespace().any(is_micros),
    };
    if found { 0.000_001 } else { 1.0 }
}

/// 설정에 맞는 파서를 생성합니다.
///
/// `Auto`는 소스의 첫 라인을 읽어 형식을 고른 뒤, 그 라인을 다시 소스 앞에 붙여
/// 첫 라인도 집계되도록 합니다.
pub fn new_parser(
    config: &ParserConfig,
    custom_fields: &[String],
    source: LineSource,
) -> Result<Box<dyn LogParser>, LogPipelineError> {
    let log_type: LogType = config.log_type.parse()?;
    let parser: Box<dyn LogParser> = match log_type {
        LogType::Csv => {
            let cfg = CsvParserConfig::weblog(&config.csv_config)?;
            Box::new(CsvParser::new(cfg, source)?)
        }
        LogType::Regex => Box::new(RegexParser::new(
            &config.regex_config.pattern,
            custom_fields,
            source,
        )?),
        LogType::Ltsv => Box::new(LtsvParser::new(&config.ltsv_config, custom_fields, source)?),
        LogType::Json => Box::new(JsonParser::new(&config.json_config, custom_fields, source)),
        LogType::Auto => guess_parser(config, custom_fields, source)?,
    };
    debug!(parser = %parser.info(), "log parser created");
    Ok(parser)
}

/// 자동 감지 시 순서대로 시도하는 CSV 형식 (열이 많은 형식부터)
pub const GUESS_CSV_FORMATS: &[&str] = &[
    r#"$host $remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent" $request_length $request_time $upstream_response_time"#,
    r#"$host $remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent" $request_length $request_time"#,
    r#"$host $remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent""#,
    r#"$host $remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent"#,
    r#"$remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent" $request_length $request_time $upstream_response_time"#,
    r#"$remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent" $request_length $request_time"#,
    r#"$remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent""#,
    r#"$remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent"#,
];

fn guess_parser(
    config: &ParserConfig,
    custom_fields: &[String],
    mut source: LineSource,
) -> Result<Box<dyn LogParser>, LogPipelineError> {
    let mut first = Vec::new();
    source.read_until(b'\n', &mut first)?;
    let sample = trim_line_end(&first).to_vec();
    if sample.is_empty() {
        return Err(LogPipelineError::config(
            "parser.log_type",
            "cannot guess log format: source is empty",
        ));
    }

    let replay: LineSource = Box::new(io::BufReader::new(Cursor::new(first).chain(source)));

    if sample.first() == Some(&b'{') {
        debug!("guessed json log format");
        return Ok(Box::new(JsonParser::new(
            &config.json_config,
            custom_fields,
            replay,
        )));
    }

    let ltsv = &config.ltsv_config;
    if looks_like_ltsv(&sample, ltsv.field_delimiter.as_bytes(), ltsv.value_delimiter.as_bytes()) {
        debug!("guessed ltsv log format");
        return Ok(Box::new(LtsvParser::new(ltsv, custom_fields, replay)?));
    }

    let guess_base = CsvParserConfig::weblog(&CsvConfig::default())?;
    for format in GUESS_CSV_FORMATS {
        let cfg = CsvParserConfig {
            format: (*format).to_owned(),
            ..guess_base.clone()
        };
        let mut probe = CsvParser::new(cfg.clone(), Box::new(io::empty()))?;
        let mut line = LogLine::new(1.0).with_custom_fields(custom_fields.iter().cloned());
        if probe.parse(&sample, &mut line).is_ok() && line.verify().is_ok() {
            debug!(format, "guessed csv log format");
            return Ok(Box::new(CsvParser::new(cfg, replay)?));
        }
    }

    Err(LogPipelineError::config(
        "parser.log_type",
        format!(
            "cannot guess log format from first line '{}'",
            String::from_utf8_lossy(&sample)
        ),
    ))
}

fn looks_like_ltsv(sample: &[u8], field_delim: &[u8], value_delim: &[u8]) -> bool {
    if field_delim.is_empty() || value_delim.is_empty() {
        return false;
    }
    let Ok(text) = std::str::from_utf8(sample) else {
        return false;
    };
    let (Ok(fd), Ok(vd)) = (std::str::from_utf8(field_delim), std::str::from_utf8(value_delim)) else {
        return false;
    };
    text.contains(fd) && text.split(fd).all(|pair| pair.contains(vd))
}

/// 줄 끝의 `\n`, `\r\n`을 제거합니다.
pub(crate) fn trim_line_end(mut raw: &[u8]) -> &[u8] {
    if let Some(rest) = raw.strip_suffix(b"\n") {
        raw = rest;
    }
    if let Some(rest) = raw.strip_suffix(b"\r") {
        raw = rest;
    }
    raw
}

/// 줄 단위 파서(정규식, LTSV, JSON)가 공유하는 라인 리더
pub(crate) struct LineReader {
    source: LineSource,
    buf: Vec<u8>,
}

impl fmt::Debug for LineReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineReader")
            .field("buffered", &self.buf.len())
            .finish_non_exhaustive()
    }
}

impl LineReader {
    pub(crate) fn new(source: LineSource) -> Self {
        Self {
            source,
            buf: Vec::with_capacity(512),
        }
    }

    /// 다음 비어 있지 않은 라인을 반환합니다. 소스가 끝나면 `None`입니다.
    pub(crate) fn next_line(&mut self) -> io::Result<Option<&[u8]>> {
        loop {
            self.buf.clear();
            if self.source.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            if !trim_line_end(&self.buf).is_empty() {
                break;
            }
        }
        Ok(Some(trim_line_end(&self.buf)))
    }
}

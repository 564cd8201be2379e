//! JSON 로그 파서
//!
//! 한 줄에 JSON 객체 하나인 로그(nginx `escape=json` 형식 등)를 파싱합니다.
//! 중첩 객체의 키는 dot notation(`request.method`)으로 평탄화한 뒤
//! 사용자 매핑, 사용자 정의 필드, nginx 변수 이름 순서로 필드에 대응시킵니다.
//!
//! # 사용 예시
//! ```ignore
//! use weblog_log_pipeline::parser::{JsonParser, LogParser};
//!
//! let mut parser = JsonParser::new(&JsonConfig::default(), &[], source);
//! let mut line = LogLine::default();
//! parser.parse(br#"{"remote_addr":"10.0.0.1","status":200}"#, &mut line)?;
//! assert_eq!(line.resp_status(), Some(200));
//! ```

use std::collections::BTreeMap;

use serde_json::Value;
use weblog_core::config::JsonConfig;

use super::{LineReader, LineSource, LogParser, canonical_field};
use crate::error::LogPipelineError;
use crate::logline::LogLine;

const FORMAT: &str = "json";

/// 기본 최대 입력 크기 (1MB)
pub const DEFAULT_MAX_INPUT_SIZE: usize = 1024 * 1024;

#[derive(Debug)]
struct Keys {
    mapping: BTreeMap<String, String>,
    custom_fields: Vec<String>,
    max_input_size: usize,
}

impl Keys {
    fn field_for<'a>(&'a self, path: &'a str) -> Option<&'a str> {
        if let Some(mapped) = self.mapping.get(path) {
            return Some(mapped.as_str());
        }
        if self.custom_fields.iter().any(|c| c == path) {
            return Some(path);
        }
        canonical_field(path)
    }

    fn fill(&self, raw: &[u8], line: &mut LogLine) -> Result<(), LogPipelineError> {
        if raw.len() > self.max_input_size {
            return Err(LogPipelineError::parse(
                FORMAT,
                format!(
                    "input too large: {} bytes (max: {})",
                    raw.len(),
                    self.max_input_size
                ),
            ));
        }

        let value: Value =
            serde_json::from_slice(raw).map_err(|e| LogPipelineError::parse_with(FORMAT, e))?;

        // 최상위가 JSON 객체여야 합니다
        if !value.is_object() {
            return Err(LogPipelineError::parse(
                FORMAT,
                "expected JSON object at top level",
            ));
        }

        let mut path = String::new();
        self.walk(&value, &mut path, line)
    }

    fn walk(&self, value: &Value, path: &mut String, line: &mut LogLine) -> Result<(), LogPipelineError> {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let len = path.len();
                    if len > 0 {
                        path.push('.');
                    }
                    path.push_str(key);
                    self.walk(child, path, line)?;
                    path.truncate(len);
                }
                Ok(())
            }
            Value::String(s) => self.assign(path, s, line),
            Value::Number(n) => self.assign(path, &n.to_string(), line),
            Value::Bool(b) => self.assign(path, if *b { "true" } else { "false" }, line),
            Value::Null | Value::Array(_) => Ok(()),
        }
    }

    fn assign(&self, path: &str, value: &str, line: &mut LogLine) -> Result<(), LogPipelineError> {
        match self.field_for(path) {
            Some(name) => line
                .assign(name, value)
                .map_err(|e| LogPipelineError::parse_with(FORMAT, e)),
            None => Ok(()),
        }
    }
}

/// JSON 로그 파서
#[derive(Debug)]
pub struct JsonParser {
    keys: Keys,
    reader: LineReader,
}

impl JsonParser {
    /// 키 매핑으로 새 파서를 생성합니다.
    pub fn new(config: &JsonConfig, custom_fields: &[String], source: LineSource) -> Self {
        Self {
            keys: Keys {
                mapping: config.mapping.clone(),
                custom_fields: custom_fields.to_vec(),
                max_input_size: DEFAULT_MAX_INPUT_SIZE,
            },
            reader: LineReader::new(source),
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.keys.max_input_size = size;
        self
    }
}

impl LogParser for JsonParser {
    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn read_line(&mut self, line: &mut LogLine) -> Result<bool, LogPipelineError> {
        match self.reader.next_line()? {
            Some(raw) => self.keys.fill(raw, line).map(|()| true),
            None => Ok(false),
        }
    }

    fn parse(&mut self, raw: &[u8], line: &mut LogLine) -> Result<(), LogPipelineError> {
        self.keys.fill(raw, line)
    }

    fn info(&self) -> String {
        format!("json: {} mapped keys", self.keys.mapping.len())
    }
}

//! LTSV(Labeled Tab-separated Values) 파서
//!
//! `label:value` 쌍을 탭으로 구분한 형식입니다. 레이블은 사용자 매핑,
//! LTSV 관례 이름, nginx 변수 이름 순서로 필드 이름에 대응됩니다.
//! 대응되지 않는 레이블은 무시합니다.

use std::collections::BTreeMap;

use weblog_core::config::LtsvConfig;

use super::{LineReader, LineSource, LogParser, canonical_field};
use crate::error::LogPipelineError;
use crate::logline::{LogLine, field};

const FORMAT: &str = "ltsv";

/// LTSV 관례 레이블 (ltsv.org 권장 이름)
fn conventional_label(label: &str) -> Option<&'static str> {
    let name = match label {
        "host" => field::CLIENT_ADDR,
        "vhost" => field::VHOST,
        "method" => field::REQ_METHOD,
        "uri" => field::REQ_URI,
        "protocol" => field::REQ_PROTOCOL,
        "status" => field::RESP_STATUS,
        "size" => field::RESP_SIZE,
        "reqsize" => field::REQ_SIZE,
        "reqtime" => field::RESP_TIME,
        "apptime" => field::UPSTREAM_RESP_TIME,
        _ => return None,
    };
    Some(name)
}

#[derive(Debug)]
struct Labels {
    field_delimiter: String,
    value_delimiter: String,
    mapping: BTreeMap<String, String>,
    custom_fields: Vec<String>,
}

impl Labels {
    fn field_for<'a>(&'a self, label: &'a str) -> Option<&'a str> {
        if let Some(mapped) = self.mapping.get(label) {
            return Some(mapped.as_str());
        }
        if self.custom_fields.iter().any(|c| c == label) {
            return Some(label);
        }
        conventional_label(label).or_else(|| canonical_field(label))
    }

    fn fill(&self, raw: &[u8], line: &mut LogLine) -> Result<(), LogPipelineError> {
        let text =
            std::str::from_utf8(raw).map_err(|e| LogPipelineError::parse_with(FORMAT, e))?;
        for pair in text.split(self.field_delimiter.as_str()) {
            if pair.is_empty() {
                continue;
            }
            let (label, value) = pair.split_once(self.value_delimiter.as_str()).ok_or_else(|| {
                LogPipelineError::parse(FORMAT, format!("missing value delimiter in '{pair}'"))
            })?;
            if let Some(name) = self.field_for(label) {
                line.assign(name, value)
                    .map_err(|e| LogPipelineError::parse_with(FORMAT, e))?;
            }
        }
        Ok(())
    }
}

/// LTSV 파서
#[derive(Debug)]
pub struct LtsvParser {
    labels: Labels,
    reader: LineReader,
}

impl LtsvParser {
    /// 구분자를 검증하고 파서를 생성합니다.
    pub fn new(
        config: &LtsvConfig,
        custom_fields: &[String],
        source: LineSource,
    ) -> Result<Self, LogPipelineError> {
        if config.field_delimiter.is_empty() {
            return Err(LogPipelineError::config(
                "parser.ltsv_config.field_delimiter",
                "must not be empty",
            ));
        }
        if config.value_delimiter.is_empty() {
            return Err(LogPipelineError::config(
                "parser.ltsv_config.value_delimiter",
                "must not be empty",
            ));
        }
        Ok(Self {
            labels: Labels {
                field_delimiter: config.field_delimiter.clone(),
                value_delimiter: config.value_delimiter.clone(),
                mapping: config.mapping.clone(),
                custom_fields: custom_fields.to_vec(),
            },
            reader: LineReader::new(source),
        })
    }
}

impl LogParser for LtsvParser {
    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn read_line(&mut self, line: &mut LogLine) -> Result<bool, LogPipelineError> {
        match self.reader.next_line()? {
            Some(raw) => self.labels.fill(raw, line).map(|()| true),
            None => Ok(false),
        }
    }

    fn parse(&mut self, raw: &[u8], line: &mut LogLine) -> Result<(), LogPipelineError> {
        self.labels.fill(raw, line)
    }

    fn info(&self) -> String {
        format!(
            "ltsv: field delimiter {:?}, value delimiter {:?}",
            self.labels.field_delimiter, self.labels.value_delimiter
        )
    }
}

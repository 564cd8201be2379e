//! 명명된 캡처 정규식 파서
//!
//! 캡처 그룹 이름이 곧 필드 이름입니다. 그룹 이름은 정규화된 필드 이름,
//! nginx 변수 이름, 또는 등록된 사용자 정의 필드 이름이어야 합니다.

use regex::{CaptureLocations, Regex};

use super::{LineReader, LineSource, LogParser, canonical_field};
use crate::error::LogPipelineError;
use crate::logline::LogLine;

const FORMAT: &str = "regex";

/// 정규식 파서
pub struct RegexParser {
    regex: Regex,
    locations: CaptureLocations,
    groups: Vec<(usize, String)>,
    reader: LineReader,
}

impl std::fmt::Debug for RegexParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexParser")
            .field("regex", &self.regex.as_str())
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

impl RegexParser {
    /// 정규식을 컴파일하고 그룹 이름을 검증합니다.
    pub fn new(
        pattern: &str,
        custom_fields: &[String],
        source: LineSource,
    ) -> Result<Self, LogPipelineError> {
        if pattern.is_empty() {
            return Err(LogPipelineError::config(
                "parser.regex_config.pattern",
                "empty pattern",
            ));
        }
        let regex = Regex::new(pattern)?;

        let mut groups = Vec::new();
        for (idx, name) in regex.capture_names().enumerate() {
            let Some(name) = name else { continue };
            let field = match canonical_field(name) {
                Some(canonical) => canonical.to_owned(),
                None if custom_fields.iter().any(|c| c == name) => name.to_owned(),
                None => {
                    return Err(LogPipelineError::config(
                        "parser.regex_config.pattern",
                        format!("unknown field in named group '{name}'"),
                    ));
                }
            };
            groups.push((idx, field));
        }
        if groups.is_empty() {
            return Err(LogPipelineError::config(
                "parser.regex_config.pattern",
                "pattern has no named groups",
            ));
        }

        Ok(Self {
            locations: regex.capture_locations(),
            regex,
            groups,
            reader: LineReader::new(source),
        })
    }
}

fn fill(
    regex: &Regex,
    locations: &mut CaptureLocations,
    groups: &[(usize, String)],
    raw: &[u8],
    line: &mut LogLine,
) -> Result<(), LogPipelineError> {
    let text = std::str::from_utf8(raw).map_err(|e| LogPipelineError::parse_with(FORMAT, e))?;
    if regex.captures_read(locations, text).is_none() {
        return Err(LogPipelineError::parse(FORMAT, "unmatched line"));
    }
    for (idx, name) in groups {
        if let Some((start, end)) = locations.get(*idx) {
            line.assign(name, &text[start..end])
                .map_err(|e| LogPipelineError::parse_with(FORMAT, e))?;
        }
    }
    Ok(())
}

impl LogParser for RegexParser {
    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn read_line(&mut self, line: &mut LogLine) -> Result<bool, LogPipelineError> {
        match self.reader.next_line()? {
            Some(raw) => fill(&self.regex, &mut self.locations, &self.groups, raw, line).map(|()| true),
            None => Ok(false),
        }
    }

    fn parse(&mut self, raw: &[u8], line: &mut LogLine) -> Result<(), LogPipelineError> {
        fill(&self.regex, &mut self.locations, &self.groups, raw, line)
    }

    fn info(&self) -> String {
        format!("regex: {}", self.regex.as_str())
    }
}

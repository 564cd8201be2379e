//! CSV 프레이밍 파서 -- nginx `log_format`, Apache `LogFormat` 문자열 기반
//!
//! 형식 문자열을 같은 구분자로 한 레코드로 토큰화해 필드 이름과 열 인덱스의
//! 대응표([`CsvFormat`])를 만든 뒤, 로그 라인마다 레코드 하나를 읽어 해당 열의
//! 값을 [`LogLine`]에 할당합니다.
//!
//! 형식 토큰 하나가 로그에서 여러 열을 차지하는 경우(예: `[$time_local]`은
//! 공백 때문에 두 열) 필드 검사 함수가 열 오프셋 보정값을 돌려줍니다.

use std::fmt;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim};
use weblog_core::config::CsvConfig;

use super::{LineSource, LogParser, canonical_field};
use crate::error::LogPipelineError;
use crate::logline::{LogLine, field};

const FORMAT: &str = "csv";

/// 형식 토큰 검사 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    /// 정규화된 필드 이름
    pub name: String,
    /// 이후 열 인덱스에 더할 보정값
    pub offset: i32,
    /// 열을 필드로 사용할지 여부
    pub valid: bool,
}

impl FieldCheck {
    fn accept(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset: 0,
            valid: true,
        }
    }

    fn skip(offset: i32) -> Self {
        Self {
            name: String::new(),
            offset,
            valid: false,
        }
    }
}

/// 형식 토큰 검사 함수
pub type CheckField = Arc<dyn Fn(&str) -> FieldCheck + Send + Sync>;

/// 기본 검사: `$`로 시작하고 두 글자 이상인 토큰을 이름 그대로 받습니다.
pub fn default_check_field(token: &str) -> FieldCheck {
    if token.len() >= 2 && token.starts_with('$') {
        FieldCheck::accept(token)
    } else {
        FieldCheck::skip(0)
    }
}

/// 웹 로그 검사: nginx 변수와 Apache 지시자를 정규화된 필드 이름으로 바꿉니다.
///
/// - `$`/`%` 접두사를 제거하고, 알려진 이름은 [`canonical_field`]로 매핑합니다.
/// - 모르는 이름(`$http_referer` 등)도 열로 인정합니다. 값은 할당 시 무시됩니다.
/// - 시간 토큰(`[$time_local]`, `$time_local`, `%t`)은 두 열을 차지하므로
///   오프셋 +1로 건너뜁니다.
pub fn check_weblog_field(token: &str) -> FieldCheck {
    if matches!(token, "[$time_local]" | "$time_local" | "%t") {
        return FieldCheck::skip(1);
    }
    if token.len() < 2 {
        return FieldCheck::skip(0);
    }

    if let Some(directive) = token.strip_prefix('%') {
        let name = match directive {
            "v" => field::VHOST,
            "a" | "h" => field::CLIENT_ADDR,
            "p" => field::PORT,
            "r" => field::REQUEST,
            "m" => field::REQ_METHOD,
            "U" => field::REQ_URI,
            "H" => field::REQ_PROTOCOL,
            "s" | ">s" => field::RESP_STATUS,
            "I" => field::REQ_SIZE,
            "O" | "B" | "b" => field::RESP_SIZE,
            "D" | "T" => field::RESP_TIME,
            other => return FieldCheck::accept(other),
        };
        return FieldCheck::accept(name);
    }

    match token.strip_prefix('$') {
        Some(var) => FieldCheck::accept(canonical_field(var).unwrap_or(var)),
        None => FieldCheck::skip(0),
    }
}

/// CSV 파서 설정
#[derive(Clone)]
pub struct CsvParserConfig {
    /// 구분자 (ASCII 한 바이트)
    pub delimiter: u8,
    /// 필드 앞뒤 공백 제거 여부
    pub trim_leading_space: bool,
    /// 형식 문자열
    pub format: String,
    /// 형식 토큰 검사 함수
    pub check_field: CheckField,
}

impl fmt::Debug for CsvParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvParserConfig")
            .field("delimiter", &(self.delimiter as char))
            .field("trim_leading_space", &self.trim_leading_space)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl CsvParserConfig {
    /// 공백 구분자와 기본 검사 함수로 설정을 생성합니다.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            delimiter: b' ',
            trim_leading_space: false,
            format: format.into(),
            check_field: Arc::new(default_check_field),
        }
    }

    /// 작업 설정에서 웹 로그용 파서 설정을 만듭니다.
    pub fn weblog(cfg: &CsvConfig) -> Result<Self, LogPipelineError> {
        let delimiter = match cfg.delimiter.as_bytes() {
            [b] if b.is_ascii() => *b,
            _ => {
                return Err(LogPipelineError::config(
                    "parser.csv_config.delimiter",
                    format!("must be a single ASCII character, got '{}'", cfg.delimiter),
                ));
            }
        };
        Ok(Self {
            delimiter,
            trim_leading_space: cfg.trim_leading_space,
            format: cfg.format.clone(),
            check_field: Arc::new(check_weblog_field),
        })
    }

    fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .trim(if self.trim_leading_space {
                Trim::Fields
            } else {
                Trim::None
            });
        builder
    }
}

/// 필드 이름 -> 열 인덱스 대응표
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFormat {
    raw: String,
    max_index: usize,
    field_indexes: Vec<(String, usize)>,
}

impl CsvFormat {
    /// 형식 문자열을 토큰화해 대응표를 만듭니다.
    pub fn new(config: &CsvParserConfig) -> Result<Self, LogPipelineError> {
        let bad_format =
            |reason: String| LogPipelineError::config("parser.csv_config.format", reason);

        if config.format.trim().is_empty() {
            return Err(bad_format("empty csv format".to_owned()));
        }

        let mut reader = config.reader_builder().from_reader(config.format.as_bytes());
        let mut tokens = StringRecord::new();
        let found = reader
            .read_record(&mut tokens)
            .map_err(|e| bad_format(format!("bad csv format: {e}")))?;
        if !found {
            return Err(bad_format("empty csv format".to_owned()));
        }

        let mut offset: i64 = 0;
        let mut max_index = 0;
        let mut field_indexes: Vec<(String, usize)> = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            let check = (config.check_field)(token.trim_matches('"'));
            offset += i64::from(check.offset);
            if !check.valid {
                continue;
            }

            let idx = usize::try_from(i as i64 + offset).map_err(|_| {
                bad_format(format!("field '{}' has a negative column index", check.name))
            })?;
            if field_indexes.iter().any(|(name, _)| *name == check.name) {
                return Err(bad_format(format!("duplicate field: {}", check.name)));
            }
            max_index = max_index.max(idx);
            field_indexes.push((check.name, idx));
        }

        if field_indexes.is_empty() {
            return Err(bad_format(format!(
                "bad csv format: no fields in '{}'",
                config.format
            )));
        }

        Ok(Self {
            raw: config.format.clone(),
            max_index,
            field_indexes,
        })
    }

    /// 원본 형식 문자열
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 가장 큰 열 인덱스
    pub fn max_index(&self) -> usize {
        self.max_index
    }

    /// 필드 이름의 열 인덱스
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.field_indexes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, idx)| *idx)
    }

    /// 필드 수
    pub fn len(&self) -> usize {
        self.field_indexes.len()
    }

    /// 필드가 없는지 확인합니다. 생성에 성공한 형식은 항상 false입니다.
    pub fn is_empty(&self) -> bool {
        self.field_indexes.is_empty()
    }

    fn fill(&self, record: &StringRecord, line: &mut LogLine) -> Result<(), LogPipelineError> {
        if record.len() <= self.max_index {
            return Err(LogPipelineError::parse(FORMAT, "unmatched line"));
        }
        for (name, idx) in &self.field_indexes {
            let value = record
                .get(*idx)
                .ok_or_else(|| LogPipelineError::parse(FORMAT, "unmatched line"))?;
            line.assign(name, value)
                .map_err(|e| LogPipelineError::parse_with(FORMAT, e))?;
        }
        Ok(())
    }
}

/// CSV 프레이밍 파서
///
/// 레코드 버퍼는 라인 사이에서 재사용됩니다.
pub struct CsvParser {
    config: CsvParserConfig,
    format: CsvFormat,
    reader: csv::Reader<LineSource>,
    record: StringRecord,
}

impl CsvParser {
    /// 형식을 검증하고 파서를 생성합니다.
    pub fn new(config: CsvParserConfig, source: LineSource) -> Result<Self, LogPipelineError> {
        let format = CsvFormat::new(&config)?;
        let reader = config.reader_builder().from_reader(source);
        Ok(Self {
            config,
            format,
            reader,
            record: StringRecord::new(),
        })
    }

    /// 열 대응표
    pub fn format(&self) -> &CsvFormat {
        &self.format
    }
}

impl LogParser for CsvParser {
    fn format_name(&self) -> &'static str {
        FORMAT
    }

    fn read_line(&mut self, line: &mut LogLine) -> Result<bool, LogPipelineError> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => self.format.fill(&self.record, line).map(|()| true),
            Ok(false) => Ok(false),
            Err(e) => Err(csv_error(e)),
        }
    }

    fn parse(&mut self, raw: &[u8], line: &mut LogLine) -> Result<(), LogPipelineError> {
        let mut reader = self.config.reader_builder().from_reader(raw);
        match reader.read_record(&mut self.record) {
            Ok(true) => self.format.fill(&self.record, line),
            Ok(false) => Err(LogPipelineError::parse(FORMAT, "unmatched line")),
            Err(e) => Err(csv_error(e)),
        }
    }

    fn info(&self) -> String {
        format!("csv: {}", self.format.raw)
    }
}

/// 소스 I/O 에러는 그대로, 그 외 렉서 에러는 파싱 에러로 분류합니다.
fn csv_error(err: csv::Error) -> LogPipelineError {
    if !err.is_io_error() {
        return LogPipelineError::parse_with(FORMAT, err);
    }
    match err.into_kind() {
        csv::ErrorKind::Io(e) => LogPipelineError::Io(e),
        other => LogPipelineError::parse(FORMAT, format!("{other:?}")),
    }
}

//! 설정 관리 -- weblog.toml 파싱 및 런타임 설정
//!
//! [`WeblogConfig`]는 데몬 전체 설정을 담는 최상위 구조체입니다.
//! 감시할 로그 파일마다 `[[jobs]]` 섹션 하나가 대응합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`WEBLOG_METRICS_PORT=9113` 형식)
//! 3. 설정 파일 (`weblog.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), weblog_core::error::WeblogError> {
//! use weblog_core::config::WeblogConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = WeblogConfig::load("weblog.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = WeblogConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, WeblogError};

/// weblog 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeblogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 자체 메트릭 노출 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 로그 파일별 수집 작업
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

impl WeblogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, WeblogError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, WeblogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WeblogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                WeblogError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, WeblogError> {
        toml::from_str(toml_str).map_err(|e| {
            WeblogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `WEBLOG_{SECTION}_{FIELD}`
    /// 작업(`[[jobs]]`) 단위 설정은 오버라이드 대상이 아닙니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "WEBLOG_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "WEBLOG_GENERAL_LOG_FORMAT");
        override_u64(&mut self.general.msg_limit, "WEBLOG_GENERAL_MSG_LIMIT");
        override_u64(
            &mut self.general.msg_reset_every_secs,
            "WEBLOG_GENERAL_MSG_RESET_EVERY_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "WEBLOG_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "WEBLOG_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "WEBLOG_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "WEBLOG_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 파서 형식, 매처 표현식처럼 로그 파이프라인만 해석할 수 있는 값은
    /// 파이프라인 생성 시점에 따로 검증됩니다.
    pub fn validate(&self) -> Result<(), WeblogError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.general.msg_reset_every_secs == 0 {
            return Err(invalid(
                "general.msg_reset_every_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid(
                "metrics.port",
                "must be greater than 0 when metrics are enabled".to_owned(),
            ));
        }

        let mut names = HashSet::new();
        for (i, job) in self.jobs.iter().enumerate() {
            if job.name.is_empty() {
                return Err(invalid(
                    &format!("jobs[{i}].name"),
                    "must not be empty".to_owned(),
                ));
            }
            if !names.insert(job.name.as_str()) {
                return Err(invalid(
                    &format!("jobs[{i}].name"),
                    format!("duplicate job name '{}'", job.name),
                ));
            }
            if job.path.is_empty() {
                return Err(invalid(
                    &format!("jobs[{i}].path"),
                    "must not be empty".to_owned(),
                ));
            }
            if job.update_every_secs == 0 {
                return Err(invalid(
                    &format!("jobs[{i}].update_every_secs"),
                    "must be greater than 0".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> WeblogError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 작업별 진단 메시지 상한 (초기화 주기당, 0이면 무제한)
    pub msg_limit: u64,
    /// 메시지 카운터 초기화 주기 (초)
    pub msg_reset_every_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            msg_limit: 60,
            msg_reset_every_secs: 1,
        }
    }
}

/// Prometheus 메트릭 노출 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9113,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// 로그 파일 하나에 대한 수집 작업 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// 작업 이름 (메트릭 레이블로 사용)
    pub name: String,
    /// 로그 파일 경로
    pub path: String,
    /// 수집 주기 (초)
    pub update_every_secs: u64,
    /// 파서 설정
    pub parser: ParserConfig,
    /// 응답 시간 히스토그램 버킷 경계 (초, 오름차순). 비어 있으면 히스토그램을 만들지 않습니다.
    pub histogram: Vec<f64>,
    /// URL 패턴 목록
    pub url_patterns: Vec<PatternConfig>,
    /// 사용자 정의 필드 목록
    pub custom_fields: Vec<CustomFieldConfig>,
    /// true면 응답 코드별 카운터 대신 `Nxx` 합계만 내보냅니다.
    pub group_resp_codes: bool,
    /// 시간 필드 배율. 지정하지 않으면 형식에서 추론합니다.
    pub time_scale: Option<f64>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: String::new(),
            update_every_secs: 1,
            parser: ParserConfig::default(),
            histogram: Vec::new(),
            url_patterns: Vec::new(),
            custom_fields: Vec::new(),
            group_resp_codes: false,
            time_scale: None,
        }
    }
}

/// 파서 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// 로그 형식 (auto, csv, regex, ltsv, json)
    pub log_type: String,
    /// CSV 파서 설정
    pub csv_config: CsvConfig,
    /// 정규식 파서 설정
    pub regex_config: RegexConfig,
    /// LTSV 파서 설정
    pub ltsv_config: LtsvConfig,
    /// JSON 파서 설정
    pub json_config: JsonConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            log_type: "auto".to_owned(),
            csv_config: CsvConfig::default(),
            regex_config: RegexConfig::default(),
            ltsv_config: LtsvConfig::default(),
            json_config: JsonConfig::default(),
        }
    }
}

/// CSV 파서 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// 로그 형식 문자열 (예: `$remote_addr - - [$time_local] "$request" $status`)
    pub format: String,
    /// 구분자 (ASCII 한 글자)
    pub delimiter: String,
    /// 필드 앞 공백 제거 여부
    pub trim_leading_space: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            format: String::new(),
            delimiter: " ".to_owned(),
            trim_leading_space: false,
        }
    }
}

/// 정규식 파서 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegexConfig {
    /// 명명된 캡처 그룹을 가진 정규식
    pub pattern: String,
}

/// LTSV 파서 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LtsvConfig {
    /// 필드 구분자
    pub field_delimiter: String,
    /// 레이블/값 구분자
    pub value_delimiter: String,
    /// 레이블 -> 필드 이름 매핑
    pub mapping: BTreeMap<String, String>,
}

impl Default for LtsvConfig {
    fn default() -> Self {
        Self {
            field_delimiter: "\t".to_owned(),
            value_delimiter: ":".to_owned(),
            mapping: BTreeMap::new(),
        }
    }
}

/// JSON 파서 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    /// JSON 키 -> 필드 이름 매핑
    pub mapping: BTreeMap<String, String>,
}

/// 이름 붙은 매처 표현식
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// 패턴 이름 (목록 안에서 유일)
    pub name: String,
    /// 매처 표현식 (예: `~ ^/api/`)
    #[serde(rename = "match")]
    pub matcher: String,
}

/// 사용자 정의 필드 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldConfig {
    /// 필드 이름 (형식 문자열의 토큰 이름)
    pub name: String,
    /// 값 패턴 목록
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

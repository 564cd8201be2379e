//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`JobConfig`]를 기반으로 작업 하나의
//! 파이프라인 설정을 제공합니다. core는 설정 파일의 모양만 검증하고,
//! 파서 형식이나 매처 표현식처럼 이 크레이트만 해석할 수 있는 값은
//! [`PipelineConfig::validate`]에서 검증합니다.
//!
//! # 사용 예시
//! ```ignore
//! use weblog_core::config::WeblogConfig;
//! use weblog_log_pipeline::config::PipelineConfig;
//!
//! let core_config = WeblogConfig::load("weblog.toml").await?;
//! for job in &core_config.jobs {
//!     let config = PipelineConfig::from_core(job);
//!     config.validate()?;
//! }
//! ```

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use weblog_core::config::{CustomFieldConfig, JobConfig, ParserConfig, PatternConfig};

use crate::error::LogPipelineError;
use crate::metric::Histogram;
use crate::parser::{self, LogType};
use crate::pattern::{new_custom_fields, new_user_patterns};

/// 수집 주기 상한 (1시간)
const MAX_UPDATE_EVERY_SECS: u64 = 3600;

/// 작업 하나의 로그 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 작업 이름
    pub name: String,
    /// 로그 파일 경로
    pub path: String,
    /// 수집 주기 (초)
    pub update_every_secs: u64,
    /// 파서 설정
    pub parser: ParserConfig,
    /// 히스토그램 버킷 경계 (초)
    pub histogram: Vec<f64>,
    /// URL 패턴
    pub url_patterns: Vec<PatternConfig>,
    /// 사용자 정의 필드
    pub custom_fields: Vec<CustomFieldConfig>,
    /// 응답 코드를 `Nxx`로만 집계할지 여부
    pub group_resp_codes: bool,
    /// 시간 필드 배율 (없으면 형식에서 추론)
    pub time_scale: Option<f64>,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 스냅샷 채널 용량
    pub channel_capacity: usize,
    /// 초기화 주기당 진단 메시지 상한 (0이면 무제한)
    pub msg_limit: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "weblog".to_owned(),
            path: "/var/log/nginx/access.log".to_owned(),
            update_every_secs: 1,
            parser: ParserConfig::default(),
            histogram: Vec::new(),
            url_patterns: Vec::new(),
            custom_fields: Vec::new(),
            group_resp_codes: false,
            time_scale: None,
            channel_capacity: 16,
            msg_limit: 60,
        }
    }
}

impl PipelineConfig {
    /// core의 `JobConfig`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(job: &JobConfig) -> Self {
        Self {
            name: job.name.clone(),
            path: job.path.clone(),
            update_every_secs: job.update_every_secs,
            parser: job.parser.clone(),
            histogram: job.histogram.clone(),
            url_patterns: job.url_patterns.clone(),
            custom_fields: job.custom_fields.clone(),
            group_resp_codes: job.group_resp_codes,
            time_scale: job.time_scale,
            ..Self::default()
        }
    }

    /// 수집 주기
    pub fn update_every(&self) -> Duration {
        Duration::from_secs(self.update_every_secs)
    }

    /// 로그 형식
    pub fn log_type(&self) -> Result<LogType, LogPipelineError> {
        self.parser.log_type.parse()
    }

    /// 실제로 적용할 시간 배율
    ///
    /// 지정하지 않았으면 Apache `%D` 형식은 1e-6, 그 외는 1.0입니다.
    pub fn effective_time_scale(&self) -> f64 {
        match self.time_scale {
            Some(scale) => scale,
            None => match self.log_type() {
                Ok(log_type) => parser::default_time_scale(log_type, &self.parser.csv_config),
                Err(_) => 1.0,
            },
        }
    }

    /// 사용자 정의 필드 이름 목록
    pub fn custom_field_names(&self) -> Vec<String> {
        self.custom_fields.iter().map(|f| f.name.clone()).collect()
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 파서 설정은 빈 소스로 실제 파서를 만들어 확인합니다. `auto`는 첫 라인이
    /// 있어야 형식이 정해지므로 생성 시점까지 검증을 미룹니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.name.is_empty() {
            return Err(LogPipelineError::config("name", "must not be empty"));
        }

        if self.path.is_empty() {
            return Err(LogPipelineError::config("path", "must not be empty"));
        }

        if self.update_every_secs == 0 || self.update_every_secs > MAX_UPDATE_EVERY_SECS {
            return Err(LogPipelineError::config(
                "update_every_secs",
                format!("must be 1-{MAX_UPDATE_EVERY_SECS}"),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(LogPipelineError::config(
                "channel_capacity",
                "must be greater than 0",
            ));
        }

        if let Some(scale) = self.time_scale
            && !(scale.is_finite() && scale > 0.0)
        {
            return Err(LogPipelineError::config(
                "time_scale",
                format!("must be a positive finite number, got {scale}"),
            ));
        }

        if !self.histogram.is_empty() {
            Histogram::new(&self.histogram)?;
        }

        new_user_patterns(&self.url_patterns, "url_patterns")?;
        new_custom_fields(&self.custom_fields)?;

        if self.log_type()? != LogType::Auto {
            parser::new_parser(
                &self.parser,
                &self.custom_field_names(),
                Box::new(io::empty()),
            )?;
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 작업 이름을 설정합니다.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// 로그 파일 경로를 설정합니다.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    /// 수집 주기(초)를 설정합니다.
    pub fn update_every_secs(mut self, secs: u64) -> Self {
        self.config.update_every_secs = secs;
        self
    }

    /// 파서 설정 전체를 지정합니다.
    pub fn parser(mut self, parser: ParserConfig) -> Self {
        self.config.parser = parser;
        self
    }

    /// CSV 형식 문자열을 지정하고 로그 형식을 `csv`로 바꿉니다.
    pub fn csv_format(mut self, format: impl Into<String>) -> Self {
        self.config.parser.log_type = "csv".to_owned();
        self.config.parser.csv_config.format = format.into();
        self
    }

    /// 정규식을 지정하고 로그 형식을 `regex`로 바꿉니다.
    pub fn regex_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.parser.log_type = "regex".to_owned();
        self.config.parser.regex_config.pattern = pattern.into();
        self
    }

    /// 히스토그램 버킷 경계를 설정합니다.
    pub fn histogram(mut self, edges: Vec<f64>) -> Self {
        self.config.histogram = edges;
        self
    }

    /// URL 패턴을 추가합니다.
    pub fn url_pattern(mut self, name: impl Into<String>, matcher: impl Into<String>) -> Self {
        self.config.url_patterns.push(PatternConfig {
            name: name.into(),
            matcher: matcher.into(),
        });
        self
    }

    /// 사용자 정의 필드를 추가합니다.
    pub fn custom_field(mut self, field: CustomFieldConfig) -> Self {
        self.config.custom_fields.push(field);
        self
    }

    /// 응답 코드 그룹화 여부를 설정합니다.
    pub fn group_resp_codes(mut self, group: bool) -> Self {
        self.config.group_resp_codes = group;
        self
    }

    /// 시간 배율을 설정합니다.
    pub fn time_scale(mut self, scale: f64) -> Self {
        self.config.time_scale = Some(scale);
        self
    }

    /// 스냅샷 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 진단 메시지 상한을 설정합니다.
    pub fn msg_limit(mut self, limit: u64) -> Self {
        self.config.msg_limit = limit;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMBINED: &str = r#"$remote_addr - - [$time_local] "$request" $status $body_bytes_sent"#;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let job = JobConfig {
            name: "nginx".to_owned(),
            path: "/var/log/nginx/access.log".to_owned(),
            update_every_secs: 5,
            histogram: vec![0.1, 1.0],
            group_resp_codes: true,
            ..Default::default()
        };
        let config = PipelineConfig::from_core(&job);
        assert_eq!(config.name, "nginx");
        assert_eq!(config.update_every(), Duration::from_secs(5));
        assert_eq!(config.histogram, vec![0.1, 1.0]);
        assert!(config.group_resp_codes);
        // 확장 필드는 기본값
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = PipelineConfigBuilder::new()
            .name("edge")
            .path("/tmp/access.log")
            .csv_format(COMBINED)
            .url_pattern("api", "~ ^/api/")
            .histogram(vec![0.005, 0.05, 0.5])
            .build()
            .unwrap();
        assert_eq!(config.log_type().unwrap(), LogType::Csv);
        assert_eq!(config.url_patterns.len(), 1);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases: Vec<PipelineConfigBuilder> = vec![
            PipelineConfigBuilder::new().name(""),
            PipelineConfigBuilder::new().path(""),
            PipelineConfigBuilder::new().update_every_secs(0),
            PipelineConfigBuilder::new().update_every_secs(MAX_UPDATE_EVERY_SECS + 1),
            PipelineConfigBuilder::new().channel_capacity(0),
            PipelineConfigBuilder::new().time_scale(0.0),
            PipelineConfigBuilder::new().time_scale(f64::NAN),
            PipelineConfigBuilder::new().histogram(vec![1.0, 0.1]),
            PipelineConfigBuilder::new().url_pattern("", "= a"),
            PipelineConfigBuilder::new()
                .url_pattern("a", "= a")
                .url_pattern("a", "= b"),
            PipelineConfigBuilder::new().url_pattern("a", "bogus"),
            PipelineConfigBuilder::new().csv_format(""),
            PipelineConfigBuilder::new().csv_format("$status $status"),
            PipelineConfigBuilder::new().regex_pattern(r"(?P<nope>.+)"),
            PipelineConfigBuilder::new().regex_pattern("(unclosed"),
        ];
        for (i, builder) in cases.into_iter().enumerate() {
            let err = builder.build().unwrap_err();
            assert!(
                matches!(err, LogPipelineError::Config { .. } | LogPipelineError::Regex(_)),
                "case {i}: {err}"
            );
        }
    }

    #[test]
    fn unknown_log_type_is_rejected() {
        let mut config = PipelineConfig::default();
        config.parser.log_type = "syslog".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn time_scale_is_inferred_from_format() {
        let apache = PipelineConfigBuilder::new()
            .csv_format(r#"%h %l %u %t "%r" %>s %b %D"#)
            .build()
            .unwrap();
        assert_eq!(apache.effective_time_scale(), 0.000_001);

        let nginx = PipelineConfigBuilder::new().csv_format(COMBINED).build().unwrap();
        assert_eq!(nginx.effective_time_scale(), 1.0);

        let explicit = PipelineConfigBuilder::new()
            .csv_format(COMBINED)
            .time_scale(0.001)
            .build()
            .unwrap();
        assert_eq!(explicit.effective_time_scale(), 0.001);
    }

    #[test]
    fn custom_field_names_follow_config_order() {
        let config = PipelineConfigBuilder::new()
            .custom_field(CustomFieldConfig {
                name: "http_user_agent".to_owned(),
                patterns: vec![],
            })
            .custom_field(CustomFieldConfig {
                name: "upstream_addr".to_owned(),
                patterns: vec![],
            })
            .build()
            .unwrap();
        assert_eq!(
            config.custom_field_names(),
            vec!["http_user_agent".to_owned(), "upstream_addr".to_owned()]
        );
    }
}

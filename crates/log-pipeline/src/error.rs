//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for WeblogError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! # 에러 분류
//!
//! | 변형 | 발생 시점 | 처리 |
//! |------|-----------|------|
//! | `Config` | 생성 시 | 치명적, 런타임에는 발생하지 않음 |
//! | `Parse` | 라인마다 | 복구 가능, `req_unmatched`로 집계 |
//! | `Verify` | 라인마다 | `Parse`와 동일하게 처리 |
//! | `Io` | 라인 소스 읽기 | 파이프라인 정지 |

use std::error::Error as StdError;

use weblog_core::error::{ConfigError, PipelineError, WeblogError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 구조적으로 잘못된 라인 (열 부족, 따옴표 오류, 잘못된 숫자 토큰 등)
    #[error("{format} parse: {reason}")]
    Parse {
        /// 파서 형식 (csv, regex, ltsv, json)
        format: String,
        /// 실패 사유
        reason: String,
        /// 원인 에러
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// 구조는 올바르지만 필드 값이 검증 규칙을 위반한 라인
    #[error("verify: {0}")]
    Verify(#[source] LineError),

    /// 설정 에러 (잘못된 형식 문자열, 중복 필드, 빈 이름, 잘못된 매처 등)
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl LogPipelineError {
    /// 원인 없는 파싱 에러를 생성합니다.
    pub fn parse(format: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            format: format.to_owned(),
            reason: reason.into(),
            source: None,
        }
    }

    /// 원인 에러를 감싼 파싱 에러를 생성합니다.
    pub fn parse_with<E>(format: &str, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Parse {
            format: format.to_owned(),
            reason: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// 설정 에러를 생성합니다.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 라인 단위로 복구 가능한 에러인지 확인합니다.
    ///
    /// `Parse`와 `Verify`는 해당 라인만 건너뛰고, 나머지는 파이프라인을 멈춥니다.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Verify(_))
    }
}

impl From<LogPipelineError> for WeblogError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Config { field, reason } => {
                WeblogError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::Io(e) => WeblogError::Io(e),
            LogPipelineError::Channel(msg) => {
                WeblogError::Pipeline(PipelineError::ChannelSend(msg))
            }
            other => WeblogError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

/// [`LogLine`](crate::logline::LogLine) 필드 할당/검증 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    /// `request` 토큰을 method/uri/protocol로 나눌 수 없음
    #[error("invalid request: '{0}'")]
    InvalidRequest(String),

    /// `HTTP/`로 시작하지 않는 프로토콜
    #[error("invalid protocol: '{0}'")]
    InvalidProtocol(String),

    /// 숫자로 해석할 수 없는 토큰
    #[error("invalid {field}: '{value}' is not a number")]
    InvalidNumber {
        /// 필드 이름
        field: &'static str,
        /// 원본 토큰
        value: String,
    },

    /// 필수 필드 `resp_status` 없음
    #[error("missing mandatory field: resp_status")]
    MissingStatus,

    /// 100..=599 범위 밖의 상태 코드
    #[error("invalid resp_status: {0}")]
    InvalidStatus(i64),

    /// 정규식 또는 범위 검증 실패
    #[error("invalid {field}: '{value}'")]
    InvalidField {
        /// 필드 이름
        field: &'static str,
        /// 필드 값
        value: String,
    },
}

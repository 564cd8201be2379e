#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`matcher`]: 문자열/정규식/glob 매처와 `&&`, `||`, `!` 조합
//! - [`logline`]: 라인 하나의 타입 지정 필드 레코드와 검증 규칙
//! - [`parser`]: CSV, 정규식, LTSV, JSON 파서 및 `auto` 형식 추측
//! - [`metric`]: 카운터, 고유값, 요약, 히스토그램과 작업 단위 [`MetricData`]
//! - [`pattern`]: URL 패턴과 사용자 정의 필드 패턴
//! - [`aggregator`]: 라인을 메트릭 차원으로 분류하는 분류기
//! - [`weblog`]: 수집 주기 하나를 실행하는 동기 수집기
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! LineSource -> LogParser -> LogLine -> verify -> Aggregator -> MetricData -> Snapshot
//!                                                    |                          |
//!                                          UserPattern / CustomField    mpsc<JobSnapshot>
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod logline;
pub mod matcher;
pub mod metric;
pub mod parser;
pub mod pattern;
pub mod pipeline;
pub mod weblog;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{JobSnapshot, LogPipeline, LogPipelineBuilder};

// 수집기
pub use weblog::{Tick, WebLog};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::{LineError, LogPipelineError};

// 레코드
pub use logline::LogLine;

// 매처
pub use matcher::Matcher;

// 파서
pub use parser::{CsvParser, JsonParser, LineSource, LogParser, LogType, LtsvParser, RegexParser};

// 메트릭
pub use metric::{MetricData, Snapshot};

// 분류
pub use aggregator::Aggregator;
pub use pattern::{CustomField, UserPattern};

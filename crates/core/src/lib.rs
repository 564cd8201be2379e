#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod pipeline;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, PipelineError, WeblogError};

// 설정
pub use config::{JobConfig, WeblogConfig};

// 로거
pub use logger::{Logger, MsgCountWatcher};

// 파이프라인 trait
pub use pipeline::{DynPipeline, HealthStatus, Pipeline};

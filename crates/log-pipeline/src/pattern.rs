//! 사용자 패턴 -- URL 패턴, 사용자 정의 필드 값 패턴

use std::collections::HashSet;

use weblog_core::config::{CustomFieldConfig, PatternConfig};

use crate::error::LogPipelineError;
use crate::matcher::Matcher;

/// 이름 붙은 매처
///
/// URL 패턴은 요청 URI에 대해 평가되는 `UserPattern`입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPattern {
    /// 패턴 이름 (스냅샷 키에 사용)
    pub name: String,
    /// 매처
    pub matcher: Matcher,
}

impl UserPattern {
    /// 설정에서 패턴을 만듭니다. 이름이 비어 있거나 매처가 잘못되면 에러입니다.
    pub fn from_config(cfg: &PatternConfig, field: &str) -> Result<Self, LogPipelineError> {
        if cfg.name.is_empty() {
            return Err(LogPipelineError::config(
                format!("{field}.name"),
                "must not be empty",
            ));
        }
        let matcher = Matcher::parse(&cfg.matcher).map_err(|e| {
            LogPipelineError::config(
                format!("{field}.match"),
                format!("pattern '{}': {e}", cfg.name),
            )
        })?;
        Ok(Self {
            name: cfg.name.clone(),
            matcher,
        })
    }
}

/// 패턴 목록을 만듭니다. 이름은 목록 안에서 유일해야 합니다.
pub fn new_user_patterns(
    configs: &[PatternConfig],
    field: &str,
) -> Result<Vec<UserPattern>, LogPipelineError> {
    let mut seen = HashSet::new();
    let mut patterns = Vec::with_capacity(configs.len());
    for (i, cfg) in configs.iter().enumerate() {
        let path = format!("{field}[{i}]");
        let pattern = UserPattern::from_config(cfg, &path)?;
        if !seen.insert(pattern.name.clone()) {
            return Err(LogPipelineError::config(
                format!("{path}.name"),
                format!("duplicate pattern name '{}'", pattern.name),
            ));
        }
        patterns.push(pattern);
    }
    Ok(patterns)
}

/// 사용자 정의 필드 -- 형식 토큰 하나와 그 값에 대한 패턴 목록
#[derive(Debug, Clone, PartialEq)]
pub struct CustomField {
    /// 필드 이름
    pub name: String,
    /// 값 패턴 목록
    pub patterns: Vec<UserPattern>,
}

/// 사용자 정의 필드 목록을 만듭니다. 필드 이름과 각 필드의 패턴 이름은 유일해야 합니다.
pub fn new_custom_fields(
    configs: &[CustomFieldConfig],
) -> Result<Vec<CustomField>, LogPipelineError> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(configs.len());
    for (i, cfg) in configs.iter().enumerate() {
        let path = format!("custom_fields[{i}]");
        if cfg.name.is_empty() {
            return Err(LogPipelineError::config(
                format!("{path}.name"),
                "must not be empty",
            ));
        }
        if !seen.insert(cfg.name.as_str()) {
            return Err(LogPipelineError::config(
                format!("{path}.name"),
                format!("duplicate custom field '{}'", cfg.name),
            ));
        }
        let patterns = new_user_patterns(&cfg.patterns, &format!("{path}.patterns"))?;
        fields.push(CustomField {
            name: cfg.name.clone(),
            patterns,
        });
    }
    Ok(fields)
}

//! 매처 표현식 파서
//!
//! ```text
//! expr    := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | primary
//! primary := "~" regex | "*" glob | "=" string
//!          | "regexp:" regex | "glob:" glob | "string:" string
//! ```
//!
//! 짧은 표기의 기호 뒤 공백 한 칸은 구분자로 취급합니다 (`~ ^/api/`).
//! `||`, `&&`는 패턴 안에서 이스케이프할 수 없습니다.

use super::Matcher;
use crate::error::LogPipelineError;

const FIELD: &str = "matcher";

pub(super) fn parse(expr: &str) -> Result<Matcher, LogPipelineError> {
    if expr.trim().is_empty() {
        return Err(LogPipelineError::config(FIELD, "empty expression"));
    }

    let mut result: Option<Matcher> = None;
    for part in expr.split("||") {
        let m = parse_and(part, expr)?;
        result = Some(match result {
            Some(acc) => Matcher::or(acc, m),
            None => m,
        });
    }
    result.ok_or_else(|| LogPipelineError::config(FIELD, "empty expression"))
}

fn parse_and(s: &str, whole: &str) -> Result<Matcher, LogPipelineError> {
    let mut result: Option<Matcher> = None;
    for part in s.split("&&") {
        let m = parse_unary(part.trim(), whole)?;
        result = Some(match result {
            Some(acc) => Matcher::and(acc, m),
            None => m,
        });
    }
    result.ok_or_else(|| missing_operand(whole))
}

fn parse_unary(s: &str, whole: &str) -> Result<Matcher, LogPipelineError> {
    match s.strip_prefix('!') {
        Some(rest) => Ok(Matcher::not(parse_unary(rest.trim_start(), whole)?)),
        None => parse_primary(s, whole),
    }
}

fn parse_primary(s: &str, whole: &str) -> Result<Matcher, LogPipelineError> {
    if s.is_empty() {
        return Err(missing_operand(whole));
    }

    if let Some(p) = s.strip_prefix("regexp:") {
        return Matcher::regex(p);
    }
    if let Some(p) = s.strip_prefix("glob:") {
        return Matcher::glob(p);
    }
    if let Some(p) = s.strip_prefix("string:") {
        return Ok(Matcher::string(p));
    }

    let mut chars = s.chars();
    let sigil = chars.next();
    let rest = chars.as_str();
    let pattern = rest.strip_prefix(' ').unwrap_or(rest);
    match sigil {
        Some('~') => Matcher::regex(pattern),
        Some('*') => Matcher::glob(pattern),
        Some('=') => Ok(Matcher::string(pattern)),
        _ => Err(LogPipelineError::config(
            FIELD,
            format!("unknown matcher kind in '{s}' (expected '~', '*', '=' or a long form prefix)"),
        )),
    }
}

fn missing_operand(whole: &str) -> LogPipelineError {
    LogPipelineError::config(FIELD, format!("missing operand in '{whole}'"))
}

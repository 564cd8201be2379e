//! 매처 대수 -- 조합 가능한 문자열 술어
//!
//! [`Matcher`]는 닫힌 변형 집합입니다.
//!
//! - 기본 매처: 전체 일치, 접두사, 접미사, 부분 문자열, 정규식, glob
//! - 조합 매처: AND, OR, NOT
//! - 항등원: `True`, `False`
//!
//! 조합 생성자([`Matcher::and`], [`Matcher::or`], [`Matcher::not`])는 생성 시점에
//! 대수적 단순화를 수행하므로 별도의 최적화 단계가 없습니다.
//!
//! ```
//! use weblog_log_pipeline::matcher::Matcher;
//!
//! let api = Matcher::prefix("/api/");
//! assert_eq!(Matcher::and(Matcher::True, api.clone()), api);
//! assert_eq!(Matcher::or(Matcher::True, api), Matcher::True);
//! ```

mod parse;

use crate::error::LogPipelineError;

/// 조합 가능한 문자열 매처
#[derive(Debug, Clone)]
pub enum Matcher {
    /// 항상 참
    True,
    /// 항상 거짓
    False,
    /// 전체 일치
    Full(String),
    /// 접두사 일치
    Prefix(String),
    /// 접미사 일치
    Suffix(String),
    /// 부분 문자열 포함
    Contains(String),
    /// 정규식 (부분 일치, 앵커는 패턴에 직접 지정)
    Regex(regex::bytes::Regex),
    /// glob 패턴 (전체 일치)
    Glob(glob::Pattern),
    /// 두 매처 모두 참
    And(Box<Matcher>, Box<Matcher>),
    /// 둘 중 하나라도 참
    Or(Box<Matcher>, Box<Matcher>),
    /// 부정
    Not(Box<Matcher>),
}

impl Matcher {
    /// 전체 일치 매처
    pub fn full(s: impl Into<String>) -> Self {
        Self::Full(s.into())
    }

    /// 접두사 매처
    pub fn prefix(s: impl Into<String>) -> Self {
        Self::Prefix(s.into())
    }

    /// 접미사 매처
    pub fn suffix(s: impl Into<String>) -> Self {
        Self::Suffix(s.into())
    }

    /// 부분 문자열 매처
    pub fn contains(s: impl Into<String>) -> Self {
        Self::Contains(s.into())
    }

    /// 앵커 표기로 문자열 매처를 만듭니다.
    ///
    /// `^abc$`는 전체 일치, `^abc`는 접두사, `abc$`는 접미사, 그 외는 부분 문자열입니다.
    pub fn string(expr: &str) -> Self {
        let (anchored_start, rest) = match expr.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, expr),
        };
        let (anchored_end, body) = match rest.strip_suffix('$') {
            Some(body) => (true, body),
            None => (false, rest),
        };
        match (anchored_start, anchored_end) {
            (true, true) => Self::full(body),
            (true, false) => Self::prefix(body),
            (false, true) => Self::suffix(body),
            (false, false) => Self::contains(body),
        }
    }

    /// 정규식 매처를 만듭니다.
    ///
    /// 메타 문자가 없는 리터럴(예: `^/api/`)은 동등한 문자열 매처로 낮춥니다.
    /// 빈 패턴은 `True`입니다.
    pub fn regex(pattern: &str) -> Result<Self, LogPipelineError> {
        if pattern.is_empty() {
            return Ok(Self::True);
        }
        let literal = pattern.trim_start_matches('^').trim_end_matches('$');
        let single_anchors = pattern.len() - literal.len() <= 2
            && pattern.matches('^').count() <= 1
            && pattern.matches('$').count() <= 1;
        if single_anchors && !literal.is_empty() && regex::escape(literal) == literal {
            return Ok(Self::string(pattern));
        }
        let re = regex::bytes::Regex::new(pattern)?;
        Ok(Self::Regex(re))
    }

    /// glob 매처를 만듭니다.
    pub fn glob(pattern: &str) -> Result<Self, LogPipelineError> {
        glob::Pattern::new(pattern)
            .map(Self::Glob)
            .map_err(|e| LogPipelineError::config("matcher", format!("invalid glob '{pattern}': {e}")))
    }

    /// 표현식 문자열을 파싱합니다.
    ///
    /// - `a || b`, `a && b`, `!a` (우선순위 낮은 순)
    /// - `~ <regex>`, `* <glob>`, `= <string>`
    /// - `regexp:<regex>`, `glob:<glob>`, `string:<string>`
    pub fn parse(expr: &str) -> Result<Self, LogPipelineError> {
        parse::parse(expr)
    }

    /// AND 조합 (`False`는 흡수원, `True`는 항등원)
    pub fn and(a: Matcher, b: Matcher) -> Self {
        match (a, b) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, m) | (m, Self::True) => m,
            (a, b) => Self::And(Box::new(a), Box::new(b)),
        }
    }

    /// OR 조합 (`True`는 흡수원, `False`는 항등원)
    pub fn or(a: Matcher, b: Matcher) -> Self {
        match (a, b) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, m) | (m, Self::False) => m,
            (a, b) => Self::Or(Box::new(a), Box::new(b)),
        }
    }

    /// 부정 (`!!m == m`, `!True == False`)
    pub fn not(m: Matcher) -> Self {
        match m {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Not(inner) => *inner,
            m => Self::Not(Box::new(m)),
        }
    }

    /// 바이트열에 대해 매칭합니다.
    pub fn matches(&self, b: &[u8]) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Full(s) => b == s.as_bytes(),
            Self::Prefix(s) => b.starts_with(s.as_bytes()),
            Self::Suffix(s) => b.ends_with(s.as_bytes()),
            Self::Contains(s) => contains_bytes(b, s.as_bytes()),
            Self::Regex(re) => re.is_match(b),
            Self::Glob(p) => std::str::from_utf8(b).is_ok_and(|s| p.matches(s)),
            Self::And(x, y) => x.matches(b) && y.matches(b),
            Self::Or(x, y) => x.matches(b) || y.matches(b),
            Self::Not(x) => !x.matches(b),
        }
    }

    /// 문자열에 대해 매칭합니다.
    pub fn matches_str(&self, s: &str) -> bool {
        match self {
            Self::Full(p) => s == p,
            Self::Prefix(p) => s.starts_with(p.as_str()),
            Self::Suffix(p) => s.ends_with(p.as_str()),
            Self::Contains(p) => s.contains(p.as_str()),
            Self::Glob(p) => p.matches(s),
            Self::And(x, y) => x.matches_str(s) && y.matches_str(s),
            Self::Or(x, y) => x.matches_str(s) || y.matches_str(s),
            Self::Not(x) => !x.matches_str(s),
            other => other.matches(s.as_bytes()),
        }
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::True, Self::True) | (Self::False, Self::False) => true,
            (Self::Full(a), Self::Full(b))
            | (Self::Prefix(a), Self::Prefix(b))
            | (Self::Suffix(a), Self::Suffix(b))
            | (Self::Contains(a), Self::Contains(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            (Self::Glob(a), Self::Glob(b)) => a.as_str() == b.as_str(),
            (Self::And(a1, b1), Self::And(a2, b2)) | (Self::Or(a1, b1), Self::Or(a2, b2)) => {
                a1 == a2 && b1 == b2
            }
            (Self::Not(a), Self::Not(b)) => a == b,
            _ => false,
        }
    }
}

//! 고유값 카운터

use std::collections::HashSet;

use super::Snapshot;

/// 관측된 고유 토큰 수를 셉니다 (정확한 집합 기반).
#[derive(Debug, Clone, Default)]
pub struct UniqueCounter {
    seen: HashSet<String>,
}

impl UniqueCounter {
    /// 빈 카운터
    pub fn new() -> Self {
        Self::default()
    }

    /// 토큰을 관측합니다. 이미 본 토큰은 할당하지 않습니다.
    pub fn insert(&mut self, token: &str) {
        if !self.seen.contains(token) {
            self.seen.insert(token.to_owned());
        }
    }

    /// 고유 토큰 수
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// 집합을 비웁니다.
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// 고유 토큰 수를 `key`로 기록합니다.
    pub fn write_to(&self, out: &mut Snapshot, key: &str, mul: i64, div: i64) {
        let n = i64::try_from(self.seen.len()).unwrap_or(i64::MAX);
        out.insert(key.to_owned(), n * mul / div);
    }
}

//! 단조 증가 카운터와 키별 카운터 벡터

use std::collections::HashMap;

use super::Snapshot;

/// 단조 증가하는 음이 아닌 정수 카운터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter(i64);

impl Counter {
    /// 1 증가
    pub fn inc(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// `n` 증가. 음수는 무시합니다.
    pub fn add(&mut self, n: i64) {
        if n > 0 {
            self.0 = self.0.saturating_add(n);
        }
    }

    /// 현재 값
    pub fn value(&self) -> i64 {
        self.0
    }

    /// `key`로 값을 기록합니다.
    pub fn write_to(&self, out: &mut Snapshot, key: &str, mul: i64, div: i64) {
        out.insert(key.to_owned(), self.0 * mul / div);
    }
}

/// 관측된 레이블 값 -> 카운터
///
/// 새 키를 처음 관측할 때만 할당합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterVec {
    counters: HashMap<String, Counter>,
}

impl CounterVec {
    /// 빈 벡터
    pub fn new() -> Self {
        Self::default()
    }

    /// 주어진 키를 0으로 미리 만들어 둔 벡터
    pub fn seeded<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            counters: keys.into_iter().map(|k| (k.into(), Counter::default())).collect(),
        }
    }

    /// 키의 카운터를 반환합니다. 없으면 0으로 추가합니다.
    ///
    /// 호출마다 키를 복사하므로 라인 단위 경로에서는 [`inc`](Self::inc)/[`add`](Self::add)를 씁니다.
    pub fn get(&mut self, key: &str) -> &mut Counter {
        self.counters.entry(key.to_owned()).or_default()
    }

    /// 키의 카운터를 1 증가시킵니다.
    pub fn inc(&mut self, key: &str) {
        self.add(key, 1);
    }

    /// 키의 카운터를 `n` 증가시킵니다. 이미 있는 키는 할당하지 않습니다.
    pub fn add(&mut self, key: &str, n: i64) {
        match self.counters.get_mut(key) {
            Some(counter) => counter.add(n),
            None => {
                let mut counter = Counter::default();
                counter.add(n);
                self.counters.insert(key.to_owned(), counter);
            }
        }
    }

    /// 키의 현재 값 (없으면 `None`)
    pub fn value(&self, key: &str) -> Option<i64> {
        self.counters.get(key).map(Counter::value)
    }

    /// 키 수
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// 모든 키를 `{prefix}_{key}`로 기록합니다.
    pub fn write_to(&self, out: &mut Snapshot, prefix: &str, mul: i64, div: i64) {
        for (key, counter) in &self.counters {
            counter.write_to(out, &format!("{prefix}_{key}"), mul, div);
        }
    }
}

//! 고정 버킷 히스토그램

use super::{Snapshot, scale};
use crate::error::LogPipelineError;

/// 고정 버킷 경계에 대한 누적 히스토그램
///
/// 키는 버킷 인덱스 기반입니다: `{key}_bucket_1` .. `{key}_bucket_N`, `{key}_bucket_inf`.
/// 버킷 값은 해당 경계 이하 관측 수의 누적합입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    edges: Vec<f64>,
    buckets: Vec<i64>,
    count: i64,
    sum: f64,
}

impl Histogram {
    /// 버킷 경계로 히스토그램을 생성합니다. 경계는 유한하고 순증가해야 합니다.
    pub fn new(edges: &[f64]) -> Result<Self, LogPipelineError> {
        validate_edges(edges)?;
        Ok(Self {
            edges: edges.to_vec(),
            buckets: vec![0; edges.len()],
            count: 0,
            sum: 0.0,
        })
    }

    /// 버킷 경계
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// 값을 관측합니다.
    pub fn observe(&mut self, value: f64) {
        if let Some(idx) = self.edges.iter().position(|edge| value <= *edge) {
            self.buckets[idx] += 1;
        }
        self.count += 1;
        self.sum += value;
    }

    /// 전체 관측 수
    pub fn count(&self) -> i64 {
        self.count
    }

    /// 버킷별 누적 값, `+Inf`, 관측 수, 합계(배율 적용)를 기록합니다.
    pub fn write_to(&self, out: &mut Snapshot, key: &str, mul: i64, div: i64) {
        let mut cumulative = 0;
        for (i, n) in self.buckets.iter().enumerate() {
            cumulative += n;
            out.insert(format!("{key}_bucket_{}", i + 1), cumulative);
        }
        out.insert(format!("{key}_bucket_inf"), self.count);
        out.insert(format!("{key}_count"), self.count);
        out.insert(format!("{key}_sum"), scale(self.sum, mul, div));
    }
}

/// 히스토그램 경계를 검증합니다.
pub fn validate_edges(edges: &[f64]) -> Result<(), LogPipelineError> {
    if edges.is_empty() {
        return Err(LogPipelineError::config("histogram", "must not be empty"));
    }
    if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
        return Err(LogPipelineError::config(
            "histogram",
            format!("bucket edge {bad} is not finite"),
        ));
    }
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(LogPipelineError::config(
            "histogram",
            "bucket edges must be strictly increasing",
        ));
    }
    Ok(())
}

//! 수집 주기 단위 요약 통계 (min/max/avg)

use super::{Snapshot, scale};

/// 한 수집 주기 동안의 실수 관측값 요약
///
/// 관측이 없던 주기에도 `_min`, `_max`, `_avg`를 0으로 내보내
/// 그래프에 빈 구간이 생기지 않게 합니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
}

impl Summary {
    /// 빈 요약
    pub fn new() -> Self {
        Self::default()
    }

    /// 값을 관측합니다.
    pub fn observe(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    /// 관측 수
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 최솟값 (관측이 없으면 `None`)
    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    /// 최댓값 (관측이 없으면 `None`)
    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// 평균 (관측이 없으면 `None`)
    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// 관측을 모두 지웁니다.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `{key}_min`, `{key}_max`, `{key}_avg`, `{key}_sum`, `{key}_count`를 기록합니다.
    pub fn write_to(&self, out: &mut Snapshot, key: &str, mul: i64, div: i64) {
        let count = i64::try_from(self.count).unwrap_or(i64::MAX);
        out.insert(format!("{key}_min"), scale(self.min().unwrap_or(0.0), mul, div));
        out.insert(format!("{key}_max"), scale(self.max().unwrap_or(0.0), mul, div));
        out.insert(format!("{key}_avg"), scale(self.avg().unwrap_or(0.0), mul, div));
        out.insert(format!("{key}_sum"), scale(self.sum, mul, div));
        out.insert(format!("{key}_count"), count);
    }
}

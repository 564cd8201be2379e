//! 메트릭 자료구조 -- 카운터, 고유값 카운터, 요약, 히스토그램, 벡터 카운터
//!
//! 모든 값은 내보낼 때 `mul / div` 배율을 적용해 `i64`로 기록합니다.
//! 출력 채널에는 부동소수점이 없습니다.
//!
//! 수집 주기 경계에서 고유값 카운터와 요약은 초기화되고,
//! 나머지 카운터와 히스토그램은 프로세스 수명 동안 누적됩니다.

mod counter;
mod data;
mod histogram;
mod summary;
mod unique;

pub use counter::{Counter, CounterVec};
pub use data::{MetricData, PatternStats, TIME_DIV, TIME_MUL};
pub use histogram::Histogram;
pub use summary::Summary;
pub use unique::UniqueCounter;

use std::collections::HashMap;

/// 수집 주기 하나의 결과: 평탄한 키 -> 정수 값
pub type Snapshot = HashMap<String, i64>;

/// 실수 값을 배율 적용 후 정수로 바꿉니다 (0 방향 절삭).
pub(crate) fn scale(value: f64, mul: i64, div: i64) -> i64 {
    (value * mul as f64 / div as f64) as i64
}

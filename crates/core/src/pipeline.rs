//! 파이프라인 trait -- 모듈 생명주기 정의
//!
//! [`Pipeline`]은 정적 디스패치용, [`DynPipeline`]은 daemon이
//! 여러 파이프라인을 `Box<dyn DynPipeline>`으로 묶어 관리할 때 사용합니다.
//! `Pipeline`을 구현하면 `DynPipeline`은 자동으로 구현됩니다.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::error::WeblogError;

/// `DynPipeline`이 반환하는 박싱된 future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 파이프라인 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 일부 기능 저하
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// 모듈 생명주기 trait
///
/// 로그 파일 하나당 하나의 파이프라인이 이 trait으로 관리됩니다.
pub trait Pipeline: Send {
    /// 파이프라인을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), WeblogError>> + Send;

    /// 파이프라인을 정지합니다. 진행 중인 수집 주기는 스냅샷 없이 취소됩니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), WeblogError>> + Send;

    /// 현재 건강 상태를 반환합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 객체 안전한 [`Pipeline`] 버전
pub trait DynPipeline: Send {
    /// 파이프라인을 시작합니다.
    fn start(&mut self) -> BoxFuture<'_, Result<(), WeblogError>>;

    /// 파이프라인을 정지합니다.
    fn stop(&mut self) -> BoxFuture<'_, Result<(), WeblogError>>;

    /// 현재 건강 상태를 반환합니다.
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

impl<T: Pipeline> DynPipeline for T {
    fn start(&mut self) -> BoxFuture<'_, Result<(), WeblogError>> {
        Box::pin(Pipeline::start(self))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), WeblogError>> {
        Box::pin(Pipeline::stop(self))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(Pipeline::health_check(self))
    }
}

//! 공통 에러 타입.
//!
//! 데이터 소스/저장소의 세부 에러는 `quant-data`의 `DataError`가 담당합니다.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 잘못된 입력 (심볼, 기간 등)
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 로깅 초기화 에러
    #[error("로깅 초기화 에러: {0}")]
    Logging(String),
}

/// 핵심 작업용 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

//! 심볼별 수집 결과.
//!
//! 각 심볼의 수집+저장 결과는 예외 억제가 아닌 명시적인 값으로 표현됩니다.
//! 오케스트레이터는 이 값을 모아 리포트를 만들고, 실패는 저장 건수 0으로 집계됩니다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 데이터 소스 실패 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFailure {
    /// HTTP 요청 실패 또는 비정상 상태 코드
    Http,
    /// 요청 한도 초과
    RateLimited,
    /// 요청 타임아웃
    Timeout,
    /// 응답 형식 오류
    Malformed,
}

/// 실패 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FailureKind {
    /// 설정 오류 (자격증명, 연결 문자열 누락)
    Config,
    /// 데이터 소스 오류
    Provider(ProviderFailure),
    /// 저장소 오류 (배치 트랜잭션 롤백됨)
    Storage,
    /// 작업 태스크 비정상 종료
    Internal,
}

impl FailureKind {
    /// 다음 주기에 자연 복구될 수 있는 실패인지 확인합니다.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FailureKind::Config)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Config => write!(f, "config"),
            FailureKind::Provider(ProviderFailure::Http) => write!(f, "provider/http"),
            FailureKind::Provider(ProviderFailure::RateLimited) => write!(f, "provider/rate_limited"),
            FailureKind::Provider(ProviderFailure::Timeout) => write!(f, "provider/timeout"),
            FailureKind::Provider(ProviderFailure::Malformed) => write!(f, "provider/malformed"),
            FailureKind::Storage => write!(f, "storage"),
            FailureKind::Internal => write!(f, "internal"),
        }
    }
}

/// 한 심볼의 수집 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolOutcome {
    /// 저장 성공 (저장된 행 수, 데이터 없음이면 0)
    Stored(usize),
    /// 실패
    Failed(FailureKind),
}

impl SymbolOutcome {
    /// 저장된 행 수. 실패는 0입니다.
    pub fn rows(&self) -> usize {
        match self {
            SymbolOutcome::Stored(n) => *n,
            SymbolOutcome::Failed(_) => 0,
        }
    }

    /// 실패 여부.
    pub fn is_failure(&self) -> bool {
        matches!(self, SymbolOutcome::Failed(_))
    }

    /// 실패 분류 (성공이면 None).
    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            SymbolOutcome::Stored(_) => None,
            SymbolOutcome::Failed(kind) => Some(*kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_counts_zero_rows() {
        let outcome = SymbolOutcome::Failed(FailureKind::Provider(ProviderFailure::Timeout));
        assert_eq!(outcome.rows(), 0);
        assert!(outcome.is_failure());
        assert_eq!(
            outcome.failure(),
            Some(FailureKind::Provider(ProviderFailure::Timeout))
        );
    }

    #[test]
    fn test_stored_outcome() {
        let outcome = SymbolOutcome::Stored(42);
        assert_eq!(outcome.rows(), 42);
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_failure_kind_display_and_recoverability() {
        assert_eq!(FailureKind::Storage.to_string(), "storage");
        assert_eq!(
            FailureKind::Provider(ProviderFailure::RateLimited).to_string(),
            "provider/rate_limited"
        );
        assert!(!FailureKind::Config.is_recoverable());
        assert!(FailureKind::Storage.is_recoverable());
    }

    #[test]
    fn test_failure_kind_serialization() {
        let json = serde_json::to_string(&FailureKind::Provider(ProviderFailure::Http)).unwrap();
        assert_eq!(json, r#"{"kind":"provider","detail":"http"}"#);
    }
}

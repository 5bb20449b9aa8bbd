//! 데이터 모듈 오류 타입.

use quant_core::{FailureKind, ProviderFailure};
use thiserror::Error;

/// 데이터 소스/저장소 오류.
///
/// 심볼 단위 결과에 그대로 담을 수 있도록 `Clone`을 구현합니다.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    /// 외부 API 요청 실패 또는 비정상 응답
    #[error("{provider} 요청 오류: {message}")]
    Http { provider: String, message: String },

    /// 요청 한도 초과
    #[error("{provider} 요청 한도 초과")]
    RateLimited { provider: String },

    /// 요청 타임아웃
    #[error("{provider} 요청 타임아웃")]
    Timeout { provider: String },

    /// 응답 형식 오류
    #[error("{provider} 응답 형식 오류: {message}")]
    Malformed { provider: String, message: String },

    /// 데이터 없음
    #[error("데이터 없음: {0}")]
    NotFound(String),

    /// 데이터베이스 연결 오류
    #[error("데이터베이스 연결 오류: {0}")]
    Connection(String),

    /// 쿼리 실행 오류
    #[error("쿼리 오류: {0}")]
    Query(String),

    /// 고유 제약 위반
    #[error("중복 레코드: {0}")]
    Duplicate(String),

    /// 연결 풀 소진
    #[error("연결 풀 소진")]
    PoolExhausted,

    /// 마이그레이션 오류
    #[error("마이그레이션 오류: {0}")]
    Migration(String),

    /// 설정 오류
    #[error("설정 오류: {0}")]
    Config(String),
}

impl DataError {
    /// 심볼 단위 실패 분류로 변환합니다.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            DataError::Http { .. } => FailureKind::Provider(ProviderFailure::Http),
            DataError::RateLimited { .. } => FailureKind::Provider(ProviderFailure::RateLimited),
            DataError::Timeout { .. } => FailureKind::Provider(ProviderFailure::Timeout),
            DataError::Malformed { .. } => FailureKind::Provider(ProviderFailure::Malformed),
            DataError::Config(_) => FailureKind::Config,
            DataError::NotFound(_)
            | DataError::Connection(_)
            | DataError::Query(_)
            | DataError::Duplicate(_)
            | DataError::PoolExhausted
            | DataError::Migration(_) => FailureKind::Storage,
        }
    }

    pub(crate) fn http(provider: &str, message: impl Into<String>) -> Self {
        DataError::Http {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(provider: &str, message: impl Into<String>) -> Self {
        DataError::Malformed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                if code == "23505" {
                    // PostgreSQL 고유 제약 조건 위반
                    DataError::Duplicate(db_err.message().to_string())
                } else {
                    DataError::Query(db_err.message().to_string())
                }
            }
            sqlx::Error::Io(e) => DataError::Connection(e.to_string()),
            _ => DataError::Query(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        let err = DataError::RateLimited {
            provider: "finnhub".to_string(),
        };
        assert_eq!(
            err.failure_kind(),
            FailureKind::Provider(ProviderFailure::RateLimited)
        );

        assert_eq!(DataError::PoolExhausted.failure_kind(), FailureKind::Storage);
        assert_eq!(
            DataError::Config("key".into()).failure_kind(),
            FailureKind::Config
        );
    }

    #[test]
    fn test_sqlx_pool_timeout_conversion() {
        let err: DataError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DataError::PoolExhausted));
    }
}

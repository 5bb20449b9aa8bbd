//! 에러 타입 정의.

use quant_data::DataError;
use std::fmt;

/// Collector 에러 타입
///
/// 시작 단계(설정, DB 연결, 마이그레이션)에서만 전파됩니다.
/// 수집 중 발생한 심볼 단위 실패는 `IngestReport`에 기록됩니다.
#[derive(Debug)]
pub enum CollectorError {
    /// 설정 에러
    Config(String),
    /// 데이터 소스/저장소 에러
    Data(DataError),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Data(e) => write!(f, "Data error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(_) => None,
            Self::Data(e) => Some(e),
        }
    }
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Config(msg) => Self::Config(msg),
            other => Self::Data(other),
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_config_error_becomes_config() {
        let err: CollectorError = DataError::Config("FINNHUB_API_KEY가 비어 있음".into()).into();
        assert!(matches!(err, CollectorError::Config(_)));

        let err: CollectorError = DataError::PoolExhausted.into();
        assert!(matches!(err, CollectorError::Data(DataError::PoolExhausted)));
    }
}

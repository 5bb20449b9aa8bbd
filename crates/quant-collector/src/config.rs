//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use quant_core::{parse_symbol_list, DataKind};
use quant_data::PriceWindow;
use std::time::Duration;

/// 작업별 기본 추적 심볼
const DEFAULT_PRICE_SYMBOLS: &str = "SPY,QQQ,TLT";
const DEFAULT_NEWS_SYMBOLS: &str = "SPY,QQQ,AAPL,MSFT";
const DEFAULT_INSIDER_SYMBOLS: &str = "AAPL,MSFT,GOOGL";

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL (dry-run이면 없어도 됨)
    pub database_url: Option<String>,
    /// Finnhub API 키 (없으면 뉴스/내부자 거래 작업 비활성화)
    pub finnhub_api_key: Option<String>,
    /// 작업별 추적 심볼
    pub symbols: TrackedSymbols,
    /// 스케줄 설정
    pub schedule: ScheduleConfig,
    /// 수집 설정
    pub ingest: IngestConfig,
    /// 연결 풀 최대 크기 (최소 동시 수집 수 이상)
    pub db_max_connections: u32,
}

/// 작업별 추적 심볼
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSymbols {
    pub prices: Vec<String>,
    pub news: Vec<String>,
    pub insider: Vec<String>,
}

impl TrackedSymbols {
    /// 작업 종류에 해당하는 심볼 목록
    pub fn for_kind(&self, kind: DataKind) -> &[String] {
        match kind {
            DataKind::Prices => &self.prices,
            DataKind::News => &self.news,
            DataKind::Insider => &self.insider,
        }
    }
}

/// 스케줄 설정 (분 단위)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub price_interval_minutes: u64,
    pub news_interval_minutes: u64,
    pub insider_interval_minutes: u64,
}

impl ScheduleConfig {
    /// 작업 실행 주기를 Duration으로 반환
    pub fn interval(&self, kind: DataKind) -> Duration {
        let minutes = match kind {
            DataKind::Prices => self.price_interval_minutes,
            DataKind::News => self.news_interval_minutes,
            DataKind::Insider => self.insider_interval_minutes,
        };
        Duration::from_secs(minutes * 60)
    }
}

/// 수집 설정
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// 일회성 가격 수집 구간 (PRICE_HISTORY_PERIOD / PRICE_BAR_INTERVAL)
    pub history_window: PriceWindow,
    /// 뉴스 조회 기간 (일)
    pub news_days_back: u32,
    /// 작업당 동시 수집 심볼 수
    pub concurrency: usize,
    /// 외부 요청 타임아웃 (초)
    pub provider_timeout_secs: u64,
}

impl IngestConfig {
    /// 외부 요청 타임아웃을 Duration으로 반환
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드 (`.env` 포함)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 조회 함수에서 설정 로드
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tracked = non_empty("TRACKED_SYMBOLS");
        let symbols_for = |default: &str| {
            let parsed = parse_symbol_list(tracked.as_deref().unwrap_or(default));
            if parsed.is_empty() {
                parse_symbol_list(default)
            } else {
                parsed
            }
        };

        let history_window = PriceWindow::new(
            &non_empty("PRICE_HISTORY_PERIOD").unwrap_or_else(|| "1y".to_string()),
            &non_empty("PRICE_BAR_INTERVAL").unwrap_or_else(|| "1d".to_string()),
        )
        .map_err(|e| CollectorError::Config(e.to_string()))?;

        let concurrency: usize =
            at_least_one("INGEST_CONCURRENCY", parse_or(&lookup, "INGEST_CONCURRENCY", 4));
        let configured_pool: u32 = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10);
        let db_max_connections = pool_size(configured_pool, concurrency);

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            finnhub_api_key: non_empty("FINNHUB_API_KEY"),
            symbols: TrackedSymbols {
                prices: symbols_for(DEFAULT_PRICE_SYMBOLS),
                news: symbols_for(DEFAULT_NEWS_SYMBOLS),
                insider: symbols_for(DEFAULT_INSIDER_SYMBOLS),
            },
            schedule: ScheduleConfig {
                price_interval_minutes: at_least_one(
                    "PRICE_INGESTION_INTERVAL_MINUTES",
                    parse_or(&lookup, "PRICE_INGESTION_INTERVAL_MINUTES", 5),
                ),
                news_interval_minutes: at_least_one(
                    "NEWS_INGESTION_INTERVAL_MINUTES",
                    parse_or(&lookup, "NEWS_INGESTION_INTERVAL_MINUTES", 60),
                ),
                insider_interval_minutes: at_least_one(
                    "INSIDER_INGESTION_INTERVAL_MINUTES",
                    parse_or(&lookup, "INSIDER_INGESTION_INTERVAL_MINUTES", 60),
                ),
            },
            ingest: IngestConfig {
                history_window,
                news_days_back: parse_or(&lookup, "NEWS_DAYS_BACK", 7),
                concurrency,
                provider_timeout_secs: at_least_one(
                    "PROVIDER_TIMEOUT_SECS",
                    parse_or(&lookup, "PROVIDER_TIMEOUT_SECS", 30),
                ),
            },
            db_max_connections,
        })
    }

    /// 데이터베이스 URL (없으면 설정 에러)
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })
    }

    /// Finnhub API 키 (없으면 설정 에러)
    pub fn require_finnhub_api_key(&self) -> Result<&str> {
        self.finnhub_api_key.as_deref().ok_or_else(|| {
            CollectorError::Config("FINNHUB_API_KEY 환경변수가 설정되지 않았습니다".to_string())
        })
    }
}

/// 값을 파싱 (없거나 실패 시 기본값 사용)
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = key, value = %raw, "잘못된 설정값, 기본값 사용");
            default
        }),
        None => default,
    }
}

/// 0은 허용하지 않음 (주기/동시성/타임아웃)
fn at_least_one<T>(key: &str, value: T) -> T
where
    T: PartialOrd + From<u8> + Copy,
{
    if value < T::from(1) {
        tracing::warn!(key = key, "0은 허용되지 않아 1로 조정");
        T::from(1)
    } else {
        value
    }
}

/// 풀 크기는 작업당 동시 수집 수 이상
fn pool_size(configured: u32, concurrency: usize) -> u32 {
    let required = u32::try_from(concurrency).unwrap_or(u32::MAX);
    if configured < required {
        tracing::warn!(
            configured,
            required,
            "DB_MAX_CONNECTIONS가 INGEST_CONCURRENCY보다 작아 상향 조정"
        );
        required
    } else {
        configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<CollectorConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CollectorConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.symbols.prices, vec!["SPY", "QQQ", "TLT"]);
        assert_eq!(config.symbols.news, vec!["SPY", "QQQ", "AAPL", "MSFT"]);
        assert_eq!(config.symbols.insider, vec!["AAPL", "MSFT", "GOOGL"]);
        assert_eq!(config.schedule.interval(DataKind::Prices), Duration::from_secs(300));
        assert_eq!(config.schedule.interval(DataKind::News), Duration::from_secs(3600));
        assert_eq!(config.ingest.news_days_back, 7);
        assert_eq!(config.ingest.concurrency, 4);
        assert_eq!(config.ingest.provider_timeout(), Duration::from_secs(30));
        assert_eq!(config.ingest.history_window, PriceWindow::default());
        assert_eq!(config.db_max_connections, 10);
        assert!(config.database_url.is_none());
        assert!(config.require_database_url().is_err());
        assert!(config.require_finnhub_api_key().is_err());
    }

    #[test]
    fn test_tracked_symbols_override_all_jobs() {
        let config = config_from(&[("TRACKED_SYMBOLS", " nvda, amd ,nvda")]).unwrap();
        assert_eq!(config.symbols.prices, vec!["NVDA", "AMD"]);
        assert_eq!(config.symbols.for_kind(DataKind::Insider), &["NVDA", "AMD"]);
    }

    #[test]
    fn test_pool_is_raised_to_concurrency() {
        let config =
            config_from(&[("INGEST_CONCURRENCY", "16"), ("DB_MAX_CONNECTIONS", "5")]).unwrap();
        assert_eq!(config.db_max_connections, 16);
    }

    #[test]
    fn test_zero_interval_and_bad_values() {
        let config = config_from(&[
            ("PRICE_INGESTION_INTERVAL_MINUTES", "0"),
            ("NEWS_DAYS_BACK", "abc"),
        ])
        .unwrap();
        assert_eq!(config.schedule.price_interval_minutes, 1);
        assert_eq!(config.ingest.news_days_back, 7);
    }

    #[test]
    fn test_invalid_history_window_is_config_error() {
        let result = config_from(&[("PRICE_HISTORY_PERIOD", "3y")]);
        assert!(matches!(result, Err(CollectorError::Config(_))));
    }

    #[test]
    fn test_blank_credentials_are_missing() {
        let config = config_from(&[("FINNHUB_API_KEY", "  "), ("DATABASE_URL", "postgres://x")])
            .unwrap();
        assert!(config.finnhub_api_key.is_none());
        assert_eq!(config.require_database_url().unwrap(), "postgres://x");
    }
}

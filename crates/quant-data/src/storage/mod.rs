//! 저장소.
//!
//! - [`MarketStore`]: 쓰기 (가격 upsert, 뉴스/내부자 거래 insert-or-ignore)
//! - [`MarketQuery`]: 읽기 전용 조회
//!
//! 구현체:
//! - `PgMarketStore`: PostgreSQL (+ TimescaleDB)
//! - `MemoryStore`: 같은 의미론의 메모리 저장소 (dry-run, 테스트용)

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quant_core::{InsiderRecord, InsiderTransaction, NewsItem, NewsRecord, PriceBar};

use crate::error::{DataError, Result};

pub use memory::MemoryStore;
pub use postgres::{Database, DatabaseConfig, PgMarketStore};

/// 일괄 쓰기 청크 크기.
pub const WRITE_CHUNK_SIZE: usize = 500;

/// 시장 데이터 쓰기.
///
/// 한 번의 호출은 하나의 트랜잭션입니다. 빈 입력은 0을 반환하는 no-op입니다.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// 가격 봉을 upsert합니다. (symbol, timestamp) 충돌 시 값 컬럼 전체를 덮어씁니다.
    ///
    /// 반환값: upsert된 행 수.
    async fn upsert_prices(&self, bars: &[PriceBar]) -> Result<usize>;

    /// 뉴스를 저장합니다. 중복은 조용히 건너뜁니다.
    ///
    /// 반환값: 실제로 삽입된 행 수.
    async fn insert_news(&self, items: &[NewsItem]) -> Result<usize>;

    /// 내부자 거래를 저장합니다. 중복은 조용히 건너뜁니다.
    async fn insert_insider(&self, transactions: &[InsiderTransaction]) -> Result<usize>;
}

/// 시장 데이터 조회 (읽기 전용).
#[async_trait]
pub trait MarketQuery: Send + Sync {
    /// 기간 내 가격을 오름차순으로 조회합니다. 경계가 None이면 열린 구간입니다.
    ///
    /// 구간은 `[start, end)`입니다.
    async fn prices_between(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<PriceBar>>;

    /// 최근 `limit`개의 가격을 오름차순으로 조회합니다.
    async fn latest_prices(&self, symbol: &str, limit: i64) -> Result<Vec<PriceBar>>;

    /// 최근 뉴스를 시간 역순으로 조회합니다.
    async fn latest_news(&self, symbol: &str, limit: i64) -> Result<Vec<NewsRecord>>;

    /// 최근 내부자 거래를 거래일 역순으로 조회합니다.
    async fn latest_insider(&self, symbol: &str, limit: i64) -> Result<Vec<InsiderRecord>>;

    /// 저장소 상태를 확인합니다.
    async fn health_check(&self) -> Result<bool>;

    /// `[start, end)` 구간의 가격을 오름차순으로 조회합니다.
    async fn prices_in_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>> {
        self.prices_between(symbol, Some(start), Some(end)).await
    }

    /// 가격을 조회합니다.
    ///
    /// 경계가 하나라도 있으면 구간 조회 후 마지막 `limit`개, 없으면 최근 `limit`개입니다.
    /// 결과가 비어 있으면 `DataError::NotFound`입니다.
    async fn prices(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<PriceBar>> {
        let bars = if start.is_some() || end.is_some() {
            let mut bars = self.prices_between(symbol, start, end).await?;
            let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
            if bars.len() > limit {
                bars.drain(..bars.len() - limit);
            }
            bars
        } else {
            self.latest_prices(symbol, limit).await?
        };

        if bars.is_empty() {
            return Err(DataError::NotFound(format!(
                "{} 가격 데이터 없음",
                symbol.to_uppercase()
            )));
        }
        Ok(bars)
    }
}

/// 같은 (symbol, timestamp)의 가격 봉을 하나로 합칩니다. 나중 값이 우선합니다.
///
/// 입력 순서(첫 등장 위치)는 유지됩니다.
pub fn collapse_price_batch(bars: &[PriceBar]) -> Vec<PriceBar> {
    let mut position: HashMap<(&str, DateTime<Utc>), usize> = HashMap::with_capacity(bars.len());
    let mut out: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match position.get(&(bar.symbol.as_str(), bar.timestamp)) {
            Some(&i) => out[i] = bar.clone(),
            None => {
                position.insert((bar.symbol.as_str(), bar.timestamp), out.len());
                out.push(bar.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_collapse_price_batch_last_wins() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let bars = vec![
            PriceBar::new("SPY", ts, 1.0, 1.0, 1.0, 1.0, 1),
            PriceBar::new("SPY", later, 3.0, 3.0, 3.0, 3.0, 3),
            PriceBar::new("SPY", ts, 2.0, 2.0, 2.0, 2.0, 2),
            PriceBar::new("QQQ", ts, 9.0, 9.0, 9.0, 9.0, 9),
        ];

        let collapsed = collapse_price_batch(&bars);
        assert_eq!(collapsed.len(), 3);
        assert_eq!(collapsed[0].close, 2.0);
        assert_eq!(collapsed[1].timestamp, later);
        assert_eq!(collapsed[2].symbol, "QQQ");
    }
}

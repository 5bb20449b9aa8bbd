//! 메모리 저장소.
//!
//! PostgreSQL 저장소와 같은 중복 처리 규칙을 따릅니다. 배치 하나를 처리하는 동안
//! 잠금을 유지하므로 배치 단위로 원자적입니다.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use quant_core::{InsiderRecord, InsiderTransaction, NewsItem, NewsRecord, PriceBar};
use tokio::sync::Mutex;

use super::{collapse_price_batch, MarketQuery, MarketStore};
use crate::error::Result;

type InsiderKey = (String, NaiveDate, String, String);

#[derive(Debug, Default)]
struct Tables {
    prices: BTreeMap<(String, DateTime<Utc>), PriceBar>,
    news: Vec<NewsRecord>,
    news_keys: HashSet<(String, DateTime<Utc>, String)>,
    insider: Vec<InsiderRecord>,
    insider_keys: HashSet<InsiderKey>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// 메모리 시장 데이터 저장소.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 가격 행 수.
    pub async fn price_count(&self) -> usize {
        self.tables.lock().await.prices.len()
    }

    /// 저장된 뉴스 행 수.
    pub async fn news_count(&self) -> usize {
        self.tables.lock().await.news.len()
    }

    /// 저장된 내부자 거래 행 수.
    pub async fn insider_count(&self) -> usize {
        self.tables.lock().await.insider.len()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn upsert_prices(&self, bars: &[PriceBar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }
        let bars = collapse_price_batch(bars);
        let mut tables = self.tables.lock().await;
        for bar in &bars {
            tables
                .prices
                .insert((bar.symbol.clone(), bar.timestamp), bar.clone());
        }
        Ok(bars.len())
    }

    async fn insert_news(&self, items: &[NewsItem]) -> Result<usize> {
        let mut tables = self.tables.lock().await;
        let mut inserted = 0;
        for item in items {
            if !tables.news_keys.insert(item.dedup_key()) {
                continue;
            }
            let id = tables.next_id();
            tables.news.push(NewsRecord {
                id,
                symbol: item.symbol.clone(),
                timestamp: item.timestamp,
                headline: item.headline.clone(),
                summary: item.summary.clone(),
                source: item.source.clone(),
                url: item.url.clone(),
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn insert_insider(&self, transactions: &[InsiderTransaction]) -> Result<usize> {
        let mut tables = self.tables.lock().await;
        let mut inserted = 0;
        for txn in transactions {
            if !tables.insider_keys.insert(txn.dedup_key()) {
                continue;
            }
            let id = tables.next_id();
            tables.insider.push(InsiderRecord {
                id,
                symbol: txn.symbol.clone(),
                transaction_date: txn.transaction_date,
                transaction_type: txn.transaction_type.clone(),
                shares: txn.shares,
                price: txn.price,
                value: txn.value,
                insider_name: txn.insider_name.clone().filter(|n| !n.is_empty()),
                source: txn.source.clone(),
            });
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[async_trait]
impl MarketQuery for MemoryStore {
    async fn prices_between(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<PriceBar>> {
        let symbol = symbol.to_uppercase();
        let tables = self.tables.lock().await;
        Ok(tables
            .prices
            .values()
            .filter(|b| b.symbol == symbol)
            .filter(|b| start.map_or(true, |s| b.timestamp >= s))
            .filter(|b| end.map_or(true, |e| b.timestamp < e))
            .cloned()
            .collect())
    }

    async fn latest_prices(&self, symbol: &str, limit: i64) -> Result<Vec<PriceBar>> {
        let mut bars = self.prices_between(symbol, None, None).await?;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        if bars.len() > limit {
            bars.drain(..bars.len() - limit);
        }
        Ok(bars)
    }

    async fn latest_news(&self, symbol: &str, limit: i64) -> Result<Vec<NewsRecord>> {
        let symbol = symbol.to_uppercase();
        let tables = self.tables.lock().await;
        let mut records: Vec<NewsRecord> = tables
            .news
            .iter()
            .filter(|n| n.symbol == symbol)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        records.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(records)
    }

    async fn latest_insider(&self, symbol: &str, limit: i64) -> Result<Vec<InsiderRecord>> {
        let symbol = symbol.to_uppercase();
        let tables = self.tables.lock().await;
        let mut records: Vec<InsiderRecord> = tables
            .insider
            .iter()
            .filter(|t| t.symbol == symbol)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.id.cmp(&a.id))
        });
        records.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(records)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

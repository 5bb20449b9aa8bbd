//! Yahoo Finance 가격 소스.
//!
//! `yahoo_finance_api` 크레이트의 차트 API를 사용합니다. 심볼별 요청을 최대 `concurrency`개까지
//! 동시에 보내고 결과를 하나의 프레임으로 조립합니다. 실패한 심볼은 컬럼 대신
//! `BulkPrices::failures`에 원인과 함께 남습니다.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};
use yahoo_finance_api::YahooConnector;

use super::frame::{PriceFrame, RawQuote};
use super::price::{BulkPrices, PriceSource, PriceWindow};
use crate::error::{DataError, Result};

const PROVIDER: &str = "yahoo";

/// Yahoo Finance 가격 소스.
pub struct YahooPriceSource {
    connector: YahooConnector,
    timeout: Duration,
    concurrency: usize,
}

impl YahooPriceSource {
    /// 요청 타임아웃을 지정하여 생성합니다.
    pub fn new(timeout: Duration) -> Result<Self> {
        let connector = YahooConnector::new()
            .map_err(|e| DataError::Config(format!("Yahoo Finance 연결 실패: {}", e)))?;
        Ok(Self {
            connector,
            timeout,
            concurrency: 4,
        })
    }

    /// 동시 요청 수 상한 (최소 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    async fn fetch_symbol(&self, symbol: &str, window: &PriceWindow) -> Result<Vec<RawQuote>> {
        debug!(
            symbol = symbol,
            interval = window.interval(),
            range = window.period(),
            "Yahoo Finance API 호출"
        );

        let request = self
            .connector
            .get_quote_range(symbol, window.interval(), window.period());
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| DataError::Timeout {
                provider: PROVIDER.to_string(),
            })?
            .map_err(|e| DataError::http(PROVIDER, format!("{} 조회 실패: {}", symbol, e)))?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::malformed(PROVIDER, format!("{} quote 파싱 오류: {}", symbol, e)))?;

        Ok(quotes
            .iter()
            .filter_map(|q| {
                let timestamp = Utc.timestamp_opt(q.timestamp as i64, 0).single()?;
                Some(RawQuote {
                    timestamp,
                    open: finite(q.open),
                    high: finite(q.high),
                    low: finite(q.low),
                    close: finite(q.close),
                    adj_close: finite(q.adjclose),
                    volume: Some(q.volume as f64),
                })
            })
            .collect())
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// 심볼별 조회를 `concurrency`개까지 동시에 실행하고 하나의 결과로 모읍니다.
///
/// 요청 심볼이 하나이고 성공하면 평면 프레임, 그 외에는 심볼 컬럼 프레임을 만듭니다.
async fn fetch_bounded<'a, F, Fut>(
    symbols: &'a [String],
    concurrency: usize,
    fetch: F,
) -> BulkPrices
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = Result<Vec<RawQuote>>>,
{
    let requests: Vec<_> = symbols
        .iter()
        .map(|symbol| {
            let request = fetch(symbol.as_str());
            async move { (symbol.to_uppercase(), request.await) }
        })
        .collect();
    let results: Vec<(String, Result<Vec<RawQuote>>)> = stream::iter(requests)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut series = Vec::with_capacity(results.len());
    let mut failures = BTreeMap::new();
    for (symbol, result) in results {
        match result {
            Ok(quotes) => series.push((symbol, quotes)),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "심볼 가격 조회 실패");
                failures.insert(symbol, e);
            }
        }
    }

    let frame = if symbols.len() == 1 {
        series
            .pop()
            .map(|(_, quotes)| PriceFrame::flat(quotes))
            .unwrap_or_default()
    } else {
        PriceFrame::multi(series)
    };
    BulkPrices { frame, failures }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_frame(&self, symbols: &[String], window: &PriceWindow) -> Result<BulkPrices> {
        if symbols.is_empty() {
            return Ok(BulkPrices::default());
        }

        let bulk = fetch_bounded(symbols, self.concurrency, |symbol| {
            self.fetch_symbol(symbol, window)
        })
        .await;
        Ok(bulk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn quote() -> RawQuote {
        RawQuote {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open: Some(1.0),
            high: Some(2.0),
            low: Some(0.5),
            close: Some(1.5),
            adj_close: None,
            volume: Some(10.0),
        }
    }

    #[tokio::test]
    async fn test_requests_in_flight_stay_within_concurrency() {
        let symbols: Vec<String> = ["aapl", "msft", "nvda", "amzn", "googl", "meta"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let bulk = fetch_bounded(&symbols, 2, |_symbol| {
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(vec![quote()])
            }
        })
        .await;

        assert!(max_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 2);
        assert!(bulk.failures.is_empty());
        assert!(bulk.frame.is_multi_symbol());
    }

    #[tokio::test]
    async fn test_failed_symbol_is_reported_not_dropped() {
        let symbols = vec!["AAPL".to_string(), "fail".to_string()];

        let bulk = fetch_bounded(&symbols, 4, |symbol| async move {
            if symbol == "fail" {
                Err(DataError::Timeout {
                    provider: PROVIDER.to_string(),
                })
            } else {
                Ok(vec![quote()])
            }
        })
        .await;

        assert_eq!(bulk.failures.len(), 1);
        assert!(matches!(bulk.failures["FAIL"], DataError::Timeout { .. }));
        assert!(bulk.frame.is_multi_symbol());
    }

    #[tokio::test]
    async fn test_single_symbol_failure_leaves_empty_frame() {
        let symbols = vec!["AAPL".to_string()];

        let bulk = fetch_bounded(&symbols, 4, |_| async {
            Err(DataError::http(PROVIDER, "503"))
        })
        .await;

        assert!(bulk.frame.is_empty());
        assert!(bulk.failures.contains_key("AAPL"));
    }
}

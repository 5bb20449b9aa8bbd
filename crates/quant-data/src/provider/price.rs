//! 가격 데이터 어댑터.
//!
//! 가격 소스는 여러 심볼을 한 번에 조회해 [`BulkPrices`]를 돌려줍니다.
//! [`PriceAdapter`]는 그 프레임을 심볼별 가격 봉으로 분해합니다. 조회에 실패한 심볼은
//! 프레임에서 빠지는 대신 실패 원인과 함께 기록됩니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use quant_core::PriceBar;

use super::fields::{FieldMap, PriceField};
use super::frame::PriceFrame;
use crate::error::{DataError, Result};

/// 지원하는 조회 기간.
pub const VALID_PERIODS: &[&str] = &[
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];

/// 지원하는 봉 간격.
pub const VALID_INTERVALS: &[&str] = &[
    "1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo",
];

/// 가격 조회 구간 (기간 + 봉 간격).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceWindow {
    period: String,
    interval: String,
}

impl PriceWindow {
    /// 기간과 간격을 검증하여 생성합니다.
    pub fn new(period: &str, interval: &str) -> Result<Self> {
        let period = period.trim().to_lowercase();
        let interval = interval.trim().to_lowercase();
        if !VALID_PERIODS.contains(&period.as_str()) {
            return Err(DataError::Config(format!(
                "지원하지 않는 기간: {} (가능: {})",
                period,
                VALID_PERIODS.join(", ")
            )));
        }
        if !VALID_INTERVALS.contains(&interval.as_str()) {
            return Err(DataError::Config(format!(
                "지원하지 않는 간격: {} (가능: {})",
                interval,
                VALID_INTERVALS.join(", ")
            )));
        }
        Ok(Self { period, interval })
    }

    /// 최신 가격 조회용 구간 (1일 기간, 일봉).
    pub fn latest() -> Self {
        Self {
            period: "1d".to_string(),
            interval: "1d".to_string(),
        }
    }

    pub fn period(&self) -> &str {
        &self.period
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }
}

impl Default for PriceWindow {
    fn default() -> Self {
        Self {
            period: "1y".to_string(),
            interval: "1d".to_string(),
        }
    }
}

impl std::fmt::Display for PriceWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.period, self.interval)
    }
}

/// 일괄 가격 조회 결과.
#[derive(Debug, Clone, Default)]
pub struct BulkPrices {
    pub frame: PriceFrame,
    /// 조회에 실패한 심볼 (대문자) 과 원인
    pub failures: BTreeMap<String, DataError>,
}

impl BulkPrices {
    pub fn new(frame: PriceFrame) -> Self {
        Self {
            frame,
            failures: BTreeMap::new(),
        }
    }

    /// 심볼 실패를 기록합니다.
    pub fn with_failure(mut self, symbol: &str, error: DataError) -> Self {
        self.failures.insert(symbol.to_uppercase(), error);
        self
    }
}

/// 가격 프레임 소스.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// 소스 이름 (로그용).
    fn name(&self) -> &'static str;

    /// 심볼 목록의 가격을 한 번에 조회합니다.
    ///
    /// 심볼이 하나면 평면 프레임, 여러 개면 `(필드, 심볼)` 컬럼 프레임을 반환합니다.
    /// 일부 심볼의 실패는 `failures`에 담고, 요청 전체가 실패했을 때만 `Err`입니다.
    async fn fetch_frame(&self, symbols: &[String], window: &PriceWindow) -> Result<BulkPrices>;
}

/// 가격 어댑터.
pub struct PriceAdapter {
    source: Arc<dyn PriceSource>,
    fields: FieldMap<PriceField>,
}

impl PriceAdapter {
    /// 기본 필드 테이블로 어댑터를 생성합니다.
    pub fn new(source: Arc<dyn PriceSource>) -> Result<Self> {
        Ok(Self {
            source,
            fields: PriceField::default_map()?,
        })
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// 소스에서 가격을 조회합니다.
    pub async fn fetch_frame(
        &self,
        symbols: &[String],
        window: &PriceWindow,
    ) -> Result<BulkPrices> {
        self.source.fetch_frame(symbols, window).await
    }

    /// 조회 결과를 심볼별 결과로 분해합니다.
    ///
    /// 소스가 실패로 보고한 심볼은 그 원인을, 나머지는 프레임에서 추출한 봉을 돌려줍니다.
    /// 한 심볼의 분해 실패는 다른 심볼에 영향을 주지 않습니다.
    pub fn decompose(
        &self,
        bulk: &BulkPrices,
        symbols: &[String],
    ) -> BTreeMap<String, Result<Vec<PriceBar>>> {
        symbols
            .iter()
            .map(|symbol| {
                let symbol = symbol.to_uppercase();
                let bars = match bulk.failures.get(&symbol) {
                    Some(error) => Err(error.clone()),
                    None => bulk.frame.project(&symbol, symbols.len(), &self.fields),
                };
                (symbol, bars)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::frame::RawQuote;
    use chrono::{TimeZone, Utc};

    struct StaticSource {
        bulk: BulkPrices,
    }

    #[async_trait]
    impl PriceSource for StaticSource {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn fetch_frame(&self, _: &[String], _: &PriceWindow) -> Result<BulkPrices> {
            Ok(self.bulk.clone())
        }
    }

    fn quote(day: u32) -> RawQuote {
        RawQuote {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: Some(1.0),
            high: Some(2.0),
            low: Some(0.5),
            close: Some(1.5),
            adj_close: None,
            volume: Some(10.0),
        }
    }

    #[test]
    fn test_price_window_validation() {
        assert!(PriceWindow::new("1y", "1d").is_ok());
        assert!(PriceWindow::new("YTD", "1WK").is_ok());
        assert!(PriceWindow::new("3y", "1d").is_err());
        assert!(PriceWindow::new("1y", "2h").is_err());
        assert_eq!(PriceWindow::latest().to_string(), "1d/1d");
        assert_eq!(PriceWindow::default().period(), "1y");
    }

    #[tokio::test]
    async fn test_decompose_separates_absent_and_failed_symbols() {
        let frame = PriceFrame::multi(vec![("AAPL".to_string(), vec![quote(2), quote(3)])]);
        let bulk = BulkPrices::new(frame).with_failure(
            "nvda",
            DataError::Timeout {
                provider: "static".to_string(),
            },
        );
        let adapter = PriceAdapter::new(Arc::new(StaticSource { bulk })).unwrap();
        let symbols = vec!["AAPL".to_string(), "MSFT".to_string(), "NVDA".to_string()];

        let bulk = adapter
            .fetch_frame(&symbols, &PriceWindow::default())
            .await
            .unwrap();
        let result = adapter.decompose(&bulk, &symbols);

        assert_eq!(result["AAPL"].as_ref().unwrap().len(), 2);
        assert!(result["MSFT"].as_ref().unwrap().is_empty());
        assert!(matches!(result["NVDA"], Err(DataError::Timeout { .. })));
    }
}

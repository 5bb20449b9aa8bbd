//! 데이터 소스 어댑터.
//!
//! ## 가격
//! - `YahooPriceSource`: Yahoo Finance 차트 API (여러 심볼을 한 프레임으로)
//! - `PriceAdapter`: 프레임을 심볼별 가격 봉으로 분해
//!
//! ## 뉴스/내부자 거래
//! - `FinnhubClient`: Finnhub REST (`NewsSource`, `InsiderSource` 구현)
//!
//! 모든 어댑터는 심볼 단위로 실패하며, 실패 원인은 호출자가 심볼별로 기록합니다.

pub mod fields;
pub mod finnhub;
pub mod frame;
pub mod price;
pub mod yahoo;

use async_trait::async_trait;
use quant_core::{InsiderTransaction, NewsItem};

use crate::error::Result;

pub use fields::{CanonicalField, FieldMap, InsiderField, NewsField, PriceField};
pub use finnhub::FinnhubClient;
pub use frame::{ColumnKey, PriceFrame, RawQuote};
pub use price::{
    BulkPrices, PriceAdapter, PriceSource, PriceWindow, VALID_INTERVALS, VALID_PERIODS,
};
pub use yahoo::YahooPriceSource;

/// 기업 뉴스 소스.
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// 한 심볼의 최근 뉴스를 조회합니다.
    async fn fetch_news(&self, symbol: &str, days_back: u32) -> Result<Vec<NewsItem>>;
}

/// 내부자 거래 소스.
#[async_trait]
pub trait InsiderSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// 한 심볼의 내부자 거래를 조회합니다.
    async fn fetch_insider(&self, symbol: &str) -> Result<Vec<InsiderTransaction>>;
}

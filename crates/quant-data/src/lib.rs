//! 시장 데이터 수집 및 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - 데이터 소스 어댑터 (Yahoo Finance 가격, Finnhub 뉴스/내부자 거래)
//! - 소스 필드 이름 매핑과 가격 프레임 분해
//! - PostgreSQL/TimescaleDB 저장소와 메모리 저장소
//! - 읽기 전용 조회

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use provider::{
    BulkPrices, FieldMap, FinnhubClient, InsiderSource, NewsSource, PriceAdapter, PriceFrame, PriceSource,
    PriceWindow, YahooPriceSource,
};
pub use storage::{
    Database, DatabaseConfig, MarketQuery, MarketStore, MemoryStore, PgMarketStore,
};

//! 정규화된 시장 데이터 레코드.
//!
//! 데이터 소스마다 다른 페이로드를 아래의 공통 형태로 변환한 뒤 저장합니다:
//! - `PriceBar` - OHLCV 가격 봉 (키: symbol, timestamp)
//! - `NewsItem` - 기업 뉴스 (중복 키: symbol, timestamp, headline)
//! - `InsiderTransaction` - 내부자 거래 (중복 키: symbol, transaction_date, transaction_type, insider_name)
//!
//! `NewsRecord`, `InsiderRecord`는 저장소가 부여한 `id`를 포함한 조회용 모델입니다.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 수집 데이터 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// OHLCV 가격
    Prices,
    /// 기업 뉴스
    News,
    /// 내부자 거래
    Insider,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Prices => write!(f, "prices"),
            DataKind::News => write!(f, "news"),
            DataKind::Insider => write!(f, "insider"),
        }
    }
}

/// OHLCV 가격 봉.
///
/// 같은 (symbol, timestamp)로 다시 수집되면 값 컬럼 전체를 덮어씁니다.
/// 데이터 소스가 수정주가를 재발행할 수 있기 때문입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct PriceBar {
    /// 티커 (대문자)
    pub symbol: String,
    /// 봉 시작 시간
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    pub volume: i64,
}

impl PriceBar {
    /// 새 가격 봉을 생성합니다.
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// 기업 뉴스 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// 티커 (대문자)
    pub symbol: String,
    /// 게시 시간
    pub timestamp: DateTime<Utc>,
    /// 헤드라인
    pub headline: String,
    /// 요약
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// 출처
    pub source: String,
    /// 원문 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl NewsItem {
    /// 중복 판단 키 (symbol, timestamp, headline).
    pub fn dedup_key(&self) -> (String, DateTime<Utc>, String) {
        (self.symbol.clone(), self.timestamp, self.headline.clone())
    }
}

/// 저장된 뉴스 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct NewsRecord {
    /// 저장소가 부여한 ID
    pub id: i64,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub headline: String,
    pub summary: Option<String>,
    pub source: String,
    pub url: Option<String>,
}

/// 내부자 거래.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTransaction {
    /// 티커 (대문자)
    pub symbol: String,
    /// 거래일
    pub transaction_date: NaiveDate,
    /// 거래 유형 (예: "S", "P", "Sale")
    pub transaction_type: String,
    /// 거래 주식 수
    pub shares: f64,
    /// 거래 단가
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// 거래 금액
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// 내부자 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insider_name: Option<String>,
    /// 출처
    pub source: String,
}

impl InsiderTransaction {
    /// 중복 판단 키 (symbol, transaction_date, transaction_type, insider_name).
    ///
    /// 이름이 없으면 빈 문자열로 취급합니다. 저장소의 유니크 제약과 동일한 규칙입니다.
    pub fn dedup_key(&self) -> (String, NaiveDate, String, String) {
        (
            self.symbol.clone(),
            self.transaction_date,
            self.transaction_type.clone(),
            self.insider_name.clone().unwrap_or_default(),
        )
    }
}

/// 저장된 내부자 거래 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct InsiderRecord {
    /// 저장소가 부여한 ID
    pub id: i64,
    pub symbol: String,
    pub transaction_date: NaiveDate,
    pub transaction_type: String,
    pub shares: f64,
    pub price: Option<f64>,
    pub value: Option<f64>,
    pub insider_name: Option<String>,
    pub source: String,
}

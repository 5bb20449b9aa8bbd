//! Finnhub 뉴스/내부자 거래 클라이언트.
//!
//! 엔드포인트:
//! - `/company-news`: 기업 뉴스 (JSON 배열)
//! - `/stock/insider-transactions`: 내부자 거래 (`{"data": [...]}`)
//!
//! API 키는 `X-Finnhub-Token` 헤더로 전송합니다. 무료 플랜은 분당 60회로 제한됩니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use quant_core::{InsiderTransaction, NewsItem};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::fields::{
    value_as_date, value_as_f64, value_as_string, value_as_timestamp, FieldMap, InsiderField,
    NewsField,
};
use super::{InsiderSource, NewsSource};
use crate::error::{DataError, Result};

/// 기본 API 주소.
pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

const PROVIDER: &str = "finnhub";

/// Finnhub 오류 응답.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

/// Finnhub REST 클라이언트.
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: String,
    news_fields: FieldMap<NewsField>,
    insider_fields: FieldMap<InsiderField>,
}

impl FinnhubClient {
    /// 새 클라이언트를 생성합니다. 빈 API 키는 설정 오류입니다.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DataError::Config("FINNHUB_API_KEY가 비어 있음".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            news_fields: NewsField::default_map()?,
            insider_fields: InsiderField::default_map()?,
        })
    }

    /// API 주소를 바꿉니다 (테스트 서버용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// GET 요청 후 JSON 본문을 반환합니다.
    async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(endpoint = endpoint, params = params.len(), "Finnhub 요청");

        let response = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", &self.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DataError::Timeout {
                        provider: PROVIDER.to_string(),
                    }
                } else {
                    DataError::http(PROVIDER, format!("요청 실패: {}", e))
                }
            })?;

        let status = response.status();
        match status {
            // 403은 플랜 한도 초과
            StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => {
                return Err(DataError::RateLimited {
                    provider: PROVIDER.to_string(),
                });
            }
            StatusCode::UNAUTHORIZED => {
                return Err(DataError::http(PROVIDER, "API 키가 유효하지 않음"));
            }
            _ => {}
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("HTTP {} - {}", status, body));
            return Err(DataError::http(PROVIDER, message));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DataError::Timeout {
                    provider: PROVIDER.to_string(),
                }
            } else {
                DataError::http(PROVIDER, format!("응답 읽기 실패: {}", e))
            }
        })?;

        serde_json::from_str(&body)
            .map_err(|e| DataError::malformed(PROVIDER, format!("JSON 파싱 실패: {}", e)))
    }

    /// 기간을 지정해 기업 뉴스를 조회합니다 (양 끝 포함).
    pub async fn company_news_between(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsItem>> {
        let symbol = symbol.to_uppercase();
        let payload = self
            .fetch(
                "/company-news",
                &[
                    ("symbol", symbol.clone()),
                    ("from", from.format("%Y-%m-%d").to_string()),
                    ("to", to.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;

        let Value::Array(items) = payload else {
            return Err(DataError::malformed(
                PROVIDER,
                format!("{} 뉴스 응답이 배열이 아님", symbol),
            ));
        };

        Ok(parse_news(&symbol, &items, &self.news_fields))
    }

    /// 최근 `days_back`일 동안의 기업 뉴스를 조회합니다.
    pub async fn company_news(&self, symbol: &str, days_back: u32) -> Result<Vec<NewsItem>> {
        let to = Utc::now().date_naive();
        let from = to
            .checked_sub_days(Days::new(u64::from(days_back)))
            .unwrap_or(to);
        self.company_news_between(symbol, from, to).await
    }

    /// 내부자 거래를 조회합니다.
    pub async fn insider_transactions(&self, symbol: &str) -> Result<Vec<InsiderTransaction>> {
        let symbol = symbol.to_uppercase();
        let payload = self
            .fetch("/stock/insider-transactions", &[("symbol", symbol.clone())])
            .await?;

        let items = match payload.get("data") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => return Ok(Vec::new()),
            _ => {
                return Err(DataError::malformed(
                    PROVIDER,
                    format!("{} 내부자 거래 응답에 data 배열이 없음", symbol),
                ))
            }
        };

        Ok(parse_insider(&symbol, items, &self.insider_fields))
    }
}

#[async_trait]
impl NewsSource for FinnhubClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_news(&self, symbol: &str, days_back: u32) -> Result<Vec<NewsItem>> {
        self.company_news(symbol, days_back).await
    }
}

#[async_trait]
impl InsiderSource for FinnhubClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_insider(&self, symbol: &str) -> Result<Vec<InsiderTransaction>> {
        self.insider_transactions(symbol).await
    }
}

/// 뉴스 항목 목록을 정규화합니다. 타임스탬프나 헤드라인이 없는 항목은 제외합니다.
pub fn parse_news(symbol: &str, items: &[Value], fields: &FieldMap<NewsField>) -> Vec<NewsItem> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            warn!(symbol = symbol, index = i, "뉴스 항목이 객체가 아님");
            continue;
        };
        let record = fields.normalize(object);

        let timestamp = record.get(&NewsField::Timestamp).and_then(|v| value_as_timestamp(v));
        let headline = record.get(&NewsField::Headline).and_then(|v| value_as_string(v));
        let (Some(timestamp), Some(headline)) = (timestamp, headline) else {
            warn!(symbol = symbol, index = i, "타임스탬프 또는 헤드라인 없는 뉴스 제외");
            continue;
        };

        out.push(NewsItem {
            symbol: symbol.to_uppercase(),
            timestamp,
            headline,
            summary: record.get(&NewsField::Summary).and_then(|v| value_as_string(v)),
            source: record
                .get(&NewsField::Source)
                .and_then(|v| value_as_string(v))
                .unwrap_or_else(|| PROVIDER.to_string()),
            url: record.get(&NewsField::Url).and_then(|v| value_as_string(v)),
        });
    }
    out
}

/// 내부자 거래 목록을 정규화합니다. 거래일이 없는 항목은 제외합니다.
pub fn parse_insider(
    symbol: &str,
    items: &[Value],
    fields: &FieldMap<InsiderField>,
) -> Vec<InsiderTransaction> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            warn!(symbol = symbol, index = i, "내부자 거래 항목이 객체가 아님");
            continue;
        };
        let record = fields.normalize(object);

        let Some(transaction_date) = record.get(&InsiderField::Date).and_then(|v| value_as_date(v))
        else {
            warn!(symbol = symbol, index = i, "거래일 없는 내부자 거래 제외");
            continue;
        };

        out.push(InsiderTransaction {
            symbol: symbol.to_uppercase(),
            transaction_date,
            transaction_type: record
                .get(&InsiderField::Type)
                .and_then(|v| value_as_string(v))
                .unwrap_or_default(),
            shares: record
                .get(&InsiderField::Shares)
                .and_then(|v| value_as_f64(v))
                .unwrap_or(0.0),
            price: record.get(&InsiderField::Price).and_then(|v| value_as_f64(v)),
            value: record.get(&InsiderField::Value).and_then(|v| value_as_f64(v)),
            insider_name: record.get(&InsiderField::Name).and_then(|v| value_as_string(v)),
            source: PROVIDER.to_string(),
        });
    }
    out
}

//! 데이터 소스 필드 이름 매핑.
//!
//! 데이터 소스마다 같은 개념을 다른 키로 보냅니다 ("Open"/"open", "headline"/"title",
//! "datetime"/"timestamp" 등). [`FieldMap`]은 소스 키를 정규 필드로 바꾸는 테이블이며,
//! 생성 시점에 검증됩니다:
//! - 필수 필드마다 최소 한 개의 철자가 있어야 함
//! - 하나의 철자가 서로 다른 두 필드를 가리키면 안 됨
//!
//! 키 비교는 대소문자를 구분하지 않습니다. 한 객체에 같은 필드의 철자가 여러 개 있으면
//! 테이블에서 먼저 나온 철자가 우선합니다.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::{DataError, Result};

/// 정규 필드 집합.
pub trait CanonicalField: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// 모든 필드.
    const ALL: &'static [Self];

    /// 필수 필드 여부.
    fn is_required(&self) -> bool;

    /// 필드 이름 (로그용).
    fn name(&self) -> &'static str;
}

/// 검증된 소스 키 → 정규 필드 테이블.
#[derive(Debug, Clone)]
pub struct FieldMap<F> {
    /// 소문자 키 → (필드, 우선순위)
    entries: HashMap<String, (F, usize)>,
}

impl<F: CanonicalField> FieldMap<F> {
    /// 철자 목록으로 테이블을 생성합니다. 목록 순서가 우선순위입니다.
    pub fn new(spellings: &[(&str, F)]) -> Result<Self> {
        let mut entries: HashMap<String, (F, usize)> = HashMap::new();

        for (priority, (spelling, field)) in spellings.iter().enumerate() {
            let key = spelling.trim().to_lowercase();
            if key.is_empty() {
                return Err(DataError::Config(format!(
                    "{} 필드에 빈 철자가 지정됨",
                    field.name()
                )));
            }
            match entries.get(&key) {
                Some((existing, _)) if existing != field => {
                    return Err(DataError::Config(format!(
                        "철자 '{}'가 {}와 {} 두 필드에 매핑됨",
                        spelling,
                        existing.name(),
                        field.name()
                    )));
                }
                Some(_) => continue,
                None => {
                    entries.insert(key, (*field, priority));
                }
            }
        }

        for field in F::ALL.iter().filter(|f| f.is_required()) {
            if !entries.values().any(|(f, _)| f == field) {
                return Err(DataError::Config(format!(
                    "필수 필드 {}에 대한 철자가 없음",
                    field.name()
                )));
            }
        }

        Ok(Self { entries })
    }

    /// 소스 키를 정규 필드로 변환합니다.
    pub fn resolve(&self, key: &str) -> Option<F> {
        self.resolve_with_priority(key).map(|(f, _)| f)
    }

    pub(crate) fn resolve_with_priority(&self, key: &str) -> Option<(F, usize)> {
        self.entries.get(&key.trim().to_lowercase()).copied()
    }

    /// JSON 객체를 정규 필드 기준으로 정리합니다.
    ///
    /// null 값과 매핑되지 않은 키는 버립니다.
    pub fn normalize<'a>(&self, object: &'a Map<String, Value>) -> HashMap<F, &'a Value> {
        let mut picked: HashMap<F, (usize, &'a Value)> = HashMap::new();

        for (key, value) in object {
            if value.is_null() {
                continue;
            }
            let Some((field, priority)) = self.resolve_with_priority(key) else {
                continue;
            };
            match picked.get(&field) {
                Some((existing, _)) if *existing <= priority => {}
                _ => {
                    picked.insert(field, (priority, value));
                }
            }
        }

        picked.into_iter().map(|(f, (_, v))| (f, v)).collect()
    }
}

// =============================================================================
// 정규 필드 정의
// =============================================================================

/// 가격 프레임 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl CanonicalField for PriceField {
    const ALL: &'static [Self] = &[
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::Volume,
    ];

    fn is_required(&self) -> bool {
        !matches!(self, PriceField::Volume)
    }

    fn name(&self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Volume => "volume",
        }
    }
}

impl PriceField {
    /// 기본 철자 테이블.
    pub fn default_map() -> Result<FieldMap<Self>> {
        FieldMap::new(&[
            ("Open", PriceField::Open),
            ("High", PriceField::High),
            ("Low", PriceField::Low),
            ("Close", PriceField::Close),
            ("Volume", PriceField::Volume),
        ])
    }
}

/// 뉴스 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NewsField {
    Timestamp,
    Headline,
    Summary,
    Source,
    Url,
}

impl CanonicalField for NewsField {
    const ALL: &'static [Self] = &[
        NewsField::Timestamp,
        NewsField::Headline,
        NewsField::Summary,
        NewsField::Source,
        NewsField::Url,
    ];

    fn is_required(&self) -> bool {
        matches!(self, NewsField::Timestamp | NewsField::Headline)
    }

    fn name(&self) -> &'static str {
        match self {
            NewsField::Timestamp => "timestamp",
            NewsField::Headline => "headline",
            NewsField::Summary => "summary",
            NewsField::Source => "source",
            NewsField::Url => "url",
        }
    }
}

impl NewsField {
    pub fn default_map() -> Result<FieldMap<Self>> {
        FieldMap::new(&[
            ("datetime", NewsField::Timestamp),
            ("timestamp", NewsField::Timestamp),
            ("headline", NewsField::Headline),
            ("title", NewsField::Headline),
            ("summary", NewsField::Summary),
            ("description", NewsField::Summary),
            ("source", NewsField::Source),
            ("url", NewsField::Url),
        ])
    }
}

/// 내부자 거래 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsiderField {
    Date,
    Type,
    Shares,
    Price,
    Value,
    Name,
}

impl CanonicalField for InsiderField {
    const ALL: &'static [Self] = &[
        InsiderField::Date,
        InsiderField::Type,
        InsiderField::Shares,
        InsiderField::Price,
        InsiderField::Value,
        InsiderField::Name,
    ];

    fn is_required(&self) -> bool {
        matches!(self, InsiderField::Date)
    }

    fn name(&self) -> &'static str {
        match self {
            InsiderField::Date => "transaction_date",
            InsiderField::Type => "transaction_type",
            InsiderField::Shares => "shares",
            InsiderField::Price => "price",
            InsiderField::Value => "value",
            InsiderField::Name => "insider_name",
        }
    }
}

impl InsiderField {
    pub fn default_map() -> Result<FieldMap<Self>> {
        FieldMap::new(&[
            ("transactionDate", InsiderField::Date),
            ("date", InsiderField::Date),
            ("transactionType", InsiderField::Type),
            ("type", InsiderField::Type),
            ("transactionCode", InsiderField::Type),
            ("shares", InsiderField::Shares),
            ("change", InsiderField::Shares),
            ("price", InsiderField::Price),
            ("transactionPrice", InsiderField::Price),
            ("value", InsiderField::Value),
            ("name", InsiderField::Name),
            ("insiderName", InsiderField::Name),
        ])
    }
}

// =============================================================================
// 값 변환
// =============================================================================

/// 숫자 또는 숫자 문자열을 f64로 읽습니다. 유한하지 않은 값은 None.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// 비어 있지 않은 문자열을 읽습니다. 숫자는 문자열로 변환합니다.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 타임스탬프를 읽습니다.
///
/// 지원 형식: Unix 초, Unix 밀리초, RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), `YYYY-MM-DD`.
pub fn value_as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(epoch_to_utc),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

/// 날짜를 읽습니다. 시간 정보가 있으면 UTC 기준 날짜로 자릅니다.
pub fn value_as_date(value: &Value) -> Option<NaiveDate> {
    if let Value::String(s) = value {
        if let Ok(date) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
            return Some(date);
        }
    }
    value_as_timestamp(value).map(|ts| ts.date_naive())
}

// 10^11초는 서기 5138년이므로 그 이상은 밀리초로 해석
fn epoch_to_utc(raw: i64) -> Option<DateTime<Utc>> {
    if raw.abs() >= 100_000_000_000 {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(raw) = s.parse::<i64>() {
        return epoch_to_utc(raw);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_maps_are_valid() {
        assert!(PriceField::default_map().is_ok());
        assert!(NewsField::default_map().is_ok());
        assert!(InsiderField::default_map().is_ok());
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let map = PriceField::default_map().unwrap();
        assert_eq!(map.resolve("open"), Some(PriceField::Open));
        assert_eq!(map.resolve("OPEN"), Some(PriceField::Open));
        assert_eq!(map.resolve("Adj Close"), None);
    }

    #[test]
    fn test_conflicting_spelling_is_rejected() {
        let result = FieldMap::new(&[
            ("datetime", NewsField::Timestamp),
            ("headline", NewsField::Headline),
            ("DateTime", NewsField::Summary),
        ]);
        assert!(matches!(result, Err(DataError::Config(_))));
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let result = FieldMap::new(&[("headline", NewsField::Headline)]);
        assert!(matches!(result, Err(DataError::Config(_))));
    }

    #[test]
    fn test_earlier_spelling_wins() {
        let map = NewsField::default_map().unwrap();
        let object = json!({
            "title": "second",
            "headline": "first",
            "datetime": 1700000000,
        });
        let normalized = map.normalize(object.as_object().unwrap());
        assert_eq!(normalized[&NewsField::Headline], &json!("first"));
    }

    #[test]
    fn test_null_values_fall_through_to_next_spelling() {
        let map = NewsField::default_map().unwrap();
        let object = json!({ "headline": null, "title": "fallback" });
        let normalized = map.normalize(object.as_object().unwrap());
        assert_eq!(normalized[&NewsField::Headline], &json!("fallback"));
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        assert_eq!(value_as_timestamp(&json!(1700000000)), Some(expected));
        assert_eq!(value_as_timestamp(&json!(1700000000000i64)), Some(expected));
        assert_eq!(value_as_timestamp(&json!("1700000000")), Some(expected));
        assert_eq!(
            value_as_timestamp(&json!("2023-11-14T22:13:20Z")),
            Some(expected)
        );
        assert_eq!(
            value_as_timestamp(&json!("2023-11-14 22:13:20")),
            Some(expected)
        );
        assert_eq!(
            value_as_timestamp(&json!("2023-11-14")),
            Some(Utc.with_ymd_and_hms(2023, 11, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(value_as_timestamp(&json!("yesterday")), None);
        assert_eq!(value_as_timestamp(&json!(true)), None);
    }

    #[test]
    fn test_value_as_f64() {
        assert_eq!(value_as_f64(&json!(1.5)), Some(1.5));
        assert_eq!(value_as_f64(&json!(" 2 ")), Some(2.0));
        assert_eq!(value_as_f64(&json!("NaN")), None);
        assert_eq!(value_as_f64(&json!("abc")), None);
    }

    #[test]
    fn test_value_as_date() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(value_as_date(&json!("2024-02-29")), Some(date));
        assert_eq!(value_as_date(&json!("2024-02-29T15:00:00Z")), Some(date));
        assert_eq!(value_as_date(&json!("")), None);
    }
}

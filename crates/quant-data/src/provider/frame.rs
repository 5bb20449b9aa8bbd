//! 컬럼 인덱스 가격 프레임.
//!
//! 가격 소스는 시간 인덱스와 컬럼으로 이루어진 표를 반환합니다. 컬럼 키는
//! `(필드, 심볼)`입니다:
//! - 다중 심볼 응답: 모든 컬럼에 심볼이 붙음 (`("Close", "AAPL")`)
//! - 단일 심볼 응답: 심볼 없는 평면 컬럼 (`("Close", None)`)
//!
//! [`PriceFrame::project`]는 한 심볼의 컬럼만 골라 가격 봉으로 변환합니다.
//! 다른 심볼의 값이 섞이는 일은 없습니다.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use quant_core::PriceBar;
use tracing::{debug, warn};

use super::fields::{CanonicalField, FieldMap, PriceField};
use crate::error::{DataError, Result};

/// 프레임 컬럼 키.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnKey {
    /// 소스 필드 이름 (예: "Close", "Adj Close")
    pub field: String,
    /// 심볼 (평면 프레임이면 None)
    pub symbol: Option<String>,
}

/// 한 시점의 원시 시세. 값이 없으면 None.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawQuote {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
}

/// 소스가 내보내는 컬럼 이름 (yfinance 표기).
const COLUMN_NAMES: [&str; 6] = ["Open", "High", "Low", "Close", "Adj Close", "Volume"];

impl RawQuote {
    fn values(&self) -> [Option<f64>; 6] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.adj_close,
            self.volume,
        ]
    }
}

/// 컬럼 인덱스 가격 표.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceFrame {
    index: Vec<DateTime<Utc>>,
    columns: BTreeMap<ColumnKey, Vec<Option<f64>>>,
}

impl PriceFrame {
    /// 빈 컬럼을 가진 프레임을 생성합니다.
    pub fn new(index: Vec<DateTime<Utc>>) -> Self {
        Self {
            index,
            columns: BTreeMap::new(),
        }
    }

    /// 컬럼을 추가합니다. 길이가 인덱스와 다르면 오류입니다.
    pub fn insert_column(
        &mut self,
        field: impl Into<String>,
        symbol: Option<&str>,
        values: Vec<Option<f64>>,
    ) -> Result<()> {
        let field = field.into();
        if values.len() != self.index.len() {
            return Err(DataError::malformed(
                "frame",
                format!(
                    "컬럼 {} 길이 {}가 인덱스 길이 {}와 다름",
                    field,
                    values.len(),
                    self.index.len()
                ),
            ));
        }
        let key = ColumnKey {
            field,
            symbol: symbol.map(|s| s.to_uppercase()),
        };
        self.columns.insert(key, values);
        Ok(())
    }

    /// 단일 심볼 응답 형태의 평면 프레임을 만듭니다.
    pub fn flat(mut quotes: Vec<RawQuote>) -> Self {
        quotes.sort_by_key(|q| q.timestamp);
        quotes.dedup_by_key(|q| q.timestamp);

        let mut frame = PriceFrame::new(quotes.iter().map(|q| q.timestamp).collect());
        for (i, name) in COLUMN_NAMES.iter().enumerate() {
            let values = quotes.iter().map(|q| q.values()[i]).collect();
            frame.columns.insert(
                ColumnKey {
                    field: name.to_string(),
                    symbol: None,
                },
                values,
            );
        }
        frame
    }

    /// 다중 심볼 응답 형태의 프레임을 만듭니다.
    ///
    /// 인덱스는 모든 심볼 시점의 합집합이고, 해당 시점에 데이터가 없는 심볼의 값은 None입니다.
    pub fn multi(series: Vec<(String, Vec<RawQuote>)>) -> Self {
        let index: BTreeSet<DateTime<Utc>> = series
            .iter()
            .flat_map(|(_, quotes)| quotes.iter().map(|q| q.timestamp))
            .collect();
        let index: Vec<DateTime<Utc>> = index.into_iter().collect();
        let position: HashMap<DateTime<Utc>, usize> =
            index.iter().enumerate().map(|(i, ts)| (*ts, i)).collect();

        let mut frame = PriceFrame::new(index);
        for (symbol, quotes) in series {
            let symbol = symbol.to_uppercase();
            let mut columns: Vec<Vec<Option<f64>>> =
                vec![vec![None; frame.index.len()]; COLUMN_NAMES.len()];
            for quote in &quotes {
                let row = position[&quote.timestamp];
                for (col, value) in quote.values().into_iter().enumerate() {
                    columns[col][row] = value;
                }
            }
            for (name, values) in COLUMN_NAMES.iter().zip(columns) {
                frame.columns.insert(
                    ColumnKey {
                        field: name.to_string(),
                        symbol: Some(symbol.clone()),
                    },
                    values,
                );
            }
        }
        frame
    }

    /// 행 수.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    /// 심볼이 붙은 컬럼이 하나라도 있으면 다중 심볼 프레임입니다.
    pub fn is_multi_symbol(&self) -> bool {
        self.columns.keys().any(|k| k.symbol.is_some())
    }

    /// 한 심볼의 가격 봉을 추출합니다.
    ///
    /// - 다중 심볼 프레임: 해당 심볼의 컬럼만 사용, 컬럼이 없으면 빈 결과
    /// - 평면 프레임: 요청 심볼이 정확히 하나일 때만 그 심볼로 귀속, 아니면 빈 결과
    ///
    /// OHLC 중 하나라도 없는 행은 버리고, 거래량이 없으면 0으로 채웁니다.
    /// 필수 컬럼 일부만 있는 경우는 응답 형식 오류입니다.
    pub fn project(
        &self,
        symbol: &str,
        requested: usize,
        fields: &FieldMap<PriceField>,
    ) -> Result<Vec<PriceBar>> {
        let symbol = symbol.to_uppercase();

        let target = if self.is_multi_symbol() {
            Some(symbol.as_str())
        } else if requested == 1 {
            None
        } else {
            warn!(
                symbol = %symbol,
                requested,
                "평면 프레임을 여러 심볼 중 하나에 귀속할 수 없음"
            );
            return Ok(Vec::new());
        };

        let mut selected: HashMap<PriceField, (usize, &Vec<Option<f64>>)> = HashMap::new();
        for (key, values) in &self.columns {
            if key.symbol.as_deref() != target {
                continue;
            }
            let Some((field, priority)) = fields.resolve_with_priority(&key.field) else {
                continue;
            };
            match selected.get(&field) {
                Some((existing, _)) if *existing <= priority => {}
                _ => {
                    selected.insert(field, (priority, values));
                }
            }
        }

        if selected.is_empty() {
            debug!(symbol = %symbol, "프레임에 심볼 데이터 없음");
            return Ok(Vec::new());
        }

        let missing: Vec<&str> = PriceField::ALL
            .iter()
            .filter(|f| f.is_required() && !selected.contains_key(*f))
            .map(|f| f.name())
            .collect();
        if !missing.is_empty() {
            return Err(DataError::malformed(
                "frame",
                format!("{} 필수 컬럼 누락: {}", symbol, missing.join(", ")),
            ));
        }

        let column = |field: PriceField, row: usize| -> Option<f64> {
            selected
                .get(&field)
                .and_then(|(_, values)| values[row])
                .filter(|v| v.is_finite())
        };

        let mut bars = Vec::with_capacity(self.index.len());
        let mut dropped = 0usize;
        for (row, timestamp) in self.index.iter().enumerate() {
            let ohlc = (
                column(PriceField::Open, row),
                column(PriceField::High, row),
                column(PriceField::Low, row),
                column(PriceField::Close, row),
            );
            let (Some(open), Some(high), Some(low), Some(close)) = ohlc else {
                dropped += 1;
                continue;
            };
            let volume = column(PriceField::Volume, row)
                .map(|v| v.round() as i64)
                .unwrap_or(0);
            bars.push(PriceBar::new(
                symbol.as_str(),
                *timestamp,
                open,
                high,
                low,
                close,
                volume,
            ));
        }

        // 다중 심볼 프레임에서는 다른 심볼의 시점이 섞인 빈 행이 흔하므로 debug로만 기록
        if dropped > 0 {
            debug!(symbol = %symbol, dropped, kept = bars.len(), "OHLC 결측 행 제외");
        }

        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn quote(day: u32, base: f64) -> RawQuote {
        RawQuote {
            timestamp: ts(day),
            open: Some(base),
            high: Some(base + 1.0),
            low: Some(base - 1.0),
            close: Some(base + 0.5),
            adj_close: Some(base + 0.4),
            volume: Some(1000.0),
        }
    }

    fn fields() -> FieldMap<PriceField> {
        PriceField::default_map().unwrap()
    }

    #[test]
    fn test_multi_frame_projection_never_mixes_symbols() {
        let frame = PriceFrame::multi(vec![
            ("AAPL".to_string(), vec![quote(2, 100.0), quote(3, 101.0)]),
            ("MSFT".to_string(), vec![quote(2, 400.0), quote(4, 401.0)]),
        ]);
        assert!(frame.is_multi_symbol());
        assert_eq!(frame.len(), 3);

        let aapl = frame.project("AAPL", 2, &fields()).unwrap();
        assert_eq!(aapl.len(), 2);
        assert!(aapl.iter().all(|b| b.symbol == "AAPL" && b.open < 200.0));
        assert_eq!(aapl[1].timestamp, ts(3));

        let msft = frame.project("msft", 2, &fields()).unwrap();
        assert_eq!(msft.len(), 2);
        assert!(msft.iter().all(|b| b.open >= 400.0));
    }

    #[test]
    fn test_missing_symbol_projects_to_empty() {
        let frame = PriceFrame::multi(vec![("AAPL".to_string(), vec![quote(2, 100.0)])]);
        assert!(frame.project("MSFT", 2, &fields()).unwrap().is_empty());
    }

    #[test]
    fn test_flat_frame_requires_single_request() {
        let frame = PriceFrame::flat(vec![quote(3, 10.0), quote(2, 9.0)]);
        assert!(!frame.is_multi_symbol());

        let bars = frame.project("spy", 1, &fields()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].symbol, "SPY");
        assert_eq!(bars[0].timestamp, ts(2));

        assert!(frame.project("SPY", 2, &fields()).unwrap().is_empty());
    }

    #[test]
    fn test_rows_missing_ohlc_are_dropped_and_volume_defaults_to_zero() {
        let mut partial = quote(3, 10.0);
        partial.high = None;
        let mut no_volume = quote(4, 11.0);
        no_volume.volume = None;

        let frame = PriceFrame::flat(vec![quote(2, 9.0), partial, no_volume]);
        let bars = frame.project("SPY", 1, &fields()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].timestamp, ts(4));
        assert_eq!(bars[1].volume, 0);
    }

    #[test]
    fn test_partial_required_columns_is_malformed() {
        let mut frame = PriceFrame::new(vec![ts(2)]);
        frame.insert_column("Close", Some("AAPL"), vec![Some(1.0)]).unwrap();
        let result = frame.project("AAPL", 1, &fields());
        assert!(matches!(result, Err(DataError::Malformed { .. })));
    }

    #[test]
    fn test_insert_column_length_mismatch() {
        let mut frame = PriceFrame::new(vec![ts(2), ts(3)]);
        assert!(frame.insert_column("Open", None, vec![Some(1.0)]).is_err());
    }

    #[test]
    fn test_lowercase_provider_columns_resolve() {
        let mut frame = PriceFrame::new(vec![ts(2)]);
        for name in ["open", "high", "low", "close", "volume"] {
            frame.insert_column(name, None, vec![Some(5.0)]).unwrap();
        }
        let bars = frame.project("QQQ", 1, &fields()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 5);
    }
}

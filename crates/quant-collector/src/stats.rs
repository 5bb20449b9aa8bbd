//! 수집 결과 리포트.

use quant_core::{DataKind, FailureKind, SymbolOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 한 번의 수집 실행 결과
///
/// 모든 심볼이 실패해도 리포트는 항상 만들어집니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// 데이터 종류
    pub kind: DataKind,
    /// 심볼별 결과
    pub outcomes: BTreeMap<String, SymbolOutcome>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl IngestReport {
    /// 빈 리포트 생성
    pub fn new(kind: DataKind) -> Self {
        Self {
            kind,
            outcomes: BTreeMap::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// 심볼 결과 기록
    pub fn record(&mut self, symbol: impl Into<String>, outcome: SymbolOutcome) {
        self.outcomes.insert(symbol.into(), outcome);
    }

    /// 다른 리포트의 결과를 합침
    pub fn merge(&mut self, other: IngestReport) {
        self.outcomes.extend(other.outcomes);
    }

    /// 심볼의 저장 행 수 (없거나 실패면 0)
    pub fn rows(&self, symbol: &str) -> usize {
        self.outcomes.get(symbol).map_or(0, SymbolOutcome::rows)
    }

    /// 심볼 → 저장 행 수
    pub fn row_counts(&self) -> BTreeMap<String, usize> {
        self.outcomes
            .iter()
            .map(|(symbol, outcome)| (symbol.clone(), outcome.rows()))
            .collect()
    }

    /// 전체 저장 행 수
    pub fn total_rows(&self) -> usize {
        self.outcomes.values().map(SymbolOutcome::rows).sum()
    }

    /// 성공 심볼 수 (데이터 없음 포함)
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| !o.is_failure()).count()
    }

    /// 실패 심볼 수
    pub fn failed(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_failure()).count()
    }

    /// 실패 분류별 심볼 목록
    pub fn failures(&self) -> BTreeMap<String, FailureKind> {
        self.outcomes
            .iter()
            .filter_map(|(symbol, outcome)| outcome.failure().map(|kind| (symbol.clone(), kind)))
            .collect()
    }

    /// 모든 심볼이 실패했는지
    pub fn is_total_failure(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            (self.succeeded() as f64 / self.outcomes.len() as f64) * 100.0
        }
    }

    /// 리포트 요약 로그 출력
    pub fn log_summary(&self) {
        tracing::info!(
            kind = %self.kind,
            symbols = self.outcomes.len(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            rows = self.total_rows(),
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
        for (symbol, kind) in self.failures() {
            tracing::warn!(kind = %self.kind, symbol = %symbol, failure = %kind, "심볼 수집 실패");
        }
    }
}

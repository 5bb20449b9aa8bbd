//! 수집 오케스트레이터.
//!
//! 심볼마다 조회와 저장을 독립적으로 실행합니다:
//! - 동시 실행 수는 `concurrency`로 제한 (`buffer_unordered`)
//! - 심볼마다 별도 태스크로 실행해 에러와 패닉이 다른 심볼로 번지지 않음
//! - 실패는 `SymbolOutcome::Failed`로 기록되고 리포트는 항상 반환됨
//!
//! 가격은 일괄 경로를 사용합니다. 소스를 한 번만 호출하고 프레임을 심볼별로 분해한 뒤
//! 심볼별로 저장합니다. 일괄 조회 안에서 실패한 심볼은 소스가 보고한 원인으로 기록됩니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use quant_core::{dedup_symbols, ingest_span, DataKind, FailureKind, PriceBar, SymbolOutcome};
use quant_data::{
    DataError, InsiderSource, MarketStore, NewsSource, PriceAdapter, PriceWindow,
};
use tracing::{debug, error, info, warn, Instrument};

use crate::stats::IngestReport;

/// 심볼 단위 수집 오케스트레이터
pub struct Orchestrator {
    store: Arc<dyn MarketStore>,
    concurrency: usize,
}

impl Orchestrator {
    /// 저장소와 동시 실행 한도로 생성
    pub fn new(store: Arc<dyn MarketStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 뉴스 수집
    pub async fn ingest_news(
        &self,
        source: Arc<dyn NewsSource>,
        symbols: &[String],
        days_back: u32,
    ) -> IngestReport {
        let store = Arc::clone(&self.store);
        let items = dedup_symbols(symbols).into_iter().map(|s| (s, ())).collect();

        self.fan_out(DataKind::News, items, move |symbol, ()| {
            let source = Arc::clone(&source);
            let store = Arc::clone(&store);
            async move {
                let news = source.fetch_news(&symbol, days_back).await?;
                debug!(symbol = %symbol, fetched = news.len(), "뉴스 조회");
                store.insert_news(&news).await
            }
        })
        .await
    }

    /// 내부자 거래 수집
    pub async fn ingest_insider(
        &self,
        source: Arc<dyn InsiderSource>,
        symbols: &[String],
    ) -> IngestReport {
        let store = Arc::clone(&self.store);
        let items = dedup_symbols(symbols).into_iter().map(|s| (s, ())).collect();

        self.fan_out(DataKind::Insider, items, move |symbol, ()| {
            let source = Arc::clone(&source);
            let store = Arc::clone(&store);
            async move {
                let transactions = source.fetch_insider(&symbol).await?;
                debug!(symbol = %symbol, fetched = transactions.len(), "내부자 거래 조회");
                store.insert_insider(&transactions).await
            }
        })
        .await
    }

    /// 가격 수집 (일괄 조회 후 심볼별 저장)
    pub async fn ingest_prices(
        &self,
        adapter: &PriceAdapter,
        symbols: &[String],
        window: &PriceWindow,
    ) -> IngestReport {
        let started = Instant::now();
        let symbols = dedup_symbols(symbols);
        let mut report = IngestReport::new(DataKind::Prices);
        if symbols.is_empty() {
            return report;
        }

        let bulk = match adapter.fetch_frame(&symbols, window).await {
            Ok(bulk) => bulk,
            Err(e) => {
                warn!(
                    source = adapter.source_name(),
                    window = %window,
                    error = %e,
                    "가격 일괄 조회 실패, 전체 심볼 실패 처리"
                );
                let kind = e.failure_kind();
                for symbol in symbols {
                    report.record(symbol, SymbolOutcome::Failed(kind));
                }
                report.elapsed = started.elapsed();
                return report;
            }
        };

        let mut pending: Vec<(String, Vec<PriceBar>)> = Vec::with_capacity(symbols.len());
        for (symbol, bars) in adapter.decompose(&bulk, &symbols) {
            match bars {
                Ok(bars) => pending.push((symbol, bars)),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "심볼 가격 조회 실패");
                    report.record(symbol, SymbolOutcome::Failed(e.failure_kind()));
                }
            }
        }

        let store = Arc::clone(&self.store);
        let stored = self
            .fan_out(DataKind::Prices, pending, move |_, bars| {
                let store = Arc::clone(&store);
                async move { store.upsert_prices(&bars).await }
            })
            .await;

        report.merge(stored);
        report.elapsed = started.elapsed();
        report
    }

    /// 심볼별 작업을 제한된 동시성으로 실행
    async fn fan_out<T, F, Fut>(
        &self,
        kind: DataKind,
        items: Vec<(String, T)>,
        work: F,
    ) -> IngestReport
    where
        T: Send + 'static,
        F: Fn(String, T) -> Fut,
        Fut: Future<Output = Result<usize, DataError>> + Send + 'static,
    {
        let started = Instant::now();
        let total = items.len();

        let outcomes: Vec<(String, SymbolOutcome)> = stream::iter(items)
            .map(|(symbol, input)| {
                let span = ingest_span!("ingest_symbol", kind, symbol);
                let task = tokio::spawn(work(symbol.clone(), input).instrument(span));
                async move {
                    let outcome = match task.await {
                        Ok(Ok(rows)) => SymbolOutcome::Stored(rows),
                        Ok(Err(e)) => {
                            warn!(kind = %kind, symbol = %symbol, error = %e, "심볼 수집 실패");
                            SymbolOutcome::Failed(e.failure_kind())
                        }
                        Err(e) => {
                            error!(kind = %kind, symbol = %symbol, error = %e, "심볼 수집 태스크 비정상 종료");
                            SymbolOutcome::Failed(FailureKind::Internal)
                        }
                    };
                    (symbol, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = IngestReport::new(kind);
        for (symbol, outcome) in outcomes {
            report.record(symbol, outcome);
        }
        report.elapsed = started.elapsed();

        info!(
            kind = %kind,
            symbols = total,
            rows = report.total_rows(),
            failed = report.failed(),
            "심볼별 수집 완료"
        );
        report
    }
}

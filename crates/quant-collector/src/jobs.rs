//! 수집 작업.
//!
//! 스케줄러가 주기적으로 실행하는 단위입니다. 작업은 실패를 반환하지 않고
//! 항상 리포트를 돌려줍니다.

use std::sync::Arc;

use async_trait::async_trait;
use quant_core::DataKind;
use quant_data::{InsiderSource, NewsSource, PriceAdapter, PriceWindow};

use crate::orchestrator::Orchestrator;
use crate::stats::IngestReport;

/// 수집 작업
#[async_trait]
pub trait IngestJob: Send + Sync {
    /// 작업 데이터 종류
    fn kind(&self) -> DataKind;

    /// 한 번 실행
    async fn run(&self) -> IngestReport;
}

/// 가격 수집 작업
pub struct PriceJob {
    orchestrator: Arc<Orchestrator>,
    adapter: Arc<PriceAdapter>,
    symbols: Vec<String>,
    window: PriceWindow,
}

impl PriceJob {
    /// 최신 가격 작업 (1일 구간)
    pub fn latest(
        orchestrator: Arc<Orchestrator>,
        adapter: Arc<PriceAdapter>,
        symbols: Vec<String>,
    ) -> Self {
        Self::with_window(orchestrator, adapter, symbols, PriceWindow::latest())
    }

    /// 구간 지정 가격 작업
    pub fn with_window(
        orchestrator: Arc<Orchestrator>,
        adapter: Arc<PriceAdapter>,
        symbols: Vec<String>,
        window: PriceWindow,
    ) -> Self {
        Self {
            orchestrator,
            adapter,
            symbols,
            window,
        }
    }
}

#[async_trait]
impl IngestJob for PriceJob {
    fn kind(&self) -> DataKind {
        DataKind::Prices
    }

    async fn run(&self) -> IngestReport {
        self.orchestrator
            .ingest_prices(&self.adapter, &self.symbols, &self.window)
            .await
    }
}

/// 뉴스 수집 작업
pub struct NewsJob {
    orchestrator: Arc<Orchestrator>,
    source: Arc<dyn NewsSource>,
    symbols: Vec<String>,
    days_back: u32,
}

impl NewsJob {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        source: Arc<dyn NewsSource>,
        symbols: Vec<String>,
        days_back: u32,
    ) -> Self {
        Self {
            orchestrator,
            source,
            symbols,
            days_back,
        }
    }
}

#[async_trait]
impl IngestJob for NewsJob {
    fn kind(&self) -> DataKind {
        DataKind::News
    }

    async fn run(&self) -> IngestReport {
        self.orchestrator
            .ingest_news(Arc::clone(&self.source), &self.symbols, self.days_back)
            .await
    }
}

/// 내부자 거래 수집 작업
pub struct InsiderJob {
    orchestrator: Arc<Orchestrator>,
    source: Arc<dyn InsiderSource>,
    symbols: Vec<String>,
}

impl InsiderJob {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        source: Arc<dyn InsiderSource>,
        symbols: Vec<String>,
    ) -> Self {
        Self {
            orchestrator,
            source,
            symbols,
        }
    }
}

#[async_trait]
impl IngestJob for InsiderJob {
    fn kind(&self) -> DataKind {
        DataKind::Insider
    }

    async fn run(&self) -> IngestReport {
        self.orchestrator
            .ingest_insider(Arc::clone(&self.source), &self.symbols)
            .await
    }
}

//! Market data collector CLI.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use quant_collector::{
    CollectorConfig, CollectorError, IngestJob, IngestReport, InsiderJob, NewsJob, Orchestrator,
    PriceJob, Scheduler,
};
use quant_core::{init_logging, parse_symbol_list, DataKind, LogConfig};
use quant_data::{
    Database, DatabaseConfig, FinnhubClient, MarketQuery, MarketStore, MemoryStore, PgMarketStore,
    PriceAdapter, PriceWindow, YahooPriceSource,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "quant-collector")]
#[command(about = "Market data collector (prices, news, insider transactions)", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error). 없으면 RUST_LOG 사용
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 데이터베이스 대신 메모리 저장소 사용
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 스키마 마이그레이션 실행
    Migrate,

    /// 과거 가격 일괄 수집 (기본: PRICE_HISTORY_PERIOD / PRICE_BAR_INTERVAL)
    BackfillPrices {
        /// 조회 기간 (예: "1mo", "1y", "max")
        #[arg(long)]
        period: Option<String>,
        /// 봉 간격 (예: "1d", "1h")
        #[arg(long)]
        interval: Option<String>,
        /// 특정 심볼만 수집 (쉼표로 구분, 예: "AAPL,MSFT")
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 최신 가격 수집 (1일 구간)
    IngestPrices {
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 뉴스 수집
    IngestNews {
        #[arg(long)]
        symbols: Option<String>,
        /// 조회 기간 (일)
        #[arg(long)]
        days_back: Option<u32>,
    },

    /// 내부자 거래 수집
    IngestInsider {
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 활성화된 모든 작업을 한 번씩 실행
    RunOnce,

    /// 데몬 모드: 작업별 주기로 실행, SIGINT/SIGTERM 시 종료
    Daemon,

    /// 저장된 가격 조회
    ShowPrices {
        #[arg(long)]
        symbol: String,
        /// 시작 시각 (RFC3339 또는 YYYY-MM-DD, 포함)
        #[arg(long, value_parser = parse_time)]
        start: Option<DateTime<Utc>>,
        /// 종료 시각 (RFC3339 또는 YYYY-MM-DD, 제외)
        #[arg(long, value_parser = parse_time)]
        end: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },

    /// 저장된 뉴스 조회 (최신순)
    ShowNews {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// 저장된 내부자 거래 조회 (최신순)
    ShowInsider {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// 저장소 상태 확인
    Health,
}

/// 명령 실행에 필요한 저장소 핸들
struct Stores {
    writer: Arc<dyn MarketStore>,
    reader: Arc<dyn MarketQuery>,
    database: Option<Arc<PgMarketStore>>,
}

impl Stores {
    fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            writer: store.clone(),
            reader: store,
            database: None,
        }
    }

    async fn postgres(config: &CollectorConfig) -> quant_collector::Result<Self> {
        let db_config = DatabaseConfig::new(config.require_database_url()?)
            .with_max_connections(config.db_max_connections);
        let database = Database::connect(&db_config).await?;
        let store = Arc::new(PgMarketStore::new(database));
        Ok(Self {
            writer: store.clone(),
            reader: store.clone(),
            database: Some(store),
        })
    }

    async fn close(&self) {
        if let Some(store) = &self.database {
            store.database().pool().close().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    let mut log_config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        log_config.level = level.clone();
    }
    init_logging(log_config)?;

    info!(dry_run = cli.dry_run, "Quant Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;

    let stores = if cli.dry_run {
        info!("dry-run: 메모리 저장소 사용");
        Stores::memory()
    } else {
        let stores = Stores::postgres(&config).await?;
        info!("데이터베이스 연결 성공");
        stores
    };

    let result = run(cli.command, &config, &stores).await;
    stores.close().await;

    match &result {
        Ok(()) => info!("Quant Collector 종료"),
        Err(e) => error!(error = %e, "Quant Collector 비정상 종료"),
    }
    result
}

async fn run(
    command: Commands,
    config: &CollectorConfig,
    stores: &Stores,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&stores.writer),
        config.ingest.concurrency,
    ));

    match command {
        Commands::Migrate => match &stores.database {
            Some(store) => {
                store.database().migrate().await?;
                info!("마이그레이션 완료");
            }
            None => warn!("dry-run: 마이그레이션 건너뜀"),
        },
        Commands::BackfillPrices {
            period,
            interval,
            symbols,
        } => {
            let history = &config.ingest.history_window;
            let window = PriceWindow::new(
                period.as_deref().unwrap_or(history.period()),
                interval.as_deref().unwrap_or(history.interval()),
            )?;
            let job = PriceJob::with_window(
                orchestrator,
                Arc::new(price_adapter(config)?),
                symbols_or(symbols, config.symbols.for_kind(DataKind::Prices)),
                window,
            );
            run_single(&job).await?;
        }
        Commands::IngestPrices { symbols } => {
            let job = PriceJob::latest(
                orchestrator,
                Arc::new(price_adapter(config)?),
                symbols_or(symbols, config.symbols.for_kind(DataKind::Prices)),
            );
            run_single(&job).await?;
        }
        Commands::IngestNews { symbols, days_back } => {
            let client = Arc::new(finnhub_client(config)?);
            let job = NewsJob::new(
                orchestrator,
                client,
                symbols_or(symbols, config.symbols.for_kind(DataKind::News)),
                days_back.unwrap_or(config.ingest.news_days_back),
            );
            run_single(&job).await?;
        }
        Commands::IngestInsider { symbols } => {
            let client = Arc::new(finnhub_client(config)?);
            let job = InsiderJob::new(
                orchestrator,
                client,
                symbols_or(symbols, config.symbols.for_kind(DataKind::Insider)),
            );
            run_single(&job).await?;
        }
        Commands::RunOnce => {
            info!("=== 전체 수집 1회 실행 ===");
            let jobs = build_jobs(config, orchestrator)?;
            let mut reports = Vec::with_capacity(jobs.len());
            for job in jobs {
                let report = job.run().await;
                report.log_summary();
                reports.push(report);
            }
            print_json(&reports)?;
            info!("=== 전체 수집 완료 ===");
        }
        Commands::Daemon => {
            let mut scheduler = Scheduler::new();
            for job in build_jobs(config, orchestrator)? {
                let every = config.schedule.interval(job.kind());
                scheduler.add_job(job, every);
            }

            info!(
                jobs = ?scheduler.kinds(),
                price_minutes = config.schedule.price_interval_minutes,
                news_minutes = config.schedule.news_interval_minutes,
                insider_minutes = config.schedule.insider_interval_minutes,
                "=== 데몬 모드 시작 ==="
            );

            let shutdown_token = CancellationToken::new();
            let handle = scheduler.start(shutdown_token.clone());

            shutdown_signal(shutdown_token).await;
            // 진행 중인 실행은 끝까지 완료됨
            handle.shutdown().await;
        }
        Commands::ShowPrices {
            symbol,
            start,
            end,
            limit,
        } => {
            let bars = stores.reader.prices(&symbol, start, end, limit).await?;
            print_json(&bars)?;
        }
        Commands::ShowNews { symbol, limit } => {
            let news = stores.reader.latest_news(&symbol, limit).await?;
            print_json(&news)?;
        }
        Commands::ShowInsider { symbol, limit } => {
            let transactions = stores.reader.latest_insider(&symbol, limit).await?;
            print_json(&transactions)?;
        }
        Commands::Health => {
            let healthy = stores.reader.health_check().await.unwrap_or_else(|e| {
                warn!(error = %e, "상태 확인 실패");
                false
            });
            print_json(&serde_json::json!({ "storage": healthy }))?;
            if !healthy {
                return Err("저장소 상태 이상".into());
            }
        }
    }

    Ok(())
}

/// 활성화된 수집 작업 목록
///
/// Finnhub 키가 없으면 뉴스/내부자 거래 작업은 비활성화됩니다.
fn build_jobs(
    config: &CollectorConfig,
    orchestrator: Arc<Orchestrator>,
) -> quant_collector::Result<Vec<Arc<dyn IngestJob>>> {
    let mut jobs: Vec<Arc<dyn IngestJob>> = vec![Arc::new(PriceJob::latest(
        Arc::clone(&orchestrator),
        Arc::new(price_adapter(config)?),
        config.symbols.for_kind(DataKind::Prices).to_vec(),
    ))];

    match finnhub_client(config) {
        Ok(client) => {
            let client = Arc::new(client);
            jobs.push(Arc::new(NewsJob::new(
                Arc::clone(&orchestrator),
                client.clone(),
                config.symbols.for_kind(DataKind::News).to_vec(),
                config.ingest.news_days_back,
            )));
            jobs.push(Arc::new(InsiderJob::new(
                orchestrator,
                client,
                config.symbols.for_kind(DataKind::Insider).to_vec(),
            )));
        }
        Err(CollectorError::Config(reason)) => {
            warn!(
                disabled = ?[DataKind::News, DataKind::Insider],
                reason = %reason,
                "Finnhub 설정 없음, 작업 비활성화"
            );
        }
        Err(e) => return Err(e),
    }

    Ok(jobs)
}

fn price_adapter(config: &CollectorConfig) -> quant_collector::Result<PriceAdapter> {
    let source = YahooPriceSource::new(config.ingest.provider_timeout())?
        .with_concurrency(config.ingest.concurrency);
    Ok(PriceAdapter::new(Arc::new(source))?)
}

fn finnhub_client(config: &CollectorConfig) -> quant_collector::Result<FinnhubClient> {
    let key = config.require_finnhub_api_key()?;
    Ok(FinnhubClient::new(key, config.ingest.provider_timeout())?)
}

/// 명령줄 심볼이 있으면 우선 사용
fn symbols_or(arg: Option<String>, tracked: &[String]) -> Vec<String> {
    match arg.as_deref().map(parse_symbol_list) {
        Some(symbols) if !symbols.is_empty() => symbols,
        _ => tracked.to_vec(),
    }
}

/// 작업 1회 실행 후 결과 출력
///
/// 모든 심볼이 실패하면 에러로 종료합니다.
async fn run_single(job: &dyn IngestJob) -> Result<(), Box<dyn std::error::Error>> {
    let report: IngestReport = job.run().await;
    report.log_summary();
    print_json(&report)?;

    if report.is_total_failure() {
        return Err(format!("{} 수집: 모든 심볼 실패", report.kind).into());
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("잘못된 시각 형식: {} (RFC3339 또는 YYYY-MM-DD)", raw))
}

/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C 핸들러 설치 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM 핸들러 설치 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Ctrl+C 수신, 종료 시작");
        }
        _ = terminate => {
            warn!("SIGTERM 수신, 종료 시작");
        }
    }

    shutdown_token.cancel();
    info!("종료 신호를 작업에 전파함");
}

//! # Quant Collector
//!
//! 가격, 뉴스, 내부자 거래를 주기적으로 수집해 저장하는 수집기.
//!
//! - [`orchestrator`]: 심볼 단위 동시 수집
//! - [`jobs`]: 데이터 종류별 수집 작업
//! - [`scheduler`]: 주기 실행과 종료 처리

pub mod config;
pub mod error;
pub mod jobs;
pub mod orchestrator;
pub mod scheduler;
pub mod stats;

pub use config::{CollectorConfig, IngestConfig, ScheduleConfig, TrackedSymbols};
pub use error::{CollectorError, Result};
pub use jobs::{IngestJob, InsiderJob, NewsJob, PriceJob};
pub use orchestrator::Orchestrator;
pub use scheduler::{JobState, JobStatus, Scheduler, SchedulerHandle};
pub use stats::IngestReport;

//! 수집 스케줄러.
//!
//! 작업마다 독립된 tokio 태스크에서 실행합니다:
//! - 시작 즉시 한 번 실행 (cold start)
//! - 이후 주기마다 실행, 실행 중 놓친 tick은 건너뜀
//! - 종료 신호는 실행과 실행 사이에서만 확인하므로 진행 중인 실행은 끝까지 완료됨
//! - 한 작업의 실패나 패닉은 로그만 남기고 다음 주기에 다시 실행

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quant_core::{ingest_span, DataKind};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

use crate::jobs::IngestJob;
use crate::stats::IngestReport;

/// 작업 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
}

/// 작업 현황
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub kind: DataKind,
    pub state: JobState,
    pub interval: Duration,
    /// 완료된 실행 횟수
    pub runs: u64,
    pub last_report: Option<IngestReport>,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    fn new(kind: DataKind, interval: Duration) -> Self {
        Self {
            kind,
            state: JobState::Idle,
            interval,
            runs: 0,
            last_report: None,
            last_run_at: None,
        }
    }
}

struct ScheduledJob {
    job: Arc<dyn IngestJob>,
    interval: Duration,
}

/// 작업 테이블을 소유하는 스케줄러
#[derive(Default)]
pub struct Scheduler {
    jobs: BTreeMap<DataKind, ScheduledJob>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 작업 등록. 같은 종류의 작업이 있으면 교체합니다.
    pub fn add_job(&mut self, job: Arc<dyn IngestJob>, every: Duration) -> &mut Self {
        let every = every.max(Duration::from_millis(1));
        if self
            .jobs
            .insert(job.kind(), ScheduledJob { job, interval: every })
            .is_some()
        {
            warn!("같은 종류의 작업을 교체함");
        }
        self
    }

    /// 등록된 작업 종류
    pub fn kinds(&self) -> Vec<DataKind> {
        self.jobs.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// 모든 작업을 시작합니다.
    pub fn start(self, shutdown: CancellationToken) -> SchedulerHandle {
        let mut statuses = BTreeMap::new();
        let mut tasks = Vec::with_capacity(self.jobs.len());

        for (kind, scheduled) in self.jobs {
            let status = Arc::new(RwLock::new(JobStatus::new(kind, scheduled.interval)));
            statuses.insert(kind, Arc::clone(&status));
            tasks.push(tokio::spawn(run_job_loop(
                scheduled.job,
                scheduled.interval,
                status,
                shutdown.clone(),
            )));
        }

        info!(jobs = tasks.len(), "스케줄러 시작");
        SchedulerHandle {
            statuses,
            tasks,
            shutdown,
        }
    }
}

/// 실행 중인 스케줄러 핸들
pub struct SchedulerHandle {
    statuses: BTreeMap<DataKind, Arc<RwLock<JobStatus>>>,
    tasks: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl SchedulerHandle {
    /// 작업 현황 조회
    pub async fn status(&self, kind: DataKind) -> Option<JobStatus> {
        match self.statuses.get(&kind) {
            Some(status) => Some(status.read().await.clone()),
            None => None,
        }
    }

    /// 전체 작업 현황
    pub async fn statuses(&self) -> Vec<JobStatus> {
        let mut out = Vec::with_capacity(self.statuses.len());
        for status in self.statuses.values() {
            out.push(status.read().await.clone());
        }
        out
    }

    /// 종료 토큰
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 종료 신호를 보내고 모든 작업 루프가 끝날 때까지 대기
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.join().await;
    }

    /// 외부 종료 신호로 모든 작업 루프가 끝날 때까지 대기
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "스케줄러 작업 루프 비정상 종료");
            }
        }
        info!("스케줄러 종료");
    }
}

async fn run_job_loop(
    job: Arc<dyn IngestJob>,
    every: Duration,
    status: Arc<RwLock<JobStatus>>,
    shutdown: CancellationToken,
) {
    let kind = job.kind();
    info!(kind = %kind, interval_secs = every.as_secs(), "작업 등록");

    if shutdown.is_cancelled() {
        return;
    }

    // 첫 실행 즉시
    execute(&job, &status).await;

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // 첫 tick 건너뛰기 (이미 위에서 실행함)

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!(kind = %kind, "종료 신호 수신, 작업 중지");
                break;
            }
            _ = ticker.tick() => {
                execute(&job, &status).await;
            }
        }
    }
}

async fn execute(job: &Arc<dyn IngestJob>, status: &RwLock<JobStatus>) {
    let kind = job.kind();
    status.write().await.state = JobState::Running;

    let task_job = Arc::clone(job);
    let run = (async move { task_job.run().await }).instrument(ingest_span!("ingest_job", kind));
    let report = match tokio::spawn(run).await {
        Ok(report) => {
            report.log_summary();
            if report.is_total_failure() {
                warn!(kind = %kind, "모든 심볼 수집 실패, 다음 주기에 재시도");
            }
            Some(report)
        }
        Err(e) => {
            error!(kind = %kind, error = %e, "작업 실행 중 패닉, 다음 주기에 재시도");
            None
        }
    };

    let mut status = status.write().await;
    status.state = JobState::Idle;
    status.runs += 1;
    status.last_run_at = Some(Utc::now());
    if report.is_some() {
        status.last_report = report;
    }
}

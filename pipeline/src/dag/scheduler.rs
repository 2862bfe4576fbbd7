//! Periodic DAG runner.
//!
//! Triggers one run per interval. Runs never overlap: the next tick is only
//! awaited once the previous run has finished. Without catchup, ticks missed
//! while a run was in progress are dropped.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use super::{Dag, DagRun};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// Scheduler knobs not carried by the DAG itself.
#[derive(Debug, Clone, Default)]
pub struct ScheduleOptions {
    /// Stop after this many runs
    pub max_runs: Option<usize>,
    /// Replace the DAG interval
    pub interval: Option<Duration>,
}

/// Totals over a scheduler session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub runs: usize,
    pub failed: usize,
}

async fn run_once(dag: Arc<Dag>, config: Arc<PipelineConfig>) -> PipelineResult<DagRun> {
    let run = tokio::task::spawn_blocking(move || dag.run(&config))
        .await
        .map_err(|e| PipelineError::Aborted(e.to_string()))??;
    Ok(run)
}

/// Run `dag` every interval until `max_runs` is reached or Ctrl-C.
pub async fn run_schedule(
    dag: Dag,
    config: PipelineConfig,
    options: ScheduleOptions,
) -> PipelineResult<ScheduleSummary> {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    run_schedule_until(dag, config, options, ctrl_c).await
}

/// Run `dag` every interval until `max_runs` is reached or `shutdown` resolves.
///
/// A shutdown during a run lets that run finish, then stops.
pub async fn run_schedule_until<S>(
    dag: Dag,
    config: PipelineConfig,
    options: ScheduleOptions,
    shutdown: S,
) -> PipelineResult<ScheduleSummary>
where
    S: Future<Output = ()>,
{
    // Fail fast on a malformed graph instead of once per tick
    dag.execution_order()?;

    let period = options
        .interval
        .unwrap_or(dag.interval)
        .max(Duration::from_millis(1));
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(if dag.catchup {
        MissedTickBehavior::Burst
    } else {
        MissedTickBehavior::Skip
    });

    info!(dag_id = %dag.dag_id, ?period, catchup = dag.catchup, "scheduler started");

    let dag = Arc::new(dag);
    let config = Arc::new(config);
    let mut summary = ScheduleSummary::default();

    // Polled across iterations so a signal during a run is not lost
    tokio::pin!(shutdown);
    let mut interrupted = false;

    loop {
        if interrupted || options.max_runs.is_some_and(|max| summary.runs >= max) {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("interrupted, stopping scheduler");
                break;
            }
        }

        let current = run_once(dag.clone(), config.clone());
        tokio::pin!(current);
        let run = tokio::select! {
            run = &mut current => run?,
            _ = &mut shutdown => {
                info!("interrupted, finishing current run");
                interrupted = true;
                current.await?
            }
        };
        summary.runs += 1;
        if run.succeeded() {
            info!(run_id = %run.run_id, "run succeeded");
        } else {
            summary.failed += 1;
            if let Some((task, error)) = run.first_error() {
                warn!(run_id = %run.run_id, %task, error, "run failed");
            }
        }
    }

    info!(runs = summary.runs, failed = summary.failed, "scheduler stopped");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::TaskId;

    #[tokio::test]
    async fn test_stops_after_max_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_workdir(dir.path());
        let options = ScheduleOptions {
            max_runs: Some(2),
            interval: Some(Duration::from_millis(5)),
        };

        let summary = run_schedule(Dag::trafic_ingestion(), config, options)
            .await
            .unwrap();

        // No raw file: both runs fail at transform_data
        assert_eq!(summary, ScheduleSummary { runs: 2, failed: 2 });
    }

    #[tokio::test]
    async fn test_shutdown_during_run_stops_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_workdir(dir.path());
        std::fs::create_dir_all(config.raw_input.parent().unwrap()).unwrap();
        let mut raw = String::from("caption\n");
        for i in 0..20_000 {
            raw.push_str(&format!("{i}; Car; 1.0; 2.0; 1;2;3;4;5;6; 1;2;3;4;5;6; \n"));
        }
        std::fs::write(&config.raw_input, raw).unwrap();

        let options = ScheduleOptions {
            max_runs: None,
            interval: Some(Duration::from_secs(30)),
        };
        let shutdown = tokio::time::sleep(Duration::from_millis(50));

        let summary = tokio::time::timeout(
            Duration::from_secs(20),
            run_schedule_until(Dag::trafic_ingestion(), config.clone(), options, shutdown),
        )
        .await
        .expect("scheduler did not stop")
        .unwrap();

        // The in-flight run completes before the scheduler returns
        assert_eq!(summary, ScheduleSummary { runs: 1, failed: 0 });
        assert!(config.processed_output.exists());
    }

    #[tokio::test]
    async fn test_zero_max_runs() {
        let config = PipelineConfig::from_workdir("/nonexistent");
        let options = ScheduleOptions {
            max_runs: Some(0),
            interval: None,
        };

        let summary = run_schedule(Dag::trafic_ingestion(), config, options)
            .await
            .unwrap();
        assert_eq!(summary.runs, 0);
    }

    #[tokio::test]
    async fn test_cyclic_dag_rejected() {
        let mut dag = Dag::trafic_ingestion();
        dag.edges.push((TaskId::LoadData, TaskId::TransformData));
        let config = PipelineConfig::from_workdir("/nonexistent");

        let result = run_schedule(dag, config, ScheduleOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::Dag(_))));
    }
}

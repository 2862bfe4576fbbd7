//! Task graph for the ingestion pipeline.
//!
//! The two tasks never call each other. Their ordering is an explicit edge
//! in [`Dag::edges`], and [`Dag::run`] executes tasks in topological order:
//!
//! ```text
//! ┌────────────────┐      ┌───────────┐
//! │ transform_data │ ───▶ │ load_data │
//! └────────────────┘      └───────────┘
//! ```
//!
//! When a task fails, every task downstream of it is marked
//! [`TaskState::UpstreamFailed`] and skipped.

pub mod scheduler;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{DagError, DagResult, PipelineError};
use crate::load::{load_file, LoadReport};
use crate::transform::{transform_file, TransformReport};

pub use scheduler::{run_schedule, run_schedule_until, ScheduleOptions, ScheduleSummary};

/// One day.
pub const DAILY: Duration = Duration::from_secs(24 * 60 * 60);

// =============================================================================
// Tasks
// =============================================================================

/// Tasks known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskId {
    TransformData,
    LoadData,
}

impl TaskId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::TransformData => "transform_data",
            TaskId::LoadData => "load_data",
        }
    }

    /// Run the task against `config`.
    pub fn execute(&self, config: &PipelineConfig) -> Result<TaskOutput, PipelineError> {
        match self {
            TaskId::TransformData => Ok(TaskOutput::Transformed(transform_file(config)?)),
            TaskId::LoadData => Ok(TaskOutput::Loaded(load_file(config)?)),
        }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful task produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutput {
    Transformed(TransformReport),
    Loaded(LoadReport),
}

// =============================================================================
// Graph
// =============================================================================

/// A directed acyclic graph of tasks plus its schedule.
#[derive(Debug, Clone, Serialize)]
pub struct Dag {
    pub dag_id: String,
    pub description: String,
    /// Time between scheduled runs
    pub interval: Duration,
    /// Run missed intervals when the scheduler falls behind
    pub catchup: bool,
    pub tasks: Vec<TaskId>,
    /// (upstream, downstream)
    pub edges: Vec<(TaskId, TaskId)>,
}

impl Dag {
    /// The daily `trafic_ingestion` graph: transform_data → load_data.
    pub fn trafic_ingestion() -> Self {
        Self {
            dag_id: "trafic_ingestion".to_string(),
            description: "Aggregates traficrecords for data analysis".to_string(),
            interval: DAILY,
            catchup: false,
            tasks: vec![TaskId::TransformData, TaskId::LoadData],
            edges: vec![(TaskId::TransformData, TaskId::LoadData)],
        }
    }

    /// Tasks in an order where every upstream precedes its downstreams.
    ///
    /// Ties keep declaration order.
    pub fn execution_order(&self) -> DagResult<Vec<TaskId>> {
        let known: HashSet<TaskId> = self.tasks.iter().copied().collect();
        let mut indegree: HashMap<TaskId, usize> = self.tasks.iter().map(|t| (*t, 0)).collect();

        for (up, down) in &self.edges {
            for task in [up, down] {
                if !known.contains(task) {
                    return Err(DagError::UnknownTask(task.to_string()));
                }
            }
            *indegree.entry(*down).or_default() += 1;
        }

        let mut ready: VecDeque<TaskId> = self
            .tasks
            .iter()
            .copied()
            .filter(|t| indegree[t] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());

        while let Some(task) = ready.pop_front() {
            order.push(task);
            for (_, down) in self.edges.iter().filter(|(up, _)| *up == task) {
                let d = indegree.entry(*down).or_default();
                *d -= 1;
                if *d == 0 {
                    ready.push_back(*down);
                }
            }
        }

        if order.len() != self.tasks.len() {
            let stuck: Vec<&str> = self
                .tasks
                .iter()
                .filter(|t| !order.contains(*t))
                .map(TaskId::as_str)
                .collect();
            return Err(DagError::Cycle(stuck.join(", ")));
        }

        Ok(order)
    }

    /// Direct upstreams of `task`.
    pub fn upstream_of(&self, task: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.edges
            .iter()
            .filter(move |(_, down)| *down == task)
            .map(|(up, _)| *up)
    }

    /// Execute one run with `execute` as the task body.
    pub fn run_with<F>(&self, config: &PipelineConfig, mut execute: F) -> DagResult<DagRun>
    where
        F: FnMut(TaskId, &PipelineConfig) -> Result<TaskOutput, PipelineError>,
    {
        let order = self.execution_order()?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("dag_run", dag_id = %self.dag_id, %run_id);
        let _guard = span.enter();

        let mut failed: HashSet<TaskId> = HashSet::new();
        let mut tasks = Vec::with_capacity(order.len());

        for task in order {
            if self.upstream_of(task).any(|up| failed.contains(&up)) {
                info!(%task, "skipping, upstream failed");
                failed.insert(task);
                tasks.push(TaskRun {
                    task,
                    state: TaskState::UpstreamFailed,
                    output: None,
                    error: None,
                });
                continue;
            }

            info!(%task, "running");
            match execute(task, config) {
                Ok(output) => {
                    info!(%task, "success");
                    tasks.push(TaskRun {
                        task,
                        state: TaskState::Success,
                        output: Some(output),
                        error: None,
                    });
                }
                Err(e) => {
                    error!(%task, error = %e, "failed");
                    failed.insert(task);
                    tasks.push(TaskRun {
                        task,
                        state: TaskState::Failed,
                        output: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(DagRun {
            dag_id: self.dag_id.clone(),
            run_id,
            started_at,
            finished_at: Utc::now(),
            tasks,
        })
    }

    /// Execute one run of the real tasks.
    pub fn run(&self, config: &PipelineConfig) -> DagResult<DagRun> {
        self.run_with(config, |task, config| task.execute(config))
    }
}

// =============================================================================
// Runs
// =============================================================================

/// Final state of a task within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Success,
    Failed,
    UpstreamFailed,
}

/// One task's outcome within a run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRun {
    pub task: TaskId,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<TaskOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one DAG run.
#[derive(Debug, Clone, Serialize)]
pub struct DagRun {
    pub dag_id: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks: Vec<TaskRun>,
}

impl DagRun {
    pub fn succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.state == TaskState::Success)
    }

    pub fn state_of(&self, task: TaskId) -> Option<TaskState> {
        self.tasks.iter().find(|t| t.task == task).map(|t| t.state)
    }

    /// First task error, if any.
    pub fn first_error(&self) -> Option<(TaskId, &str)> {
        self.tasks
            .iter()
            .find_map(|t| t.error.as_deref().map(|e| (t.task, e)))
    }
}

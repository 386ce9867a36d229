//! Parallel batch export.
//!
//! Jobs are queued FIFO on a bounded `rayon` pool. Each worker sends its
//! messages back over a bounded channel; the calling thread drains that
//! channel while the pool runs, so completions are handled in arrival
//! order rather than submission order.
//!
//! ```text
//! coordinator ──jobs──▶ rayon pool (N workers)
//!      ▲                     │
//!      └──── sync_channel ◀──┘   Started / Done / Skipped
//! ```
//!
//! Per-job state only moves forward:
//! `Pending → Running → {Succeeded, Failed}`. A job that has not started
//! when the [`CancelToken`] is set is skipped and stays `Pending`; jobs
//! already running finish normally and their files are kept.

use crate::export::{self, ExportJob, ExportReport};
use crate::imaging::ImageBackend;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use thiserror::Error;

/// Failures listed individually in a summary; the rest are counted.
pub const MAX_LISTED_FAILURES: usize = 10;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress notifications for an observer (CLI printer, GUI status bar).
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        index: usize,
        name: String,
    },
    Succeeded {
        index: usize,
        name: String,
        written: Vec<PathBuf>,
        completed: usize,
        total: usize,
    },
    Failed {
        index: usize,
        name: String,
        error: String,
        completed: usize,
        total: usize,
    },
    Skipped {
        index: usize,
        name: String,
    },
}

/// Aggregate outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Files written across all successful jobs.
    pub files_written: usize,
    /// `(name, error)` in arrival order.
    pub failures: Vec<(String, String)>,
    pub skipped: usize,
    /// Final status per job, in submission order.
    pub statuses: Vec<JobStatus>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn cancelled(&self) -> bool {
        self.skipped > 0
    }

    /// The first `limit` failures as `name: error`, followed by
    /// `...and N more` when some were left out.
    pub fn failure_lines(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self
            .failures
            .iter()
            .take(limit)
            .map(|(name, error)| format!("{name}: {error}"))
            .collect();
        if self.failures.len() > limit {
            lines.push(format!("...and {} more", self.failures.len() - limit));
        }
        lines
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed())?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        write!(f, " ({} total)", self.total)
    }
}

enum WorkerMsg {
    Started(usize),
    Done(usize, ExportReport),
    Skipped(usize),
}

/// Runs export jobs on a fixed-size worker pool.
pub struct BatchOrchestrator {
    workers: usize,
    events: Option<Sender<BatchEvent>>,
}

impl BatchOrchestrator {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            events: None,
        }
    }

    /// Forward progress events to `sender`. A disconnected receiver is
    /// ignored.
    pub fn with_events(mut self, sender: Sender<BatchEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Export every job and wait for the pool to drain.
    ///
    /// `on_report` runs on the calling thread for each finished job, as it
    /// arrives.
    pub fn run(
        &self,
        backend: &impl ImageBackend,
        jobs: &[ExportJob],
        cancel: &CancelToken,
        mut on_report: impl FnMut(&ExportReport),
    ) -> Result<BatchSummary, BatchError> {
        let total = jobs.len();
        let mut summary = BatchSummary {
            total,
            statuses: vec![JobStatus::Pending; total],
            ..Default::default()
        };
        if total == 0 {
            return Ok(summary);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("wallcrop-export-{i}"))
            .build()?;
        tracing::info!("exporting {total} image(s) on {} worker(s)", self.workers);

        let (tx, rx) = mpsc::sync_channel::<WorkerMsg>(self.workers * 2);
        let mut completed = 0;

        std::thread::scope(|s| {
            s.spawn(move || {
                pool.scope_fifo(|scope| {
                    for (pos, job) in jobs.iter().enumerate() {
                        let tx = tx.clone();
                        scope.spawn_fifo(move |_| {
                            if cancel.is_cancelled() {
                                let _ = tx.send(WorkerMsg::Skipped(pos));
                                return;
                            }
                            let _ = tx.send(WorkerMsg::Started(pos));
                            let report = export::run_job(backend, job);
                            let _ = tx.send(WorkerMsg::Done(pos, report));
                        });
                    }
                });
            });

            for msg in rx {
                match msg {
                    WorkerMsg::Started(pos) => {
                        advance(&mut summary.statuses[pos], JobStatus::Running);
                        self.emit(BatchEvent::Started {
                            index: jobs[pos].index,
                            name: jobs[pos].name(),
                        });
                    }
                    WorkerMsg::Skipped(pos) => {
                        summary.skipped += 1;
                        self.emit(BatchEvent::Skipped {
                            index: jobs[pos].index,
                            name: jobs[pos].name(),
                        });
                    }
                    WorkerMsg::Done(pos, report) => {
                        completed += 1;
                        on_report(&report);
                        let event = match &report.outcome {
                            Ok(written) => {
                                advance(&mut summary.statuses[pos], JobStatus::Succeeded);
                                summary.succeeded += 1;
                                summary.files_written += written.len();
                                BatchEvent::Succeeded {
                                    index: report.index,
                                    name: report.name.clone(),
                                    written: written.clone(),
                                    completed,
                                    total,
                                }
                            }
                            Err(e) => {
                                advance(&mut summary.statuses[pos], JobStatus::Failed);
                                tracing::warn!("export failed for {}: {e}", report.name);
                                summary.failures.push((report.name.clone(), e.to_string()));
                                BatchEvent::Failed {
                                    index: report.index,
                                    name: report.name.clone(),
                                    error: e.to_string(),
                                    completed,
                                    total,
                                }
                            }
                        };
                        self.emit(event);
                    }
                }
            }
        });

        tracing::info!("batch finished: {summary}");
        Ok(summary)
    }
}

fn advance(status: &mut JobStatus, next: JobStatus) {
    if status.can_transition_to(next) {
        *status = next;
    } else {
        tracing::error!("ignoring job status change {status:?} -> {next:?}");
    }
}

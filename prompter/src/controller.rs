//! Iteration controller for `prompter run`.
//!
//! Runs one task through the generator a fixed number of times, recording each
//! attempt, then persists the whole batch in a single write. Generator failures
//! are absorbed per iteration; only invalid requests and persistence failures
//! reach the caller.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::core::invariants::validate_run_request;
use crate::core::record::{Record, RecordFactory, SystemRecordFactory};
use crate::core::types::{GenerationOutcome, IterationEvent};
use crate::io::generator::Generator;
use crate::io::store::RecordStore;

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Short identifier embedded in the output file name.
    pub run_id: String,
    /// One record per iteration, in iteration order.
    pub records: Vec<Record>,
    /// Where the store put the batch.
    pub path: PathBuf,
}

impl RunOutcome {
    pub fn completed(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.output().is_some())
            .count()
    }
}

/// The run request was rejected before any iteration executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRunError {
    pub errors: Vec<String>,
}

impl fmt::Display for InvalidRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid run request:\n- {}", self.errors.join("\n- "))
    }
}

impl std::error::Error for InvalidRunError {}

/// Every iteration ran but the batch could not be persisted.
///
/// The records are kept so the caller can still inspect or retry them.
#[derive(Debug)]
pub struct PersistError {
    pub run_id: String,
    pub records: Vec<Record>,
    pub source: anyhow::Error,
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to persist {} records for run {}: {:#}",
            self.records.len(),
            self.run_id,
            self.source
        )
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Drives a generator over repeated iterations of one task.
pub struct Controller<G, S, I = fn() -> String, C = fn() -> DateTime<Utc>> {
    generator: G,
    store: S,
    factory: RecordFactory<I, C>,
    max_iterations: u32,
}

impl<G, S> Controller<G, S>
where
    G: Generator,
    S: RecordStore,
{
    /// Controller with UUID ids, the system clock, and no iteration cap.
    pub fn new(generator: G, store: S) -> Self {
        Self {
            generator,
            store,
            factory: SystemRecordFactory::system(),
            max_iterations: u32::MAX,
        }
    }
}

impl<G, S, I, C> Controller<G, S, I, C>
where
    G: Generator,
    S: RecordStore,
    I: FnMut() -> String,
    C: FnMut() -> DateTime<Utc>,
{
    /// Swap in a different record factory (deterministic ids and clocks in tests).
    pub fn with_factory<I2, C2>(self, factory: RecordFactory<I2, C2>) -> Controller<G, S, I2, C2>
    where
        I2: FnMut() -> String,
        C2: FnMut() -> DateTime<Utc>,
    {
        Controller {
            generator: self.generator,
            store: self.store,
            factory,
            max_iterations: self.max_iterations,
        }
    }

    /// Reject runs asking for more than `max_iterations`.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run `task` `iterations` times and persist the records.
    pub fn run_task(&mut self, task: &str, agent_name: &str, iterations: u32) -> Result<RunOutcome> {
        self.run_task_with(task, agent_name, iterations, |_| {})
    }

    /// Like [`Controller::run_task`], calling `on_iteration` after each iteration.
    ///
    /// Errors are [`InvalidRunError`] (nothing ran) or [`PersistError`]
    /// (everything ran, nothing saved); match with `downcast_ref`.
    #[instrument(skip_all, fields(agent_name = %agent_name, iterations = iterations))]
    pub fn run_task_with<F>(
        &mut self,
        task: &str,
        agent_name: &str,
        iterations: u32,
        mut on_iteration: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(&IterationEvent<'_>),
    {
        let errors = validate_run_request(task, agent_name, iterations, self.max_iterations);
        if !errors.is_empty() {
            return Err(InvalidRunError { errors }.into());
        }

        let run_id = new_run_id();
        info!(run_id = %run_id, task, "running task");

        let mut records = Vec::with_capacity(iterations.min(1_024) as usize);
        for iter in 1..=iterations {
            debug!(iter, "starting iteration");
            let mut record = self.factory.create(agent_name, task);

            let outcome = match self.generator.generate(task) {
                Ok(text) => match record.attach_output(text) {
                    Ok(()) => {
                        info!(iter, record_id = record.id(), "iteration completed");
                        GenerationOutcome::Completed
                    }
                    Err(err) => failed(iter, &record, err),
                },
                Err(err) => failed(iter, &record, err),
            };

            on_iteration(&IterationEvent {
                run_id: &run_id,
                iter,
                iterations,
                record: &record,
                outcome,
            });
            records.push(record);
        }

        match self.store.persist(&records, agent_name, &run_id) {
            Ok(path) => {
                info!(run_id = %run_id, path = %path.display(), records = records.len(), "run complete");
                Ok(RunOutcome {
                    run_id,
                    records,
                    path,
                })
            }
            Err(source) => {
                warn!(run_id = %run_id, err = %format!("{source:#}"), "persisting records failed");
                Err(PersistError {
                    run_id,
                    records,
                    source,
                }
                .into())
            }
        }
    }
}

fn failed(iter: u32, record: &Record, err: anyhow::Error) -> GenerationOutcome {
    let reason = format!("{err:#}");
    warn!(iter, record_id = record.id(), reason = %reason, "iteration failed");
    GenerationOutcome::Failed { reason }
}

/// Short random run identifier (8 hex chars).
pub fn new_run_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

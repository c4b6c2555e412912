//! Record persistence: one JSON array file per run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::core::invariants::{is_file_name_safe, validate_records};
use crate::core::record::Record;
use crate::io::atomic::{WriteMode, write_atomic};

/// JSON Schema for persisted record files.
pub const RECORDS_SCHEMA: &str =
    include_str!("../../../schemas/prompt_records/v1.schema.json");

/// Destination for a completed batch of records.
pub trait RecordStore {
    /// Persist `records` for one run and return where they landed.
    ///
    /// All-or-nothing: on error nothing is visible under the final name.
    fn persist(&self, records: &[Record], agent_name: &str, run_id: &str) -> Result<PathBuf>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn persist(&self, records: &[Record], agent_name: &str, run_id: &str) -> Result<PathBuf> {
        (**self).persist(records, agent_name, run_id)
    }
}

/// Writes `{agent_name}_prompts_{timestamp}_{run_id}.json` into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordStore for JsonFileStore {
    #[instrument(skip_all, fields(agent_name = %agent_name, run_id = %run_id, records = records.len()))]
    fn persist(&self, records: &[Record], agent_name: &str, run_id: &str) -> Result<PathBuf> {
        if !is_file_name_safe(agent_name) || !is_file_name_safe(run_id) {
            return Err(anyhow!(
                "refusing to build a file name from agent '{}' and run '{}'",
                agent_name,
                run_id
            ));
        }
        let path = self
            .dir
            .join(record_file_name(agent_name, run_id, Utc::now()));

        let batch: Vec<Value> = records.iter().map(Record::to_serializable).collect();
        let mut buf = serde_json::to_string_pretty(&batch).context("serialize records")?;
        buf.push('\n');

        write_atomic(&path, buf.as_bytes(), WriteMode::CreateNew)?;
        info!(path = %path.display(), "records saved");
        Ok(path)
    }
}

/// File name for a run's records. `at` is rendered in ISO-8601 basic form so
/// the name stays portable.
pub fn record_file_name(agent_name: &str, run_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_prompts_{}_{}.json",
        agent_name,
        at.format("%Y%m%dT%H%M%S%.6fZ"),
        run_id
    )
}

/// Load a persisted record file, checking the schema and batch invariants.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read records {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse records {}", path.display()))?;
    validate_schema(&value).with_context(|| format!("validate {}", path.display()))?;
    let records: Vec<Record> = serde_json::from_value(value)
        .with_context(|| format!("deserialize records {}", path.display()))?;

    let errors = validate_records(&records);
    if !errors.is_empty() {
        return Err(anyhow!(
            "record invariants failed in {}: {}",
            path.display(),
            errors.join("; ")
        ));
    }
    debug!(path = %path.display(), records = records.len(), "records loaded");
    Ok(records)
}

fn validate_schema(value: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(RECORDS_SCHEMA).context("parse records schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(value) {
        let messages = compiled
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "records schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

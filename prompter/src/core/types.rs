//! Shared types passed between the controller and its callers.

use serde::Serialize;

use crate::core::record::Record;

/// How the generation call ended for one iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GenerationOutcome {
    /// The generator returned text and it was attached to the record.
    Completed,
    /// The generator failed; the record keeps a null output.
    Failed { reason: String },
}

impl GenerationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Observer notification emitted once per iteration.
#[derive(Debug, Clone)]
pub struct IterationEvent<'a> {
    pub run_id: &'a str,
    /// Iteration number (1-indexed).
    pub iter: u32,
    pub iterations: u32,
    pub record: &'a Record,
    pub outcome: GenerationOutcome,
}

//! Semantic checks on run requests and record batches that JSON Schema cannot express.

use std::collections::HashSet;

use crate::core::record::{Record, render_prompt};

/// Check a run request before any iteration executes:
/// - `task` is not blank
/// - `agent_name` is not blank and is safe to embed in a file name
/// - `iterations <= max_iterations`
pub fn validate_run_request(
    task: &str,
    agent_name: &str,
    iterations: u32,
    max_iterations: u32,
) -> Vec<String> {
    let mut errors = Vec::new();

    if task.trim().is_empty() {
        errors.push("task must not be empty".to_string());
    }

    if agent_name.trim().is_empty() {
        errors.push("agent_name must not be empty".to_string());
    } else if !is_file_name_safe(agent_name) {
        errors.push(format!(
            "agent_name '{}' must not be '.' or '..' or contain path separators or control characters",
            agent_name
        ));
    }

    if iterations > max_iterations {
        errors.push(format!(
            "iterations {} exceeds max_iterations {}",
            iterations, max_iterations
        ));
    }

    errors
}

/// Check invariants across a batch of records:
/// - No duplicate ids
/// - Timestamps non-decreasing in order
/// - Each prompt is the rendering of its task
pub fn validate_records(records: &[Record]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        if !seen.insert(record.id()) {
            errors.push(format!("duplicate id '{}' at index {}", record.id(), index));
        }
        if record.prompt() != render_prompt(record.task()) {
            errors.push(format!("{}: prompt does not match task", record.id()));
        }
    }

    for pair in records.windows(2) {
        if pair[1].timestamp() < pair[0].timestamp() {
            errors.push(format!(
                "{}: timestamp precedes previous record {}",
                pair[1].id(),
                pair[0].id()
            ));
        }
    }

    errors
}

pub(crate) fn is_file_name_safe(name: &str) -> bool {
    name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
}

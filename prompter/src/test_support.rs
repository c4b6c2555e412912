//! Test-only helpers: deterministic record stamps, scripted generators, and stores.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::core::record::{Record, RecordFactory};
use crate::io::generator::Generator;
use crate::io::store::RecordStore;

/// Clock starting at 2026-10-18T09:30:00Z that advances one second per call.
pub fn ticking_clock() -> impl FnMut() -> DateTime<Utc> {
    let start = Utc
        .with_ymd_and_hms(2026, 10, 18, 9, 30, 0)
        .single()
        .expect("valid start time");
    let mut tick = 0i64;
    move || {
        let now = start + Duration::seconds(tick);
        tick += 1;
        now
    }
}

/// Clock starting at 2026-10-18T09:30:00Z that steps back one second per call.
pub fn rewinding_clock() -> impl FnMut() -> DateTime<Utc> {
    let mut now = Utc
        .with_ymd_and_hms(2026, 10, 18, 9, 30, 0)
        .single()
        .expect("valid start time");
    move || {
        let current = now;
        now = now - Duration::seconds(1);
        current
    }
}

/// Id source yielding `id-1`, `id-2`, ...
pub fn sequential_ids() -> impl FnMut() -> String {
    let mut next = 0u32;
    move || {
        next += 1;
        format!("id-{next}")
    }
}

/// Record factory with sequential ids and a ticking clock.
pub fn sequential_factory() -> RecordFactory<impl FnMut() -> String, impl FnMut() -> DateTime<Utc>> {
    RecordFactory::new(sequential_ids(), ticking_clock())
}

/// Generator that replays a queue of results, then repeats a fallback.
pub struct ScriptedGenerator {
    script: RefCell<VecDeque<Result<String, String>>>,
    fallback: Result<String, String>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Result<String, String>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            fallback: Err("script exhausted".to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Always succeed with `text`.
    pub fn always(text: &str) -> Self {
        Self {
            fallback: Ok(text.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Always fail with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            fallback: Err(reason.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Tasks received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, task: &str) -> Result<String> {
        self.calls.borrow_mut().push(task.to_string());
        let next = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(|reason| anyhow!(reason))
    }
}

/// Store that keeps every persisted batch in memory, in call order.
#[derive(Default)]
pub struct MemoryStore {
    pub batches: RefCell<Vec<(String, String, Vec<Record>)>>,
}

impl RecordStore for MemoryStore {
    fn persist(&self, records: &[Record], agent_name: &str, run_id: &str) -> Result<PathBuf> {
        self.batches
            .borrow_mut()
            .push((agent_name.to_string(), run_id.to_string(), records.to_vec()));
        Ok(PathBuf::from(format!("memory://{agent_name}/{run_id}")))
    }
}

/// Store that always fails and counts attempts.
#[derive(Default)]
pub struct FailingStore {
    pub attempts: Cell<u32>,
}

impl RecordStore for FailingStore {
    fn persist(&self, _records: &[Record], _agent_name: &str, _run_id: &str) -> Result<PathBuf> {
        self.attempts.set(self.attempts.get() + 1);
        Err(anyhow!("disk full"))
    }
}

//! Prompt record data model.
//!
//! A [`Record`] captures one iteration of a run: who asked (`agent_name`), what
//! was asked (`task`), the rendered `prompt`, and the generated `output`.
//! Identity and creation time come from a [`RecordFactory`] so tests can swap
//! in deterministic sources.

use anyhow::{Result, anyhow};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One iteration's unit of work and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    id: String,
    #[serde(with = "iso8601")]
    timestamp: DateTime<Utc>,
    agent_name: String,
    task: String,
    prompt: String,
    output: Option<String>,
}

impl Record {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Attach the generated output. Fails if an output is already present.
    pub fn attach_output(&mut self, output: impl Into<String>) -> Result<()> {
        if self.output.is_some() {
            return Err(anyhow!("record {} already has an output", self.id));
        }
        self.output = Some(output.into());
        Ok(())
    }

    /// Field-stable JSON form: `id, timestamp, agent_name, task, prompt, output`.
    pub fn to_serializable(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "timestamp": format_timestamp(&self.timestamp),
            "agent_name": self.agent_name,
            "task": self.task,
            "prompt": self.prompt,
            "output": self.output,
        })
    }
}

/// Render the prompt text for `task`.
pub fn render_prompt(task: &str) -> String {
    format!("The user wants to accomplish the following task: {task}.")
}

/// Render a UTC timestamp as RFC 3339 with microseconds and a `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Builds records from injected id and clock sources.
///
/// Timestamps never go backwards across records from one factory, even if the
/// clock does.
pub struct RecordFactory<I, C> {
    new_id: I,
    now_utc: C,
    last: Option<DateTime<Utc>>,
}

/// Factory backed by UUID v4 ids and the system clock.
pub type SystemRecordFactory = RecordFactory<fn() -> String, fn() -> DateTime<Utc>>;

impl SystemRecordFactory {
    pub fn system() -> Self {
        RecordFactory::new(new_id as fn() -> String, Utc::now as fn() -> DateTime<Utc>)
    }
}

impl<I, C> RecordFactory<I, C>
where
    I: FnMut() -> String,
    C: FnMut() -> DateTime<Utc>,
{
    pub fn new(new_id: I, now_utc: C) -> Self {
        Self {
            new_id,
            now_utc,
            last: None,
        }
    }

    /// Create a fresh record with no output.
    ///
    /// Timestamps are truncated to microseconds so a persisted record parses
    /// back to an identical value, and clamped to the previous record's.
    pub fn create(&mut self, agent_name: &str, task: &str) -> Record {
        let now = (self.now_utc)().trunc_subsecs(6);
        let timestamp = match self.last {
            Some(last) if now < last => last,
            _ => now,
        };
        self.last = Some(timestamp);
        Record {
            id: (self.new_id)(),
            timestamp,
            agent_name: agent_name.to_string(),
            task: task.to_string(),
            prompt: render_prompt(task),
            output: None,
        }
    }
}

/// Generate a random UUID v4 identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_factory() -> RecordFactory<impl FnMut() -> String, impl FnMut() -> DateTime<Utc>> {
        let mut next = 0u32;
        RecordFactory::new(
            move || {
                next += 1;
                format!("id-{next}")
            },
            || Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
        )
    }

    #[test]
    fn create_renders_prompt_and_leaves_output_empty() {
        let mut factory = fixed_factory();
        let record = factory.create("Trip-Agent", "Plan a trip");

        assert_eq!(record.id(), "id-1");
        assert_eq!(record.agent_name(), "Trip-Agent");
        assert_eq!(
            record.prompt(),
            "The user wants to accomplish the following task: Plan a trip."
        );
        assert_eq!(record.output(), None);
    }

    #[test]
    fn prompt_depends_only_on_task() {
        let mut factory = fixed_factory();
        let a = factory.create("a", "same task");
        let b = factory.create("b", "same task");
        assert_eq!(a.prompt(), b.prompt());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn attach_output_is_write_once() {
        let mut record = fixed_factory().create("agent", "task");
        record.attach_output("first").expect("attach");
        let err = record.attach_output("second").unwrap_err();

        assert!(err.to_string().contains("already has an output"));
        assert_eq!(record.output(), Some("first"));
    }

    #[test]
    fn serializable_form_has_stable_keys_and_null_output() {
        let record = fixed_factory().create("agent", "task");
        let value = record.to_serializable();

        let keys: Vec<&str> = value
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec!["id", "timestamp", "agent_name", "task", "prompt", "output"]
        );
        assert_eq!(value["timestamp"], "2026-10-18T09:30:00.000000Z");
        assert!(value["output"].is_null());
    }

    #[test]
    fn serde_matches_serializable_form() {
        let mut record = fixed_factory().create("agent", "task");
        record.attach_output("done").expect("attach");

        let via_serde = serde_json::to_value(&record).expect("to_value");
        assert_eq!(via_serde, record.to_serializable());

        let parsed: Record = serde_json::from_value(via_serde).expect("from_value");
        assert_eq!(parsed, record);
    }

    #[test]
    fn timestamps_hold_when_clock_steps_back() {
        let start = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let mut readings = vec![
            start,
            start - chrono::Duration::seconds(1),
            start + chrono::Duration::seconds(2),
        ]
        .into_iter();
        let mut next = 0u32;
        let mut factory = RecordFactory::new(
            move || {
                next += 1;
                format!("id-{next}")
            },
            move || readings.next().unwrap(),
        );

        let stamps: Vec<DateTime<Utc>> = (0..3)
            .map(|_| factory.create("agent", "task").timestamp())
            .collect();

        assert_eq!(
            stamps,
            vec![start, start, start + chrono::Duration::seconds(2)]
        );
    }

    #[test]
    fn system_factory_generates_distinct_uuids() {
        let mut factory = SystemRecordFactory::system();
        let a = factory.create("agent", "task");
        let b = factory.create("agent", "task");

        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
        assert!(b.timestamp() >= a.timestamp());
    }
}

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::common::arraydef::RangeExpansion;
use crate::common::nodecount::parse_node_count;
use crate::common::validation::{FieldValue, Validate, ValidationErrors, check_inclusion};
use crate::server::allocation::{Allocation, AllocationRegistry};
use crate::server::script::ScriptStore;

/// Externally assigned job identifier.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        JobId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        JobId::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        JobId(id)
    }
}

impl FromStr for JobId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(JobId::new(s))
    }
}

/// Implements the wire names of a plain enum in both directions.
macro_rules! wire_enum {
    ($name: ident { $($variant: ident => $wire: literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(format!("unknown {}: {s}", stringify!($name))),
                }
            }
        }
    };
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Cancelling,
    Cancelled,
    Completed,
    Failed,
}

wire_enum!(JobState {
    Pending => "PENDING",
    Running => "RUNNING",
    Cancelling => "CANCELLING",
    Cancelled => "CANCELLED",
    Completed => "COMPLETED",
    Failed => "FAILED",
});

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Cancelled | JobState::Completed | JobState::Failed
        )
    }
}

/// Why a pending job has not started yet.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    WaitingForScheduling,
    Priority,
    Resources,
}

wire_enum!(Reason {
    WaitingForScheduling => "WaitingForScheduling",
    Priority => "Priority",
    Resources => "Resources",
});

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Job,
    ArrayJob,
    ArrayTask,
}

wire_enum!(JobType {
    Job => "JOB",
    ArrayJob => "ARRAY_JOB",
    ArrayTask => "ARRAY_TASK",
});

/// Resources a job needs on every node it runs on. Missing values count as zero.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeResources {
    pub cpus: Option<u64>,
    pub gpus: Option<u64>,
    pub memory: Option<u64>,
}

/// Field values used to build a [`Job`].
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct JobFields {
    pub id: Option<String>,
    pub job_type: Option<String>,
    pub state: Option<String>,
    pub reason: Option<String>,
    pub partition: Option<String>,
    pub min_nodes: Option<serde_json::Value>,
    pub script_name: Option<String>,
    pub script_provided: Option<serde_json::Value>,
    pub arguments: Option<Vec<String>>,
    pub array: Option<String>,
    pub username: Option<String>,
    pub cpus_per_node: Option<u64>,
    pub gpus_per_node: Option<u64>,
    pub memory_per_node: Option<u64>,
}

#[derive(Debug, Clone, Default)]
struct Lifecycle {
    state: FieldValue<JobState>,
    reason: FieldValue<Reason>,
}

/// A schedulable unit of work.
///
/// Submission fields are assigned through `&mut self` before the job is
/// shared. The lifecycle (state and reason) sits behind a per-job lock, so
/// transitions on a shared job are serialized.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    job_type: FieldValue<JobType>,
    partition: Option<String>,
    min_nodes: FieldValue<u64>,
    script_name: Option<String>,
    script_provided: FieldValue<bool>,
    arguments: Option<Vec<String>>,
    array_range: Option<RangeExpansion>,
    username: Option<String>,
    resources: NodeResources,
    lifecycle: Mutex<Lifecycle>,
}

impl Job {
    pub fn new(id: impl Into<JobId>) -> Self {
        Job {
            id: id.into(),
            job_type: FieldValue::Value(JobType::Job),
            partition: None,
            min_nodes: FieldValue::Unset,
            script_name: None,
            script_provided: FieldValue::Unset,
            arguments: None,
            array_range: None,
            username: None,
            resources: NodeResources::default(),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Assigns every present field. Never fails, bad values show up in [`Validate::validate`].
    pub fn from_fields(fields: JobFields) -> Self {
        let mut job = Job::new(fields.id.unwrap_or_default());
        if let Some(job_type) = fields.job_type {
            job.job_type = FieldValue::parse(Some(job_type.as_str()));
        }
        job.assign_state(fields.state.as_deref());
        job.assign_reason(fields.reason.as_deref());
        job.partition = fields.partition;
        if let Some(min_nodes) = fields.min_nodes {
            job.assign_min_nodes(&min_nodes);
        }
        job.script_name = fields.script_name;
        if let Some(provided) = fields.script_provided {
            job.script_provided = match provided {
                serde_json::Value::Bool(value) => FieldValue::Value(value),
                serde_json::Value::Null => FieldValue::Unset,
                other => FieldValue::Invalid(other.to_string()),
            };
        }
        job.arguments = fields.arguments;
        if let Some(array) = fields.array {
            job.set_array(&array);
        }
        job.username = fields.username;
        job.resources = NodeResources {
            cpus: fields.cpus_per_node,
            gpus: fields.gpus_per_node,
            memory: fields.memory_per_node,
        };
        job
    }

    /// Builds a job from a JSON object of field values.
    pub fn from_json(value: serde_json::Value) -> crate::Result<Self> {
        let fields: JobFields = serde_json::from_value(value)?;
        Ok(Job::from_fields(fields))
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn job_type(&self) -> Option<JobType> {
        self.job_type.get()
    }

    pub fn set_job_type(&mut self, job_type: JobType) {
        self.job_type = FieldValue::Value(job_type);
    }

    pub fn state(&self) -> Option<JobState> {
        self.lifecycle.lock().state.get()
    }

    pub fn set_state(&self, state: JobState) {
        self.lifecycle.lock().state = FieldValue::Value(state);
    }

    /// Assigns a state by its wire name, `None` clears it.
    pub fn assign_state(&self, raw: Option<&str>) {
        self.lifecycle.lock().state = FieldValue::parse(raw);
    }

    /// The scheduling reason, only visible while the job is pending.
    pub fn reason(&self) -> Option<Reason> {
        let lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            FieldValue::Value(JobState::Pending) => lifecycle.reason.get(),
            _ => None,
        }
    }

    pub fn set_reason(&self, reason: Option<Reason>) {
        self.lifecycle.lock().reason = reason.map(FieldValue::Value).unwrap_or_default();
    }

    pub fn assign_reason(&self, raw: Option<&str>) {
        self.lifecycle.lock().reason = FieldValue::parse(raw);
    }

    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    pub fn set_partition(&mut self, partition: impl Into<String>) {
        self.partition = Some(partition.into());
    }

    /// Decoded node count, `None` when unset or not decodable.
    pub fn min_nodes(&self) -> Option<u64> {
        self.min_nodes.get()
    }

    /// Same as [`Job::min_nodes`] until an independent maximum is supported.
    pub fn max_nodes(&self) -> Option<u64> {
        self.min_nodes()
    }

    pub fn set_min_nodes(&mut self, count: u64) {
        self.min_nodes = FieldValue::Value(count);
    }

    /// Accepts `<int>`, `<int>k` and `<int>m`. Other input is kept and rejected by validation.
    pub fn set_min_nodes_raw(&mut self, raw: &str) {
        self.min_nodes = match parse_node_count(raw) {
            Some(count) => FieldValue::Value(count),
            None => FieldValue::Invalid(raw.to_string()),
        };
    }

    /// Strings and unsigned integers are decoded, anything else is kept for validation.
    pub fn assign_min_nodes(&mut self, raw: &serde_json::Value) {
        match raw {
            serde_json::Value::Null => self.min_nodes = FieldValue::Unset,
            serde_json::Value::String(raw) => self.set_min_nodes_raw(raw),
            serde_json::Value::Number(count) if count.is_u64() => {
                self.set_min_nodes_raw(&count.to_string())
            }
            other => self.min_nodes = FieldValue::Invalid(other.to_string()),
        }
    }

    pub fn script_name(&self) -> Option<&str> {
        self.script_name.as_deref()
    }

    pub fn set_script_name(&mut self, name: impl Into<String>) {
        self.script_name = Some(name.into());
    }

    pub fn script_provided(&self) -> bool {
        self.script_provided.get().unwrap_or(false)
    }

    pub fn set_script_provided(&mut self, provided: bool) {
        self.script_provided = FieldValue::Value(provided);
    }

    pub fn arguments(&self) -> &[String] {
        self.arguments.as_deref().unwrap_or_default()
    }

    pub fn set_arguments(&mut self, arguments: Vec<String>) {
        self.arguments = Some(arguments);
    }

    /// Turns the job into an array job over `expression`.
    pub fn set_array(&mut self, expression: &str) {
        self.job_type = FieldValue::Value(JobType::ArrayJob);
        self.array_range = Some(RangeExpansion::parse(expression));
    }

    pub fn array_range(&self) -> Option<&RangeExpansion> {
        self.array_range.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    pub fn resources(&self) -> NodeResources {
        self.resources
    }

    pub fn set_resources(&mut self, resources: NodeResources) {
        self.resources = resources;
    }

    pub fn display_id(&self) -> String {
        self.id.to_string()
    }

    pub fn script_path(&self, store: &ScriptStore) -> PathBuf {
        store.path_for(&self.id)
    }

    /// Removes the stored script. Called once the job has reached its end.
    pub fn cleanup(&self, store: &ScriptStore) -> crate::Result<()> {
        store.cleanup(&self.id)
    }

    pub fn allocation(&self, registry: &AllocationRegistry) -> Option<Arc<Allocation>> {
        registry.for_job(&self.id)
    }

    pub fn is_allocated(&self, registry: &AllocationRegistry) -> bool {
        self.allocation(registry).is_some()
    }

    /// Record used by array tasks for their own lifecycle.
    pub(crate) fn task_record(&self, index: u32) -> Job {
        let record = Job {
            id: JobId::new(format!("{}.{index}", self.id)),
            job_type: FieldValue::Value(JobType::ArrayTask),
            partition: self.partition.clone(),
            min_nodes: FieldValue::Value(1),
            script_name: None,
            script_provided: FieldValue::Unset,
            arguments: self.arguments.clone(),
            array_range: None,
            username: self.username.clone(),
            resources: self.resources,
            lifecycle: Mutex::new(Lifecycle::default()),
        };
        record.set_state(JobState::Pending);
        record.set_reason(Some(Reason::WaitingForScheduling));
        record
    }

    fn validate_min_nodes(&self, errors: &mut ValidationErrors) {
        match &self.min_nodes {
            FieldValue::Unset => errors.add("min_nodes", "can't be blank"),
            FieldValue::Invalid(raw) => errors.add(
                "min_nodes",
                format!("'{raw}' is not a number, expected <int>, <int>k or <int>m"),
            ),
            FieldValue::Value(0) => {
                errors.add("min_nodes", "must be greater than or equal to 1")
            }
            FieldValue::Value(_) => {}
        }
    }
}

impl Validate for Job {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.id.is_blank() {
            errors.add("id", "can't be blank");
        }
        {
            let lifecycle = self.lifecycle.lock();
            check_inclusion(&mut errors, "state", &lifecycle.state, true);
            check_inclusion(&mut errors, "reason", &lifecycle.reason, false);
        }
        match &self.job_type {
            FieldValue::Value(JobType::ArrayTask) => {
                errors.add("job_type", "'ARRAY_TASK' is not included in the list")
            }
            job_type => check_inclusion(&mut errors, "job_type", job_type, true),
        }

        match self.job_type() {
            Some(JobType::Job) => {
                self.validate_min_nodes(&mut errors);
                if self.script_name.as_deref().is_none_or(|name| name.trim().is_empty()) {
                    errors.add("script_name", "can't be blank");
                }
                if self.script_provided != FieldValue::Value(true) {
                    errors.add("script_provided", "is not included in the list");
                }
            }
            Some(JobType::ArrayJob) => {
                if !self.array_range.as_ref().is_some_and(RangeExpansion::is_valid) {
                    errors.add("array", "is not a valid range expression");
                }
            }
            Some(JobType::ArrayTask) | None => {}
        }
        errors
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Job {}

impl Hash for Job {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

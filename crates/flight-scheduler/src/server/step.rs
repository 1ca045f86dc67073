use serde::{Deserialize, Serialize};

use crate::common::validation::{FieldValue, Validate, ValidationErrors, check_inclusion};
use crate::server::job::JobId;
use crate::server::node::Node;
use crate::server::task::Schedulable;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Initializing,
    Running,
    Completed,
    Failed,
}

impl std::str::FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIALIZING" => Ok(ExecutionState::Initializing),
            "RUNNING" => Ok(ExecutionState::Running),
            "COMPLETED" => Ok(ExecutionState::Completed),
            "FAILED" => Ok(ExecutionState::Failed),
            _ => Err(format!("unknown execution state: {s}")),
        }
    }
}

/// Run of a job step on a single node.
#[derive(Debug, Clone)]
pub struct Execution {
    id: String,
    node_name: String,
    port: Option<u16>,
    state: FieldValue<ExecutionState>,
}

impl Execution {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Set once the node has started listening for this execution.
    pub fn set_port(&mut self, port: u16) {
        self.port = Some(port);
    }

    pub fn state(&self) -> Option<ExecutionState> {
        self.state.get()
    }

    pub fn set_state(&mut self, state: ExecutionState) {
        self.state = FieldValue::Value(state);
    }

    pub fn assign_state(&mut self, raw: Option<&str>) {
        self.state = FieldValue::parse(raw);
    }
}

impl Validate for Execution {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.node_name.is_empty() {
            errors.add("node", "can't be blank");
        }
        check_inclusion(&mut errors, "state", &self.state, true);
        errors
    }
}

/// A parallel step of a job, executed once on every node allocated to the job.
#[derive(Debug, Clone)]
pub struct JobStep {
    id: u32,
    job_id: JobId,
    job_display_id: String,
    path: Option<String>,
    arguments: Vec<String>,
    pty: bool,
    /// Additional environment of the step, expected to be an object.
    envs: serde_json::Value,
    executions: Vec<Execution>,
}

impl JobStep {
    pub fn new(job: &impl Schedulable, id: u32) -> Self {
        JobStep {
            id,
            job_id: job.id().clone(),
            job_display_id: job.display_id(),
            path: None,
            arguments: Vec::new(),
            pty: false,
            envs: serde_json::Value::Object(Default::default()),
            executions: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn set_arguments(&mut self, arguments: Vec<String>) {
        self.arguments = arguments;
    }

    pub fn is_pty(&self) -> bool {
        self.pty
    }

    pub fn set_pty(&mut self, pty: bool) {
        self.pty = pty;
    }

    pub fn envs(&self) -> &serde_json::Value {
        &self.envs
    }

    pub fn set_envs(&mut self, envs: serde_json::Value) {
        self.envs = envs;
    }

    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    pub fn add_execution(&mut self, node: &Node) -> &mut Execution {
        let execution = Execution {
            id: format!("{}.{}.{}", self.job_id, self.id, node.name()),
            node_name: node.name().to_string(),
            port: None,
            state: FieldValue::Value(ExecutionState::Initializing),
        };
        self.executions.push(execution);
        let last = self.executions.len() - 1;
        &mut self.executions[last]
    }

    pub fn execution_for(&self, node_name: &str) -> Option<&Execution> {
        self.executions
            .iter()
            .find(|execution| execution.node_name == node_name)
    }

    pub fn execution_for_mut(&mut self, node_name: &str) -> Option<&mut Execution> {
        self.executions
            .iter_mut()
            .find(|execution| execution.node_name == node_name)
    }

    /// True once every execution was given a port.
    pub fn is_submitted(&self) -> bool {
        self.executions.iter().all(|execution| execution.port.is_some())
    }

    pub fn display_id(&self) -> String {
        format!("{}.{}", self.job_display_id, self.id)
    }
}

impl Validate for JobStep {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.job_id.is_blank() {
            errors.add("job", "can't be blank");
        }
        if self.path.as_deref().is_none_or(|path| path.trim().is_empty()) {
            errors.add("path", "can't be blank");
        }
        if !self.envs.is_object() {
            errors.add("envs", "must be a hash");
        }
        errors
    }
}

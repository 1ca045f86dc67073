use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crate::common::validation::{Validate, ValidationErrors};
use crate::server::node::Node;

/// A named pool of nodes sharing scheduling constraints.
#[derive(Debug, Clone)]
pub struct Partition {
    name: String,
    nodes: Vec<Arc<Node>>,
    default: bool,
    default_time_limit: Option<Duration>,
    max_time_limit: Option<Duration>,
    /// Node selection rules, expected to be a table.
    matches: toml::Value,
}

impl Partition {
    pub fn new(name: impl Into<String>, nodes: Vec<Arc<Node>>) -> Self {
        Partition {
            name: name.into(),
            nodes,
            default: false,
            default_time_limit: None,
            max_time_limit: None,
            matches: toml::Value::Table(Default::default()),
        }
    }

    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    pub fn with_time_limits(
        mut self,
        default_time_limit: Option<Duration>,
        max_time_limit: Option<Duration>,
    ) -> Self {
        self.default_time_limit = default_time_limit;
        self.max_time_limit = max_time_limit;
        self
    }

    pub fn with_matches(mut self, matches: toml::Value) -> Self {
        self.matches = matches;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn default_time_limit(&self) -> Option<Duration> {
        self.default_time_limit
    }

    pub fn max_time_limit(&self) -> Option<Duration> {
        self.max_time_limit
    }

    pub fn matches(&self) -> &toml::Value {
        &self.matches
    }
}

impl Validate for Partition {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if !self.matches.is_table() {
            errors.add("matches", "must be a hash");
        }
        errors
    }
}

impl PartialEq for Partition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.nodes == other.nodes
    }
}

impl Eq for Partition {}

impl Hash for Partition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.nodes.hash(state);
    }
}

use serde::{Deserialize, Serialize};

/// A compute node and the resources it offers to jobs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub cpus: u64,
    #[serde(default)]
    pub gpus: u64,
    #[serde(default)]
    pub memory: u64,
}

impl Node {
    pub fn new(name: impl Into<String>, cpus: u64, gpus: u64, memory: u64) -> Self {
        Node {
            name: name.into(),
            cpus,
            gpus,
            memory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::Map;
use crate::common::error::error;
use crate::common::validation::Validate;
use crate::server::node::Node;
use crate::server::partition::Partition;
use crate::server::script::ScriptStore;

fn deserialize_human_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = Option::<String>::deserialize(deserializer)?;
    buf.map(|value| humantime::parse_duration(&value).map_err(serde::de::Error::custom))
        .transpose()
}

fn empty_table() -> toml::Value {
    toml::Value::Table(Default::default())
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartitionConfig {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default, deserialize_with = "deserialize_human_duration_opt")]
    pub default_time_limit: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_human_duration_opt")]
    pub max_time_limit: Option<Duration>,
    #[serde(default = "empty_table")]
    pub matches: toml::Value,
}

/// Controller configuration, usually read from a TOML file.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    pub job_dir: PathBuf,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub partitions: Vec<PartitionConfig>,
}

impl ControllerConfig {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The first partition flagged as default.
    pub fn default_partition(&self) -> Option<&PartitionConfig> {
        self.partitions.iter().find(|partition| partition.default)
    }

    pub fn script_store(&self) -> ScriptStore {
        ScriptStore::new(&self.job_dir)
    }

    /// Resolves partition node names against the node inventory and validates
    /// every partition.
    pub fn build_partitions(&self) -> crate::Result<Vec<Partition>> {
        let mut inventory: Map<&str, Arc<Node>> = Map::default();
        for node in &self.nodes {
            if inventory
                .insert(node.name(), Arc::new(node.clone()))
                .is_some()
            {
                return error(format!("Node {} is defined more than once", node.name()));
            }
        }

        let mut partitions = Vec::with_capacity(self.partitions.len());
        for config in &self.partitions {
            let mut nodes = Vec::with_capacity(config.nodes.len());
            for name in &config.nodes {
                match inventory.get(name.as_str()) {
                    Some(node) => nodes.push(node.clone()),
                    None => {
                        return error(format!(
                            "Partition {} references unknown node {name}",
                            config.name
                        ));
                    }
                }
            }
            let partition = Partition::new(&config.name, nodes)
                .with_default(config.default)
                .with_time_limits(config.default_time_limit, config.max_time_limit)
                .with_matches(config.matches.clone());
            partition.validate().into_result()?;
            partitions.push(partition);
        }
        Ok(partitions)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ControllerConfig;
    use crate::common::error::SchedulerError;

    const CONFIG: &str = r#"
job_dir = "/var/spool/flight"

[[nodes]]
name = "node01"
cpus = 16
memory = 65536

[[nodes]]
name = "node02"
cpus = 32
gpus = 2

[[partitions]]
name = "all"
nodes = ["node01", "node02"]
default = true
default_time_limit = "1h"
max_time_limit = "2days"

[[partitions]]
name = "gpu"
nodes = ["node02"]
matches = { gpus = "yes" }
"#;

    #[test]
    fn parse_config() {
        let config = ControllerConfig::parse(CONFIG).unwrap();
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.nodes[1].gpus, 2);
        assert_eq!(config.nodes[1].memory, 0);
        assert_eq!(config.default_partition().unwrap().name, "all");

        let partitions = config.build_partitions().unwrap();
        assert_eq!(partitions.len(), 2);
        assert!(partitions[0].is_default());
        assert_eq!(
            partitions[0].default_time_limit(),
            Some(Duration::from_secs(3600))
        );
        assert_eq!(
            partitions[0].max_time_limit(),
            Some(Duration::from_secs(2 * 24 * 3600))
        );
        assert_eq!(partitions[1].nodes()[0].cpus, 32);
        assert!(partitions[1].matches().is_table());
        assert_eq!(
            config.script_store().root(),
            std::path::Path::new("/var/spool/flight")
        );
    }

    #[test]
    fn unknown_node_is_rejected() {
        let config = ControllerConfig::parse(
            r#"
job_dir = "/tmp"
[[partitions]]
name = "all"
nodes = ["ghost"]
"#,
        )
        .unwrap();
        assert!(config.default_partition().is_none());
        let error = config.build_partitions().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Error: Partition all references unknown node ghost"
        );
    }

    #[test]
    fn matches_must_be_table() {
        let config = ControllerConfig::parse(
            r#"
job_dir = "/tmp"
[[partitions]]
name = "all"
matches = "everything"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_partitions(),
            Err(SchedulerError::ValidationError(_))
        ));
    }

    #[test]
    fn bad_time_limit() {
        let result = ControllerConfig::parse(
            r#"
job_dir = "/tmp"
[[partitions]]
name = "all"
max_time_limit = "forever"
"#,
        );
        assert!(matches!(result, Err(SchedulerError::DeserializationError(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("controller.toml");
        std::fs::write(&path, CONFIG).unwrap();
        let config = ControllerConfig::load(&path).unwrap();
        assert_eq!(config.partitions.len(), 2);
    }
}

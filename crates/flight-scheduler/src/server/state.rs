use std::sync::Arc;

use crate::common::config::ControllerConfig;
use crate::server::allocation::AllocationRegistry;
use crate::server::partition::Partition;
use crate::server::script::ScriptStore;

/// Long lived controller state shared by request handlers.
///
/// The allocation registry is created once here and handed out by reference
/// counted handle to everything that records or queries allocations.
pub struct ControllerState {
    partitions: Vec<Partition>,
    allocations: Arc<AllocationRegistry>,
    scripts: ScriptStore,
}

impl ControllerState {
    pub fn new(partitions: Vec<Partition>, scripts: ScriptStore) -> Self {
        ControllerState {
            partitions,
            allocations: Arc::new(AllocationRegistry::new()),
            scripts,
        }
    }

    pub fn from_config(config: &ControllerConfig) -> crate::Result<Self> {
        let partitions = config.build_partitions()?;
        log::debug!(
            "Loaded {} partition(s), job scripts stored in {}",
            partitions.len(),
            config.job_dir.display()
        );
        Ok(Self::new(partitions, config.script_store()))
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn partition(&self, name: &str) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|partition| partition.name() == name)
    }

    /// The first partition flagged as default.
    pub fn default_partition(&self) -> Option<&Partition> {
        self.partitions.iter().find(|partition| partition.is_default())
    }

    pub fn allocations(&self) -> &Arc<AllocationRegistry> {
        &self.allocations
    }

    pub fn scripts(&self) -> &ScriptStore {
        &self.scripts
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::ControllerState;
    use crate::common::config::ControllerConfig;
    use crate::server::allocation::Allocation;
    use crate::server::job::JobState;
    use crate::server::task::Schedulable;
    use crate::server::task_registry::TaskRegistry;
    use crate::tests::utils::JobBuilder;

    fn state() -> ControllerState {
        let config = ControllerConfig::parse(
            r#"
job_dir = "/tmp/flight-jobs"

[[nodes]]
name = "n1"
cpus = 4

[[nodes]]
name = "n2"
cpus = 4

[[partitions]]
name = "debug"
nodes = ["n1"]

[[partitions]]
name = "all"
nodes = ["n1", "n2"]
default = true
"#,
        )
        .unwrap();
        ControllerState::from_config(&config).unwrap()
    }

    #[test]
    fn partition_lookup() {
        let state = state();
        assert_eq!(state.default_partition().unwrap().name(), "all");
        assert_eq!(state.partition("debug").unwrap().nodes().len(), 1);
        assert!(state.partition("missing").is_none());
    }

    #[test]
    fn job_allocation_lookup() {
        let state = state();
        let job = JobBuilder::default().id("1").partition("all").finish();
        assert!(!job.is_allocated(state.allocations()));

        let nodes = state.partition("all").unwrap().nodes().to_vec();
        state
            .allocations()
            .add(Allocation::new(&job, nodes).unwrap())
            .unwrap();
        assert!(job.is_allocated(state.allocations()));
        assert_eq!(job.allocation(state.allocations()).unwrap().nodes().len(), 2);
    }

    #[test]
    fn array_tasks_allocate_separately() {
        let state = state();
        let job = Arc::new(
            JobBuilder::default()
                .id("arr")
                .array("1-2")
                .min_nodes("2")
                .partition("all")
                .finish(),
        );
        let mut registry = TaskRegistry::new(job).unwrap();
        let partition = state.partition("all").unwrap();

        for node in partition.nodes() {
            let task = registry.pending_task().unwrap().clone();
            state
                .allocations()
                .add(Allocation::new(&task, vec![node.clone()]).unwrap())
                .unwrap();
            task.set_state(JobState::Running);
        }

        assert!(registry.is_limited());
        assert!(registry.pending_task().is_none());
        let first = &registry.running_tasks()[0];
        assert_eq!(
            state
                .allocations()
                .for_job(first.id())
                .unwrap()
                .node_names()
                .collect::<Vec<_>>(),
            vec!["n1"]
        );
        assert_eq!(state.allocations().len(), 2);
    }
}

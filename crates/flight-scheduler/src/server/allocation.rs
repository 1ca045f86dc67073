use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::common::error::SchedulerError;
use crate::server::job::{JobId, NodeResources};
use crate::server::node::Node;
use crate::server::task::Schedulable;
use crate::{Map, Set};

/// Raised when an allocation would double-book a node or a job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AllocationConflict {
    #[error("Node {0} is already allocated")]
    Node(String),
    #[error("Job {0} is already allocated")]
    Job(JobId),
}

/// A valid job bound to a set of distinct nodes.
///
/// Creating an allocation does not claim anything; resources are only taken
/// once the allocation is added to an [`AllocationRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    job_id: JobId,
    resources: NodeResources,
    nodes: Vec<Arc<Node>>,
}

impl Allocation {
    pub fn new(job: &impl Schedulable, nodes: Vec<Arc<Node>>) -> crate::Result<Self> {
        job.validate().into_result()?;
        if nodes.is_empty() {
            return Err(SchedulerError::GenericError(format!(
                "Allocation of job {} needs at least one node",
                job.display_id()
            )));
        }
        {
            let mut seen = Set::default();
            if let Some(node) = nodes.iter().find(|node| !seen.insert(node.name())) {
                return Err(SchedulerError::GenericError(format!(
                    "Allocation of job {} lists node {} more than once",
                    job.display_id(),
                    node.name()
                )));
            }
        }
        Ok(Allocation {
            job_id: job.id().clone(),
            resources: job.resources(),
            nodes,
        })
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Per-node requirements of the allocated job.
    pub fn resources(&self) -> NodeResources {
        self.resources
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name())
    }
}

#[derive(Default)]
struct AllocationTable {
    nodes: Map<String, Vec<Arc<Allocation>>>,
    jobs: Map<JobId, Arc<Allocation>>,
}

impl AllocationTable {
    fn check(&self, allocation: &Allocation) -> Result<(), AllocationConflict> {
        for name in allocation.node_names() {
            if self.nodes.get(name).is_some_and(|held| !held.is_empty()) {
                return Err(AllocationConflict::Node(name.to_string()));
            }
        }
        if self.jobs.contains_key(allocation.job_id()) {
            return Err(AllocationConflict::Job(allocation.job_id().clone()));
        }
        Ok(())
    }

    fn allocated_on(&self, node_name: &str) -> AllocatedResources {
        let mut total = AllocatedResources::default();
        for allocation in self.nodes.get(node_name).into_iter().flatten() {
            let resources = allocation.resources();
            total.cpus += resources.cpus.unwrap_or(0);
            total.gpus += resources.gpus.unwrap_or(0);
            total.memory += resources.memory.unwrap_or(0);
        }
        total
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct AllocatedResources {
    cpus: u64,
    gpus: u64,
    memory: u64,
}

/// Registry of all active allocations, the single source of truth for what is
/// allocated right now.
///
/// One reader-writer lock guards both indices, so `add` checks and inserts
/// atomically and readers never observe a half registered allocation.
#[derive(Default)]
pub struct AllocationRegistry {
    table: RwLock<AllocationTable>,
}

impl AllocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the nodes of `allocation` for its job.
    ///
    /// Fails without changing the registry when any of the nodes is taken or the
    /// job already holds an allocation.
    pub fn add(&self, allocation: Allocation) -> Result<Arc<Allocation>, AllocationConflict> {
        let mut table = self.table.write();
        table.check(&allocation)?;

        let allocation = Arc::new(allocation);
        for name in allocation.node_names() {
            table
                .nodes
                .entry(name.to_string())
                .or_default()
                .push(allocation.clone());
        }
        table
            .jobs
            .insert(allocation.job_id().clone(), allocation.clone());
        log::debug!(
            "Job {} allocated on [{}]",
            allocation.job_id(),
            allocation.node_names().collect::<Vec<_>>().join(", ")
        );
        Ok(allocation)
    }

    /// Releases `allocation`. Nodes and jobs it is not registered under are left alone.
    pub fn delete(&self, allocation: &Allocation) {
        let mut table = self.table.write();
        if table
            .jobs
            .get(allocation.job_id())
            .is_some_and(|registered| registered.as_ref() == allocation)
        {
            table.jobs.remove(allocation.job_id());
        }
        for name in allocation.node_names() {
            if let Some(held) = table.nodes.get_mut(name) {
                held.retain(|registered| registered.as_ref() != allocation);
                if held.is_empty() {
                    table.nodes.remove(name);
                }
            }
        }
        log::debug!("Allocation of job {} released", allocation.job_id());
    }

    pub fn for_job(&self, job_id: &JobId) -> Option<Arc<Allocation>> {
        self.table.read().jobs.get(job_id).cloned()
    }

    /// Allocations holding `node_name`, empty for unknown nodes.
    pub fn for_node(&self, node_name: &str) -> Vec<Arc<Allocation>> {
        self.table
            .read()
            .nodes
            .get(node_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.table.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().jobs.is_empty()
    }

    /// Snapshot of the current allocations.
    pub fn allocations(&self) -> Vec<Arc<Allocation>> {
        self.table.read().jobs.values().cloned().collect()
    }

    /// Visits a snapshot of the current allocations; the lock is not held while `f` runs.
    pub fn for_each(&self, f: impl FnMut(&Arc<Allocation>)) {
        self.allocations().iter().for_each(f);
    }

    pub fn clear(&self) {
        let mut table = self.table.write();
        table.jobs.clear();
        table.nodes.clear();
    }

    /// How many more instances of `job` fit onto `node` next to what is
    /// already allocated there.
    ///
    /// For every resource the job asks for, the free amount on the node is
    /// divided by the per-node request; the smallest quotient wins. A job
    /// without a CPU request counts as needing one CPU.
    pub fn max_parallel_per_node(&self, job: &impl Schedulable, node: &Node) -> u64 {
        if !job.is_valid() {
            log::error!(
                "Can not determine resource satisfaction for an invalid job: {}",
                job.display_id()
            );
            return 0;
        }

        let allocated = self.table.read().allocated_on(node.name());
        let wanted = job.resources();

        let fits = |capacity: u64, used: u64, request: u64| capacity.saturating_sub(used) / request;
        let mut max = fits(node.cpus, allocated.cpus, wanted.cpus.unwrap_or(0).max(1));
        if let Some(gpus) = wanted.gpus.filter(|gpus| *gpus > 0) {
            max = max.min(fits(node.gpus, allocated.gpus, gpus));
        }
        if let Some(memory) = wanted.memory.filter(|memory| *memory > 0) {
            max = max.min(fits(node.memory, allocated.memory, memory));
        }
        max
    }
}

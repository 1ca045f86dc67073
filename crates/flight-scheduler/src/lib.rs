pub mod common;
pub mod server;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::SchedulerError;
pub type Result<T> = std::result::Result<T, Error>;

pub type Map<K, V> = hashbrown::HashMap<K, V, fxhash::FxBuildHasher>;
pub type Set<T> = hashbrown::HashSet<T, fxhash::FxBuildHasher>;

// Reexports
pub use server::allocation::{Allocation, AllocationConflict, AllocationRegistry};
pub use server::job::{Job, JobId, JobState, JobType, Reason};
pub use server::partition::Partition;
pub use server::task::{ArrayTask, Schedulable, Workload};
pub use server::task_registry::TaskRegistry;

pub const SCHEDULER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod allocation;
pub mod job;
pub mod node;
pub mod partition;
pub mod script;
pub mod state;
pub mod step;
pub mod task;
pub mod task_registry;

use std::path::PathBuf;
use std::sync::Arc;

use crate::common::validation::{Validate, ValidationErrors};
use crate::server::job::{Job, JobId, JobState, JobType, NodeResources, Reason};
use crate::server::script::ScriptStore;

/// Capabilities shared by everything that can be placed onto nodes.
pub trait Schedulable: Validate {
    fn id(&self) -> &JobId;
    fn display_id(&self) -> String;
    fn job_type(&self) -> Option<JobType>;

    fn state(&self) -> Option<JobState>;
    fn set_state(&self, state: JobState);
    fn reason(&self) -> Option<Reason>;
    fn set_reason(&self, reason: Option<Reason>);

    fn min_nodes(&self) -> Option<u64>;
    fn max_nodes(&self) -> Option<u64> {
        self.min_nodes()
    }
    fn resources(&self) -> NodeResources;
    fn partition(&self) -> Option<&str>;

    /// Job whose batch script is executed.
    fn script_owner(&self) -> &JobId;

    fn script_path(&self, store: &ScriptStore) -> PathBuf {
        store.path_for(self.script_owner())
    }
}

impl Schedulable for Job {
    fn id(&self) -> &JobId {
        Job::id(self)
    }

    fn display_id(&self) -> String {
        Job::display_id(self)
    }

    fn job_type(&self) -> Option<JobType> {
        Job::job_type(self)
    }

    fn state(&self) -> Option<JobState> {
        Job::state(self)
    }

    fn set_state(&self, state: JobState) {
        Job::set_state(self, state)
    }

    fn reason(&self) -> Option<Reason> {
        Job::reason(self)
    }

    fn set_reason(&self, reason: Option<Reason>) {
        Job::set_reason(self, reason)
    }

    fn min_nodes(&self) -> Option<u64> {
        Job::min_nodes(self)
    }

    fn resources(&self) -> NodeResources {
        Job::resources(self)
    }

    fn partition(&self) -> Option<&str> {
        Job::partition(self)
    }

    fn script_owner(&self) -> &JobId {
        Job::id(self)
    }
}

/// One index of an array job.
///
/// Placement, validity and the batch script come from the array job, while the
/// lifecycle belongs to the task itself. Clones share that lifecycle.
///
/// Tasks are told apart by their position in the expansion, so an index that
/// appears twice yields two distinct tasks. Both still carry the id
/// `<job>.<index>`, hence the allocation registry holds at most one of them at
/// a time and the second is only placed once the first is released.
#[derive(Debug, Clone)]
pub struct ArrayTask {
    array_job: Arc<Job>,
    index: u32,
    position: u64,
    record: Arc<Job>,
}

impl ArrayTask {
    pub(crate) fn new(array_job: Arc<Job>, index: u32) -> Self {
        let record = Arc::new(array_job.task_record(index));
        ArrayTask {
            array_job,
            index,
            position: 0,
            record,
        }
    }

    pub(crate) fn with_position(mut self, position: u64) -> Self {
        self.position = position;
        self
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Zero based position of the task in the array expansion.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn array_job(&self) -> &Arc<Job> {
        &self.array_job
    }

    pub fn is_pending(&self) -> bool {
        self.state() == Some(JobState::Pending)
    }

    pub fn is_running(&self) -> bool {
        self.state() == Some(JobState::Running)
    }
}

impl PartialEq for ArrayTask {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.index == other.index
            && self.array_job.id() == other.array_job.id()
    }
}

impl Eq for ArrayTask {}

impl Validate for ArrayTask {
    fn validate(&self) -> ValidationErrors {
        self.array_job.validate()
    }
}

impl Schedulable for ArrayTask {
    fn id(&self) -> &JobId {
        self.record.id()
    }

    fn display_id(&self) -> String {
        format!("{}.{}", self.array_job.display_id(), self.index)
    }

    fn job_type(&self) -> Option<JobType> {
        Some(JobType::ArrayTask)
    }

    fn state(&self) -> Option<JobState> {
        self.record.state()
    }

    fn set_state(&self, state: JobState) {
        self.record.set_state(state)
    }

    fn reason(&self) -> Option<Reason> {
        self.record.reason()
    }

    fn set_reason(&self, reason: Option<Reason>) {
        self.record.set_reason(reason)
    }

    fn min_nodes(&self) -> Option<u64> {
        Some(1)
    }

    fn resources(&self) -> NodeResources {
        self.record.resources()
    }

    fn partition(&self) -> Option<&str> {
        self.array_job.partition()
    }

    fn script_owner(&self) -> &JobId {
        self.array_job.id()
    }
}

/// Either a whole job or a single array task.
#[derive(Debug, Clone)]
pub enum Workload {
    Job(Arc<Job>),
    Task(ArrayTask),
}

impl Workload {
    fn inner(&self) -> &dyn Schedulable {
        match self {
            Workload::Job(job) => job.as_ref(),
            Workload::Task(task) => task,
        }
    }
}

impl From<Arc<Job>> for Workload {
    fn from(job: Arc<Job>) -> Self {
        Workload::Job(job)
    }
}

impl From<ArrayTask> for Workload {
    fn from(task: ArrayTask) -> Self {
        Workload::Task(task)
    }
}

impl Validate for Workload {
    fn validate(&self) -> ValidationErrors {
        self.inner().validate()
    }
}

impl Schedulable for Workload {
    fn id(&self) -> &JobId {
        self.inner().id()
    }

    fn display_id(&self) -> String {
        self.inner().display_id()
    }

    fn job_type(&self) -> Option<JobType> {
        self.inner().job_type()
    }

    fn state(&self) -> Option<JobState> {
        self.inner().state()
    }

    fn set_state(&self, state: JobState) {
        self.inner().set_state(state)
    }

    fn reason(&self) -> Option<Reason> {
        self.inner().reason()
    }

    fn set_reason(&self, reason: Option<Reason>) {
        self.inner().set_reason(reason)
    }

    fn min_nodes(&self) -> Option<u64> {
        self.inner().min_nodes()
    }

    fn resources(&self) -> NodeResources {
        self.inner().resources()
    }

    fn partition(&self) -> Option<&str> {
        self.inner().partition()
    }

    fn script_owner(&self) -> &JobId {
        self.inner().script_owner()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ArrayTask, Schedulable, Workload};
    use crate::common::validation::Validate;
    use crate::server::job::{JobState, JobType, NodeResources, Reason};
    use crate::server::script::ScriptStore;
    use crate::tests::utils::JobBuilder;

    fn array_job() -> Arc<crate::server::job::Job> {
        Arc::new(
            JobBuilder::default()
                .id("12")
                .array("1-5")
                .min_nodes("3")
                .partition("gpu")
                .resources(NodeResources {
                    cpus: Some(2),
                    gpus: None,
                    memory: Some(512),
                })
                .finish(),
        )
    }

    #[test]
    fn task_overrides_type_and_node_count() {
        let task = ArrayTask::new(array_job(), 3);
        assert_eq!(task.job_type(), Some(JobType::ArrayTask));
        assert_eq!(task.min_nodes(), Some(1));
        assert_eq!(task.max_nodes(), Some(1));
        assert_eq!(task.display_id(), "12.3");
        assert_eq!(task.id().as_str(), "12.3");
    }

    #[test]
    fn task_shares_placement_with_array_job() {
        let task = ArrayTask::new(array_job(), 1);
        assert_eq!(task.partition(), Some("gpu"));
        assert_eq!(task.script_owner().as_str(), "12");
        let store = ScriptStore::new("/jobs");
        assert_eq!(
            task.script_path(&store),
            std::path::Path::new("/jobs/12/job-script")
        );
        assert_eq!(task.resources().cpus, Some(2));
    }

    #[test]
    fn task_validity_follows_array_job() {
        let task = ArrayTask::new(array_job(), 1);
        assert!(task.is_valid());

        let broken = Arc::new(JobBuilder::default().array("1-").finish());
        let task = ArrayTask::new(broken, 1);
        assert!(task.validate().has_error_on("array"));
    }

    #[test]
    fn task_owns_its_lifecycle() {
        let job = array_job();
        let task = ArrayTask::new(job.clone(), 1);
        assert_eq!(task.state(), Some(JobState::Pending));
        assert_eq!(task.reason(), Some(Reason::WaitingForScheduling));

        task.set_state(JobState::Running);
        assert_eq!(task.reason(), None);
        assert_eq!(job.state(), Some(JobState::Pending));
    }

    #[test]
    fn clones_observe_same_state() {
        let task = ArrayTask::new(array_job(), 2);
        let other = task.clone();
        task.set_state(JobState::Completed);
        assert_eq!(other.state(), Some(JobState::Completed));
        assert_eq!(task, other);
    }

    #[test]
    fn repeated_index_gives_distinct_tasks() {
        let job = array_job();
        let first = ArrayTask::new(job.clone(), 2);
        let second = ArrayTask::new(job, 2).with_position(1);
        assert_ne!(first, second);
        assert_eq!(first.id(), second.id());
        assert_eq!(second.position(), 1);
    }

    #[test]
    fn workload_dispatch() {
        let job = array_job();
        let whole: Workload = job.clone().into();
        let task: Workload = ArrayTask::new(job, 4).into();
        assert_eq!(whole.job_type(), Some(JobType::ArrayJob));
        assert_eq!(whole.min_nodes(), Some(3));
        assert_eq!(task.job_type(), Some(JobType::ArrayTask));
        assert_eq!(task.min_nodes(), Some(1));
        assert_eq!(task.display_id(), "12.4");
    }
}

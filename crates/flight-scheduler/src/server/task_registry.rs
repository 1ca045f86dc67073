use std::sync::Arc;

use crate::common::arraydef::RangeCursor;
use crate::common::error::SchedulerError;
use crate::server::job::{Job, JobState};
use crate::server::task::{ArrayTask, Schedulable};

/// Tracks the tasks of one array job.
///
/// Tasks are materialized one at a time: the next index of the array is only
/// turned into a task once the current pending task has started (or ended),
/// so the number of live tasks is bounded by running + finished + 1 rather
/// than by the size of the array.
#[derive(Debug)]
pub struct TaskRegistry {
    job: Arc<Job>,
    cursor: RangeCursor,
    pending: Option<ArrayTask>,
    running: Vec<ArrayTask>,
    past: Vec<ArrayTask>,
}

impl TaskRegistry {
    pub fn new(job: Arc<Job>) -> crate::Result<Self> {
        if job.array_range().is_none() {
            return Err(SchedulerError::NotAnArrayJob(job.id().clone()));
        }
        let mut registry = TaskRegistry {
            job,
            cursor: RangeCursor::default(),
            pending: None,
            running: Vec::new(),
            past: Vec::new(),
        };
        registry.pending = registry.next_task();
        Ok(registry)
    }

    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }

    pub fn pending_task(&mut self) -> Option<&ArrayTask> {
        self.refresh();
        self.pending.as_ref()
    }

    pub fn running_tasks(&mut self) -> &[ArrayTask] {
        self.refresh();
        &self.running
    }

    pub fn past_tasks(&mut self) -> &[ArrayTask] {
        self.refresh();
        &self.past
    }

    /// True when as many tasks are running as the array job requested nodes.
    pub fn is_limited(&mut self) -> bool {
        self.refresh();
        self.running.len() as u64 >= self.job.min_nodes().unwrap_or(1)
    }

    /// Number of tasks materialized so far.
    pub fn generated(&self) -> u64 {
        self.cursor.consumed()
    }

    fn next_task(&mut self) -> Option<ArrayTask> {
        let range = self.job.array_range()?;
        let index = self.cursor.advance(range)?;
        let position = self.cursor.consumed() - 1;
        log::debug!("Materializing task {}.{index} at position {position}", self.job.id());
        Some(ArrayTask::new(self.job.clone(), index).with_position(position))
    }

    fn refresh(&mut self) {
        let (running, finished): (Vec<_>, Vec<_>) = std::mem::take(&mut self.running)
            .into_iter()
            .partition(ArrayTask::is_running);
        self.running = running;
        self.past.extend(finished);

        let Some(pending) = self.pending.take_if(|task| !task.is_pending()) else {
            return;
        };
        match pending.state() {
            Some(JobState::Running) => self.running.push(pending),
            _ => self.past.push(pending),
        }
        self.pending = self.next_task();
    }
}

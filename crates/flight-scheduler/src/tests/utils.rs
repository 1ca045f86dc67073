use std::fmt::Debug;
use std::sync::Arc;

use derive_builder::Builder;

use crate::common::parser::CharParser;
use crate::server::job::{Job, JobState, NodeResources, Reason};
use crate::server::node::Node;

pub fn expect_parser_error<T: Debug>(parser: impl CharParser<T>, input: &str) -> String {
    match parser.parse_text(input) {
        Ok(value) => panic!("The parser should have failed on {input:?}, got {value:?}"),
        Err(error) => error.to_string(),
    }
}

/// Valid pending batch job unless told otherwise.
#[derive(Builder)]
#[builder(name = "JobBuilder", pattern = "owned", build_fn(private, name = "build_template"))]
pub struct JobTemplate {
    #[builder(default = "\"1\".to_string()", setter(into))]
    id: String,
    #[builder(default = "JobState::Pending")]
    state: JobState,
    #[builder(default = "\"1\".to_string()", setter(into))]
    min_nodes: String,
    #[builder(default, setter(into, strip_option))]
    partition: Option<String>,
    #[builder(default, setter(into, strip_option))]
    array: Option<String>,
    #[builder(default)]
    resources: NodeResources,
}

impl JobBuilder {
    pub fn finish(self) -> Job {
        let template = self.build_template().unwrap();
        let mut job = Job::new(template.id);
        job.set_state(template.state);
        job.set_reason(Some(Reason::WaitingForScheduling));
        job.set_script_name("job.sh");
        job.set_script_provided(true);
        job.set_min_nodes_raw(&template.min_nodes);
        if let Some(partition) = template.partition {
            job.set_partition(partition);
        }
        job.set_resources(template.resources);
        if let Some(array) = template.array {
            job.set_array(&array);
        }
        job
    }
}

pub fn node(name: &str, cpus: u64) -> Arc<Node> {
    Arc::new(Node::new(name, cpus, 0, 0))
}

pub fn nodes(names: &[&str]) -> Vec<Arc<Node>> {
    names.iter().map(|name| node(name, 1)).collect()
}

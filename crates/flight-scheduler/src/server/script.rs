use std::path::{Path, PathBuf};

use crate::server::job::JobId;

const SCRIPT_FILE_NAME: &str = "job-script";

/// Stores batch scripts on disk, one directory per job: `<root>/<job-id>/job-script`.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    root: PathBuf,
}

impl ScriptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ScriptStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.root.join(job_id.as_str())
    }

    pub fn path_for(&self, job_id: &JobId) -> PathBuf {
        self.job_dir(job_id).join(SCRIPT_FILE_NAME)
    }

    pub fn write(&self, job_id: &JobId, content: &str) -> crate::Result<()> {
        std::fs::create_dir_all(self.job_dir(job_id))?;
        std::fs::write(self.path_for(job_id), content)?;
        Ok(())
    }

    pub fn read(&self, job_id: &JobId) -> crate::Result<String> {
        Ok(std::fs::read_to_string(self.path_for(job_id))?)
    }

    /// Removes the script directory of a job. Succeeds when it is already gone.
    pub fn cleanup(&self, job_id: &JobId) -> crate::Result<()> {
        let dir = self.job_dir(job_id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                log::debug!("Removed script directory {}", dir.display());
                Ok(())
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

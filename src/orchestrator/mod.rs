//! Creation and run flows built on the step runner

mod create;
mod error;
mod run;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::naming::ProjectName;
use crate::process::StepRunHandle;

pub use create::{CreationFlow, CreationOptions, CreationState};
pub use error::{OrchestrationError, Result};
pub use run::{list_project_directories, RunFlow};

/// Category attached to every milestone record.
pub const LOG_CATEGORY: &str = "RN";

/// How a flow ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// The capability a host drives: run to completion, or cancel midway.
///
/// `cancel` may be called concurrently with `run` from another task.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn run(&self) -> Result<Outcome>;
    async fn cancel(&self);
}

/// Per-invocation state shared by every step of a flow.
#[derive(Debug)]
pub struct OrchestrationContext {
    pub name: ProjectName,
    pub apps_location: PathBuf,
    stopping: CancellationToken,
}

impl OrchestrationContext {
    pub fn new(name: ProjectName, apps_location: impl Into<PathBuf>) -> Self {
        Self {
            name,
            apps_location: apps_location.into(),
            stopping: CancellationToken::new(),
        }
    }

    /// Directory the app lives in once relocated.
    pub fn app_dir(&self) -> PathBuf {
        self.apps_location.join(&self.name.directory)
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.is_cancelled()
    }

    pub fn stopping(&self) -> &CancellationToken {
        &self.stopping
    }

    fn request_stop(&self) {
        self.stopping.cancel();
    }
}

/// The step run currently owned by a flow, if any.
#[derive(Default)]
struct ActiveRun(Mutex<Option<StepRunHandle>>);

impl ActiveRun {
    fn track(&self, handle: StepRunHandle) {
        *self.lock() = Some(handle);
    }

    fn take(&self) -> Option<StepRunHandle> {
        self.lock().take()
    }

    /// Kill the active run and wait until its process is gone.
    async fn kill(&self) {
        if let Some(handle) = self.take() {
            handle.kill();
            handle.terminated().await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<StepRunHandle>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

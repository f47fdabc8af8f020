//! External process steps
//!
//! A [`Step`] describes one command invocation. The [`StepRunner`] turns it
//! into a live [`StepRun`], which streams output as [`StepEvent`]s and can be
//! stopped from elsewhere through a cloned [`StepRunHandle`].

mod error;
mod runner;
mod spawner;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub use error::{Result, StepError};
pub use runner::{StepRun, StepRunHandle, StepRunner};
pub use spawner::{OutputLine, ProcessExit, Spawner, TokioSpawner};

/// Immutable description of an external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Cleanup steps may still launch after cancellation has been requested.
    pub runs_during_abort: bool,
}

impl Step {
    pub fn new<I, A>(command: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            command: command.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
            env: BTreeMap::new(),
            runs_during_abort: false,
        }
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn during_abort(mut self) -> Self {
        self.runs_during_abort = true;
        self
    }

    /// Command line as the operator would type it, for logs and errors.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.command.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Lifecycle of a single step run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    Stopped,
    Failed,
    Succeeded,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Stopped | StepStatus::Failed | StepStatus::Succeeded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Stopped => "stopped",
            StepStatus::Failed => "failed",
            StepStatus::Succeeded => "succeeded",
        }
    }
}

/// Events surfaced while a step runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    Stdout(String),
    Stderr(String),
    /// The process could not be started at all.
    Error(String),
    /// Natural exit. `None` when the process was terminated by a signal.
    Exit(Option<i32>),
}

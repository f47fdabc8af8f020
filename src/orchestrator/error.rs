use std::path::PathBuf;

use thiserror::Error;

use crate::process::StepError;

pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error(transparent)]
    Step(#[from] StepError),

    #[error("No apps found in {}", .apps_location.display())]
    ProjectNotFound { apps_location: PathBuf },

    #[error("The react native app {requested} does not exist\n Available apps: {}", .available.join(", "))]
    NamedProjectNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("Failed to list apps in {}: {source}", .apps_location.display())]
    ListApps {
        apps_location: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OrchestrationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestrationError::Step(e) if e.is_cancelled())
    }
}

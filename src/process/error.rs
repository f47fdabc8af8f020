use thiserror::Error;

pub type Result<T> = std::result::Result<T, StepError>;

#[derive(Error, Debug)]
pub enum StepError {
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}{}", exit_label(.exit_code), stderr_suffix(.stderr))]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Step cancelled")]
    Cancelled,
}

impl StepError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StepError::Cancelled)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            StepError::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

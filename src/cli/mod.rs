//! Command-line interface

pub mod create;
pub mod run;

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::orchestrator::{Orchestrator, Outcome};

#[derive(Parser)]
#[command(name = "rns", version, about = "Scaffold and run React Native apps")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file to use instead of ./rns.toml
    #[arg(long, global = true, env = "RNS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory that holds the apps
    #[arg(long, global = true, env = "RNS_APPS_LOCATION")]
    pub apps_location: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new app with the React Native community CLI
    Create(create::CreateArgs),

    /// Install an app's dependencies and start its dev server
    Run(run::RunArgs),
}

impl Cli {
    /// Settings from disk with command-line overrides applied.
    pub fn settings(&self) -> Result<Settings> {
        let cwd = std::env::current_dir()
            .context("Cannot determine the current directory")?;
        let mut settings = Settings::load(self.config.as_deref(), &cwd)?;
        if let Some(apps_location) = &self.apps_location {
            settings.app.apps_location = apps_location.clone();
        }
        Ok(settings)
    }
}

/// Run `orchestrator` to the end, cancelling it on Ctrl-C.
pub async fn drive(orchestrator: Arc<dyn Orchestrator>) -> Result<Outcome> {
    drive_until(orchestrator, tokio::signal::ctrl_c()).await
}

/// Run `orchestrator` to the end, cancelling it once `interrupt` fires.
///
/// If `interrupt` fails the orchestrator simply runs to completion.
async fn drive_until<I>(orchestrator: Arc<dyn Orchestrator>, interrupt: I) -> Result<Outcome>
where
    I: Future<Output = io::Result<()>>,
{
    let mut task = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.run().await }
    });

    tokio::select! {
        joined = &mut task => {
            return Ok(joined.context("Orchestration task panicked")??);
        }
        signal = interrupt => match signal {
            Ok(()) => {
                tracing::warn!("Interrupted, stopping...");
                orchestrator.cancel().await;
            }
            Err(e) => tracing::warn!(error = %e, "Cannot listen for Ctrl-C"),
        }
    }

    Ok(task.await.context("Orchestration task panicked")??)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Runs until cancelled.
    #[derive(Default)]
    struct Waiting {
        cancelled: AtomicBool,
        wake: Notify,
    }

    #[async_trait]
    impl Orchestrator for Waiting {
        async fn run(&self) -> crate::orchestrator::Result<Outcome> {
            self.wake.notified().await;
            if self.cancelled.load(Ordering::SeqCst) {
                Ok(Outcome::Cancelled)
            } else {
                Ok(Outcome::Completed)
            }
        }

        async fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
            self.wake.notify_one();
        }
    }

    #[tokio::test]
    async fn test_interrupt_cancels() {
        let orchestrator = Arc::new(Waiting::default());
        let outcome = drive_until(orchestrator, async { Ok(()) }).await.unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
    }

    #[tokio::test]
    async fn test_failed_interrupt_does_not_cancel() {
        let orchestrator = Arc::new(Waiting::default());
        let finisher = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            finisher.wake.notify_one();
        });

        let outcome = drive_until(orchestrator.clone(), async {
            Err(io::Error::other("no signal handler"))
        })
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert!(!orchestrator.cancelled.load(Ordering::SeqCst));
    }
}

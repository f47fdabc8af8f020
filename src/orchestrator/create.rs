//! Creation flow: generate a new app and move it into the apps location

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::error::Result;
use super::{path_arg, ActiveRun, OrchestrationContext, Orchestrator, Outcome, LOG_CATEGORY};
use crate::config::WorkspaceSettings;
use crate::logging::{LogRecord, Logger};
use crate::presenter::Presenter;
use crate::process::{self, Spawner, Step, StepError, StepEvent, StepRunner};

/// Where the creation flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
    Idle,
    PreparingWorkspace,
    Generating,
    Relocating,
    StrippingMetadata,
    InstallingNativeDeps,
    Done,
    Failed,
    Aborting,
    Aborted,
}

impl CreationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CreationState::Done | CreationState::Failed | CreationState::Aborted
        )
    }

    fn is_aborting(&self) -> bool {
        matches!(self, CreationState::Aborting | CreationState::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CreationState::Idle => "idle",
            CreationState::PreparingWorkspace => "preparing_workspace",
            CreationState::Generating => "generating",
            CreationState::Relocating => "relocating",
            CreationState::StrippingMetadata => "stripping_metadata",
            CreationState::InstallingNativeDeps => "installing_native_deps",
            CreationState::Done => "done",
            CreationState::Failed => "failed",
            CreationState::Aborting => "aborting",
            CreationState::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreationOptions {
    pub scratch_location: PathBuf,
    pub generator_package: String,
    pub generation_horizon: Duration,
    pub generation_increase: f64,
}

impl From<&WorkspaceSettings> for CreationOptions {
    fn from(settings: &WorkspaceSettings) -> Self {
        Self {
            scratch_location: settings.scratch_location.clone(),
            generator_package: settings.generator_package.clone(),
            generation_horizon: settings.generation_horizon(),
            generation_increase: settings.generation_increase,
        }
    }
}

pub struct CreationFlow<S> {
    runner: StepRunner<S>,
    presenter: Arc<dyn Presenter>,
    logger: Arc<dyn Logger>,
    context: OrchestrationContext,
    options: CreationOptions,
    active: ActiveRun,
    state: watch::Sender<CreationState>,
}

impl<S: Spawner> CreationFlow<S> {
    pub fn new(
        spawner: Arc<S>,
        presenter: Arc<dyn Presenter>,
        logger: Arc<dyn Logger>,
        context: OrchestrationContext,
        options: CreationOptions,
    ) -> Self {
        Self {
            runner: StepRunner::new(spawner),
            presenter,
            logger,
            context,
            options,
            active: ActiveRun::default(),
            state: watch::Sender::new(CreationState::Idle),
        }
    }

    pub fn state(&self) -> CreationState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CreationState> {
        self.state.subscribe()
    }

    pub fn context(&self) -> &OrchestrationContext {
        &self.context
    }

    /// Where the generator leaves the app before it is relocated.
    fn generated_dir(&self) -> PathBuf {
        self.options
            .scratch_location
            .join(&self.context.name.display)
    }

    fn narrate(&self, title: &str, message: &str) {
        self.logger.log(
            LogRecord::info(message)
                .titled(title)
                .in_category(LOG_CATEGORY),
        );
    }

    /// Move to `next` unless an abort has taken over the state.
    fn transition(&self, next: CreationState) {
        self.state.send_if_modified(|state| {
            if state.is_aborting() {
                false
            } else {
                *state = next;
                true
            }
        });
    }

    /// Step boundary: refuse to go further once a stop was requested.
    fn checkpoint(&self) -> Result<()> {
        if self.context.is_stopping() {
            return Err(StepError::Cancelled.into());
        }
        Ok(())
    }

    fn enter(&self, next: CreationState) -> Result<()> {
        self.checkpoint()?;
        debug!(state = next.as_str(), "creation flow advancing");
        self.transition(next);
        Ok(())
    }

    async fn run_step(&self, step: Step) -> process::Result<()> {
        let run = self.runner.prepare(step, self.context.stopping())?;
        self.active.track(run.handle());
        run.run(|event| match event {
            StepEvent::Stdout(line) | StepEvent::Stderr(line) => {
                let line = line.trim();
                if !line.is_empty() {
                    self.presenter.set_script_output(line);
                }
            }
            StepEvent::Error(cause) => debug!(%cause, "step could not start"),
            StepEvent::Exit(code) => debug!(?code, "step exited"),
        })
        .await
    }

    async fn forward(&self) -> Result<()> {
        let scratch = &self.options.scratch_location;
        let generated = self.generated_dir();
        let app_dir = self.context.app_dir();

        self.enter(CreationState::PreparingWorkspace)?;
        self.presenter.set_progress_percentage(10.0);
        self.run_step(Step::new("mkdir", ["-p".to_string(), path_arg(scratch)]))
            .await?;
        self.presenter.increase_progress_percentage_by(2.0);

        self.enter(CreationState::Generating)?;
        self.narrate(
            "Running the React Native generator",
            &format!(
                "Executing npx {} init {}",
                self.options.generator_package, self.context.name.display
            ),
        );
        self.presenter.start_progress_increase_simulation(
            self.options.generation_increase,
            self.options.generation_horizon,
        );
        let generated_result = self
            .run_step(
                Step::new(
                    "npx",
                    [
                        self.options.generator_package.as_str(),
                        "init",
                        self.context.name.display.as_str(),
                    ],
                )
                .in_dir(scratch),
            )
            .await;
        self.presenter.finish_progress_increase_simulation();
        generated_result?;

        self.enter(CreationState::Relocating)?;
        self.narrate(
            "Relocating...",
            &format!("Moving the generated app into {}", app_dir.display()),
        );
        self.run_step(Step::new("mkdir", ["-p".to_string(), path_arg(&app_dir)]))
            .await?;
        self.checkpoint()?;
        self.run_step(Step::new(
            "rsync",
            [
                "-av".to_string(),
                format!("{}/", path_arg(&generated)),
                path_arg(&app_dir),
            ],
        ))
        .await?;

        self.enter(CreationState::StrippingMetadata)?;
        self.narrate("Finishing up...", "Stripping generator metadata");
        self.run_step(Step::new(
            "rm",
            ["-rf".to_string(), path_arg(&app_dir.join(".git"))],
        ))
        .await?;
        self.presenter.increase_progress_percentage_by(5.0);
        self.checkpoint()?;
        self.run_step(Step::new("rm", ["-rf".to_string(), path_arg(&generated)]))
            .await?;
        self.presenter.increase_progress_percentage_by(5.0);

        self.enter(CreationState::InstallingNativeDeps)?;
        self.narrate(
            "Installing iOS dependencies",
            "Running bundle install and pod install",
        );
        match self.install_native_deps().await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                self.logger.log(
                    LogRecord::warning(format!("Skipping native dependencies: {}", e))
                        .titled("iOS dependency install failed")
                        .in_category(LOG_CATEGORY),
                );
            }
        }

        Ok(())
    }

    async fn install_native_deps(&self) -> process::Result<()> {
        let ios_dir = self.context.app_dir().join("ios");
        self.run_step(Step::new("bundle", ["install"]).in_dir(&ios_dir))
            .await?;
        if self.context.is_stopping() {
            return Err(StepError::Cancelled);
        }
        self.run_step(Step::new("pod", ["install"]).in_dir(&ios_dir))
            .await
    }
}

#[async_trait]
impl<S: Spawner + 'static> Orchestrator for CreationFlow<S> {
    async fn run(&self) -> Result<Outcome> {
        match self.forward().await {
            Ok(()) if !self.context.is_stopping() => {
                self.transition(CreationState::Done);
                self.presenter.set_progress_percentage(100.0);
                self.narrate(
                    "App created",
                    &format!(
                        "{} is ready in {}",
                        self.context.name.display,
                        self.context.app_dir().display()
                    ),
                );
                Ok(Outcome::Completed)
            }
            Ok(()) => Ok(Outcome::Cancelled),
            Err(_) if self.context.is_stopping() => Ok(Outcome::Cancelled),
            Err(e) => {
                self.transition(CreationState::Failed);
                self.logger.log(
                    LogRecord::error(e.to_string())
                        .titled("App creation failed")
                        .in_category(LOG_CATEGORY),
                );
                Err(e)
            }
        }
    }

    async fn cancel(&self) {
        let first = self.state.send_if_modified(|state| {
            if state.is_terminal() || state.is_aborting() {
                false
            } else {
                *state = CreationState::Aborting;
                true
            }
        });
        if !first {
            return;
        }

        self.context.request_stop();
        self.active.kill().await;
        self.presenter.finish_progress_increase_simulation();

        self.logger.log(
            LogRecord::warning("Removing the partially generated app")
                .titled("Aborting")
                .in_category(LOG_CATEGORY),
        );
        let rollback = Step::new(
            "rm",
            ["-rf".to_string(), path_arg(&self.generated_dir())],
        )
        .during_abort();
        if let Err(e) = self.run_step(rollback).await {
            warn!(error = %e, "rollback failed");
        }

        self.state.send_replace(CreationState::Aborted);
    }
}

//! Run flow: install an existing app's dependencies and serve it

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::error::{OrchestrationError, Result};
use super::{ActiveRun, OrchestrationContext, Orchestrator, Outcome, LOG_CATEGORY};
use crate::classifier::{classify_line, Classified};
use crate::config::AppConfig;
use crate::logging::{LogRecord, Logger};
use crate::presenter::Presenter;
use crate::process::{self, Spawner, Step, StepEvent, StepRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Output goes straight to the display.
    Raw,
    /// Stdout is classified, milestones go to the log.
    DevServer,
}

pub struct RunFlow<S> {
    runner: StepRunner<S>,
    presenter: Arc<dyn Presenter>,
    logger: Arc<dyn Logger>,
    context: OrchestrationContext,
    app: AppConfig,
    script: Option<String>,
    active: ActiveRun,
}

impl<S: Spawner> RunFlow<S> {
    /// `script` selects `npm run <script>` instead of `npm start`.
    pub fn new(
        spawner: Arc<S>,
        presenter: Arc<dyn Presenter>,
        logger: Arc<dyn Logger>,
        context: OrchestrationContext,
        app: AppConfig,
        script: Option<String>,
    ) -> Self {
        Self {
            runner: StepRunner::new(spawner),
            presenter,
            logger,
            context,
            app,
            script,
            active: ActiveRun::default(),
        }
    }

    pub fn context(&self) -> &OrchestrationContext {
        &self.context
    }

    /// Find the requested app among the existing ones.
    pub fn resolve(&self) -> Result<PathBuf> {
        let apps_location = &self.context.apps_location;
        let available = list_project_directories(apps_location)?;

        if available.contains(&self.context.name.directory) {
            return Ok(self.context.app_dir());
        }
        if available.is_empty() {
            return Err(OrchestrationError::ProjectNotFound {
                apps_location: apps_location.clone(),
            });
        }
        Err(OrchestrationError::NamedProjectNotFound {
            requested: self.context.name.display.clone(),
            available,
        })
    }

    pub fn server_step(&self, app_dir: &Path) -> Step {
        let args = match &self.script {
            Some(script) => vec!["run".to_string(), script.clone()],
            None => vec!["start".to_string()],
        };
        Step::new("npm", args)
            .in_dir(app_dir)
            .with_env(self.app.environment())
    }

    /// Kill the dev server. Safe to call more than once.
    pub async fn stop(&self) {
        self.context.request_stop();
        self.active.kill().await;
    }

    async fn serve(&self, app_dir: &Path) -> Result<()> {
        self.logger.log(
            LogRecord::info("Running npm install")
                .titled("Installing dependencies")
                .in_category(LOG_CATEGORY),
        );
        self.run_step(Step::new("npm", ["install"]).in_dir(app_dir), Route::Raw)
            .await?;

        let server = self.server_step(app_dir);
        self.logger.log(
            LogRecord::info(format!("Executing {}", server))
                .titled(format!("Starting {}", self.context.name.display))
                .in_category(LOG_CATEGORY),
        );
        self.run_step(server, Route::DevServer).await?;
        Ok(())
    }

    async fn run_step(&self, step: Step, route: Route) -> process::Result<()> {
        let run = self.runner.prepare(step, self.context.stopping())?;
        self.active.track(run.handle());
        run.run(|event| self.handle_event(event, route)).await
    }

    fn handle_event(&self, event: StepEvent, route: Route) {
        match event {
            StepEvent::Stdout(line) if route == Route::DevServer => match classify_line(&line) {
                Some(Classified::Log(message)) => self
                    .logger
                    .log(LogRecord::info(message).in_category(LOG_CATEGORY)),
                Some(Classified::Raw(line)) => self.presenter.set_script_output(&line),
                None => {}
            },
            StepEvent::Stdout(line) | StepEvent::Stderr(line) => {
                let line = line.trim();
                if !line.is_empty() {
                    self.presenter.set_script_output(line);
                }
            }
            // Stopping the server legitimately produces errors
            StepEvent::Error(cause) if !self.context.is_stopping() => {
                self.logger.log(
                    LogRecord::error(cause)
                        .titled("Process error")
                        .in_category(LOG_CATEGORY),
                );
            }
            StepEvent::Error(_) => {}
            StepEvent::Exit(code) => debug!(?code, "step exited"),
        }
    }
}

#[async_trait]
impl<S: Spawner + 'static> Orchestrator for RunFlow<S> {
    async fn run(&self) -> Result<Outcome> {
        let app_dir = self.resolve()?;
        match self.serve(&app_dir).await {
            Ok(()) if self.context.is_stopping() => Ok(Outcome::Cancelled),
            Ok(()) => Ok(Outcome::Completed),
            Err(e) if self.context.is_stopping() => {
                debug!(error = %e, "dev server ended after stop");
                Ok(Outcome::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    async fn cancel(&self) {
        self.stop().await;
    }
}

/// Names of the subdirectories of `apps_location`, sorted.
///
/// A missing directory counts as empty.
pub fn list_project_directories(apps_location: &Path) -> Result<Vec<String>> {
    let list_err = |source| OrchestrationError::ListApps {
        apps_location: apps_location.to_path_buf(),
        source,
    };

    let entries = match fs::read_dir(apps_location) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(list_err(e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(list_err)?;
        if entry.file_type().map_err(list_err)?.is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}

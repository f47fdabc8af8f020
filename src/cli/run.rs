//! `rns run` command implementation

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use super::drive;
use crate::config::Settings;
use crate::logging::TracingLogger;
use crate::naming::ProjectName;
use crate::orchestrator::{OrchestrationContext, Outcome, RunFlow};
use crate::presenter::TerminalPresenter;
use crate::process::TokioSpawner;

#[derive(Args)]
pub struct RunArgs {
    /// Name of the app to run [default: NativeApp]
    name: Option<String>,

    /// package.json script to run instead of `start`
    #[arg(short, long)]
    command: Option<String>,
}

pub async fn run(settings: Settings, args: RunArgs) -> Result<()> {
    let name = ProjectName::new(args.name.as_deref());
    let presenter = Arc::new(TerminalPresenter::new(
        settings.workspace.tick_interval(),
        false,
    ));
    let context = OrchestrationContext::new(name.clone(), &settings.app.apps_location);
    let flow = Arc::new(RunFlow::new(
        Arc::new(TokioSpawner::new()),
        presenter,
        Arc::new(TracingLogger),
        context,
        settings.app,
        args.command,
    ));

    if drive(flow).await? == Outcome::Cancelled {
        println!("✓ Stopped {}", name.display);
    }
    Ok(())
}

//! `rns create` command implementation

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;

use super::drive;
use crate::config::Settings;
use crate::logging::TracingLogger;
use crate::naming::ProjectName;
use crate::orchestrator::{CreationFlow, CreationOptions, OrchestrationContext, Outcome};
use crate::presenter::TerminalPresenter;
use crate::process::TokioSpawner;

#[derive(Args)]
pub struct CreateArgs {
    /// Name of the new app [default: NativeApp]
    name: Option<String>,
}

pub async fn run(settings: Settings, args: CreateArgs) -> Result<()> {
    let name = ProjectName::new(args.name.as_deref());
    let presenter = Arc::new(TerminalPresenter::new(
        settings.workspace.tick_interval(),
        true,
    ));
    let context = OrchestrationContext::new(name.clone(), &settings.app.apps_location);
    let flow = Arc::new(CreationFlow::new(
        Arc::new(TokioSpawner::new()),
        presenter.clone(),
        Arc::new(TracingLogger),
        context,
        CreationOptions::from(&settings.workspace),
    ));

    let outcome = drive(flow.clone()).await;
    presenter.close();

    match outcome? {
        Outcome::Completed => {
            println!(
                "✓ Created {} in {}",
                name.display,
                flow.context().app_dir().display()
            );
            Ok(())
        }
        Outcome::Cancelled => bail!("Creation of {} was cancelled", name.display),
    }
}

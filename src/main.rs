use anyhow::Result;
use clap::Parser;

use rn_scaffold::cli::{create, run, Cli, Commands};
use rn_scaffold::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = cli.settings()?;
    match cli.command {
        Commands::Create(args) => create::run(settings, args).await,
        Commands::Run(args) => run::run(settings, args).await,
    }
}

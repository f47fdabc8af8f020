use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask", about = "Development tasks for rn-scaffold")]
struct Xtask {
    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Regenerate the CLI reference in docs/
    GenDocs {
        /// Output file
        #[arg(long, default_value = "docs/cli-reference.md")]
        output: PathBuf,
    },
}

fn main() -> std::io::Result<()> {
    match Xtask::parse().command {
        Task::GenDocs { output } => {
            let markdown = clap_markdown::help_markdown::<rn_scaffold::cli::Cli>();
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output, markdown)?;
            println!("Wrote {}", output.display());
        }
    }
    Ok(())
}

//! Helmview CLI - Preview Helm charts as plain YAML, without a cluster

use clap::{Parser, Subcommand};
use miette::Result;

mod commands;
mod exit_codes;

#[derive(Parser)]
#[command(name = "helmview")]
#[command(version)]
#[command(about = "Preview Helm charts as plain YAML, without a cluster", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a chart's templates and print the manifests
    Render {
        /// Chart reference (repo/name, e.g. stable/redis)
        reference: String,

        /// GitHub repository to read charts from (owner/name)
        #[arg(long, default_value = "helm/charts")]
        github: String,

        /// git-http-mirror alias (used with --mirror-host instead of GitHub)
        #[arg(long)]
        mirror_alias: Option<String>,

        /// git-http-mirror hostname
        #[arg(long)]
        mirror_host: Option<String>,

        /// Print only this template file
        #[arg(short = 's', long)]
        show_only: Option<String>,
    },

    /// Check that charts render cleanly
    Compat {
        /// Chart references (repo/name)
        references: Vec<String>,

        /// GitHub repository to read charts from (owner/name)
        #[arg(long, default_value = "helm/charts")]
        github: String,

        /// git-http-mirror alias (used with --mirror-host instead of GitHub)
        #[arg(long)]
        mirror_alias: Option<String>,

        /// git-http-mirror hostname
        #[arg(long)]
        mirror_host: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    if cli.debug {
        std::env::set_var("RUST_BACKTRACE", "1");
    }

    match cli.command {
        Commands::Render {
            reference,
            github,
            mirror_alias,
            mirror_host,
            show_only,
        } => {
            let fs = commands::filesystem(&github, mirror_alias, mirror_host);
            commands::render::run(&reference, fs.as_ref(), show_only.as_deref()).await
        }

        Commands::Compat {
            references,
            github,
            mirror_alias,
            mirror_host,
        } => {
            let fs = commands::filesystem(&github, mirror_alias, mirror_host);
            commands::compat::run(&references, fs.as_ref()).await
        }
    }
}

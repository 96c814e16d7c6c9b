// Copyright 2026 Picrew Archive Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::sync::Arc;

mod archive;
mod grab;
mod routes;
mod scrape_task;
mod sessions;

#[derive(Parser)]
#[command(
    name = "picrew-archive",
    about = "Archive an image maker into a clean, deterministic asset tree",
    version,
    after_help = "Run 'picrew-archive <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one maker (url, bare numeric id, or saved page) to disk
    Grab {
        /// Maker url, numeric id, or path to a previously saved page
        input: String,
        /// Output directory
        #[arg(long, default_value = "makers")]
        out: PathBuf,
        /// Downloads in flight per batch
        #[arg(long, default_value_t = picrew_archive::DEFAULT_BATCH_SIZE)]
        batch: usize,
        /// Also compress the finished maker directory into a zip
        #[arg(long)]
        zip: bool,
    },
    /// Run the scrape/poll HTTP server with the web dashboard
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,
        /// Directory for in-flight scrapes and finished archives
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("picrew_archive={default_level}").parse().unwrap())
                .add_directive(
                    format!("picrew_archive_server={default_level}")
                        .parse()
                        .unwrap(),
                ),
        )
        .init();

    let result = match cli.command {
        Commands::Grab {
            input,
            out,
            batch,
            zip,
        } => grab::run(&input, &out, batch, zip).await,
        Commands::Serve { port, data_dir } => {
            let state = Arc::new(routes::AppState::new(&data_dir));
            routes::serve(port, state).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "picrew-archive", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }
    result
}

// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use gleaner::cli::{harvest_cmd, learn_cmd};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gleaner",
    about = "Gleaner — pattern-learning catalog harvester",
    version,
    after_help = "Run 'gleaner <command> --help' for details on each command."
)]
struct Cli {
    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a pattern mapping from sample listing pages
    Learn {
        /// Category listing URL (without the page parameter)
        #[arg(long)]
        category_url: String,
        /// JSON probe file: field -> known value on each sample page
        #[arg(long)]
        probes: PathBuf,
        /// Where to write the learned mapping
        #[arg(long, default_value = "mapping.json")]
        output: PathBuf,
        /// Number of sample pages to capture
        #[arg(long, default_value = "3")]
        pages: u32,
        /// Query parameter carrying the page number
        #[arg(long, default_value = "page")]
        page_param: String,
        /// Locator acceptance threshold
        #[arg(long, default_value = "0.8")]
        threshold: f64,
        /// Navigation timeout per page in milliseconds
        #[arg(long, default_value = "15000")]
        nav_timeout: u64,
        /// Show the browser window instead of running headless
        #[arg(long)]
        headed: bool,
    },
    /// Harvest records by replaying a learned mapping across listing pages
    Harvest {
        /// Category listing URL (defaults to the one stored in the mapping)
        #[arg(long)]
        category_url: Option<String>,
        /// Learned mapping file
        #[arg(long, default_value = "mapping.json")]
        mapping: PathBuf,
        /// Output CSV path
        #[arg(long, default_value = "harvest.csv")]
        output: PathBuf,
        /// Maximum listing pages to visit
        #[arg(long, default_value = "50")]
        pages: u32,
        /// Stop after this many records
        #[arg(long)]
        max_items: Option<u64>,
        /// Concurrent browser tabs
        #[arg(long, default_value = "15")]
        tabs: usize,
        /// Base inter-dispatch delay in milliseconds (jitter is added)
        #[arg(long, default_value = "900")]
        delay_ms: u64,
        /// Query parameter carrying the page number
        #[arg(long, default_value = "page")]
        page_param: String,
        /// Retries per page after the first attempt
        #[arg(long, default_value = "2")]
        retries: u32,
        /// Navigation timeout per page in milliseconds
        #[arg(long, default_value = "20000")]
        nav_timeout: u64,
        /// Show the browser window instead of running headless
        #[arg(long)]
        headed: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let directive = if quiet {
        "gleaner=error"
    } else if verbose {
        "gleaner=debug"
    } else {
        "gleaner=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Learn {
            category_url,
            probes,
            output,
            pages,
            page_param,
            threshold,
            nav_timeout,
            headed,
        } => {
            learn_cmd::run(&learn_cmd::LearnOpts {
                category_url,
                probes,
                output,
                sample_pages: pages,
                page_param,
                threshold,
                nav_timeout_ms: nav_timeout,
                headed,
            })
            .await
        }
        Commands::Harvest {
            category_url,
            mapping,
            output,
            pages,
            max_items,
            tabs,
            delay_ms,
            page_param,
            retries,
            nav_timeout,
            headed,
        } => {
            harvest_cmd::run(&harvest_cmd::HarvestOpts {
                category_url,
                mapping,
                output,
                max_pages: pages,
                max_items,
                tabs,
                delay_ms,
                page_param,
                retries,
                nav_timeout_ms: nav_timeout,
                headed,
                quiet: cli.quiet,
            })
            .await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "gleaner", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli.quiet {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}

mod cmd;
mod output;
mod prompt;

use clap::{Parser, Subcommand};
use sitedeploy_core::context::DEFAULT_REGION;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sitedeploy",
    about = "Provision static-website hosting: storage, CDN, DNS zone, and TLS certificate",
    version,
    propagate_version = true
)]
struct Cli {
    /// Provider region (certificate operations always run in us-east-1)
    #[arg(long, global = true, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision hosting for a domain and optionally publish site content
    Deploy {
        /// Domain name for the website (e.g. example.com)
        domain: String,

        /// Local directory of site files to publish once the stack is up
        path: Option<PathBuf>,
    },

    /// Permanently delete every resource provisioned for a domain
    Cleanup {
        /// Domain name to tear down
        domain: String,

        /// Non-interactive confirmation; must be the domain name itself
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Show stack status and outputs for a domain
    Status {
        /// Domain name to inspect
        domain: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Deploy { domain, path } => {
            cmd::deploy::run(&cli.region, &domain, path.as_deref(), cli.json)
        }
        Commands::Cleanup { domain, confirm } => {
            cmd::cleanup::run(&cli.region, &domain, confirm.as_deref(), cli.json)
        }
        Commands::Status { domain } => cmd::status::run(&cli.region, &domain, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

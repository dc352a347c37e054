use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;

use cartup::config;
use cartup::{DeployError, Deployer, DeploymentResult};

#[derive(Parser)]
#[command(
    name = "cartup",
    version,
    about = "Deploys cartridges to a B2C Commerce instance over WebDAV"
)]
struct Cli {
    /// JSON settings file (defaults to ./cartup.json, then CARTUP_* env vars)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a single file to its place in the deployed cartridge
    File {
        path: PathBuf,
        /// Read upload content from stdin instead of the file on disk
        #[arg(long)]
        stdin: bool,
    },
    /// Zip and deploy the whole cartridge containing PATH
    Cartridge { path: PathBuf },
    /// Zip and deploy every cartridge sitting next to the one containing PATH
    All { path: PathBuf },
    /// Validate settings and probe the configured instance
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run().await {
        Ok(result) if result.success || result.skipped => {
            println!("{}", result.message);
            ExitCode::SUCCESS
        }
        Ok(result) => {
            error!("{}", result.message);
            ExitCode::FAILURE
        }
        Err(e) => {
            // Configuration and credential problems land here; they
            // abort before or during the flow and need operator action.
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run() -> anyhow::Result<DeploymentResult> {
    let cli = Cli::parse();
    let config = config::load(cli.settings.as_deref())?;
    let deployer = Deployer::new(config);

    let result = match cli.command {
        Command::File { path, stdin } => {
            let content = if stdin {
                let mut buffer = Vec::new();
                io::stdin()
                    .read_to_end(&mut buffer)
                    .context("could not read upload content from stdin")?;
                buffer
            } else {
                fs::read(&path)
                    .with_context(|| format!("could not read '{}'", path.display()))?
            };
            let path = fs::canonicalize(&path).unwrap_or(path);
            deployer.deploy_file(&path, content).await
        }
        Command::Cartridge { path } => {
            let path = fs::canonicalize(&path).unwrap_or(path);
            deployer.deploy_cartridge(&path).await
        }
        Command::All { path } => {
            let path = fs::canonicalize(&path).unwrap_or(path);
            deployer.deploy_all(&path).await
        }
        Command::Check => deployer.check().await,
    };

    result.map_err(|e: DeployError| anyhow::Error::new(e))
}

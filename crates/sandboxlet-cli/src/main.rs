//! sandboxlet CLI
//!
//! Command-line frontend for driving the container runtime client.

mod commands;

use clap::{Parser, Subcommand};
use sandboxlet_core::ClientConfig;
use sandboxlet_runtime::ContainerRuntimeClient;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// sandboxlet - remote control for a sandboxed container runtime
#[derive(Parser, Debug)]
#[command(name = "sandboxlet")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides the configuration file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the runtime binary and its version
    Version,

    /// Start a detached container
    Run {
        /// Image reference (e.g., docker.io/library/alpine:3)
        image: String,

        /// Arguments for the container process
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show a container's network address
    Inspect {
        /// Container ID
        id: String,

        /// Keep retrying for this many seconds while no address is assigned
        #[arg(long, default_value_t = 0)]
        wait: u64,
    },

    /// Pause a container
    Pause {
        /// Container ID
        id: String,
    },

    /// Resume a paused container
    Unpause {
        /// Container ID
        id: String,
    },

    /// Stop and remove a container
    Rm {
        /// Container ID
        id: String,
    },

    /// List running containers
    Ps {
        /// Include stopped containers (accepted; the runtime lists running ones only)
        #[arg(short, long)]
        all: bool,

        /// Filter as key=value (may be repeated)
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Print JSON instead of one ID per line
        #[arg(long)]
        json: bool,
    },

    /// Pull one or more images concurrently
    Pull {
        /// Image references
        #[arg(required = true)]
        images: Vec<String>,
    },

    /// Report whether a container was OOM-killed
    Oom {
        /// Container ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    // Initialize logging
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::new(log_directives(
        cli.verbose,
        cli.log_level.as_deref(),
        env_directives.as_deref(),
        &config.logging.level,
    ));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(config.logging.with_target)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let client = ContainerRuntimeClient::connect(config.runtime).await?;

    match cli.command {
        Commands::Version => commands::version(&client),
        Commands::Run { image, args } => commands::run(&client, &image, &args).await?,
        Commands::Inspect { id, wait } => commands::inspect(&client, &id, wait).await?,
        Commands::Pause { id } => commands::pause(&client, &id).await?,
        Commands::Unpause { id } => commands::unpause(&client, &id).await?,
        Commands::Rm { id } => commands::rm(&client, &id).await?,
        Commands::Ps { all, filters, json } => commands::ps(&client, &filters, all, json).await?,
        Commands::Pull { images } => commands::pull(&client, &images).await?,
        Commands::Oom { id } => commands::oom(&client, &id).await?,
    }

    Ok(())
}

/// Pick the log filter: `-v`, then `--log-level`, then `RUST_LOG`, then the config file
fn log_directives<'a>(
    verbose: bool,
    flag: Option<&'a str>,
    env: Option<&'a str>,
    configured: &'a str,
) -> &'a str {
    if verbose {
        return "debug";
    }
    flag.or(env.filter(|v| !v.trim().is_empty())).unwrap_or(configured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directives_precedence() {
        let env = Some("sandboxlet_runtime=trace");
        assert_eq!(log_directives(true, Some("warn"), env, "info"), "debug");
        assert_eq!(log_directives(false, Some("warn"), env, "info"), "warn");
        assert_eq!(log_directives(false, None, env, "info"), "sandboxlet_runtime=trace");
        assert_eq!(log_directives(false, None, Some(" "), "error"), "error");
        assert_eq!(log_directives(false, None, None, "info"), "info");
    }
}

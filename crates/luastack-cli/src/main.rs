//! luastack command-line driver
//!
//! Runs Lua scripts and dumps them to bytecode through the bridge, and
//! lists the operation table.
//!
//! Logging is controlled with `RUST_LOG` (e.g. `RUST_LOG=luastack=debug`);
//! scripts log through `host.log` under the `luastack::script` target.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use luastack::BridgeConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "luastack")]
#[command(about = "Drive a Lua VM through the luastack bridge", long_about = None)]
#[command(version)]
struct Cli {
    /// Bridge configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Lua script and print its results
    Run {
        /// Script file (source or bytecode)
        file: PathBuf,
    },

    /// Compile a Lua script to bytecode
    Dump {
        /// Script file
        file: PathBuf,
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
        /// Strip debug information
        #[arg(long)]
        strip: bool,
    },

    /// List the bridge operations and their arities
    Ops,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(BridgeConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "luastack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { file } => commands::run::execute(config, &file),
        Commands::Dump {
            file,
            output,
            strip,
        } => commands::dump::execute(config, &file, &output, strip),
        Commands::Ops => commands::ops::execute(),
    }
}

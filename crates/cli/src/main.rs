use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{
    execute_check_command, execute_serve_command, transport_registry, CheckArgs, ServeArgs,
};

/// Used when `RUST_LOG` is unset: Portal's crates plus the access log
const DEFAULT_LOG_FILTER: &str = "portal=info,public_access=info";

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Portal - pluggable REST front door")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a server and run it until Ctrl+C
    Serve(ServeCommandArgs),
    /// Validate configuration without binding a socket
    Check(ConfigArgs),
    /// List available transports
    Transports,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Properties file to load
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Property override, may be repeated
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Args)]
pub struct ServeCommandArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Port to listen on (overrides http.server.port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let serve_args = ServeArgs {
                config: args.config.config,
                set: args.config.set,
                port: args.port,
            };
            execute_serve_command(serve_args).await
        }
        Commands::Check(args) => execute_check_command(CheckArgs {
            config: args.config,
            set: args.set,
        }),
        Commands::Transports => {
            println!("🔌 Available transports:");
            for name in transport_registry().names() {
                println!("   {}", name);
            }
            Ok(())
        }
    }
}

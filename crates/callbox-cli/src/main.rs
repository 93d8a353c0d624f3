//! callbox command line host
//!
//! Serves the demo registry over HTTP, or runs a single invoke/list request
//! in-process and prints the JSON response.

mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use callbox_server::{Config, Server, Service};
use clap::{Parser, Subcommand};
use serde_json::Value as Json;

#[derive(Parser)]
#[command(name = "callbox")]
#[command(about = "Remote invocation server for registered native functions", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (callbox.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the invoke and list endpoints
    Serve {
        /// Bind address (IP literal)
        #[arg(long)]
        host: Option<String>,
        /// Bind port, 0 for ephemeral
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one invoke request and print the response
    Invoke {
        /// Request JSON, e.g. '{"method":"add","args":[1,2]}'
        request: String,
    },

    /// Print the registered methods
    List {
        /// Filter JSON, e.g. '{"package":"main"}'
        #[arg(default_value = "{}")]
        filter: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    setup_tracing(&config.log.filter, cli.verbose);

    let registry = Arc::new(demo::registry());

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            let server = Server::bind(&config.server, registry)?;
            server.serve()?;
        }

        Commands::Invoke { request } => {
            let request = parse_json(&request)?;
            print_json(&Service::new(registry).invoke(&request))?;
        }

        Commands::List { filter } => {
            let filter = parse_json(&filter)?;
            print_json(&Service::new(registry).list(&filter))?;
        }
    }

    Ok(())
}

fn setup_tracing(filter: &str, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"))
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_json(text: &str) -> anyhow::Result<Json> {
    serde_json::from_str(text).with_context(|| format!("not valid JSON: {}", text))
}

fn print_json(value: &Json) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! Menuet server.
//!
//! - `menuet serve` (default) - load the project and serve it
//! - `menuet check` - load everything, report problems, exit
//! - `menuet routes` - print the route table

use clap::{Parser, Subcommand};
use menuet::Menuet;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Menuet application server
#[derive(Parser)]
#[command(name = "menuet")]
#[command(version)]
#[command(about = "Serve a Menuet project directory")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project root
    #[arg(long, global = true, env = "MENUET_ROOT", default_value = ".")]
    root: PathBuf,

    /// Environment name; selects config/<env>.json
    #[arg(long, global = true)]
    env: Option<String>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Load the project and serve it
    Serve,
    /// Load the project and exit
    Check,
    /// Print the route table
    Routes,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve);

    let mut menuet = Menuet::new(cli.root).registered_modules();
    if let Some(env) = cli.env {
        menuet = menuet.env(env);
    }

    let built = match menuet.build().await {
        Ok(built) => built,
        Err(e) => {
            error!(error = %e, "Startup failed");
            eprintln!("menuet: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match command {
        Commands::Check => {
            println!("ok: {} routes", built.app.router().routes().len());
            ExitCode::SUCCESS
        }
        Commands::Routes => {
            for route in built.app.router().routes() {
                println!("{:<7} {}", route.method.as_str(), route.path);
            }
            ExitCode::SUCCESS
        }
        Commands::Serve => match built.run().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "Server stopped with an error");
                ExitCode::FAILURE
            }
        },
    }
}

#[macro_use]
mod backend;
mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wndpump",
    version,
    about = "Native window message pump with cooperative cancellation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init(commands::init::InitArgs),
    /// Create a window and pump its messages until Ctrl+C or timeout
    Run(commands::run::RunArgs),
    /// Post custom messages, cancel, and report what the pump dispatched
    Demo(commands::demo::DemoArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => commands::init::execute(&args),
        Commands::Run(args) => commands::run::execute(&args),
        Commands::Demo(args) => commands::demo::execute(&args),
    }
}

//! Loadsketch CLI - estimate request rates across architecture diagrams

mod cli;
mod report;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();

    let mut app = cli::LoadsketchApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

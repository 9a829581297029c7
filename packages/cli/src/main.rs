mod commands;
mod steps;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, init, run, CheckArgs, InitArgs, RunArgs};
use tracing_subscriber::EnvFilter;

/// Minibind CLI - drive reactive attribute bindings outside a browser
#[derive(Parser, Debug)]
#[command(name = "minibind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log binding activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default minibind.config.json
    Init(InitArgs),

    /// Bind a document, replay steps against it and print the result
    Run(RunArgs),

    /// Analyze a binding expression
    Check(CheckArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "minibind_runtime=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Run(args) => run(args, &cwd),
            Command::Check(args) => check(args),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

//! Ferrite program-image tooling.
//!
//! Single command-line interface over compiled program images: structural
//! inspection, JSON dumps for toolchain consumption, and a generated sample
//! image for trying the tools out.

mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ferrite")]
#[command(about = "Ferrite program-image tooling", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an image and print a tree summary
    Inspect {
        /// Program-image file
        file: PathBuf,
        /// Color output: auto, always, never
        #[arg(long)]
        color: Option<String>,
    },

    /// Load an image and dump the decoded tree as JSON
    Dump {
        /// Program-image file
        file: PathBuf,
        /// Pretty-print the JSON
        #[arg(short, long)]
        pretty: bool,
    },

    /// Write a small generated example image
    Sample {
        /// Output path
        #[arg(default_value = "sample.fbc")]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect { file, color } => commands::inspect::run(&file, color.as_deref()),
        Commands::Dump { file, pretty } => commands::dump::run(&file, pretty),
        Commands::Sample { out } => commands::sample::run(&out),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

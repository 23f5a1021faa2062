mod check;
mod exec;
mod tree;

use std::path::PathBuf;

use check::CheckCommand;
use clap::{Args, Parser, Subcommand};
use exec::ExecCommand;
use eyre::Result;
use tree::TreeCommand;
use trellis_core::ReleaseTrack;
use trellis_tree::{CommandTree, TreeBuilder};

/// Extension trait for exiting on tree errors with pretty formatting
pub(crate) trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self) -> T;
}

impl<T> UnwrapOrExit<T> for trellis_tree::Result<T> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(e));
                std::process::exit(1);
            }
        }
    }
}

/// Definition directories shared by every subcommand.
#[derive(Args)]
pub(crate) struct RootArgs {
    /// GA definition root (defaults to ./commands)
    #[arg(long, default_value = "commands")]
    pub root: PathBuf,

    /// Beta overlay root
    #[arg(long)]
    pub beta: Option<PathBuf>,

    /// Alpha overlay root
    #[arg(long)]
    pub alpha: Option<PathBuf>,
}

impl RootArgs {
    pub fn build(&self) -> trellis_tree::Result<CommandTree> {
        let mut builder = TreeBuilder::new(&self.root);
        if let Some(beta) = &self.beta {
            builder = builder.overlay(ReleaseTrack::Beta, beta);
        }
        if let Some(alpha) = &self.alpha {
            builder = builder.overlay(ReleaseTrack::Alpha, alpha);
        }
        Ok(builder.build()?)
    }
}

#[derive(Parser)]
#[command(name = "trellis")]
#[command(version)]
#[command(about = "Load, inspect, and dispatch TOML-defined command trees")]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Check(cmd) => cmd.run(),
            Commands::Tree(cmd) => cmd.run(),
            Commands::Exec(cmd) => cmd.run(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load every definition and report defects
    Check(CheckCommand),

    /// Print the command tree per release track
    Tree(TreeCommand),

    /// Dispatch a command line against the tree
    Exec(ExecCommand),
}

//! Command-line interface for chore-tracker.
//!
//! This module provides the CLI structure for the `chores` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, BackupCommand, ChoreTypeArg, ConfigCommand, FrequencyArg, ListCommand,
    PriorityArg, StateArg, UpdateCommand,
};

/// chores - Keep track of recurring household chores
///
/// Records chores with fixed or adaptive schedules, tracks completions and
/// streaks, and flags chores that slip past their due date.
#[derive(Debug, Parser)]
#[command(name = "chores")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the chore store (overrides configuration)
    #[arg(long, global = true, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a chore
    Add(AddCommand),

    /// Remove a chore
    Remove {
        /// Chore id or name
        chore: String,
    },

    /// Change fields of a chore
    Update(UpdateCommand),

    /// Mark a chore done
    Complete {
        /// Chore id or name
        chore: String,

        /// Who did it
        #[arg(short, long)]
        by: Option<String>,

        /// Notes for the history log
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Put a chore back to pending
    Reset {
        /// Chore id or name
        chore: String,

        /// Why
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// List chores
    List(ListCommand),

    /// Show one chore with its history
    Show {
        /// Chore id or name
        chore: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Run the overdue check once
    Check {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show sensor projections of all chores
    Sensors {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show completion statistics
    Stats {
        /// Chore id or name; omit for store totals
        chore: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Run overdue checks periodically until interrupted
    Run {
        /// Hours between checks (defaults to configuration)
        #[arg(long)]
        interval_hours: Option<u32>,
    },

    /// Manage backups
    #[command(subcommand)]
    Backup(BackupCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

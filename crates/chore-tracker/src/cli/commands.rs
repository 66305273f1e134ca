//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::chore::{ChoreState, ChoreType, Frequency, Priority};
use crate::lifecycle::ChoreUpdate;
use crate::service::{AddChore, ChoreFilter};
use crate::validation;

/// Arguments of `add`.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Chore name
    pub name: String,

    /// First due date (YYYY-MM-DD)
    #[arg(short, long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,

    /// Description
    #[arg(long)]
    pub description: Option<String>,

    /// Recurrence frequency
    #[arg(short, long, value_enum)]
    pub frequency: Option<FrequencyArg>,

    /// Scheduling policy
    #[arg(short = 't', long = "type", value_enum)]
    pub chore_type: Option<ChoreTypeArg>,

    /// Recurrence interval in days
    #[arg(long)]
    pub interval_days: Option<u32>,

    /// Days added when an adaptive chore is done late
    #[arg(long)]
    pub max_days: Option<u32>,

    /// Days added when an adaptive chore is done on time
    #[arg(long)]
    pub adaptive_window: Option<u32>,

    /// Who does it
    #[arg(short, long)]
    pub assigned_to: Option<String>,

    /// Priority
    #[arg(short, long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// Category label
    #[arg(long)]
    pub category: Option<String>,

    /// Estimated duration in minutes
    #[arg(long)]
    pub estimated_duration: Option<u32>,
}

impl From<AddCommand> for AddChore {
    fn from(cmd: AddCommand) -> Self {
        Self {
            name: cmd.name,
            due_date: cmd.due,
            description: cmd.description,
            frequency: cmd.frequency.map(Into::into),
            chore_type: cmd.chore_type.map(Into::into),
            interval_days: cmd.interval_days,
            max_days: cmd.max_days,
            adaptive_window: cmd.adaptive_window,
            assigned_to: cmd.assigned_to,
            priority: cmd.priority.map(Into::into),
            category: cmd.category,
            estimated_duration: cmd.estimated_duration,
        }
    }
}

/// Arguments of `update`.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Chore id or name
    pub chore: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New due date (YYYY-MM-DD)
    #[arg(short, long, value_parser = parse_date, conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,

    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// New recurrence frequency
    #[arg(short, long, value_enum)]
    pub frequency: Option<FrequencyArg>,

    /// New scheduling policy
    #[arg(short = 't', long = "type", value_enum)]
    pub chore_type: Option<ChoreTypeArg>,

    /// New recurrence interval in days
    #[arg(long)]
    pub interval_days: Option<u32>,

    /// New late window
    #[arg(long)]
    pub max_days: Option<u32>,

    /// New on-time window
    #[arg(long)]
    pub adaptive_window: Option<u32>,

    /// New assignee
    #[arg(short, long)]
    pub assigned_to: Option<String>,

    /// New priority
    #[arg(short, long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// New category
    #[arg(long)]
    pub category: Option<String>,

    /// New estimated duration in minutes
    #[arg(long)]
    pub estimated_duration: Option<u32>,
}

impl UpdateCommand {
    /// The field changes requested on the command line.
    #[must_use]
    pub fn to_update(&self) -> ChoreUpdate {
        let due_date = if self.clear_due {
            Some(None)
        } else {
            self.due.map(Some)
        };
        ChoreUpdate {
            name: self.name.clone(),
            description: self.description.clone(),
            due_date,
            chore_type: self.chore_type.map(Into::into),
            frequency: self.frequency.map(Into::into),
            interval_days: self.interval_days,
            max_days: self.max_days,
            adaptive_window: self.adaptive_window,
            assigned_to: self.assigned_to.clone(),
            priority: self.priority.map(Into::into),
            category: self.category.clone(),
            estimated_duration: self.estimated_duration,
        }
    }
}

/// Arguments of `list`.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only chores in this state
    #[arg(short, long, value_enum)]
    pub state: Option<StateArg>,

    /// Only chores assigned to this person
    #[arg(short, long)]
    pub assigned_to: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl ListCommand {
    /// The filter described by the flags.
    #[must_use]
    pub fn filter(&self) -> ChoreFilter {
        ChoreFilter {
            state: self.state.map(Into::into),
            assigned_to: self.assigned_to.clone(),
        }
    }
}

/// Backup commands.
#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Write a snapshot of all chores
    Create,

    /// Replace all chores with a snapshot
    Restore {
        /// Backup file to restore
        file: PathBuf,
    },

    /// Delete old snapshots
    Cleanup {
        /// Keep backups newer than this many days (defaults to configuration)
        #[arg(long)]
        retention_days: Option<u32>,
    },

    /// List snapshots
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Frequency argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrequencyArg {
    /// Every day
    Daily,
    /// Every 7 days
    Weekly,
    /// Every 14 days
    Biweekly,
    /// Every 30 days
    Monthly,
    /// Every 90 days
    Quarterly,
    /// Every 365 days
    Yearly,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Daily => Self::Daily,
            FrequencyArg::Weekly => Self::Weekly,
            FrequencyArg::Biweekly => Self::Biweekly,
            FrequencyArg::Monthly => Self::Monthly,
            FrequencyArg::Quarterly => Self::Quarterly,
            FrequencyArg::Yearly => Self::Yearly,
        }
    }
}

/// Chore type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChoreTypeArg {
    /// Advance by the frequency from the due date
    Fixed,
    /// Advance from the completion date
    Adaptive,
}

impl From<ChoreTypeArg> for ChoreType {
    fn from(arg: ChoreTypeArg) -> Self {
        match arg {
            ChoreTypeArg::Fixed => Self::Fixed,
            ChoreTypeArg::Adaptive => Self::Adaptive,
        }
    }
}

/// Priority argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
            PriorityArg::Critical => Self::Critical,
        }
    }
}

/// Lifecycle state argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    /// Waiting to be done
    Pending,
    /// Done for this cycle
    Completed,
    /// Past due
    Overdue,
}

impl From<StateArg> for ChoreState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Pending => Self::Pending,
            StateArg::Completed => Self::Completed,
            StateArg::Overdue => Self::Overdue,
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    validation::parse_due_date(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_arg_conversion() {
        assert_eq!(Frequency::from(FrequencyArg::Daily), Frequency::Daily);
        assert_eq!(Frequency::from(FrequencyArg::Biweekly), Frequency::Biweekly);
        assert_eq!(Frequency::from(FrequencyArg::Yearly), Frequency::Yearly);
    }

    #[test]
    fn test_state_arg_conversion() {
        assert_eq!(ChoreState::from(StateArg::Overdue), ChoreState::Overdue);
        assert_eq!(ChoreType::from(ChoreTypeArg::Adaptive), ChoreType::Adaptive);
        assert_eq!(Priority::from(PriorityArg::Critical), Priority::Critical);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-08"), Ok(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()));
        assert!(parse_date("tomorrow").unwrap_err().contains("due_date"));
    }

    #[test]
    fn test_update_clear_due() {
        let cmd = UpdateCommand {
            chore: "x".to_string(),
            name: None,
            due: None,
            clear_due: true,
            description: None,
            frequency: None,
            chore_type: None,
            interval_days: None,
            max_days: None,
            adaptive_window: None,
            assigned_to: None,
            priority: None,
            category: None,
            estimated_duration: None,
        };
        assert_eq!(cmd.to_update().due_date, Some(None));
    }
}

//! `chores` - CLI for chore-tracker
//!
//! This binary provides the command-line interface for adding, completing
//! and reviewing chores, and for running the periodic overdue check.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;

use chore_tracker::cli::{BackupCommand, Cli, Command, ConfigCommand};
use chore_tracker::event::{ChannelSink, EventSink, TracingSink};
use chore_tracker::storage::backup;
use chore_tracker::{
    init_logging, run_scheduler, Chore, ChoreService, ChoreStore, Config, ServiceOptions,
};

/// Where configuration and chores come from, resolved lazily so that
/// `config` subcommands still work with a broken configuration file.
#[derive(Debug)]
struct App {
    config_path: Option<PathBuf>,
    store_path: Option<PathBuf>,
}

impl App {
    fn config(&self) -> Result<Config> {
        let mut config =
            Config::load_from(self.config_path.clone()).context("loading configuration")?;
        if let Some(store) = &self.store_path {
            config.storage.path = Some(store.clone());
        }
        Ok(config)
    }

    fn service(&self) -> Result<ChoreService> {
        open_service(&self.config()?, Arc::new(TracingSink))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let app = App {
        config_path: cli.config,
        store_path: cli.store,
    };

    match cli.command {
        Command::Add(cmd) => {
            let chore = app.service()?.add_chore(cmd.into())?;
            println!("Added '{}' ({})", chore.name, chore.id);
        }
        Command::Remove { chore } => {
            if app.service()?.remove_chore(&chore)? {
                println!("Removed '{chore}'");
            } else {
                println!("No chore named '{chore}'");
            }
        }
        Command::Update(cmd) => {
            let update = cmd.to_update();
            if update.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            match app.service()?.update_chore(&cmd.chore, update)? {
                Some(chore) => print_chore(&chore),
                None => println!("No chore named '{}'", cmd.chore),
            }
        }
        Command::Complete { chore, by, notes } => {
            match app.service()?.complete_chore(&chore, by, notes)? {
                Some(chore) => println!(
                    "Completed '{}', next due {}",
                    chore.name,
                    format_date(chore.due_date)
                ),
                None => println!("No chore named '{chore}'"),
            }
        }
        Command::Reset { chore, reason } => match app.service()?.reset_chore(&chore, reason)? {
            Some(chore) => println!("'{}' is {}", chore.name, chore.state),
            None => println!("No chore named '{chore}'"),
        },
        Command::List(cmd) => {
            let chores = app.service()?.list_chores(&cmd.filter())?;
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&chores)?);
            } else if chores.is_empty() {
                println!("No chores.");
            } else {
                println!("{:<12}  {:<30}  {:<10}  {:<10}  ASSIGNED", "ID", "NAME", "STATE", "DUE");
                for chore in &chores {
                    println!(
                        "{:<12}  {:<30}  {:<10}  {:<10}  {}",
                        chore.id,
                        chore.name,
                        chore.state,
                        format_date(chore.due_date),
                        chore.assigned_to
                    );
                }
            }
        }
        Command::Show { chore, json } => {
            let Some(chore) = app.service()?.get_chore(&chore)? else {
                bail!("no chore named '{chore}'");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&chore)?);
            } else {
                print_chore(&chore);
                println!();
                println!("History:");
                for entry in &chore.history {
                    println!(
                        "  {}  {:<9}  {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M"),
                        entry.action,
                        entry.notes.as_deref().unwrap_or("")
                    );
                }
            }
        }
        Command::Check { json } => {
            let report = app.service()?.check_overdue(Utc::now())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} marked overdue, {} reset to pending",
                    report.marked_overdue.len(),
                    report.reset_to_pending.len()
                );
            }
        }
        Command::Sensors { json } => {
            let sensors = app.service()?.sensors(Utc::now().date_naive())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sensors)?);
            } else {
                for sensor in &sensors {
                    println!("{:<40}  {}", sensor.unique_id, sensor.state);
                }
            }
        }
        Command::Stats { chore: Some(chore), json } => {
            let stats = app.service()?.statistics(&chore)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Completions:      {}", stats.total_completions);
                println!("  on time:        {}", stats.on_time_completions);
                println!("  late:           {}", stats.overdue_completions);
                println!("Days late total:  {}", stats.total_overdue_days);
                println!("Times overdue:    {}", stats.total_overdue_count);
                println!("Streak:           {}", stats.completion_streak);
                if let Some(avg) = stats.average_completion_days {
                    println!("Average (days):   {avg:.1}");
                }
            }
        }
        Command::Stats { chore: None, json } => {
            let stats = app.service()?.store_stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Chores:     {}", stats.total_chores);
                println!("  pending:   {}", stats.pending);
                println!("  completed: {}", stats.completed);
                println!("  overdue:   {}", stats.overdue);
                if let Some(path) = &stats.path {
                    println!("Store:      {} ({} bytes)", path.display(), stats.file_size_bytes);
                }
            }
        }
        Command::Run { interval_hours } => handle_run(&app.config()?, interval_hours)?,
        Command::Backup(cmd) => {
            let config = app.config()?;
            let service = open_service(&config, Arc::new(TracingSink))?;
            handle_backup(&config, &service, cmd)?;
        }
        Command::Config(cmd) => handle_config(&app, cmd)?,
    }
    Ok(())
}

fn open_service(config: &Config, sink: Arc<dyn EventSink>) -> Result<ChoreService> {
    let path = config.store_path();
    let store = ChoreStore::open(&path)
        .with_context(|| format!("opening chore store {}", path.display()))?;
    Ok(ChoreService::new(store, sink, ServiceOptions::from(config)))
}

fn handle_run(config: &Config, interval_hours: Option<u32>) -> Result<()> {
    let interval = match interval_hours {
        Some(0) => bail!("--interval-hours must be greater than 0"),
        Some(hours) => Duration::from_secs(u64::from(hours) * 60 * 60),
        None => config.check_interval(),
    };

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async {
        let (sink, mut events) = ChannelSink::channel(256);
        let service = Arc::new(open_service(config, Arc::new(sink))?);

        let printer = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::warn!("Could not encode event: {}", err),
                }
            }
        });

        run_scheduler(Arc::clone(&service), interval, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

        // The printer ends once the last sender is gone
        drop(service);
        let _ = printer.await;
        Ok::<(), anyhow::Error>(())
    })
}

fn handle_backup(config: &Config, service: &ChoreService, cmd: BackupCommand) -> Result<()> {
    let dir = config.backup_dir();
    match cmd {
        BackupCommand::Create => {
            let path = service.create_backup(&dir, Utc::now())?;
            println!("{}", path.display());
        }
        BackupCommand::Restore { file } => {
            let count = service
                .restore_backup(&file)
                .with_context(|| format!("restoring {}", file.display()))?;
            println!("Restored {count} chores");
        }
        BackupCommand::Cleanup { retention_days } => {
            let days = retention_days.unwrap_or(config.storage.backup_retention_days);
            let removed = service.cleanup_backups(&dir, days, Utc::now())?;
            println!("Removed {removed} backups");
        }
        BackupCommand::List { json } => {
            let backups = backup::list_backups(&dir)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&backups)?);
            } else {
                for b in &backups {
                    println!(
                        "{}  {:>8} bytes  {}",
                        b.created_at.format("%Y-%m-%d %H:%M:%S"),
                        b.size_bytes,
                        b.path.display()
                    );
                }
            }
        }
    }
    Ok(())
}

fn handle_config(app: &App, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = app.config()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                let d = &config.defaults;
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Store path:         {}", config.store_path().display());
                println!("  Backup dir:         {}", config.backup_dir().display());
                println!("  Backup retention:   {} days", config.storage.backup_retention_days);
                println!();
                println!("[Schedule]");
                println!("  Check interval:     {} hours", config.schedule.check_interval_hours);
                println!("  Reset completed:    {}", config.schedule.reset_completed);
                println!();
                println!("[Defaults]");
                println!("  Type / frequency:   {} / {}", d.chore_type, d.frequency);
                println!("  Interval:           {} days", d.interval_days);
                println!("  Adaptive window:    {} days (late: {})", d.adaptive_window, d.max_days);
                println!("  Priority:           {}", d.priority);
                println!("  Category:           {}", d.category);
                println!("  Duration:           {} minutes", d.estimated_duration);
            }
        }
        ConfigCommand::Path => {
            let path = app.config_path.clone();
            println!("{}", path.unwrap_or_else(Config::default_config_path).display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or_else(|| app.config_path.clone())
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_chore(chore: &Chore) {
    println!("{} ({})", chore.name, chore.id);
    if !chore.description.is_empty() {
        println!("  {}", chore.description);
    }
    println!("  State:      {}", chore.state);
    println!("  Due:        {}", format_date(chore.due_date));
    println!(
        "  Schedule:   {} {} (every {} days)",
        chore.chore_type, chore.frequency, chore.interval_days
    );
    if !chore.assigned_to.is_empty() {
        println!("  Assigned:   {}", chore.assigned_to);
    }
    println!(
        "  Priority:   {} / {}",
        chore.metadata.priority, chore.metadata.category
    );
    println!("  Streak:     {}", chore.statistics.completion_streak);
}

fn format_date(date: Option<chrono::NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

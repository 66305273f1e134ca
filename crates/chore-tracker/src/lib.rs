//! `chore-tracker` - Recurring chore tracking with adaptive scheduling
//!
//! This library keeps a persisted set of chores, advances their due dates on
//! completion according to a fixed or adaptive policy, tracks completion
//! statistics, and flags chores that slip past their due date.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod chore;
pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod logging;
pub mod scheduler;
pub mod schedule;
pub mod sensor;
pub mod service;
pub mod storage;
pub mod validation;

pub use chore::{Chore, ChoreState, ChoreStatistics, ChoreType, Frequency, Priority};
pub use config::Config;
pub use error::{Error, Result};
pub use event::{ChoreEvent, EventSink};
pub use lifecycle::{apply, Action, ChoreUpdate, TransitionContext};
pub use logging::init_logging;
pub use scheduler::run_scheduler;
pub use sensor::ChoreSensor;
pub use service::{AddChore, ChoreFilter, ChoreService, OverdueReport, ServiceOptions};
pub use storage::{ChoreStore, StoreStats};

//! Core data structures for the icebite journal.
//!
//! This module contains the value types handed out by the store (preferences,
//! monthly statistics, calendar cells, change events) and the CLI subcommands.
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::{parse_finite, JournalError, Trip, WindLevel, CloudLevel};

/// A specialized Result type for icebite operations.
pub type Result<T> = std::result::Result<T, JournalError>;

/// Monthly trip target used when none has been stored.
pub const DEFAULT_MONTHLY_GOAL: u32 = 4;

/// Species offered as suggestions on a fresh install.
pub const DEFAULT_SPECIES: [&str; 4] = ["Perch", "Pike", "Roach", "Bream"];

/// User preferences persisted next to the trips
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    /// Set once the welcome flow has been shown; never cleared
    pub has_seen_onboarding: bool,
    /// Target number of trips per calendar month, always positive
    pub monthly_goal: u32,
    /// Known species names, used as suggestions only
    pub fish_species_list: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            has_seen_onboarding: false,
            monthly_goal: DEFAULT_MONTHLY_GOAL,
            fish_species_list: DEFAULT_SPECIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Aggregate figures for one calendar month
#[derive(Debug, Clone, PartialEq)]
pub struct MonthStats {
    pub trip_count: usize,
    pub total_catch: u64,
    /// Mean bite score, 0.0 for a month without trips
    pub average_bite_score: f64,
    /// Trip with the highest bite score (first one wins on ties)
    pub best_day: Option<Trip>,
}

/// Trips logged in a month measured against the monthly goal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProgress {
    pub completed: usize,
    pub goal: u32,
    /// completed / goal, capped at 1.0
    pub fraction: f64,
}

impl GoalProgress {
    pub fn is_met(&self) -> bool {
        self.completed as u64 >= self.goal as u64
    }
}

/// One day cell of a calendar month view
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub trips: Vec<Trip>,
}

/// Handle returned by `TripStore::subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Change notifications delivered to store listeners after a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    TripAdded { id: String },
    TripUpdated { id: String },
    /// `removed` is zero when no trip carried the id
    TripsDeleted { id: String, removed: usize },
    PreferencesChanged,
    /// All trips were cleared
    Reset,
}

/// Trip fields accepted by `add` and `edit`
#[derive(Args, Debug, Default)]
pub struct TripFields {
    /// Trip date (YYYY-MM-DD), defaults to today when adding
    #[clap(short, long)]
    pub date: Option<String>,

    /// Short title for the trip
    #[clap(short = 'T', long)]
    pub title: Option<String>,

    /// Where the trip took place
    #[clap(short, long)]
    pub location: Option<String>,

    /// Free-form notes
    #[clap(short, long)]
    pub notes: Option<String>,

    /// Write the notes in an editor
    #[clap(short, long)]
    pub edit: bool,

    /// Bite score from 1 (dead) to 5 (on fire)
    #[clap(short, long, value_parser = clap::value_parser!(i32).range(1..=5))]
    pub bite: Option<i32>,

    /// Number of fish caught
    #[clap(long)]
    pub catch: Option<u32>,

    /// Total weight of the catch
    #[clap(long, value_parser = parse_finite)]
    pub weight: Option<f64>,

    /// Species caught (comma-separated)
    #[clap(short, long)]
    pub species: Option<String>,

    /// Air temperature
    #[clap(long, allow_negative_numbers = true, value_parser = parse_finite)]
    pub temperature: Option<f64>,

    /// Atmospheric pressure
    #[clap(long, value_parser = parse_finite)]
    pub pressure: Option<f64>,

    #[clap(long, value_enum)]
    pub wind: Option<WindLevel>,

    #[clap(long, value_enum)]
    pub cloud: Option<CloudLevel>,

    /// Start time on the trip date (HH:MM)
    #[clap(long)]
    pub start: Option<String>,

    /// End time on the trip date (HH:MM)
    #[clap(long)]
    pub end: Option<String>,
}

/// Available subcommands for the icebite journal
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log a new trip
    Add(TripFields),

    /// Change fields of an existing trip
    Edit {
        /// ID of the trip to edit
        id: String,

        #[clap(flatten)]
        fields: TripFields,
    },

    /// Delete a trip by ID
    Delete {
        /// ID of the trip to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Show a single trip
    Show {
        /// ID of the trip to show
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List the trips of one day
    Day {
        /// Day to show (YYYY-MM-DD), defaults to today
        date: Option<String>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Print a month calendar with bite markers
    Calendar {
        /// Month to show (YYYY-MM), defaults to the current month
        month: Option<String>,
    },

    /// Browse the trip log, newest first
    Log {
        /// Text to look for in title, location and notes
        query: Option<String>,

        /// Only show trips where this species was caught
        #[clap(short, long)]
        species: Option<String>,

        /// Limit the number of trips shown (0 = no limit)
        #[clap(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Monthly statistics and goal progress
    Stats {
        /// Month to summarize (YYYY-MM), defaults to the current month
        month: Option<String>,
    },

    /// Show or change the monthly trip goal
    Goal {
        /// New goal (trips per month)
        #[clap(short, long)]
        set: Option<u32>,
    },

    /// Manage the list of known species
    Species {
        /// Species to add
        #[clap(short, long)]
        add: Option<String>,

        /// Species to remove
        #[clap(short, long)]
        remove: Option<String>,
    },

    /// Delete every logged trip (preferences are kept)
    Reset {
        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config,
}

impl Commands {
    /// Whether the command writes machine-readable JSON to stdout
    pub fn wants_json(&self) -> bool {
        match self {
            Commands::Show { json, .. }
            | Commands::Day { json, .. }
            | Commands::Log { json, .. } => *json,
            _ => false,
        }
    }
}

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};
use log::{debug, error, info, trace, warn};
use serde_json::Value;

use crate::{
    days_in_month, first_of_month, CalendarDay, GoalProgress, JournalError, KeyValueStore,
    MonthStats, Preferences, Result, StoreEvent, SubscriptionId, Trip, DEFAULT_MONTHLY_GOAL,
};

/// Key holding the serialized trip collection
pub const TRIPS_KEY: &str = "trips";
/// Key holding the onboarding flag
pub const ONBOARDING_KEY: &str = "hasSeenOnboarding";
/// Key holding the monthly goal
pub const MONTHLY_GOAL_KEY: &str = "monthlyGoal";
/// Key holding the known species list
pub const SPECIES_KEY: &str = "fishSpeciesList";

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Owns the trip collection and user preferences, and writes the full state
/// to its key-value store after every mutation.
///
/// Persistence failures never reach the caller: they are logged and the
/// in-memory state stays authoritative until the next successful write.
pub struct TripStore<S: KeyValueStore> {
    /// Backing key-value namespace
    kv: S,

    /// All trips, in insertion order
    trips: Vec<Trip>,

    preferences: Preferences,

    /// Offset used to decide which calendar day a trip belongs to
    offset: FixedOffset,

    /// Registered change listeners
    listeners: Vec<(SubscriptionId, Listener)>,

    next_subscription: u64,
}

impl<S: KeyValueStore> TripStore<S> {
    /// Creates a store over `kv` that groups trips by UTC calendar days,
    /// loading whatever state `kv` already holds.
    pub fn new(kv: S) -> Self {
        Self::with_offset(kv, Utc.fix())
    }

    /// Creates a store over `kv` that groups trips by calendar days at `offset`
    pub fn with_offset(kv: S, offset: FixedOffset) -> Self {
        let mut store = Self {
            kv,
            trips: Vec::new(),
            preferences: Preferences::default(),
            offset,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        store.load();
        store
    }

    /// Replaces the in-memory state with what the key-value store holds.
    ///
    /// Missing or undecodable values fall back to an empty trip list and
    /// default preferences; nothing is reported to the caller.
    pub fn load(&mut self) {
        debug!("Loading journal state");

        self.trips = match self.kv.get(TRIPS_KEY) {
            Some(value) => match serde_json::from_value::<Vec<Trip>>(value) {
                Ok(trips) => trips,
                Err(e) => {
                    warn!("Failed to decode stored trips, starting empty: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let has_seen_onboarding = self
            .kv
            .get(ONBOARDING_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        // Zero, negative or garbage goals all resolve to the default
        let monthly_goal = self
            .kv
            .get(MONTHLY_GOAL_KEY)
            .and_then(|v| v.as_u64())
            .and_then(|goal| u32::try_from(goal).ok())
            .filter(|goal| *goal > 0)
            .unwrap_or(DEFAULT_MONTHLY_GOAL);

        let fish_species_list = match self.kv.get(SPECIES_KEY) {
            Some(value) => serde_json::from_value::<Vec<String>>(value).unwrap_or_else(|e| {
                warn!("Failed to decode stored species list, using defaults: {}", e);
                Preferences::default().fish_species_list
            }),
            None => Preferences::default().fish_species_list,
        };

        self.preferences = Preferences {
            has_seen_onboarding,
            monthly_goal,
            fish_species_list,
        };

        info!(
            "Loaded {} trips (monthly goal {}, onboarding seen: {})",
            self.trips.len(),
            self.preferences.monthly_goal,
            self.preferences.has_seen_onboarding
        );
    }

    /// Writes the full state to the key-value store, logging any failure
    pub fn persist(&mut self) {
        if let Err(e) = self.try_persist() {
            error!("Failed to persist journal state: {}", e);
        }
    }

    fn try_persist(&mut self) -> Result<()> {
        trace!("Persisting {} trips", self.trips.len());
        let mut entries: Vec<(&str, Value)> = Vec::with_capacity(4);

        // A trip list that fails to encode is skipped; the preferences are
        // still written
        match serde_json::to_value(&self.trips) {
            Ok(value) => entries.push((TRIPS_KEY, value)),
            Err(e) => error!("Failed to encode trips, keeping previous copy: {}", e),
        }

        entries.push((
            ONBOARDING_KEY,
            Value::Bool(self.preferences.has_seen_onboarding),
        ));
        entries.push((MONTHLY_GOAL_KEY, Value::from(self.preferences.monthly_goal)));
        entries.push((
            SPECIES_KEY,
            serde_json::to_value(&self.preferences.fish_species_list)?,
        ));

        self.kv.set_many(entries)
    }

    /// Registers a listener that is called after every persisted mutation
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        debug!("Registered store listener {:?}", id);
        id
    }

    /// Removes a listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    fn notify(&mut self, event: StoreEvent) {
        trace!("Notifying {} listeners of {:?}", self.listeners.len(), event);
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Appends a trip. Ids are not checked for uniqueness.
    pub fn add(&mut self, trip: Trip) {
        info!("Adding trip: {}", trip.id);
        let id = trip.id.clone();
        self.trips.push(trip);
        self.persist();
        self.notify(StoreEvent::TripAdded { id });
    }

    /// Replaces the first trip with the same id.
    ///
    /// Returns false (and writes nothing) when no trip has that id.
    pub fn update(&mut self, trip: Trip) -> bool {
        info!("Updating trip: {}", trip.id);
        match self.trips.iter().position(|t| t.id == trip.id) {
            Some(index) => {
                let id = trip.id.clone();
                self.trips[index] = trip;
                self.persist();
                self.notify(StoreEvent::TripUpdated { id });
                true
            }
            None => {
                debug!("No trip with id {}, update skipped", trip.id);
                false
            }
        }
    }

    /// Removes every trip carrying `trip`'s id and returns how many were removed
    pub fn delete(&mut self, trip: &Trip) -> usize {
        self.delete_by_id(&trip.id)
    }

    pub fn delete_by_id(&mut self, id: &str) -> usize {
        info!("Deleting trip: {}", id);
        let before = self.trips.len();
        self.trips.retain(|t| t.id != id);
        let removed = before - self.trips.len();
        debug!("Removed {} trips with id {}", removed, id);

        self.persist();
        self.notify(StoreEvent::TripsDeleted {
            id: id.to_string(),
            removed,
        });
        removed
    }

    /// Clears every trip, in memory and in the key-value store. Preferences
    /// are kept.
    pub fn reset_all(&mut self) {
        warn!("Resetting journal, dropping {} trips", self.trips.len());
        self.trips.clear();
        if let Err(e) = self.kv.remove(TRIPS_KEY) {
            error!("Failed to remove stored trips: {}", e);
        }
        self.persist();
        self.notify(StoreEvent::Reset);
    }

    pub fn mark_onboarding_seen(&mut self) {
        info!("Marking onboarding as seen");
        self.preferences.has_seen_onboarding = true;
        self.persist();
        self.notify(StoreEvent::PreferencesChanged);
    }

    /// Sets the monthly trip goal. Zero is rejected.
    pub fn set_monthly_goal(&mut self, goal: u32) -> Result<()> {
        if goal == 0 {
            return Err(JournalError::InvalidGoal { goal });
        }

        info!("Setting monthly goal to {}", goal);
        self.preferences.monthly_goal = goal;
        self.persist();
        self.notify(StoreEvent::PreferencesChanged);
        Ok(())
    }

    /// Adds a species to the suggestion list.
    ///
    /// Returns Ok(false) when a species with the same name (ignoring case)
    /// is already known.
    pub fn add_species(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(JournalError::InvalidSpecies {
                name: name.to_string(),
            });
        }

        let lowered = name.to_lowercase();
        if self
            .preferences
            .fish_species_list
            .iter()
            .any(|s| s.to_lowercase() == lowered)
        {
            debug!("Species {} already known", name);
            return Ok(false);
        }

        info!("Adding species: {}", name);
        self.preferences.fish_species_list.push(name.to_string());
        self.persist();
        self.notify(StoreEvent::PreferencesChanged);
        Ok(true)
    }

    /// Removes a species from the suggestion list; trips are not touched
    pub fn remove_species(&mut self, name: &str) -> bool {
        let before = self.preferences.fish_species_list.len();
        self.preferences.fish_species_list.retain(|s| s != name);
        if before == self.preferences.fish_species_list.len() {
            return false;
        }

        info!("Removed species: {}", name);
        self.persist();
        self.notify(StoreEvent::PreferencesChanged);
        true
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Gives access to the backing key-value store
    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn into_kv(self) -> S {
        self.kv
    }

    /// Retrieves a trip by its ID
    pub fn get(&self, id: &str) -> Option<&Trip> {
        self.trips.iter().find(|t| t.id == id)
    }

    /// Trips on the given calendar day, in no particular order
    pub fn trips_for_date(&self, date: NaiveDate) -> Vec<Trip> {
        self.trips
            .iter()
            .filter(|t| t.local_date(&self.offset) == date)
            .cloned()
            .collect()
    }

    /// Trips in the same calendar month and year as `reference`
    pub fn trips_for_month(&self, reference: NaiveDate) -> Vec<Trip> {
        self.trips
            .iter()
            .filter(|t| {
                let day = t.local_date(&self.offset);
                day.year() == reference.year() && day.month() == reference.month()
            })
            .cloned()
            .collect()
    }

    /// Case-insensitive text search over title, location and notes,
    /// optionally restricted to trips that caught `species`.
    ///
    /// Empty text and an empty or missing species filter do not restrict.
    pub fn search(&self, text: &str, species: Option<&str>) -> Vec<Trip> {
        let needle = text.to_lowercase();
        let species = species.filter(|s| !s.is_empty());
        debug!("Searching trips for '{}' (species: {:?})", text, species);

        self.trips
            .iter()
            .filter(|t| needle.is_empty() || t.matches_text(&needle))
            .filter(|t| species.map_or(true, |s| t.has_species(s)))
            .cloned()
            .collect()
    }

    /// Search results ordered newest first, as shown in the trip log
    pub fn log(&self, text: &str, species: Option<&str>) -> Vec<Trip> {
        let mut trips = self.search(text, species);
        trips.sort_by(|a, b| b.date.cmp(&a.date));
        trips
    }

    /// Count, total catch, mean bite score and best day for the month
    /// containing `reference`
    pub fn aggregate_month(&self, reference: NaiveDate) -> MonthStats {
        let trips = self.trips_for_month(reference);

        let total_catch: u64 = trips.iter().map(|t| t.catch_count as u64).sum();
        let average_bite_score = if trips.is_empty() {
            0.0
        } else {
            trips.iter().map(|t| t.bite_score as f64).sum::<f64>() / trips.len() as f64
        };

        // Keep the first trip among equal scores
        let best_day = trips
            .iter()
            .fold(None::<&Trip>, |best, trip| match best {
                Some(b) if b.bite_score >= trip.bite_score => Some(b),
                _ => Some(trip),
            })
            .cloned();

        MonthStats {
            trip_count: trips.len(),
            total_catch,
            average_bite_score,
            best_day,
        }
    }

    /// Trips logged in the month of `reference` against the monthly goal
    pub fn goal_progress(&self, reference: NaiveDate) -> GoalProgress {
        let completed = self.trips_for_month(reference).len();
        let goal = self.preferences.monthly_goal;
        let fraction = if goal == 0 {
            1.0
        } else {
            (completed as f64 / goal as f64).min(1.0)
        };

        GoalProgress {
            completed,
            goal,
            fraction,
        }
    }

    /// Calendar cells for the month of `reference`: one `None` per blank
    /// before the 1st (weeks start on Monday), then one cell per day
    pub fn month_grid(&self, reference: NaiveDate) -> Vec<Option<CalendarDay>> {
        let first = first_of_month(reference);
        let leading = first.weekday().num_days_from_monday() as usize;
        let month_trips = self.trips_for_month(first);

        let mut cells: Vec<Option<CalendarDay>> = vec![None; leading];
        for day in 0..days_in_month(first) {
            let date = first + Duration::days(day as i64);
            let trips = month_trips
                .iter()
                .filter(|t| t.local_date(&self.offset) == date)
                .cloned()
                .collect();
            cells.push(Some(CalendarDay { date, trips }));
        }

        cells
    }
}

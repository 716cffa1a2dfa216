//! CLI module for the icebite journal
//!
//! This module handles the command-line interface: it turns parsed commands
//! into calls on the trip store and renders the results.
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::Path,
    process::Command,
};

use chrono::{Datelike, NaiveDate};
use console::{style, StyledObject};
use log::{debug, info};
use shell_words::split;
use tempfile::Builder;

use crate::{
    helper, parse_species, BiteSeverity, CalendarDay, Commands, Config, JournalError,
    KeyValueStore, Result, Trip, TripFields, TripStore,
};

const WEEKDAY_LABELS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

/// Calendar cells show at most this many trip dots
const MAX_DAY_MARKERS: usize = 3;

/// CLI Application handler - processes CLI commands and interfaces with TripStore
pub struct App<S: KeyValueStore> {
    /// The trip store backend
    store: TripStore<S>,

    /// Application configuration
    config: Config,

    /// Whether to display verbose output
    verbose: bool,
}

impl<S: KeyValueStore> App<S> {
    /// Create a new CLI application with the given store and config
    pub fn new(store: TripStore<S>, config: Config, verbose: bool) -> Self {
        Self {
            store,
            config,
            verbose,
        }
    }

    pub fn store(&self) -> &TripStore<S> {
        &self.store
    }

    /// Prints the welcome text on the very first run and remembers that it
    /// has been shown. JSON output stays clean: the banner waits for the
    /// next command that prints for a person.
    pub fn show_onboarding_if_needed(&mut self, command: &Commands) {
        if self.store.preferences().has_seen_onboarding || command.wants_json() {
            return;
        }

        println!("{}", style("Welcome to icebite!").bold().cyan());
        println!();
        println!("  Log every trip:      icebite add -T \"Lake A\" --bite 4 --catch 3");
        println!("  See your month:      icebite calendar");
        println!("  Search the log:      icebite log perch --species Perch");
        println!("  Track your goal:     icebite stats   (goal: icebite goal --set 6)");
        println!();

        self.store.mark_onboarding_seen();
    }

    /// Run the CLI application with the given command
    pub fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Add(fields) => self.handle_add(fields)?,

            Commands::Edit { id, fields } => self.handle_edit(id, fields)?,

            Commands::Delete { id, force } => self.handle_delete(id, force)?,

            Commands::Show { id, json } => self.handle_show(&id, json)?,

            Commands::Day { date, json } => self.handle_day(date, json)?,

            Commands::Calendar { month } => self.handle_calendar(month)?,

            Commands::Log {
                query,
                species,
                limit,
                json,
            } => self.handle_log(query, species, limit, json)?,

            Commands::Stats { month } => self.handle_stats(month)?,

            Commands::Goal { set } => self.handle_goal(set)?,

            Commands::Species { add, remove } => self.handle_species(add, remove)?,

            Commands::Reset { force } => self.handle_reset(force)?,

            Commands::Config => self.handle_config()?,
        }

        Ok(())
    }

    fn today(&self) -> NaiveDate {
        helper::today(&self.store.offset())
    }

    fn day_or_today(&self, date: Option<String>) -> Result<NaiveDate> {
        match date {
            Some(d) => helper::parse_date(&d),
            None => Ok(self.today()),
        }
    }

    fn month_or_current(&self, month: Option<String>) -> Result<NaiveDate> {
        match month {
            Some(m) => helper::parse_month(&m),
            None => Ok(helper::first_of_month(self.today())),
        }
    }

    fn handle_add(&mut self, fields: TripFields) -> Result<()> {
        let date = self.day_or_today(fields.date.clone())?;
        let trip = Trip::new(helper::day_start(date, &self.store.offset()));
        let trip = self.apply_fields(trip, fields)?;

        let id = trip.id.clone();
        self.store.add(trip);
        println!("Trip logged with ID: {}", id);
        Ok(())
    }

    fn handle_edit(&mut self, id: String, fields: TripFields) -> Result<()> {
        let trip = match self.store.get(&id) {
            Some(trip) => trip.clone(),
            None => return Err(JournalError::TripNotFound { id }),
        };

        let trip = self.apply_fields(trip, fields)?;
        self.store.update(trip);
        println!("Trip {} updated successfully", id);
        Ok(())
    }

    /// Copies every provided field onto `trip`
    fn apply_fields(&self, mut trip: Trip, fields: TripFields) -> Result<Trip> {
        let offset = self.store.offset();

        if let Some(date) = fields.date {
            let date = helper::parse_date(&date)?;
            if date != trip.local_date(&offset) {
                trip.date = helper::day_start(date, &offset);
            }
        }
        let day = trip.local_date(&offset);

        if let Some(title) = fields.title {
            trip.title = title;
        }
        if let Some(location) = fields.location {
            trip.location = location;
        }

        if let Some(notes) = fields.notes {
            trip.notes = notes;
        } else if fields.edit {
            trip.notes = self.open_editor_for_notes(&trip.title, &trip.notes)?;
        }

        if let Some(bite) = fields.bite {
            trip.bite_score = bite;
        }
        if let Some(catch) = fields.catch {
            trip.catch_count = catch;
        }
        if fields.weight.is_some() {
            trip.total_weight = fields.weight;
        }
        if fields.species.is_some() {
            trip.fish_species = parse_species(fields.species);
        }
        if fields.temperature.is_some() {
            trip.temperature = fields.temperature;
        }
        if fields.pressure.is_some() {
            trip.pressure = fields.pressure;
        }
        if let Some(wind) = fields.wind {
            trip.wind = wind;
        }
        if let Some(cloud) = fields.cloud {
            trip.cloud = cloud;
        }
        if let Some(start) = fields.start {
            let time = helper::parse_time(&start)?;
            trip.start_time = Some(helper::local_instant(day, time, &offset));
        }
        if let Some(end) = fields.end {
            let time = helper::parse_time(&end)?;
            trip.end_time = Some(helper::local_instant(day, time, &offset));
        }

        Ok(trip)
    }

    fn open_editor_for_notes(&self, title: &str, existing_notes: &str) -> Result<String> {
        // Create a temporary file with .md extension
        let temp_file = Builder::new().suffix(".md").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        let mut file = OpenOptions::new().write(true).open(&temp_path)?;
        writeln!(file, "<!-- Notes for trip: {} -->", title)?;
        writeln!(
            file,
            "<!-- Lines starting with <!-- are ignored. Save and exit when done. -->"
        )?;
        write!(file, "{}", existing_notes)?;
        drop(file);

        let editor_cmd = self.config.get_editor_command();
        info!("Opening editor for trip notes: {}", editor_cmd);
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(self.process_editor_content(content))
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        let path_str = file_path.to_string_lossy();

        // Handle shell-like command parsing
        let args = split(editor_cmd).map_err(|e| JournalError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        if args.is_empty() {
            return Err(JournalError::EditorError {
                message: "Empty editor command".to_string(),
            });
        }

        let mut command = Command::new(&args[0]);
        command.args(&args[1..]);
        command.arg(path_str.as_ref());

        let status = command.status()?;
        if !status.success() {
            return Err(JournalError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }

    fn process_editor_content(&self, content: String) -> String {
        content
            .lines()
            .filter(|line| !line.trim_start().starts_with("<!--"))
            .collect::<Vec<&str>>()
            .join("\n")
            .trim()
            .to_string()
    }

    fn handle_delete(&mut self, id: String, force: bool) -> Result<()> {
        let trip = match self.store.get(&id) {
            Some(trip) => trip.clone(),
            None => return Err(JournalError::TripNotFound { id }),
        };

        if !force {
            println!("You are about to delete the following trip:");
            self.print_trip(&trip);
            println!("\nThis action cannot be undone!");
            if !confirm("Are you sure you want to delete this trip?")? {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        self.store.delete(&trip);
        println!("Trip '{}' ({}) has been deleted.", trip.title, trip.id);
        Ok(())
    }

    fn handle_show(&self, id: &str, json: bool) -> Result<()> {
        let trip = self
            .store
            .get(id)
            .ok_or_else(|| JournalError::TripNotFound { id: id.to_string() })?;

        if json {
            println!("{}", serde_json::to_string_pretty(trip)?);
        } else {
            self.print_trip(trip);
        }
        Ok(())
    }

    fn handle_day(&self, date: Option<String>, json: bool) -> Result<()> {
        let date = self.day_or_today(date)?;
        let mut trips = self.store.trips_for_date(date);
        trips.sort_by(|a, b| a.date.cmp(&b.date));

        if json {
            println!("{}", serde_json::to_string_pretty(&trips)?);
            return Ok(());
        }

        println!(
            "{}: {} trip{}",
            style(date.format("%A, %B %-d, %Y")).bold(),
            trips.len(),
            plural(trips.len())
        );
        for trip in &trips {
            println!();
            self.print_trip(trip);
        }
        Ok(())
    }

    fn handle_calendar(&self, month: Option<String>) -> Result<()> {
        let first = self.month_or_current(month)?;
        let today = self.today();
        let grid = self.store.month_grid(first);

        println!("{}", style(first.format("%B %Y")).bold());
        let header: Vec<String> = WEEKDAY_LABELS
            .iter()
            .map(|label| format!("{:>4}{}", label, " ".repeat(MAX_DAY_MARKERS)))
            .collect();
        println!("{}", header.join(""));

        for week in grid.chunks(7) {
            let line: Vec<String> = week
                .iter()
                .map(|cell| match cell {
                    Some(day) => render_day_cell(day, today),
                    None => " ".repeat(4 + MAX_DAY_MARKERS),
                })
                .collect();
            println!("{}", line.join(""));
        }

        let stats = self.store.aggregate_month(first);
        println!(
            "\n{} trip{} this month  {} good  {} medium  {} poor",
            stats.trip_count,
            plural(stats.trip_count),
            severity_marker(5),
            severity_marker(3),
            severity_marker(1)
        );
        Ok(())
    }

    fn handle_log(
        &self,
        query: Option<String>,
        species: Option<String>,
        limit: usize,
        json: bool,
    ) -> Result<()> {
        let query = query.unwrap_or_default();
        let mut trips = self.store.log(&query, species.as_deref());
        let total = trips.len();

        // 0 means no limit
        if limit > 0 && trips.len() > limit {
            trips.truncate(limit);
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&trips)?);
            return Ok(());
        }

        if trips.is_empty() {
            if self.store.trips().is_empty() {
                println!("No trips logged yet");
            } else {
                println!("No results found");
            }
            return Ok(());
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for trip in &trips {
            let line = format!(
                "{}  {:<5}  {}  {}",
                trip.local_date(&self.store.offset()).format("%Y-%m-%d"),
                bite_dots(trip.bite_score),
                trip.catch_count,
                display_title(trip)
            );
            println!("{}", truncate(&line, term_width));
            if self.verbose {
                println!("            {}", style(&trip.id).dim());
            }
        }

        if trips.len() < total {
            println!(
                "\nShowing {} of {} trips. Use --limit to show more.",
                trips.len(),
                total
            );
        } else {
            println!("\nFound {} trip{}", total, plural(total));
        }
        Ok(())
    }

    fn handle_stats(&self, month: Option<String>) -> Result<()> {
        let first = self.month_or_current(month)?;
        let stats = self.store.aggregate_month(first);
        let progress = self.store.goal_progress(first);

        println!("{}", style(first.format("%B %Y")).bold());
        println!("  Trips:        {}", stats.trip_count);
        println!("  Total catch:  {}", stats.total_catch);
        println!("  Avg bite:     {:.1}", stats.average_bite_score);
        println!("  Goal:         {}/{}", progress.completed, progress.goal);

        if let Some(best) = &stats.best_day {
            println!(
                "  Best day:     {} {} ({})",
                best.local_date(&self.store.offset()).format("%b %-d"),
                display_title(best),
                severity_marker(best.bite_score)
            );
        }

        let filled = (progress.fraction * 20.0).round() as usize;
        println!(
            "\n  [{}{}] {} of {} trips completed",
            style("#".repeat(filled)).cyan(),
            "-".repeat(20 - filled),
            progress.completed,
            progress.goal
        );
        if progress.is_met() {
            println!("  {}", style("Monthly goal reached!").green());
        }
        Ok(())
    }

    fn handle_goal(&mut self, set: Option<u32>) -> Result<()> {
        if let Some(goal) = set {
            self.store.set_monthly_goal(goal)?;
        }
        println!(
            "Monthly goal: {} trips per month",
            self.store.preferences().monthly_goal
        );
        Ok(())
    }

    fn handle_species(&mut self, add: Option<String>, remove: Option<String>) -> Result<()> {
        if let Some(name) = add {
            if !self.store.add_species(&name)? {
                println!("'{}' is already in the species list", name.trim());
            }
        }
        if let Some(name) = remove {
            if !self.store.remove_species(&name) {
                println!("'{}' is not in the species list", name);
            }
        }

        for species in &self.store.preferences().fish_species_list {
            println!("  {}", species);
        }
        Ok(())
    }

    fn handle_reset(&mut self, force: bool) -> Result<()> {
        if !force {
            println!(
                "This deletes all {} logged trips. Preferences are kept.",
                self.store.trips().len()
            );
            if !confirm("Are you sure you want to reset the journal?")? {
                println!("Reset cancelled.");
                return Ok(());
            }
        }

        self.store.reset_all();
        println!("All trips have been deleted.");
        Ok(())
    }

    fn handle_config(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&self.config)?);
        println!("Journal file: {}", self.config.store_path().display());
        println!(
            "Calendar offset: UTC{}",
            self.store.offset()
        );
        Ok(())
    }

    fn print_trip(&self, trip: &Trip) {
        let offset = self.store.offset();
        println!("ID:       {}", trip.id);
        println!("Title:    {}", style(display_title(trip)).bold());
        println!("Date:     {}", trip.local_date(&offset).format("%Y-%m-%d"));
        if !trip.location.is_empty() {
            println!("Location: {}", trip.location);
        }
        if let (Some(start), Some(end)) = (trip.start_time, trip.end_time) {
            let start = start.with_timezone(&offset).format("%H:%M");
            let end = end.with_timezone(&offset).format("%H:%M");
            match trip.duration() {
                Some(d) => println!(
                    "Time:     {}-{} ({}h {:02}m)",
                    start,
                    end,
                    d.num_hours(),
                    d.num_minutes() % 60
                ),
                None => println!("Time:     {}-{}", start, end),
            }
        }
        println!(
            "Bite:     {} {}",
            bite_dots(trip.bite_score),
            severity_marker(trip.bite_score)
        );
        match trip.total_weight {
            Some(weight) => println!("Catch:    {} ({:.2} kg)", trip.catch_count, weight),
            None => println!("Catch:    {}", trip.catch_count),
        }
        if !trip.fish_species.is_empty() {
            println!("Species:  {}", style(trip.fish_species.join(", ")).cyan());
        }

        let mut conditions = vec![format!("wind {}", trip.wind), format!("cloud {}", trip.cloud)];
        if let Some(t) = trip.temperature {
            conditions.push(format!("{:.1}°", t));
        }
        if let Some(p) = trip.pressure {
            conditions.push(format!("{:.0} hPa", p));
        }
        println!("Weather:  {}", conditions.join(", "));

        if !trip.notes.is_empty() {
            println!("\n{}", trip.notes);
        }
        debug!("Printed trip {}", trip.id);
    }
}

/// Asks a yes/no question on stdin; anything but "y"/"yes" is a no
fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    stdout().flush().map_err(JournalError::Io)?;

    let mut input = String::new();
    stdin().read_line(&mut input).map_err(JournalError::Io)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn display_title(trip: &Trip) -> &str {
    if trip.title.is_empty() {
        "(untitled)"
    } else {
        &trip.title
    }
}

/// Colored dot for the severity bucket of a bite score
fn severity_marker(score: i32) -> StyledObject<&'static str> {
    match BiteSeverity::from_score(score) {
        BiteSeverity::Good => style("●").green(),
        BiteSeverity::Medium => style("●").cyan(),
        BiteSeverity::Poor => style("●").red(),
    }
}

/// Five-slot bar with one filled slot per bite point
fn bite_dots(score: i32) -> String {
    let filled = score.clamp(0, 5) as usize;
    format!("{}{}", "●".repeat(filled), "○".repeat(5 - filled))
}

/// One dot per trip in trip order, each colored by its own bite score,
/// padded to `MAX_DAY_MARKERS` columns
fn day_markers(day: &CalendarDay) -> String {
    let shown = day.trips.len().min(MAX_DAY_MARKERS);
    let dots: String = day
        .trips
        .iter()
        .take(shown)
        .map(|trip| severity_marker(trip.bite_score).to_string())
        .collect();
    format!("{}{}", dots, " ".repeat(MAX_DAY_MARKERS - shown))
}

/// Day number followed by the day's trip markers
fn render_day_cell(day: &CalendarDay, today: NaiveDate) -> String {
    let number = format!("{:>4}", day.date.day());
    let number = if day.date == today {
        style(number).bold().underlined().to_string()
    } else {
        number
    };
    format!("{}{}", number, day_markers(day))
}

fn truncate(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        line.to_string()
    } else {
        let cut: String = line.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

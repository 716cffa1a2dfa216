//! The trip record and its small closed enumerations.
//!
//! The serialized shape (camelCase keys, `"Low"`/`"Clear"` style enum values,
//! omitted optionals) is the on-disk format of the `trips` key.
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bite score given to a freshly created trip.
pub const DEFAULT_BITE_SCORE: i32 = 3;

/// Wind strength observed during a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum WindLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Cloud cover observed during a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum CloudLevel {
    Clear,
    #[default]
    Normal,
    Overcast,
}

impl fmt::Display for WindLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WindLevel::Low => "Low",
            WindLevel::Medium => "Medium",
            WindLevel::High => "High",
        };
        f.write_str(label)
    }
}

impl fmt::Display for CloudLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CloudLevel::Clear => "Clear",
            CloudLevel::Normal => "Normal",
            CloudLevel::Overcast => "Overcast",
        };
        f.write_str(label)
    }
}

/// Display bucket for a bite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiteSeverity {
    /// Scores 4 and 5
    Good,
    /// Scores 2 and 3
    Medium,
    /// Everything else, including out-of-range scores
    Poor,
}

impl BiteSeverity {
    pub fn from_score(score: i32) -> Self {
        match score {
            4..=5 => BiteSeverity::Good,
            2..=3 => BiteSeverity::Medium,
            _ => BiteSeverity::Poor,
        }
    }
}

/// Represents a single logged fishing trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Unique identifier, assigned at creation and never changed
    pub id: String,
    /// When the trip took place; grouping only looks at the calendar day
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
    /// Subjective 1-5 rating of how active the fish were
    #[serde(default = "default_bite_score")]
    pub bite_score: i32,
    #[serde(default)]
    pub catch_count: u32,
    /// Total weight of the catch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_weight: Option<f64>,
    #[serde(default)]
    pub fish_species: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub wind: WindLevel,
    #[serde(default)]
    pub cloud: CloudLevel,
}

fn default_bite_score() -> i32 {
    DEFAULT_BITE_SCORE
}

impl Trip {
    /// Creates a new trip on the given date with a fresh id and default conditions
    pub fn new(date: DateTime<Utc>) -> Self {
        Trip {
            id: Uuid::new_v4().to_string(),
            date,
            title: String::new(),
            start_time: None,
            end_time: None,
            location: String::new(),
            notes: String::new(),
            bite_score: DEFAULT_BITE_SCORE,
            catch_count: 0,
            total_weight: None,
            fish_species: Vec::new(),
            temperature: None,
            pressure: None,
            wind: WindLevel::default(),
            cloud: CloudLevel::default(),
        }
    }

    /// Severity bucket of this trip's bite score
    pub fn severity(&self) -> BiteSeverity {
        BiteSeverity::from_score(self.bite_score)
    }

    /// Calendar day of the trip as seen from `offset`
    pub fn local_date(&self, offset: &FixedOffset) -> NaiveDate {
        self.date.with_timezone(offset).date_naive()
    }

    /// Time spent on the water, when both ends were recorded and make sense
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end >= start => Some(end - start),
            _ => None,
        }
    }

    pub fn has_species(&self, species: &str) -> bool {
        self.fish_species.iter().any(|s| s == species)
    }

    /// Case-insensitive substring match over title, location and notes.
    /// `needle` must already be lowercased.
    pub(crate) fn matches_text(&self, needle: &str) -> bool {
        [&self.title, &self.location, &self.notes]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 6, 30, 0).unwrap()
    }

    #[test]
    fn test_new_trip_defaults() {
        let trip = Trip::new(sample_date());
        assert!(Uuid::parse_str(&trip.id).is_ok());
        assert_eq!(trip.bite_score, 3);
        assert_eq!(trip.catch_count, 0);
        assert_eq!(trip.wind, WindLevel::Low);
        assert_eq!(trip.cloud, CloudLevel::Normal);
        assert!(trip.title.is_empty());
        assert!(trip.fish_species.is_empty());
        assert_ne!(trip.id, Trip::new(sample_date()).id);
    }

    #[test]
    fn test_severity_buckets() {
        assert_eq!(BiteSeverity::from_score(5), BiteSeverity::Good);
        assert_eq!(BiteSeverity::from_score(4), BiteSeverity::Good);
        assert_eq!(BiteSeverity::from_score(3), BiteSeverity::Medium);
        assert_eq!(BiteSeverity::from_score(2), BiteSeverity::Medium);
        assert_eq!(BiteSeverity::from_score(1), BiteSeverity::Poor);
        assert_eq!(BiteSeverity::from_score(0), BiteSeverity::Poor);
        assert_eq!(BiteSeverity::from_score(9), BiteSeverity::Poor);
        assert_eq!(BiteSeverity::from_score(-2), BiteSeverity::Poor);
    }

    #[test]
    fn test_serialized_shape() {
        let trip = Trip {
            title: "Lake A".to_string(),
            total_weight: Some(2.5),
            wind: WindLevel::High,
            cloud: CloudLevel::Overcast,
            fish_species: vec!["Pike".to_string()],
            ..Trip::new(sample_date())
        };

        let value = serde_json::to_value(&trip).unwrap();
        assert_eq!(value["title"], "Lake A");
        assert_eq!(value["biteScore"], 3);
        assert_eq!(value["catchCount"], 0);
        assert_eq!(value["totalWeight"], 2.5);
        assert_eq!(value["fishSpecies"][0], "Pike");
        assert_eq!(value["wind"], "High");
        assert_eq!(value["cloud"], "Overcast");
        assert!(value.get("temperature").is_none());
        assert!(value.get("startTime").is_none());
    }

    #[test]
    fn test_deserialize_with_nulls_and_missing_fields() {
        let json = r#"{
            "id": "6c1e4d0a-0000-4000-8000-000000000001",
            "date": "2024-01-05T06:30:00Z",
            "title": "Ice hole",
            "temperature": null,
            "wind": "Medium",
            "cloud": "Clear"
        }"#;

        let trip: Trip = serde_json::from_str(json).unwrap();
        assert_eq!(trip.title, "Ice hole");
        assert_eq!(trip.temperature, None);
        assert_eq!(trip.bite_score, DEFAULT_BITE_SCORE);
        assert_eq!(trip.wind, WindLevel::Medium);
        assert_eq!(trip.cloud, CloudLevel::Clear);
        assert_eq!(trip.date, sample_date());
    }

    #[test]
    fn test_unknown_wind_value_is_rejected() {
        let json = r#"{"id": "x", "date": "2024-01-05T06:30:00Z", "wind": "Gale"}"#;
        assert!(serde_json::from_str::<Trip>(json).is_err());
    }

    #[test]
    fn test_duration() {
        let start = sample_date();
        let mut trip = Trip::new(start);
        assert!(trip.duration().is_none());

        trip.start_time = Some(start);
        trip.end_time = Some(start + Duration::minutes(90));
        assert_eq!(trip.duration(), Some(Duration::minutes(90)));

        trip.end_time = Some(start - Duration::minutes(1));
        assert!(trip.duration().is_none());
    }

    #[test]
    fn test_local_date_respects_offset() {
        let trip = Trip::new(Utc.with_ymd_and_hms(2024, 1, 5, 23, 30, 0).unwrap());
        let utc = FixedOffset::east_opt(0).unwrap();
        let helsinki = FixedOffset::east_opt(2 * 3600).unwrap();

        assert_eq!(trip.local_date(&utc), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(
            trip.local_date(&helsinki),
            NaiveDate::from_ymd_opt(2024, 1, 6).unwrap()
        );
    }

    #[test]
    fn test_matches_text_is_case_insensitive() {
        let trip = Trip {
            title: "Morning on Lake Ladoga".to_string(),
            location: "North Bay".to_string(),
            notes: "Perch near the reeds".to_string(),
            ..Trip::new(sample_date())
        };

        assert!(trip.matches_text("ladoga"));
        assert!(trip.matches_text("north"));
        assert!(trip.matches_text("reeds"));
        assert!(!trip.matches_text("pike"));
    }
}

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use icebite::{
    CloudLevel, FileKeyValueStore, KeyValueStore, Trip, TripStore, WindLevel, MONTHLY_GOAL_KEY,
    TRIPS_KEY,
};
use serde_json::json;
use tempfile::tempdir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_trips_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("journal.json");

    let lake_a = Trip {
        title: "Lake A".to_string(),
        location: "North shore".to_string(),
        bite_score: 5,
        catch_count: 3,
        total_weight: Some(1.75),
        fish_species: vec!["Perch".to_string()],
        temperature: Some(-8.0),
        wind: WindLevel::Medium,
        cloud: CloudLevel::Clear,
        ..Trip::new(Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap())
    };
    let lake_b = Trip {
        title: "Lake B".to_string(),
        bite_score: 2,
        catch_count: 1,
        ..Trip::new(Utc.with_ymd_and_hms(2024, 1, 5, 14, 0, 0).unwrap())
    };

    {
        let mut store = TripStore::new(FileKeyValueStore::open(&path).unwrap());
        store.add(lake_a.clone());
        store.add(lake_b.clone());
        store.set_monthly_goal(8).unwrap();
        store.mark_onboarding_seen();
    }

    let store = TripStore::new(FileKeyValueStore::open(&path).unwrap());
    assert_eq!(store.trips(), &[lake_a.clone(), lake_b]);
    assert_eq!(store.preferences().monthly_goal, 8);
    assert!(store.preferences().has_seen_onboarding);

    let stats = store.aggregate_month(ymd(2024, 1, 1));
    assert_eq!(stats.trip_count, 2);
    assert_eq!(stats.total_catch, 4);
    assert_eq!(stats.average_bite_score, 3.5);
    assert_eq!(stats.best_day, Some(lake_a));
}

#[test]
fn test_on_disk_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("journal.json");

    let mut store = TripStore::new(FileKeyValueStore::open(&path).unwrap());
    store.add(Trip {
        title: "Ice".to_string(),
        ..Trip::new(Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap())
    });

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["monthlyGoal"], json!(4));
    assert_eq!(raw["hasSeenOnboarding"], json!(false));
    assert_eq!(raw["trips"][0]["title"], json!("Ice"));
    assert_eq!(raw["trips"][0]["wind"], json!("Low"));
    assert_eq!(raw["trips"][0]["cloud"], json!("Normal"));
    assert_eq!(raw["trips"][0]["biteScore"], json!(3));
    assert!(raw["trips"][0].get("totalWeight").is_none());
}

#[test]
fn test_corrupt_trips_and_zero_goal_fall_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("journal.json");

    {
        let mut kv = FileKeyValueStore::open(&path).unwrap();
        kv.set(TRIPS_KEY, json!([{"id": 42}])).unwrap();
        kv.set(MONTHLY_GOAL_KEY, json!(0)).unwrap();
    }

    let store = TripStore::new(FileKeyValueStore::open(&path).unwrap());
    assert!(store.trips().is_empty());
    assert_eq!(store.preferences().monthly_goal, 4);
}

#[test]
fn test_reset_is_durable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("journal.json");
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();

    {
        let mut store = TripStore::with_offset(FileKeyValueStore::open(&path).unwrap(), offset);
        store.add(Trip::new(Utc.with_ymd_and_hms(2024, 3, 3, 9, 0, 0).unwrap()));
        store.set_monthly_goal(5).unwrap();
        store.reset_all();
    }

    let store = TripStore::with_offset(FileKeyValueStore::open(&path).unwrap(), offset);
    assert!(store.trips().is_empty());
    assert!(store.trips_for_date(ymd(2024, 3, 3)).is_empty());
    assert_eq!(store.preferences().monthly_goal, 5);
}

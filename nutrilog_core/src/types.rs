//! Core domain types for the Nutrilog food tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Food items and log entries
//! - Macro goals and aggregation totals
//! - User profiles and questionnaire answers
//! - Weekly statistics

use chrono::{Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Profile Enums
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
}

/// Direction the user wants their weight to move
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Lose,
    Maintain,
    Gain,
}

/// How aggressively to pursue a lose/gain goal
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Mild,
    Moderate,
    Aggressive,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DietaryPreference {
    Omnivore,
    Vegetarian,
    Vegan,
    GlutenFree,
    Keto,
}

// ============================================================================
// Food and Log Types
// ============================================================================

/// A food candidate produced by image recognition or text search.
///
/// Ephemeral: the user confirms one before it becomes a `LogEntry`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub name: String,
    pub portion: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// A logged meal. Immutable once created; identity is `id`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub name: String,
    pub portion: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl LogEntry {
    /// Create a new entry from a confirmed food candidate
    pub fn from_food(item: &FoodItem, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: item.name.clone(),
            portion: item.portion.clone(),
            calories: item.calories,
            protein: item.protein,
            carbs: item.carbs,
            fat: item.fat,
            timestamp,
        }
    }

    /// Local calendar date this entry falls on
    ///
    /// Returns None for timestamps that are not representable in the local
    /// timezone (such entries never match any day filter).
    pub fn local_date(&self) -> Option<NaiveDate> {
        Local
            .timestamp_millis_opt(self.timestamp)
            .single()
            .map(|dt| dt.date_naive())
    }
}

// ============================================================================
// Goals and Totals
// ============================================================================

/// Daily macro targets in kcal and grams
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MacroGoals {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

/// Summed macros over a set of log entries
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTotals {
    /// Fold one entry into the running totals
    pub fn add_entry(&mut self, entry: &LogEntry) {
        self.calories += entry.calories;
        self.protein += entry.protein;
        self.carbs += entry.carbs;
        self.fat += entry.fat;
    }
}

// ============================================================================
// Profile Types
// ============================================================================

/// A user's persisted profile. One per user id, created via onboarding.
///
/// `bmi` is derived from weight/height and is recomputed whenever either
/// changes; it is never edited directly.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub gender: Gender,
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub dietary_preference: DietaryPreference,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    #[serde(default)]
    pub intensity: Option<Intensity>,
    pub macro_goals: MacroGoals,
    pub bmi: f64,
    /// Epoch milliseconds of the last profile write
    pub timestamp: i64,
}

/// Completed (or partially completed) onboarding questionnaire.
///
/// Every field is optional; the goal calculator falls back to fixed default
/// goals when a required field is absent.
#[derive(Clone, Debug, Default)]
pub struct QuizAnswers {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub dietary_preference: Option<DietaryPreference>,
    pub activity_level: Option<ActivityLevel>,
    pub goal: Option<Goal>,
    pub intensity: Option<Intensity>,
}

/// Partial profile update applied by `Store::update_profile`
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub dietary_preference: Option<DietaryPreference>,
    pub activity_level: Option<ActivityLevel>,
    pub goal: Option<Goal>,
    pub intensity: Option<Intensity>,
    pub macro_goals: Option<MacroGoals>,
}

// ============================================================================
// Weekly Statistics
// ============================================================================

/// Totals for a single calendar day, labelled for chart axes
#[derive(Clone, Debug, PartialEq)]
pub struct DailyStats {
    pub date: NaiveDate,
    /// Short weekday label ("Sun", "Mon", ...)
    pub label: String,
    pub totals: MacroTotals,
}

/// Summary over a 7-day breakdown
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeeklySummary {
    pub total_calories: f64,
    /// Rounded average over days that have logs (see `weekly_summary`)
    pub avg_calories: f64,
    pub days_logged: usize,
}

/// Percentage share of each macro's calories within a day
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MacroSplit {
    pub protein_pct: f64,
    pub carbs_pct: f64,
    pub fat_pct: f64,
}

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_log_entry_from_food_copies_macros() {
        let food = FoodItem {
            name: "Banana".into(),
            portion: "1 medium".into(),
            calories: 105.0,
            protein: 1.3,
            carbs: 27.0,
            fat: 0.4,
        };

        let entry = LogEntry::from_food(&food, 1_700_000_000_000);
        assert_eq!(entry.name, "Banana");
        assert_eq!(entry.calories, 105.0);
        assert_eq!(entry.timestamp, 1_700_000_000_000);
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn test_log_entry_ids_are_unique() {
        let food = FoodItem {
            name: "Apple".into(),
            portion: "1 medium".into(),
            calories: 95.0,
            protein: 0.5,
            carbs: 25.0,
            fat: 0.3,
        };

        let a = LogEntry::from_food(&food, 0);
        let b = LogEntry::from_food(&food, 0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_local_date_matches_construction_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let ts = Local
            .from_local_datetime(&date.and_hms_opt(13, 30, 0).unwrap())
            .single()
            .unwrap()
            .timestamp_millis();

        let entry = LogEntry {
            id: "e1".into(),
            name: "Lunch".into(),
            portion: "1 plate".into(),
            calories: 600.0,
            protein: 30.0,
            carbs: 60.0,
            fat: 20.0,
            timestamp: ts,
        };

        assert_eq!(entry.local_date(), Some(date));
    }

    #[test]
    fn test_profile_serde_roundtrip() {
        let profile = UserProfile {
            name: Some("Sam".into()),
            gender: Gender::Female,
            age: 28,
            weight_kg: 62.0,
            height_cm: 168.0,
            dietary_preference: DietaryPreference::Vegan,
            activity_level: ActivityLevel::Moderate,
            goal: Goal::Maintain,
            intensity: None,
            macro_goals: MacroGoals {
                calories: 2000,
                protein: 150,
                carbs: 250,
                fat: 65,
            },
            bmi: 22.0,
            timestamp: 1_700_000_000_000,
        };

        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"gender\":\"female\""));
        assert!(json.contains("\"dietary_preference\":\"vegan\""));

        let parsed: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }
}

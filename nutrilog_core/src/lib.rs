#![forbid(unsafe_code)]

//! Core domain model and business logic for the Nutrilog food tracker.
//!
//! This crate provides:
//! - Domain types (food items, log entries, profiles, goals)
//! - Goal calculation from biometric questionnaire answers
//! - Daily/weekly log aggregation
//! - Persistence (per-user JSON store with change notification)
//! - AI provider interface (live Gemini client and offline mock)

pub mod types;
pub mod error;
pub mod goals;
pub mod aggregate;
pub mod store;
pub mod ai;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{AiProvider, Config};
pub use goals::{compute_bmi, compute_goals, suggest_goal_from_bmi, DEFAULT_GOALS};
pub use aggregate::{
    crosses_goal, filter_by_day, macro_distribution, start_of_week, sum_macros,
    weekly_breakdown, weekly_summary,
};
pub use store::{JsonStore, Store, Subscription};
pub use ai::{GeminiClient, MockProvider, NutritionAi};

//! Daily and weekly log aggregation.
//!
//! Pure, read-only reductions over a snapshot of the log collection:
//! per-day filtering, macro totals, the 7-day breakdown used by chart
//! views, and the edge-triggered goal-crossing predicate used when new
//! food is logged. Nothing here mutates the input.

use crate::{DailyStats, LogEntry, MacroSplit, MacroTotals, WeeklySummary};
use chrono::{Datelike, Duration, NaiveDate};

/// Entries whose timestamp falls on the given local calendar day
///
/// Comparison is by calendar-date components, not a 24-hour window, so an
/// entry logged just after midnight belongs to the new day.
pub fn filter_by_day(entries: &[LogEntry], day: NaiveDate) -> impl Iterator<Item = &LogEntry> {
    entries.iter().filter(move |e| e.local_date() == Some(day))
}

/// Sum macros over a sequence of entries. Empty input yields all zeros.
pub fn sum_macros<'a, I>(entries: I) -> MacroTotals
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    entries.into_iter().fold(MacroTotals::default(), |mut acc, entry| {
        acc.add_entry(entry);
        acc
    })
}

/// The Sunday on or before the given date
pub fn start_of_week(anchor: NaiveDate) -> NaiveDate {
    anchor - Duration::days(i64::from(anchor.weekday().num_days_from_sunday()))
}

/// Per-day stats for the week containing `anchor`
///
/// Always returns exactly 7 days starting on Sunday; days without entries
/// yield all-zero stats rather than being omitted.
pub fn weekly_breakdown(entries: &[LogEntry], anchor: NaiveDate) -> Vec<DailyStats> {
    let start = start_of_week(anchor);

    (0..7)
        .map(|offset| {
            let date = start + Duration::days(offset);
            DailyStats {
                date,
                label: date.format("%a").to_string(),
                totals: sum_macros(filter_by_day(entries, date)),
            }
        })
        .collect()
}

/// Summarize a 7-day breakdown
///
/// `avg_calories` divides by the number of days with logs, floored at one
/// day so an empty week averages to 0 instead of dividing by zero. The
/// floor is a product decision carried over unchanged.
pub fn weekly_summary(days: &[DailyStats]) -> WeeklySummary {
    let total_calories: f64 = days.iter().map(|d| d.totals.calories).sum();
    let days_logged = days.iter().filter(|d| d.totals.calories > 0.0).count();
    let avg_calories = (total_calories / days_logged.max(1) as f64).round();

    WeeklySummary {
        total_calories,
        avg_calories,
        days_logged,
    }
}

/// Percentage share of each macro's calories within a day's totals
///
/// Grams convert at 4/4/9 kcal per gram. A day with no macros yields an
/// all-zero split rather than a fabricated default distribution.
pub fn macro_distribution(totals: &MacroTotals) -> MacroSplit {
    let protein_cal = totals.protein * 4.0;
    let carbs_cal = totals.carbs * 4.0;
    let fat_cal = totals.fat * 9.0;
    let total_macro_cal = protein_cal + carbs_cal + fat_cal;

    if total_macro_cal == 0.0 {
        return MacroSplit::default();
    }

    MacroSplit {
        protein_pct: protein_cal / total_macro_cal * 100.0,
        carbs_pct: carbs_cal / total_macro_cal * 100.0,
        fat_pct: fat_cal / total_macro_cal * 100.0,
    }
}

/// Edge-triggered goal-crossing predicate
///
/// True only on the transition from under-goal to at/over-goal. Additions
/// made while already over the goal do not fire again.
pub fn crosses_goal(current_total: f64, new_amount: f64, goal: f64) -> bool {
    current_total < goal && current_total + new_amount >= goal
}

//! Goal calculation from biometric questionnaire answers.
//!
//! This module converts a user's answers (age, weight, height, activity
//! level, goal direction) into daily calorie and macro-gram targets using
//! the Mifflin-St Jeor BMR estimate. All functions here are pure and total:
//! incomplete answers produce a fixed default rather than an error.

use crate::{ActivityLevel, DietaryPreference, Gender, Goal, Intensity, MacroGoals, QuizAnswers};

/// Fallback goals used when required questionnaire fields are absent
pub const DEFAULT_GOALS: MacroGoals = MacroGoals {
    calories: 2000,
    protein: 150,
    carbs: 250,
    fat: 65,
};

/// Calorie floor applied after goal adjustment
const CALORIE_FLOOR: f64 = 1200.0;

// kcal per gram. Fixed, not configurable.
const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

/// Compute daily macro goals from questionnaire answers
///
/// Required fields are age, weight, height, activity level and goal; if any
/// is absent the fixed `DEFAULT_GOALS` value is returned. Gender only shifts
/// the BMR constant (absent gender takes the male branch) and intensity only
/// applies to lose/gain goals.
pub fn compute_goals(answers: &QuizAnswers) -> MacroGoals {
    let (Some(age), Some(weight), Some(height), Some(activity), Some(goal)) = (
        answers.age,
        answers.weight_kg,
        answers.height_cm,
        answers.activity_level,
        answers.goal,
    ) else {
        tracing::debug!("Incomplete questionnaire, using default goals");
        return DEFAULT_GOALS;
    };

    // Mifflin-St Jeor
    let gender_term = match answers.gender {
        Some(Gender::Female) => -161.0,
        _ => 5.0,
    };
    let bmr = 10.0 * weight + 6.25 * height - 5.0 * f64::from(age) + gender_term;

    let mut calories = (bmr * activity_multiplier(activity)).round();

    let adjustment = intensity_adjustment(answers.intensity);
    match goal {
        Goal::Lose => calories -= adjustment,
        Goal::Gain => calories += adjustment,
        Goal::Maintain => {}
    }

    let calories = calories.max(CALORIE_FLOOR);

    let (protein_ratio, carbs_ratio, fat_ratio) = macro_ratios(answers.dietary_preference);

    MacroGoals {
        calories: calories as u32,
        protein: (calories * protein_ratio / KCAL_PER_G_PROTEIN).round() as u32,
        carbs: (calories * carbs_ratio / KCAL_PER_G_CARBS).round() as u32,
        fat: (calories * fat_ratio / KCAL_PER_G_FAT).round() as u32,
    }
}

/// Body Mass Index, rounded to one decimal place
pub fn compute_bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    (weight_kg / (height_m * height_m) * 10.0).round() / 10.0
}

/// Suggest a goal direction from BMI
///
/// The suggestion pre-fills the questionnaire but never overrides an
/// explicit user choice.
pub fn suggest_goal_from_bmi(bmi: f64) -> Goal {
    if bmi < 18.5 {
        Goal::Gain
    } else if bmi < 25.0 {
        Goal::Maintain
    } else {
        Goal::Lose
    }
}

fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::Active => 1.725,
    }
}

/// Daily kcal deficit/surplus for a lose/gain goal
fn intensity_adjustment(intensity: Option<Intensity>) -> f64 {
    match intensity {
        Some(Intensity::Mild) => 250.0,
        Some(Intensity::Moderate) => 500.0,
        Some(Intensity::Aggressive) => 750.0,
        None => 0.0,
    }
}

/// Macro calorie ratios (protein, carbs, fat) for a dietary preference
fn macro_ratios(preference: Option<DietaryPreference>) -> (f64, f64, f64) {
    match preference {
        Some(DietaryPreference::Keto) => (0.25, 0.05, 0.70),
        Some(DietaryPreference::Vegan) => (0.25, 0.50, 0.25),
        _ => (0.30, 0.40, 0.30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_answers() -> QuizAnswers {
        QuizAnswers {
            gender: Some(Gender::Male),
            age: Some(30),
            weight_kg: Some(70.0),
            height_cm: Some(175.0),
            activity_level: Some(ActivityLevel::Sedentary),
            goal: Some(Goal::Maintain),
            ..QuizAnswers::default()
        }
    }

    #[test]
    fn test_missing_required_field_returns_default() {
        let cases = [
            QuizAnswers {
                age: None,
                ..complete_answers()
            },
            QuizAnswers {
                weight_kg: None,
                ..complete_answers()
            },
            QuizAnswers {
                height_cm: None,
                ..complete_answers()
            },
            QuizAnswers {
                activity_level: None,
                ..complete_answers()
            },
            QuizAnswers {
                goal: None,
                ..complete_answers()
            },
            QuizAnswers::default(),
        ];

        for answers in cases {
            assert_eq!(compute_goals(&answers), DEFAULT_GOALS);
        }
    }

    #[test]
    fn test_reference_maintain_calculation() {
        // BMR = 10*70 + 6.25*175 - 5*30 + 5 = 1648.75
        // calories = round(1648.75 * 1.2) = 1979
        let goals = compute_goals(&complete_answers());
        assert_eq!(goals.calories, 1979);
        assert_eq!(goals.protein, 148);
        assert_eq!(goals.carbs, 198);
        assert_eq!(goals.fat, 66);
    }

    #[test]
    fn test_female_gender_term() {
        let answers = QuizAnswers {
            gender: Some(Gender::Female),
            ..complete_answers()
        };
        // BMR = 1648.75 - 166 = 1482.75; round(1482.75 * 1.2) = 1779
        assert_eq!(compute_goals(&answers).calories, 1779);
    }

    #[test]
    fn test_absent_gender_takes_male_branch() {
        let answers = QuizAnswers {
            gender: None,
            ..complete_answers()
        };
        assert_eq!(compute_goals(&answers).calories, 1979);
    }

    #[test]
    fn test_lose_goal_subtracts_intensity() {
        let answers = QuizAnswers {
            goal: Some(Goal::Lose),
            intensity: Some(Intensity::Moderate),
            ..complete_answers()
        };
        assert_eq!(compute_goals(&answers).calories, 1979 - 500);
    }

    #[test]
    fn test_gain_goal_adds_intensity() {
        let answers = QuizAnswers {
            goal: Some(Goal::Gain),
            intensity: Some(Intensity::Mild),
            ..complete_answers()
        };
        assert_eq!(compute_goals(&answers).calories, 1979 + 250);
    }

    #[test]
    fn test_maintain_ignores_intensity() {
        let answers = QuizAnswers {
            intensity: Some(Intensity::Aggressive),
            ..complete_answers()
        };
        assert_eq!(compute_goals(&answers).calories, 1979);
    }

    #[test]
    fn test_calorie_floor() {
        // Small, light person with an aggressive cut lands below 1200 pre-floor
        let answers = QuizAnswers {
            gender: Some(Gender::Female),
            age: Some(60),
            weight_kg: Some(40.0),
            height_cm: Some(150.0),
            activity_level: Some(ActivityLevel::Sedentary),
            goal: Some(Goal::Lose),
            intensity: Some(Intensity::Aggressive),
            ..QuizAnswers::default()
        };
        assert_eq!(compute_goals(&answers).calories, 1200);
    }

    #[test]
    fn test_keto_ratios() {
        let answers = QuizAnswers {
            dietary_preference: Some(DietaryPreference::Keto),
            ..complete_answers()
        };
        let goals = compute_goals(&answers);
        // 1979 kcal: 25% protein, 5% carbs, 70% fat
        assert_eq!(goals.protein, 124);
        assert_eq!(goals.carbs, 25);
        assert_eq!(goals.fat, 154);
    }

    #[test]
    fn test_vegan_ratios() {
        let answers = QuizAnswers {
            dietary_preference: Some(DietaryPreference::Vegan),
            ..complete_answers()
        };
        let goals = compute_goals(&answers);
        // 1979 kcal: 25% protein, 50% carbs, 25% fat
        assert_eq!(goals.protein, 124);
        assert_eq!(goals.carbs, 247);
        assert_eq!(goals.fat, 55);
    }

    #[test]
    fn test_vegetarian_uses_default_ratios() {
        let answers = QuizAnswers {
            dietary_preference: Some(DietaryPreference::Vegetarian),
            ..complete_answers()
        };
        assert_eq!(compute_goals(&answers).protein, 148);
    }

    #[test]
    fn test_compute_bmi_one_decimal() {
        assert_eq!(compute_bmi(70.0, 175.0), 22.9);
        assert_eq!(compute_bmi(80.0, 180.0), 24.7);
    }

    #[test]
    fn test_suggest_goal_thresholds() {
        assert_eq!(suggest_goal_from_bmi(17.0), Goal::Gain);
        assert_eq!(suggest_goal_from_bmi(18.5), Goal::Maintain);
        assert_eq!(suggest_goal_from_bmi(24.9), Goal::Maintain);
        assert_eq!(suggest_goal_from_bmi(25.0), Goal::Lose);
        assert_eq!(suggest_goal_from_bmi(31.2), Goal::Lose);
    }
}

//! AI provider interface for food recognition, search, and insights.
//!
//! Two implementations of the same trait: `GeminiClient` calls the Gemini
//! generateContent API over HTTP, and `MockProvider` serves a small canned
//! food table for offline use and tests. Which one runs is decided once at
//! composition time from configuration, never probed per call.
//!
//! AI failures are recoverable: they surface as `Error::Ai` and the only
//! retry is the user triggering the operation again.

use crate::config::{AiConfig, AiProvider};
use crate::{aggregate, Error, FoodItem, LogEntry, MacroGoals, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Returned by `daily_insight` when there is nothing to analyze
pub const NO_LOGS_MESSAGE: &str =
    "No food has been logged yet. Log some meals to get your personalized AI insights!";

/// Nutrition analysis service consumed by the UI layer
pub trait NutritionAi {
    /// Identify food items in an image
    fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<Vec<FoodItem>>;

    /// Look up nutrition for a free-text food query.
    ///
    /// Returns None when the query has no reasonable match.
    fn search_food(&self, query: &str) -> Result<Option<FoodItem>>;

    /// Free-text insight over a day's log against the user's goals
    fn daily_insight(&self, entries: &[LogEntry], goals: &MacroGoals) -> Result<String>;
}

/// Build the configured provider
pub fn from_config(config: &AiConfig) -> Result<Box<dyn NutritionAi>> {
    match config.provider {
        AiProvider::Gemini => Ok(Box::new(GeminiClient::from_env(config)?)),
        AiProvider::Mock => Ok(Box::new(MockProvider)),
    }
}

// ============================================================================
// Live Provider
// ============================================================================

/// Blocking client for the Gemini generateContent endpoint
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client, reading the API key from the configured env var
    pub fn from_env(config: &AiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(format!(
                "{} environment variable is required for the gemini provider",
                config.api_key_env
            ))
        })?;

        Ok(Self {
            http: reqwest::blocking::Client::new(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// POST a generateContent request and extract the response text
    fn generate(&self, body: serde_json::Value) -> Result<String> {
        let url = format!("{}/{}:generateContent", API_BASE, self.model);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            return Err(Error::Ai(format!(
                "Gemini request failed with status {}",
                response.status()
            )));
        }

        let value: serde_json::Value = response.json()?;
        let text = value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Ai("Gemini response contained no text".into()))?;

        Ok(text.trim().to_string())
    }
}

impl NutritionAi for GeminiClient {
    fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<Vec<FoodItem>> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": mime_type,
                            "data": BASE64.encode(image),
                        }
                    },
                    {
                        "text": "Analyze the image and identify each distinct food item. \
                                 For each item, provide its name, estimated portion size, and \
                                 nutritional information (calories, protein, carbs, fat). \
                                 Respond only with a valid JSON array of objects with keys \
                                 name, portion, calories, protein, carbs, fat."
                    }
                ]
            }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        let text = self.generate(body)?;
        tracing::debug!("Image analysis returned {} bytes of JSON", text.len());
        parse_food_items(&text)
    }

    fn search_food(&self, query: &str) -> Result<Option<FoodItem>> {
        let prompt = format!(
            "Provide estimated nutritional information for the following food query: \"{}\". \
             Return a single JSON object with the properties name, portion, calories, protein, \
             carbs, and fat. For the name, use a standardized name for the food item. For \
             portion, use a common serving size (e.g. '1 cup', '100g', '1 medium apple'). \
             If the query is ambiguous or you cannot find a reasonable match, respond with \
             null. Respond only with valid JSON, no additional text.",
            query
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        let text = self.generate(body)?;
        parse_food_search(&text)
    }

    fn daily_insight(&self, entries: &[LogEntry], goals: &MacroGoals) -> Result<String> {
        if entries.is_empty() {
            return Ok(NO_LOGS_MESSAGE.into());
        }

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": insight_prompt(entries, goals) }] }]
        });

        self.generate(body)
    }
}

/// Parse the JSON array returned by image analysis
fn parse_food_items(text: &str) -> Result<Vec<FoodItem>> {
    let items: Vec<FoodItem> = serde_json::from_str(text)
        .map_err(|e| Error::Ai(format!("unparseable food list: {}", e)))?;

    if items.iter().any(|item| item.name.trim().is_empty()) {
        return Err(Error::Ai("food item missing a name".into()));
    }

    Ok(items)
}

/// Parse the JSON object (or null) returned by food search
fn parse_food_search(text: &str) -> Result<Option<FoodItem>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed == "{}" {
        return Ok(None);
    }

    let item: FoodItem = serde_json::from_str(trimmed)
        .map_err(|e| Error::Ai(format!("unparseable food item: {}", e)))?;

    if item.name.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(item))
}

/// Coach-style prompt with totals and percent-of-goal progress
fn insight_prompt(entries: &[LogEntry], goals: &MacroGoals) -> String {
    let totals = aggregate::sum_macros(entries);

    let pct = |value: f64, goal: u32| -> i64 {
        if goal == 0 {
            0
        } else {
            (value / f64::from(goal) * 100.0).round() as i64
        }
    };

    let food_list = entries
        .iter()
        .map(|e| format!("- {} ({:.0} kcal)", e.name, e.calories))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a friendly and encouraging nutrition coach. Analyze the user's food log \
         for the day and provide personalized insights.\n\
         The user's daily goals are: {} calories, {}g protein, {}g carbs, and {}g fat.\n\
         So far today, they have consumed: {:.0} calories ({}% of goal), {:.0}g protein \
         ({}% of goal), {:.0}g carbs ({}% of goal), and {:.0}g fat ({}% of goal).\n\n\
         Here are the foods they ate:\n{}\n\n\
         Based on this, provide 2-3 short, actionable, and positive insights as Markdown \
         bullet points. Start with a positive observation, compare their intake to their \
         goals, and offer a simple suggestion for their next meal. Keep the tone friendly \
         and supportive, not critical. Do not just list the numbers back to them. Respond \
         only with the Markdown content, no additional text.",
        goals.calories,
        goals.protein,
        goals.carbs,
        goals.fat,
        totals.calories,
        pct(totals.calories, goals.calories),
        totals.protein,
        pct(totals.protein, goals.protein),
        totals.carbs,
        pct(totals.carbs, goals.carbs),
        totals.fat,
        pct(totals.fat, goals.fat),
        food_list,
    )
}

// ============================================================================
// Mock Provider
// ============================================================================

/// Deterministic offline provider backed by a small canned food table
pub struct MockProvider;

static FOOD_TABLE: Lazy<Vec<FoodItem>> = Lazy::new(|| {
    let item = |name: &str, portion: &str, calories: f64, protein: f64, carbs: f64, fat: f64| {
        FoodItem {
            name: name.into(),
            portion: portion.into(),
            calories,
            protein,
            carbs,
            fat,
        }
    };

    vec![
        item("Banana", "1 medium", 105.0, 1.3, 27.0, 0.4),
        item("Apple", "1 medium", 95.0, 0.5, 25.0, 0.3),
        item("Chicken Breast", "100g", 165.0, 31.0, 0.0, 3.6),
        item("White Rice", "1 cup cooked", 205.0, 4.3, 45.0, 0.4),
        item("Egg", "1 large", 78.0, 6.3, 0.6, 5.3),
        item("Oatmeal", "1 cup cooked", 158.0, 6.0, 27.0, 3.2),
        item("Salmon", "100g", 208.0, 20.0, 0.0, 13.0),
        item("Broccoli", "1 cup", 55.0, 3.7, 11.0, 0.6),
        item("Greek Yogurt", "1 cup", 100.0, 17.0, 6.0, 0.7),
        item("Whole Wheat Bread", "1 slice", 81.0, 4.0, 14.0, 1.1),
    ]
});

impl NutritionAi for MockProvider {
    fn analyze_image(&self, _image: &[u8], _mime_type: &str) -> Result<Vec<FoodItem>> {
        // Fixed plate so downstream flows are exercisable offline
        Ok(vec![FOOD_TABLE[2].clone(), FOOD_TABLE[3].clone()])
    }

    fn search_food(&self, query: &str) -> Result<Option<FoodItem>> {
        let query = query.to_lowercase();
        Ok(FOOD_TABLE
            .iter()
            .find(|item| {
                let name = item.name.to_lowercase();
                query.contains(&name) || name.contains(query.trim())
            })
            .cloned())
    }

    fn daily_insight(&self, entries: &[LogEntry], goals: &MacroGoals) -> Result<String> {
        if entries.is_empty() {
            return Ok(NO_LOGS_MESSAGE.into());
        }

        let totals = aggregate::sum_macros(entries);
        let remaining = f64::from(goals.calories) - totals.calories;

        let mut lines = vec![format!(
            "- You logged {} item(s) totalling {:.0} kcal of your {} kcal goal.",
            entries.len(),
            totals.calories,
            goals.calories
        )];

        if remaining > 0.0 {
            lines.push(format!(
                "- You have about {:.0} kcal left today; a protein-rich snack would fit well.",
                remaining
            ));
        } else {
            lines.push("- You've reached today's calorie goal; lighter choices from here.".into());
        }

        lines.push(format!(
            "- Macros so far: {:.0}g protein, {:.0}g carbs, {:.0}g fat.",
            totals.protein, totals.carbs, totals.fat
        ));

        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::now_millis;

    fn entry(name: &str, calories: f64) -> LogEntry {
        LogEntry::from_food(
            &FoodItem {
                name: name.into(),
                portion: "1 serving".into(),
                calories,
                protein: 10.0,
                carbs: 20.0,
                fat: 5.0,
            },
            now_millis(),
        )
    }

    fn goals() -> MacroGoals {
        MacroGoals {
            calories: 2000,
            protein: 150,
            carbs: 250,
            fat: 65,
        }
    }

    #[test]
    fn test_parse_food_items_valid_array() {
        let text = r#"[
            {"name": "Toast", "portion": "1 slice", "calories": 80, "protein": 3, "carbs": 14, "fat": 1},
            {"name": "Butter", "portion": "1 tbsp", "calories": 102, "protein": 0.1, "carbs": 0, "fat": 11.5}
        ]"#;

        let items = parse_food_items(text).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Toast");
        assert_eq!(items[1].fat, 11.5);
    }

    #[test]
    fn test_parse_food_items_rejects_garbage() {
        assert!(matches!(parse_food_items("not json"), Err(Error::Ai(_))));
    }

    #[test]
    fn test_parse_food_items_rejects_unnamed_item() {
        let text = r#"[{"name": "  ", "portion": "1", "calories": 1, "protein": 0, "carbs": 0, "fat": 0}]"#;
        assert!(matches!(parse_food_items(text), Err(Error::Ai(_))));
    }

    #[test]
    fn test_parse_food_search_null_means_no_match() {
        assert_eq!(parse_food_search("null").unwrap(), None);
        assert_eq!(parse_food_search("NULL").unwrap(), None);
        assert_eq!(parse_food_search("{}").unwrap(), None);
        assert_eq!(parse_food_search("  ").unwrap(), None);
    }

    #[test]
    fn test_parse_food_search_object() {
        let text = r#"{"name": "Banana", "portion": "1 medium", "calories": 105, "protein": 1.3, "carbs": 27, "fat": 0.4}"#;
        let item = parse_food_search(text).unwrap().unwrap();
        assert_eq!(item.name, "Banana");
        assert_eq!(item.calories, 105.0);
    }

    #[test]
    fn test_insight_prompt_includes_progress() {
        let entries = vec![entry("Lunch", 1000.0)];
        let prompt = insight_prompt(&entries, &goals());

        assert!(prompt.contains("1000 calories (50% of goal)"));
        assert!(prompt.contains("- Lunch (1000 kcal)"));
    }

    #[test]
    fn test_mock_search_is_deterministic() {
        let mock = MockProvider;
        let a = mock.search_food("one banana").unwrap().unwrap();
        let b = mock.search_food("BANANA").unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.name, "Banana");
    }

    #[test]
    fn test_mock_search_miss_returns_none() {
        let mock = MockProvider;
        assert_eq!(mock.search_food("unobtainium stew").unwrap(), None);
    }

    #[test]
    fn test_mock_analyze_image_is_fixed() {
        let mock = MockProvider;
        let plate = mock.analyze_image(b"not really an image", "image/png").unwrap();
        assert_eq!(plate.len(), 2);
        assert_eq!(plate[0].name, "Chicken Breast");
    }

    #[test]
    fn test_empty_log_insight_is_canned() {
        let mock = MockProvider;
        let text = mock.daily_insight(&[], &goals()).unwrap();
        assert_eq!(text, NO_LOGS_MESSAGE);
    }

    #[test]
    fn test_mock_insight_reports_totals() {
        let mock = MockProvider;
        let entries = vec![entry("Breakfast", 400.0), entry("Lunch", 700.0)];
        let text = mock.daily_insight(&entries, &goals()).unwrap();

        assert!(text.contains("1100 kcal"));
        assert!(text.contains("2000 kcal goal"));
    }
}

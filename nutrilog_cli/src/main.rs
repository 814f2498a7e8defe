use chrono::{Local, NaiveDate, TimeZone};
use clap::{Parser, Subcommand};
use nutrilog_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nutrilog")]
#[command(about = "Personal nutrition tracker with AI-assisted food logging", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override AI provider (gemini, mock)
    #[arg(long, global = true)]
    ai: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the onboarding quiz and compute daily macro goals
    Setup {
        #[arg(long)]
        name: Option<String>,

        /// Gender (male, female)
        #[arg(long)]
        gender: Option<String>,

        /// Age in years
        #[arg(long)]
        age: Option<u32>,

        /// Weight in kilograms
        #[arg(long)]
        weight: Option<f64>,

        /// Height in centimeters
        #[arg(long)]
        height: Option<f64>,

        /// Activity level (sedentary, light, moderate, active)
        #[arg(long)]
        activity: Option<String>,

        /// Goal (lose, maintain, gain); defaults to the BMI suggestion
        #[arg(long)]
        goal: Option<String>,

        /// Intensity for lose/gain goals (mild, moderate, aggressive)
        #[arg(long)]
        intensity: Option<String>,

        /// Dietary preference (omnivore, vegetarian, vegan, gluten-free, keto)
        #[arg(long)]
        diet: Option<String>,

        /// Fail instead of prompting for missing answers
        #[arg(long)]
        non_interactive: bool,
    },

    /// Look up a food (text query or photo) and add it to the log
    Log {
        /// Free-text food query, e.g. "one banana"
        query: Option<String>,

        /// Analyze a food photo instead of a text query
        #[arg(long, conflicts_with = "query")]
        image: Option<PathBuf>,

        /// Log against this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        date: Option<String>,
    },

    /// Remove a log entry by id
    Remove {
        id: String,
    },

    /// Show a day's entries and progress against goals (default)
    Day {
        /// Date to show (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Show the weekly breakdown and summary for the week of a date
    Week {
        #[arg(long)]
        date: Option<String>,
    },

    /// AI-generated insight for a day's log
    Insights {
        #[arg(long)]
        date: Option<String>,
    },

    /// Show or edit macro goals
    Goals {
        #[arg(long)]
        calories: Option<u32>,

        #[arg(long)]
        protein: Option<u32>,

        #[arg(long)]
        carbs: Option<u32>,

        #[arg(long)]
        fat: Option<u32>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    nutrilog_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let user_id = config.user.id.clone();

    let mut ai_config = config.ai.clone();
    if let Some(provider) = cli.ai.as_deref() {
        ai_config.provider = match provider.to_lowercase().as_str() {
            "gemini" => AiProvider::Gemini,
            "mock" => AiProvider::Mock,
            other => {
                return Err(Error::Config(format!("unknown AI provider: {}", other)));
            }
        };
    }

    let mut store = JsonStore::new(&data_dir);

    match cli.command {
        Some(Commands::Setup {
            name,
            gender,
            age,
            weight,
            height,
            activity,
            goal,
            intensity,
            diet,
            non_interactive,
        }) => cmd_setup(
            &store,
            &user_id,
            SetupFlags {
                name,
                gender,
                age,
                weight,
                height,
                activity,
                goal,
                intensity,
                diet,
            },
            non_interactive,
        ),
        Some(Commands::Log { query, image, date }) => {
            cmd_log(&mut store, &user_id, &ai_config, query, image, date.as_deref())
        }
        Some(Commands::Remove { id }) => cmd_remove(&mut store, &user_id, &id),
        Some(Commands::Day { date }) => cmd_day(&store, &user_id, date.as_deref()),
        Some(Commands::Week { date }) => cmd_week(&store, &user_id, date.as_deref()),
        Some(Commands::Insights { date }) => {
            cmd_insights(&store, &user_id, &ai_config, date.as_deref())
        }
        Some(Commands::Goals {
            calories,
            protein,
            carbs,
            fat,
        }) => cmd_goals(&store, &user_id, calories, protein, carbs, fat),
        None => {
            // Default to today's view
            cmd_day(&store, &user_id, None)
        }
    }
}

struct SetupFlags {
    name: Option<String>,
    gender: Option<String>,
    age: Option<u32>,
    weight: Option<f64>,
    height: Option<f64>,
    activity: Option<String>,
    goal: Option<String>,
    intensity: Option<String>,
    diet: Option<String>,
}

fn cmd_setup(
    store: &impl Store,
    user_id: &str,
    flags: SetupFlags,
    non_interactive: bool,
) -> Result<()> {
    if store.get_profile(user_id)?.is_some() {
        println!("A profile already exists; answers will replace it.\n");
    }

    let gender = resolve(flags.gender.as_deref(), "gender", parse_gender, non_interactive, || {
        ask("Gender (male/female)", parse_gender)
    })?;
    let age = resolve_value(flags.age, "age", non_interactive, || {
        ask("Age (years)", |s| s.parse::<u32>().ok().filter(|a| *a > 0))
    })?;
    let weight = resolve_value(flags.weight, "weight", non_interactive, || {
        ask("Weight (kg)", |s| s.parse::<f64>().ok().filter(|w| *w > 0.0))
    })?;
    let height = resolve_value(flags.height, "height", non_interactive, || {
        ask("Height (cm)", |s| s.parse::<f64>().ok().filter(|h| *h > 0.0))
    })?;
    let activity = resolve(
        flags.activity.as_deref(),
        "activity",
        parse_activity,
        non_interactive,
        || ask("Activity level (sedentary/light/moderate/active)", parse_activity),
    )?;
    let diet = resolve(flags.diet.as_deref(), "diet", parse_diet, non_interactive, || {
        ask(
            "Dietary preference (omnivore/vegetarian/vegan/gluten-free/keto)",
            parse_diet,
        )
    })?;

    // The BMI suggestion pre-fills the goal but never overrides an explicit one
    let bmi = compute_bmi(weight, height);
    let suggested = suggest_goal_from_bmi(bmi);
    println!("  BMI: {:.1} — suggested goal: {}", bmi, goal_name(suggested));

    let goal = match flags.goal.as_deref() {
        Some(s) => parse_goal(s).ok_or_else(|| Error::Config(format!("invalid goal: {}", s)))?,
        None if non_interactive => suggested,
        None => ask_with_default(
            &format!("Goal (lose/maintain/gain) [{}]", goal_name(suggested)),
            parse_goal,
            suggested,
        )?,
    };

    let intensity = match flags.intensity.as_deref() {
        Some(s) => Some(
            parse_intensity(s).ok_or_else(|| Error::Config(format!("invalid intensity: {}", s)))?,
        ),
        None if goal == Goal::Maintain || non_interactive => None,
        None => Some(ask(
            "Intensity (mild/moderate/aggressive)",
            parse_intensity,
        )?),
    };

    let answers = QuizAnswers {
        name: flags.name.clone(),
        gender: Some(gender),
        age: Some(age),
        weight_kg: Some(weight),
        height_cm: Some(height),
        dietary_preference: Some(diet),
        activity_level: Some(activity),
        goal: Some(goal),
        intensity,
    };

    let macro_goals = compute_goals(&answers);

    let profile = UserProfile {
        name: flags.name,
        gender,
        age,
        weight_kg: weight,
        height_cm: height,
        dietary_preference: diet,
        activity_level: activity,
        goal,
        intensity,
        macro_goals,
        bmi,
        timestamp: 0, // stamped by the store
    };

    store.save_profile(user_id, &profile)?;

    println!();
    println!("✓ Profile saved");
    print_goals(&macro_goals);
    Ok(())
}

fn cmd_log(
    store: &mut JsonStore,
    user_id: &str,
    ai_config: &config::AiConfig,
    query: Option<String>,
    image: Option<PathBuf>,
    date: Option<&str>,
) -> Result<()> {
    let profile = load_profile(&*store, user_id)?;
    let date = parse_date_flag(date)?;
    let provider = ai::from_config(ai_config)?;

    let foods = if let Some(image_path) = image {
        let bytes = std::fs::read(&image_path)?;
        let mime = mime_for_image(&image_path)?;
        let foods = provider.analyze_image(&bytes, mime)?;
        if foods.is_empty() {
            println!("No food recognized in {}.", image_path.display());
            return Ok(());
        }
        foods
    } else {
        let query = query.ok_or_else(|| {
            Error::Config("either a food query or --image is required".into())
        })?;
        match provider.search_food(&query)? {
            Some(food) => vec![food],
            None => {
                println!("No match found for \"{}\".", query);
                return Ok(());
            }
        }
    };

    // Edge-triggered goal check: computed against the day's total before
    // this batch is added
    let logs = store.get_logs(user_id)?;
    let current = sum_macros(filter_by_day(&logs, date)).calories;
    let added: f64 = foods.iter().map(|f| f.calories).sum();
    let will_cross = crosses_goal(current, added, f64::from(profile.macro_goals.calories));

    let timestamp = timestamp_for(date);
    for food in &foods {
        let entry = LogEntry::from_food(food, timestamp);
        store.append_log(user_id, &entry)?;
        println!(
            "✓ Logged {} ({}) — {:.0} kcal  [{}]",
            entry.name, entry.portion, entry.calories, entry.id
        );
    }

    if will_cross {
        println!();
        println!(
            "⚠ This puts you at or over your {} kcal goal for {}.",
            profile.macro_goals.calories, date
        );
    }

    Ok(())
}

fn cmd_remove(store: &mut JsonStore, user_id: &str, id: &str) -> Result<()> {
    store.remove_log(user_id, id)?;
    println!("✓ Entry removed");
    Ok(())
}

fn cmd_day(store: &impl Store, user_id: &str, date: Option<&str>) -> Result<()> {
    let profile = load_profile(store, user_id)?;
    let date = parse_date_flag(date)?;
    let logs = store.get_logs(user_id)?;

    let entries: Vec<&LogEntry> = filter_by_day(&logs, date).collect();
    let totals = sum_macros(entries.iter().copied());
    let goals = profile.macro_goals;

    println!();
    println!("─── {} ───", date.format("%A, %B %-d"));

    if entries.is_empty() {
        println!("No food logged.");
    } else {
        for entry in &entries {
            println!(
                "  • {} ({}) — {:.0} kcal  [{}]",
                entry.name, entry.portion, entry.calories, entry.id
            );
        }
    }

    println!();
    print_progress("Calories", totals.calories, goals.calories, "kcal");
    print_progress("Protein", totals.protein, goals.protein, "g");
    print_progress("Carbs", totals.carbs, goals.carbs, "g");
    print_progress("Fat", totals.fat, goals.fat, "g");

    Ok(())
}

fn cmd_week(store: &impl Store, user_id: &str, date: Option<&str>) -> Result<()> {
    // Weekly view works goal-free, but a profile signals setup happened
    let _ = load_profile(store, user_id)?;
    let date = parse_date_flag(date)?;
    let logs = store.get_logs(user_id)?;

    let breakdown = weekly_breakdown(&logs, date);
    let summary = weekly_summary(&breakdown);

    println!();
    println!(
        "Week of {} — {}",
        breakdown[0].date.format("%b %-d"),
        breakdown[6].date.format("%b %-d")
    );
    println!();
    println!("  Day  Date    Calories  Protein  Carbs  Fat    P/C/F split");

    for day in &breakdown {
        let split = macro_distribution(&day.totals);
        println!(
            "  {}  {}  {:>7.0}  {:>6.0}g  {:>4.0}g  {:>4.0}g  {:>3.0}/{:.0}/{:.0}%",
            day.label,
            day.date.format("%b %-d"),
            day.totals.calories,
            day.totals.protein,
            day.totals.carbs,
            day.totals.fat,
            split.protein_pct,
            split.carbs_pct,
            split.fat_pct,
        );
    }

    println!();
    println!("  Total: {:.0} kcal", summary.total_calories);
    println!("  Average (logged days): {:.0} kcal", summary.avg_calories);
    println!("  Days logged: {}/7", summary.days_logged);

    Ok(())
}

fn cmd_insights(
    store: &impl Store,
    user_id: &str,
    ai_config: &config::AiConfig,
    date: Option<&str>,
) -> Result<()> {
    let profile = load_profile(store, user_id)?;
    let date = parse_date_flag(date)?;
    let logs = store.get_logs(user_id)?;

    let entries: Vec<LogEntry> = filter_by_day(&logs, date).cloned().collect();

    let provider = ai::from_config(ai_config)?;
    let insight = provider.daily_insight(&entries, &profile.macro_goals)?;

    println!();
    println!("{}", insight);
    Ok(())
}

fn cmd_goals(
    store: &impl Store,
    user_id: &str,
    calories: Option<u32>,
    protein: Option<u32>,
    carbs: Option<u32>,
    fat: Option<u32>,
) -> Result<()> {
    let profile = load_profile(store, user_id)?;

    if calories.is_none() && protein.is_none() && carbs.is_none() && fat.is_none() {
        print_goals(&profile.macro_goals);
        return Ok(());
    }

    let merged = MacroGoals {
        calories: calories.unwrap_or(profile.macro_goals.calories),
        protein: protein.unwrap_or(profile.macro_goals.protein),
        carbs: carbs.unwrap_or(profile.macro_goals.carbs),
        fat: fat.unwrap_or(profile.macro_goals.fat),
    };

    let updated = store.update_profile(
        user_id,
        ProfileUpdate {
            macro_goals: Some(merged),
            ..ProfileUpdate::default()
        },
    )?;

    println!("✓ Goals updated");
    print_goals(&updated.macro_goals);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn load_profile(store: &impl Store, user_id: &str) -> Result<UserProfile> {
    store.get_profile(user_id)?.ok_or_else(|| {
        Error::Storage("no profile found — run `nutrilog setup` first".into())
    })
}

fn print_goals(goals: &MacroGoals) {
    println!(
        "Daily goals: {} kcal · {}g protein · {}g carbs · {}g fat",
        goals.calories, goals.protein, goals.carbs, goals.fat
    );
}

fn print_progress(label: &str, value: f64, goal: u32, unit: &str) {
    const WIDTH: usize = 20;
    let ratio = if goal == 0 {
        0.0
    } else {
        (value / f64::from(goal)).clamp(0.0, 1.0)
    };
    let filled = (ratio * WIDTH as f64).round() as usize;

    println!(
        "  {:<8} {}{}  {:.0} / {} {}",
        label,
        "█".repeat(filled),
        "░".repeat(WIDTH - filled),
        value,
        goal,
        unit
    );
}

/// Today when no flag is given, else a strict YYYY-MM-DD parse
fn parse_date_flag(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| Error::Config(format!("invalid date (expected YYYY-MM-DD): {}", s))),
    }
}

/// Entry timestamp for a target date: now for today, local noon otherwise
fn timestamp_for(date: NaiveDate) -> i64 {
    let today = Local::now().date_naive();
    if date == today {
        return now_millis();
    }

    Local
        .from_local_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time"))
        .single()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(now_millis)
}

fn mime_for_image(path: &Path) -> Result<&'static str> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => Ok("image/jpeg"),
        Some("png") => Ok("image/png"),
        Some("webp") => Ok("image/webp"),
        _ => Err(Error::Config(format!(
            "unsupported image type: {}",
            path.display()
        ))),
    }
}

fn parse_gender(s: &str) -> Option<Gender> {
    match s.to_lowercase().as_str() {
        "male" | "m" => Some(Gender::Male),
        "female" | "f" => Some(Gender::Female),
        _ => None,
    }
}

fn parse_activity(s: &str) -> Option<ActivityLevel> {
    match s.to_lowercase().as_str() {
        "sedentary" => Some(ActivityLevel::Sedentary),
        "light" => Some(ActivityLevel::Light),
        "moderate" => Some(ActivityLevel::Moderate),
        "active" => Some(ActivityLevel::Active),
        _ => None,
    }
}

fn parse_goal(s: &str) -> Option<Goal> {
    match s.to_lowercase().as_str() {
        "lose" => Some(Goal::Lose),
        "maintain" => Some(Goal::Maintain),
        "gain" => Some(Goal::Gain),
        _ => None,
    }
}

fn parse_intensity(s: &str) -> Option<Intensity> {
    match s.to_lowercase().as_str() {
        "mild" => Some(Intensity::Mild),
        "moderate" => Some(Intensity::Moderate),
        "aggressive" => Some(Intensity::Aggressive),
        _ => None,
    }
}

fn parse_diet(s: &str) -> Option<DietaryPreference> {
    match s.to_lowercase().as_str() {
        "omnivore" => Some(DietaryPreference::Omnivore),
        "vegetarian" => Some(DietaryPreference::Vegetarian),
        "vegan" => Some(DietaryPreference::Vegan),
        "gluten-free" | "gluten_free" => Some(DietaryPreference::GlutenFree),
        "keto" => Some(DietaryPreference::Keto),
        _ => None,
    }
}

fn goal_name(goal: Goal) -> &'static str {
    match goal {
        Goal::Lose => "lose",
        Goal::Maintain => "maintain",
        Goal::Gain => "gain",
    }
}

/// Use a flag value when present, otherwise prompt (or fail non-interactively)
fn resolve<T, P, A>(
    flag: Option<&str>,
    field: &str,
    parse: P,
    non_interactive: bool,
    ask_fn: A,
) -> Result<T>
where
    P: Fn(&str) -> Option<T>,
    A: FnOnce() -> Result<T>,
{
    match flag {
        Some(s) => parse(s).ok_or_else(|| Error::Config(format!("invalid {}: {}", field, s))),
        None if non_interactive => Err(Error::Config(format!("--{} is required", field))),
        None => ask_fn(),
    }
}

fn resolve_value<T, A>(
    flag: Option<T>,
    field: &str,
    non_interactive: bool,
    ask_fn: A,
) -> Result<T>
where
    A: FnOnce() -> Result<T>,
{
    match flag {
        Some(v) => Ok(v),
        None if non_interactive => Err(Error::Config(format!("--{} is required", field))),
        None => ask_fn(),
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    let bytes = io::stdin().read_line(&mut input)?;
    if bytes == 0 {
        return Err(Error::Other("unexpected end of input".into()));
    }
    Ok(input.trim().to_string())
}

/// Prompt until the answer parses
fn ask<T, P>(label: &str, parse: P) -> Result<T>
where
    P: Fn(&str) -> Option<T>,
{
    loop {
        let line = prompt_line(label)?;
        if let Some(value) = parse(&line) {
            return Ok(value);
        }
        println!("  Unrecognized answer, try again.");
    }
}

/// Like `ask`, but an empty answer takes the default
fn ask_with_default<T, P>(label: &str, parse: P, default: T) -> Result<T>
where
    P: Fn(&str) -> Option<T>,
{
    loop {
        let line = prompt_line(label)?;
        if line.is_empty() {
            return Ok(default);
        }
        if let Some(value) = parse(&line) {
            return Ok(value);
        }
        println!("  Unrecognized answer, try again.");
    }
}

//! Per-user persistence with file locking and change notification.
//!
//! Profiles are stored as a single JSON document and log entries as a JSONL
//! file, both under a per-user directory. Writes go through a temp file and
//! an atomic rename; reads take shared locks. Subscribers registered for a
//! user are pushed a fresh snapshot after every append/remove, which is how
//! multiple views in the same process stay in sync.

use crate::{goals, now_millis, Error, LogEntry, ProfileUpdate, Result, UserProfile};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Callback invoked with a fresh log snapshot whenever a user's logs change
pub type LogsCallback = Box<dyn FnMut(&[LogEntry])>;

/// Handle returned by `subscribe`; pass back to `unsubscribe` to detach
#[derive(Debug)]
pub struct Subscription {
    user_id: String,
    token: u64,
}

/// Persistence interface consumed by the UI layer.
///
/// The engine itself never touches storage; it is always handed
/// already-loaded snapshots.
pub trait Store {
    /// Load a user's profile. Absent or unreadable profiles are first-run,
    /// not errors.
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Write a full profile, stamping its timestamp
    fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<UserProfile>;

    /// Merge a partial update into the stored profile.
    ///
    /// Recomputes the derived BMI whenever weight or height change.
    fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<UserProfile>;

    /// Load the user's log collection in insertion order
    fn get_logs(&self, user_id: &str) -> Result<Vec<LogEntry>>;

    /// Append one entry. Entry ids must be unique within the collection.
    fn append_log(&mut self, user_id: &str, entry: &LogEntry) -> Result<()>;

    /// Remove an entry by id. Removing an unknown id is a no-op.
    fn remove_log(&mut self, user_id: &str, entry_id: &str) -> Result<()>;

    /// Register a change callback for a user's logs.
    ///
    /// The callback fires once immediately with the current snapshot, then
    /// after every append/remove until unsubscribed.
    fn subscribe(&mut self, user_id: &str, callback: LogsCallback) -> Result<Subscription>;

    /// Detach a previously registered callback
    fn unsubscribe(&mut self, subscription: Subscription);
}

/// File-backed store rooted at a data directory
pub struct JsonStore {
    data_dir: PathBuf,
    subscribers: HashMap<String, Vec<(u64, LogsCallback)>>,
    next_token: u64,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            subscribers: HashMap::new(),
            next_token: 0,
        }
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.data_dir.join("users").join(user_id)
    }

    fn profile_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join("profile.json")
    }

    fn logs_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join("logs.jsonl")
    }

    /// Atomically write `contents` to `path` via a locked temp file
    fn write_atomic(path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?)?;

        // Exclusive lock serializes concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        Ok(())
    }

    /// Push the current snapshot to every subscriber for this user
    fn notify(&mut self, user_id: &str) {
        let Some(callbacks) = self.subscribers.get(user_id) else {
            return;
        };
        if callbacks.is_empty() {
            return;
        }

        let logs = match self.get_logs(user_id) {
            Ok(logs) => logs,
            Err(e) => {
                tracing::warn!("Failed to reload logs for notification: {}", e);
                return;
            }
        };

        if let Some(callbacks) = self.subscribers.get_mut(user_id) {
            for (_, callback) in callbacks.iter_mut() {
                callback(&logs);
            }
        }
    }
}

impl Store for JsonStore {
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let path = self.profile_path(user_id);
        if !path.exists() {
            tracing::debug!("No profile found for user {}", user_id);
            return Ok(None);
        }

        let file = File::open(&path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let mut reader = BufReader::new(&file);
        let read_result = reader.read_to_string(&mut contents);
        file.unlock()?;
        read_result?;

        match serde_json::from_str::<UserProfile>(&contents) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                // Unreadable profile is treated as first-run
                tracing::warn!(
                    "Failed to parse profile at {:?}: {}. Treating as absent.",
                    path,
                    e
                );
                Ok(None)
            }
        }
    }

    fn save_profile(&self, user_id: &str, profile: &UserProfile) -> Result<UserProfile> {
        let mut stored = profile.clone();
        stored.timestamp = now_millis();

        let contents = serde_json::to_string(&stored)?;
        Self::write_atomic(&self.profile_path(user_id), &contents)?;

        tracing::debug!("Saved profile for user {}", user_id);
        Ok(stored)
    }

    fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<UserProfile> {
        let mut profile = self.get_profile(user_id)?.ok_or_else(|| {
            Error::Storage(format!("no profile stored for user {}", user_id))
        })?;

        let old_weight = profile.weight_kg;
        let old_height = profile.height_cm;

        if let Some(name) = update.name {
            profile.name = Some(name);
        }
        if let Some(gender) = update.gender {
            profile.gender = gender;
        }
        if let Some(age) = update.age {
            profile.age = age;
        }
        if let Some(weight_kg) = update.weight_kg {
            profile.weight_kg = weight_kg;
        }
        if let Some(height_cm) = update.height_cm {
            profile.height_cm = height_cm;
        }
        if let Some(preference) = update.dietary_preference {
            profile.dietary_preference = preference;
        }
        if let Some(level) = update.activity_level {
            profile.activity_level = level;
        }
        if let Some(goal) = update.goal {
            profile.goal = goal;
        }
        if let Some(intensity) = update.intensity {
            profile.intensity = Some(intensity);
        }
        if let Some(macro_goals) = update.macro_goals {
            profile.macro_goals = macro_goals;
        }

        // BMI is derived, never edited directly
        if profile.weight_kg != old_weight || profile.height_cm != old_height {
            profile.bmi = goals::compute_bmi(profile.weight_kg, profile.height_cm);
        }

        self.save_profile(user_id, &profile)
    }

    fn get_logs(&self, user_id: &str) -> Result<Vec<LogEntry>> {
        let path = self.logs_path(user_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        file.lock_shared()?;

        let reader = BufReader::new(&file);
        let mut entries = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse log entry at line {}: {}", line_num + 1, e);
                    // Continue reading, don't fail completely
                }
            }
        }

        file.unlock()?;
        tracing::debug!("Read {} log entries for user {}", entries.len(), user_id);
        Ok(entries)
    }

    fn append_log(&mut self, user_id: &str, entry: &LogEntry) -> Result<()> {
        let existing = self.get_logs(user_id)?;
        if existing.iter().any(|e| e.id == entry.id) {
            return Err(Error::Storage(format!(
                "duplicate log entry id {}",
                entry.id
            )));
        }

        let path = self.logs_path(user_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(entry)?;
        let write_result = writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush());
        drop(writer);
        file.unlock()?;
        write_result?;

        tracing::debug!("Appended log entry {} for user {}", entry.id, user_id);
        self.notify(user_id);
        Ok(())
    }

    fn remove_log(&mut self, user_id: &str, entry_id: &str) -> Result<()> {
        let entries = self.get_logs(user_id)?;
        let before = entries.len();

        let remaining: Vec<&LogEntry> = entries.iter().filter(|e| e.id != entry_id).collect();
        if remaining.len() == before {
            tracing::debug!("No log entry {} for user {}", entry_id, user_id);
            return Ok(());
        }

        let mut contents = String::new();
        for entry in &remaining {
            contents.push_str(&serde_json::to_string(entry)?);
            contents.push('\n');
        }

        Self::write_atomic(&self.logs_path(user_id), &contents)?;

        tracing::debug!("Removed log entry {} for user {}", entry_id, user_id);
        self.notify(user_id);
        Ok(())
    }

    fn subscribe(&mut self, user_id: &str, mut callback: LogsCallback) -> Result<Subscription> {
        // Initial snapshot fires before the callback is registered
        let logs = self.get_logs(user_id)?;
        callback(&logs);

        let token = self.next_token;
        self.next_token += 1;

        self.subscribers
            .entry(user_id.to_string())
            .or_default()
            .push((token, callback));

        Ok(Subscription {
            user_id: user_id.to_string(),
            token,
        })
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        if let Some(callbacks) = self.subscribers.get_mut(&subscription.user_id) {
            callbacks.retain(|(token, _)| *token != subscription.token);
        }
    }
}

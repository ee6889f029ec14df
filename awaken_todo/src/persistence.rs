//! Persistence adapter for the to-do collection.
//!
//! The full collection is stored as one JSON array under a fixed key and is
//! replaced in full on every save. Loading never fails: an absent slot is
//! seeded (when enabled) and an unreadable one falls back to an empty list.

use std::sync::Arc;

use chrono::Duration;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::storage::KeyValueStore;
use crate::types::{Category, Priority, Todo};

/// Default storage key for the serialized collection.
pub const DEFAULT_STORAGE_KEY: &str = "todos";

/// Reads and writes the serialized collection through a [`KeyValueStore`].
#[derive(Clone)]
pub struct TodoPersistence {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    seed_on_first_run: bool,
}

impl TodoPersistence {
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            seed_on_first_run: true,
        }
    }

    /// Whether an absent slot is filled with [`seed_todos`] on first load.
    pub fn with_seed_on_first_run(mut self, enabled: bool) -> Self {
        self.seed_on_first_run = enabled;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored collection.
    ///
    /// - nothing stored: returns the seed set (persisted before returning), or
    ///   an empty list when seeding is disabled
    /// - stored value is not a JSON array: returns an empty list
    /// - individual records that do not deserialize are skipped
    /// - storage read error: returns an empty list
    pub async fn load(&self, clock: &dyn Clock) -> Vec<Todo> {
        let raw = match self.storage.get(&self.key).await {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("Failed to read stored todos under '{}': {}", self.key, e);
                return Vec::new();
            }
        };

        match raw {
            Some(raw) => match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
                Ok(records) => {
                    let todos = self.decode_records(records);
                    log::debug!("Loaded {} todos from '{}'", todos.len(), self.key);
                    todos
                }
                Err(e) => {
                    log::warn!("Stored todos under '{}' are unreadable, starting empty: {}", self.key, e);
                    Vec::new()
                }
            },
            None if self.seed_on_first_run => {
                let seed = seed_todos(clock);
                log::info!("No stored todos under '{}', seeding {} samples", self.key, seed.len());
                let _ = self.save(&seed).await;
                seed
            }
            None => Vec::new(),
        }
    }

    /// Serialize `todos` and overwrite the stored value. No retry.
    pub async fn save(&self, todos: &[Todo]) -> Result<(), StoreError> {
        let result = self.write(todos).await;
        if let Err(e) = &result {
            log::error!("Failed to save {} todos under '{}': {}", todos.len(), self.key, e);
        }
        result
    }

    fn decode_records(&self, records: Vec<serde_json::Value>) -> Vec<Todo> {
        records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value::<Todo>(record) {
                Ok(todo) => Some(todo),
                Err(e) => {
                    log::warn!("Skipping unreadable todo #{} under '{}': {}", index, self.key, e);
                    None
                }
            })
            .collect()
    }

    async fn write(&self, todos: &[Todo]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(todos)?;
        self.storage.set(&self.key, &raw).await
    }

    /// Drop the stored value so the next load behaves like a first run.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.storage.remove(&self.key).await
    }
}

/// Sample records for a first run: one pending task due today, one due
/// tomorrow, one due next week and one already completed (also due today).
pub fn seed_todos(clock: &dyn Clock) -> Vec<Todo> {
    let now = clock.now();
    let today = clock.today();
    let created = |minutes_ago: i64| now - Duration::minutes(minutes_ago);

    vec![
        Todo {
            id: "seed-1".into(),
            title: "Plan today's quests".into(),
            description: Some("Pick the three goals that matter most today".into()),
            completed: false,
            priority: Priority::High,
            category: Category::Work,
            due_date: Some(today),
            created_at: created(40),
            completed_at: None,
        },
        Todo {
            id: "seed-2".into(),
            title: "Call a friend".into(),
            description: None,
            completed: false,
            priority: Priority::Medium,
            category: Category::Personal,
            due_date: today.succ_opt(),
            created_at: created(30),
            completed_at: None,
        },
        Todo {
            id: "seed-3".into(),
            title: "Finish a course chapter".into(),
            description: Some("Keep the learning streak alive".into()),
            completed: false,
            priority: Priority::Low,
            category: Category::Learning,
            due_date: today.checked_add_signed(Duration::days(7)),
            created_at: created(20),
            completed_at: None,
        },
        Todo {
            id: "seed-4".into(),
            title: "Morning workout".into(),
            description: None,
            completed: true,
            priority: Priority::Medium,
            category: Category::Health,
            due_date: Some(today),
            created_at: created(10),
            completed_at: Some(created(5)),
        },
    ]
}

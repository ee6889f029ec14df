//! Store configuration and the builder that wires storage, clock and seeding.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::persistence::{DEFAULT_STORAGE_KEY, TodoPersistence};
use crate::storage::{KeyValueStore, SqliteKvStore};
use crate::store::TodoStore;

pub const ENV_DATABASE_URL: &str = "AWAKEN_DATABASE_URL";
pub const ENV_TODO_KEY: &str = "AWAKEN_TODO_KEY";
pub const ENV_SEED_ON_FIRST_RUN: &str = "AWAKEN_SEED_ON_FIRST_RUN";

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Plain settings for opening a [`TodoStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    pub storage_key: String,
    /// Insert the sample records when no collection has been stored yet.
    pub seed_on_first_run: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            seed_on_first_run: true,
        }
    }
}

impl StoreConfig {
    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            config.database_url = url;
        }
        if let Some(key) = lookup(ENV_TODO_KEY) {
            if key.trim().is_empty() {
                return Err(StoreError::Config(format!("{ENV_TODO_KEY} must not be empty")));
            }
            config.storage_key = key;
        }
        if let Some(seed) = lookup(ENV_SEED_ON_FIRST_RUN) {
            config.seed_on_first_run = parse_bool(&seed).ok_or_else(|| {
                StoreError::Config(format!("{ENV_SEED_ON_FIRST_RUN} must be true or false, got '{seed}'"))
            })?;
        }
        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builder for [`TodoStore`].
pub struct TodoStoreBuilder {
    config: StoreConfig,
    storage: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl TodoStoreBuilder {
    pub fn new(database_url: &str) -> Self {
        Self::from_config(StoreConfig {
            database_url: database_url.to_string(),
            ..StoreConfig::default()
        })
    }

    pub fn from_config(config: StoreConfig) -> Self {
        Self {
            config,
            storage: None,
            clock: None,
        }
    }

    pub fn with_storage_key(mut self, key: &str) -> Self {
        self.config.storage_key = key.to_string();
        self
    }

    pub fn with_seed_data(mut self, enabled: bool) -> Self {
        self.config.seed_on_first_run = enabled;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use an existing storage backend instead of connecting to `database_url`.
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub async fn build(self) -> Result<TodoStore, StoreError> {
        if self.config.storage_key.trim().is_empty() {
            return Err(StoreError::Config("storage key must not be empty".into()));
        }

        let storage = match self.storage {
            Some(storage) => storage,
            None => {
                let sqlite = SqliteKvStore::connect(&self.config.database_url).await?;
                Arc::new(sqlite) as Arc<dyn KeyValueStore>
            }
        };
        let clock = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock) as Arc<dyn Clock>,
        };

        let persistence = TodoPersistence::new(storage, self.config.storage_key)
            .with_seed_on_first_run(self.config.seed_on_first_run);

        Ok(TodoStore::open(persistence, clock).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert!(config.seed_on_first_run);
    }

    #[test]
    fn test_env_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            (ENV_DATABASE_URL, "sqlite:./awaken.db?mode=rwc"),
            (ENV_TODO_KEY, "todos-v2"),
            (ENV_SEED_ON_FIRST_RUN, "no"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite:./awaken.db?mode=rwc");
        assert_eq!(config.storage_key, "todos-v2");
        assert!(!config.seed_on_first_run);
    }

    #[test]
    fn test_invalid_env_is_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[(ENV_SEED_ON_FIRST_RUN, "maybe")]));
        assert!(matches!(err, Err(StoreError::Config(_))));

        let err = StoreConfig::from_lookup(lookup(&[(ENV_TODO_KEY, "  ")]));
        assert!(matches!(err, Err(StoreError::Config(_))));
    }
}

//! # awaken_todo
//!
//! Local, single-user to-do list for the Awaken client.
//!
//! The whole collection lives in one on-device key-value slot and is rewritten
//! on every mutation. [`TodoStore`] owns the in-memory copy and follows a
//! save-then-commit order: a mutation only becomes visible after the persisted
//! blob has been replaced.
//!
//! ## Quick start
//!
//! ```ignore
//! use awaken_todo::{Category, Priority, StatusFilter, TodoDraft, TodoQuery, TodoStoreBuilder};
//!
//! let mut store = TodoStoreBuilder::new("sqlite:./awaken.db?mode=rwc")
//!     .build()
//!     .await?;
//!
//! store
//!     .add(TodoDraft::new("Buy milk").with_priority(Priority::Low).with_category(Category::Shopping))
//!     .await?;
//!
//! for todo in store.visible(&TodoQuery::default().with_status(StatusFilter::Pending)) {
//!     println!("{}", todo.title);
//! }
//! ```
//!
//! ## Key types
//!
//! - [`TodoStore`]: owns the collection and exposes the mutations
//! - [`TodoStoreBuilder`]: wires storage, clock and seeding options
//! - [`TodoPersistence`]: load/save of the serialized collection
//! - [`TodoQuery`]: search text plus status and category filters
//! - [`ChangeNotification`]: event emitted after every committed mutation

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod messages;
pub mod persistence;
pub mod storage;
pub mod store;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{StoreConfig, TodoStoreBuilder};
pub use error::StoreError;
pub use filter::{CategoryFilter, StatusFilter, TodoCounts, TodoQuery};
pub use messages::{ChangeKind, ChangeNotification};
pub use persistence::TodoPersistence;
pub use storage::{KeyValueStore, MemoryKvStore, SqliteKvStore};
pub use store::TodoStore;
pub use types::{Category, Priority, Todo, TodoDraft};

// Re-export for users that want to share the storage connection
pub use sea_orm;

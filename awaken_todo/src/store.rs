//! The to-do store: sole owner of the in-memory collection.
//!
//! Every mutation builds the next collection, persists it, and only then
//! replaces the in-memory copy (save-then-commit). A failed save leaves the
//! store exactly as it was and is returned to the caller.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::filter::{self, TodoCounts, TodoQuery};
use crate::messages::{ChangeKind, ChangeNotification};
use crate::persistence::TodoPersistence;
use crate::types::{Todo, TodoDraft};

const SLUG_MAX_LEN: usize = 24;

/// In-memory to-do collection with write-through persistence.
///
/// Mutations take `&mut self`: there is exactly one writer, and callers
/// serialize user actions by awaiting each mutation before the next.
pub struct TodoStore {
    todos: Vec<Todo>,
    persistence: TodoPersistence,
    clock: Arc<dyn Clock>,
    change_tx: broadcast::Sender<ChangeNotification>,
}

impl TodoStore {
    /// Load the persisted collection (seeding it on first run) and wrap it.
    pub async fn open(persistence: TodoPersistence, clock: Arc<dyn Clock>) -> Self {
        let todos = persistence.load(clock.as_ref()).await;
        let (change_tx, _) = broadcast::channel(64);
        Self {
            todos,
            persistence,
            clock,
            change_tx,
        }
    }

    /// All records, in insertion order.
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Calendar date the date filters are evaluated against.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Records matching `query`, in display order.
    pub fn visible(&self, query: &TodoQuery) -> Vec<&Todo> {
        filter::apply(&self.todos, query, self.today())
    }

    /// Pending, due-today, overdue and completed counters over the whole collection.
    pub fn counts(&self) -> TodoCounts {
        TodoCounts::compute(&self.todos, self.today())
    }

    /// Receive a [`ChangeNotification`] after every committed mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.change_tx.subscribe()
    }

    pub fn persistence(&self) -> &TodoPersistence {
        &self.persistence
    }

    /// Create a pending record from `draft`.
    ///
    /// Returns `Ok(None)` without touching storage when the title is blank.
    pub async fn add(&mut self, draft: TodoDraft) -> Result<Option<Todo>, StoreError> {
        let Some(title) = draft.normalized_title() else {
            log::debug!("Ignoring add with blank title");
            return Ok(None);
        };

        let now = self.clock.now();
        let todo = Todo {
            id: generate_id(now, &title, &self.todos),
            title,
            description: draft.normalized_description(),
            completed: false,
            priority: draft.priority,
            category: draft.category,
            due_date: draft.due_date,
            created_at: now,
            completed_at: None,
        };

        let mut next = self.todos.clone();
        next.push(todo.clone());
        self.commit(next, ChangeKind::Added, &todo.id).await?;
        Ok(Some(todo))
    }

    /// Replace the editable fields of record `id`.
    ///
    /// `id`, `created_at`, `completed` and `completed_at` are kept. Returns
    /// `Ok(None)` when the id is unknown or the title is blank.
    pub async fn edit(&mut self, id: &str, draft: TodoDraft) -> Result<Option<Todo>, StoreError> {
        let Some(title) = draft.normalized_title() else {
            log::debug!("Ignoring edit of '{}' with blank title", id);
            return Ok(None);
        };
        let Some(index) = self.position(id) else {
            log::debug!("Ignoring edit of unknown todo '{}'", id);
            return Ok(None);
        };

        let mut next = self.todos.clone();
        let todo = &mut next[index];
        todo.title = title;
        todo.description = draft.normalized_description();
        todo.priority = draft.priority;
        todo.category = draft.category;
        todo.due_date = draft.due_date;
        let edited = todo.clone();

        self.commit(next, ChangeKind::Edited, id).await?;
        Ok(Some(edited))
    }

    /// Flip the completion state of record `id`, stamping or clearing `completed_at`.
    pub async fn toggle_completed(&mut self, id: &str) -> Result<Option<Todo>, StoreError> {
        let Some(index) = self.position(id) else {
            log::debug!("Ignoring toggle of unknown todo '{}'", id);
            return Ok(None);
        };

        let mut next = self.todos.clone();
        let todo = &mut next[index];
        todo.completed = !todo.completed;
        todo.completed_at = todo.completed.then(|| self.clock.now());
        let toggled = todo.clone();

        self.commit(next, ChangeKind::Toggled, id).await?;
        Ok(Some(toggled))
    }

    /// Permanently remove record `id`. Returns `Ok(false)` when it does not exist.
    pub async fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(index) = self.position(id) else {
            log::debug!("Ignoring delete of unknown todo '{}'", id);
            return Ok(false);
        };

        let mut next = self.todos.clone();
        next.remove(index);
        self.commit(next, ChangeKind::Deleted, id).await?;
        Ok(true)
    }

    /// Re-read the persisted collection, discarding the in-memory copy.
    pub async fn reload(&mut self) {
        self.todos = self.persistence.load(self.clock.as_ref()).await;
        self.notify(ChangeKind::Reloaded, "");
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.todos.iter().position(|t| t.id == id)
    }

    async fn commit(&mut self, next: Vec<Todo>, kind: ChangeKind, id: &str) -> Result<(), StoreError> {
        self.persistence.save(&next).await?;
        self.todos = next;
        log::debug!("Committed {:?} of '{}' ({} todos)", kind, id, self.todos.len());
        self.notify(kind, id);
        Ok(())
    }

    fn notify(&self, kind: ChangeKind, id: &str) {
        let _ = self.change_tx.send(ChangeNotification {
            kind,
            id: id.to_string(),
        });
    }
}

/// Build an id from the creation time and a slug of the title, e.g.
/// `1767258000000-buy-milk`. A numeric suffix keeps it unique within `existing`.
fn generate_id(now: DateTime<Utc>, title: &str, existing: &[Todo]) -> String {
    let slug = slugify(title);
    let base = if slug.is_empty() {
        now.timestamp_millis().to_string()
    } else {
        format!("{}-{}", now.timestamp_millis(), slug)
    };

    let taken: HashSet<&str> = existing.iter().map(|t| t.id.as_str()).collect();
    if !taken.contains(base.as_str()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.chars().count() >= SLUG_MAX_LEN {
            break;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Buy milk!"), "buy-milk");
        assert_eq!(slugify("  --Plan  the Week-- "), "plan-the-week");
        assert_eq!(slugify("???"), "");
        assert!(slugify("a very long title that keeps going and going").chars().count() <= SLUG_MAX_LEN);
    }

    #[test]
    fn test_generate_id_is_unique() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let first = generate_id(now, "Buy milk", &[]);
        assert_eq!(first, format!("{}-buy-milk", now.timestamp_millis()));

        let existing = vec![Todo {
            id: first.clone(),
            title: "Buy milk".into(),
            description: None,
            completed: false,
            priority: Default::default(),
            category: Default::default(),
            due_date: None,
            created_at: now,
            completed_at: None,
        }];
        let second = generate_id(now, "Buy milk", &existing);
        assert_eq!(second, format!("{first}-2"));
    }
}

use std::error::Error;
use std::io::{self, BufRead, Write};

use awaken_todo::{
    Category, CategoryFilter, Priority, StatusFilter, StoreConfig, StoreError, Todo, TodoDraft,
    TodoQuery, TodoStore, TodoStoreBuilder,
};
use chrono::NaiveDate;

pub fn menu(query: &TodoQuery) {
    println!();
    println!(
        "[search: '{}' | status: {} | category: {}]",
        query.search, query.status, query.category
    );
    println!("1. List todos");
    println!("2. Add todo");
    println!("3. Edit todo");
    println!("4. Toggle completed");
    println!("5. Delete todo");
    println!("6. Set search text");
    println!("7. Set status filter (all, pending, completed, today, overdue)");
    println!("8. Set category filter (All, {})", category_names());
    println!("9. Show counters");
    println!("0. Exit");
}

fn category_names() -> String {
    Category::ALL.map(|c| c.as_str()).join(", ")
}

/// Print `label` and read one trimmed line. `None` on end of input.
fn prompt(input: &mut impl BufRead, label: &str) -> io::Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_todo(todo: &Todo, today: NaiveDate) {
    let mark = if todo.completed { "x" } else { " " };
    let due = match todo.due_date {
        Some(date) if todo.is_overdue(today) => format!(" due {date} (overdue)"),
        Some(date) if todo.is_due_today(today) => format!(" due {date} (today)"),
        Some(date) => format!(" due {date}"),
        None => String::new(),
    };
    println!(
        "[{mark}] {} ({}, {}){due}  id={}",
        todo.title, todo.priority, todo.category, todo.id
    );
    if let Some(description) = &todo.description {
        println!("      {description}");
    }
}

/// Ask for the editable fields. Blank answers keep the values of `base`.
fn read_draft(input: &mut impl BufRead, base: TodoDraft) -> io::Result<Option<TodoDraft>> {
    let Some(title) = prompt(input, "Title: ")? else {
        return Ok(None);
    };
    let mut draft = base;
    if !title.is_empty() {
        draft.title = title;
    }

    if let Some(description) = prompt(input, "Description (blank to keep, '-' to clear): ")? {
        match description.as_str() {
            "" => {}
            "-" => draft.description = None,
            _ => draft.description = Some(description),
        }
    }

    if let Some(priority) = prompt(input, "Priority (low, medium, high): ")? {
        if !priority.is_empty() {
            match priority.parse::<Priority>() {
                Ok(p) => draft.priority = p,
                Err(e) => println!("{e}, keeping {}", draft.priority),
            }
        }
    }

    if let Some(category) = prompt(input, &format!("Category ({}): ", category_names()))? {
        if !category.is_empty() {
            match category.parse::<Category>() {
                Ok(c) => draft.category = c,
                Err(e) => println!("{e}, keeping {}", draft.category),
            }
        }
    }

    if let Some(due) = prompt(input, "Due date YYYY-MM-DD (blank to keep, '-' to clear): ")? {
        match due.as_str() {
            "" => {}
            "-" => draft.due_date = None,
            _ => match NaiveDate::parse_from_str(&due, "%Y-%m-%d") {
                Ok(date) => draft.due_date = Some(date),
                Err(e) => println!("Invalid date '{due}': {e}"),
            },
        }
    }

    Ok(Some(draft))
}

fn not_saved(error: &StoreError) {
    log::error!("Change not saved: {}", error);
    println!("Not saved: {error}");
}

fn draft_from(todo: &Todo) -> TodoDraft {
    TodoDraft {
        title: todo.title.clone(),
        description: todo.description.clone(),
        priority: todo.priority,
        category: todo.category,
        due_date: todo.due_date,
    }
}

async fn run(store: &mut TodoStore, input: &mut impl BufRead) -> Result<(), Box<dyn Error>> {
    let mut query = TodoQuery::default();

    loop {
        menu(&query);
        let Some(choice) = prompt(input, "> ")? else {
            break;
        };

        match choice.as_str() {
            "1" => {
                let today = store.today();
                let visible = store.visible(&query);
                if visible.is_empty() {
                    println!("Nothing to show.");
                }
                for todo in visible {
                    print_todo(todo, today);
                }
            }
            "2" => {
                let Some(draft) = read_draft(input, TodoDraft::default())? else {
                    break;
                };
                match store.add(draft).await {
                    Ok(Some(todo)) => println!("Added {}", todo.id),
                    Ok(None) => println!("A title is required."),
                    Err(e) => not_saved(&e),
                }
            }
            "3" => {
                let Some(id) = prompt(input, "Todo id: ")? else { break };
                let Some(existing) = store.get(&id).map(draft_from) else {
                    println!("No todo with id '{id}'.");
                    continue;
                };
                let Some(draft) = read_draft(input, existing)? else {
                    break;
                };
                match store.edit(&id, draft).await {
                    Ok(Some(todo)) => println!("Updated {}", todo.id),
                    Ok(None) => println!("A title is required."),
                    Err(e) => not_saved(&e),
                }
            }
            "4" => {
                let Some(id) = prompt(input, "Todo id: ")? else { break };
                match store.toggle_completed(&id).await {
                    Ok(Some(todo)) if todo.completed => println!("Completed '{}'", todo.title),
                    Ok(Some(todo)) => println!("Reopened '{}'", todo.title),
                    Ok(None) => println!("No todo with id '{id}'."),
                    Err(e) => not_saved(&e),
                }
            }
            "5" => {
                let Some(id) = prompt(input, "Todo id: ")? else { break };
                match store.delete(&id).await {
                    Ok(true) => println!("Deleted {id}"),
                    Ok(false) => println!("No todo with id '{id}'."),
                    Err(e) => not_saved(&e),
                }
            }
            "6" => {
                let Some(search) = prompt(input, "Search: ")? else { break };
                query.search = search;
            }
            "7" => {
                let Some(status) = prompt(input, "Status: ")? else { break };
                match status.parse::<StatusFilter>() {
                    Ok(status) => query.status = status,
                    Err(e) => println!("{e}"),
                }
            }
            "8" => {
                let Some(category) = prompt(input, "Category: ")? else { break };
                match category.parse::<CategoryFilter>() {
                    Ok(category) => query.category = category,
                    Err(e) => println!("{e}"),
                }
            }
            "9" => {
                let counts = store.counts();
                println!(
                    "pending: {}  due today: {}  overdue: {}  completed: {}",
                    counts.pending, counts.due_today, counts.overdue, counts.completed
                );
            }
            "0" => break,
            _ => println!("Invalid choice"),
        }
    }

    Ok(())
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = StoreConfig::from_env()?;
    log::info!("Opening todo store at {}", config.database_url);

    let mut store = TodoStoreBuilder::from_config(config).build().await?;
    run(&mut store, &mut io::stdin().lock()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use awaken_todo::{KeyValueStore, MemoryKvStore};

    /// Memory storage that refuses writes while `read_only` is set.
    #[derive(Default)]
    struct ReadOnlyKv {
        inner: MemoryKvStore,
        read_only: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for ReadOnlyKv {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.read_only.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_storage_failures_keep_the_session_alive() {
        let kv = Arc::new(ReadOnlyKv::default());
        let mut store = TodoStoreBuilder::new("unused")
            .with_storage(kv.clone())
            .build()
            .await
            .expect("Failed to open store");
        let before = store.todos().to_vec();
        kv.read_only.store(true, Ordering::SeqCst);

        // add, toggle, edit and delete all fail to save; the loop must reach "9" and "0"
        let script = "2\nWater plants\n\n\n\n\n\
                      4\nseed-1\n\
                      3\nseed-2\nCall mum\n\n\n\n\n\
                      5\nseed-3\n\
                      9\n0\n";
        let mut input = Cursor::new(script.as_bytes());

        let result = run(&mut store, &mut input).await;
        assert!(result.is_ok(), "session ended with {:?}", result.err());
        assert_eq!(store.todos(), before.as_slice());
        assert_eq!(input.position() as usize, script.len());
    }
}

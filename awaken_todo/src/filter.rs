//! Sort/filter engine.
//!
//! Pure functions from the full collection plus a [`TodoQuery`] to the ordered
//! list a screen displays. The calendar date is passed in so results depend
//! only on the arguments.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::types::{Category, Todo};

/// Selects records by completion state and due date relative to today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
    /// Pending and due today.
    Today,
    /// Pending and due before today.
    Overdue,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 5] = [
        StatusFilter::All,
        StatusFilter::Pending,
        StatusFilter::Completed,
        StatusFilter::Today,
        StatusFilter::Overdue,
    ];

    pub fn matches(self, todo: &Todo, today: NaiveDate) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => !todo.completed,
            StatusFilter::Completed => todo.completed,
            StatusFilter::Today => todo.is_due_today(today),
            StatusFilter::Overdue => todo.is_overdue(today),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Pending => "pending",
            StatusFilter::Completed => "completed",
            StatusFilter::Today => "today",
            StatusFilter::Overdue => "overdue",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        StatusFilter::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown status filter '{s}'"))
    }
}

/// Exact category match, or no restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => todo.category == category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("All"),
            CategoryFilter::Only(category) => category.fmt(f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

/// Search text plus status and category filters. All three must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoQuery {
    pub search: String,
    pub status: StatusFilter,
    pub category: CategoryFilter,
}

impl TodoQuery {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    fn needle(&self) -> Option<String> {
        let search = self.search.trim();
        (!search.is_empty()).then(|| search.to_lowercase())
    }
}

/// Filter `todos` by `query`, then sort with [`compare`].
pub fn apply<'a>(todos: &'a [Todo], query: &TodoQuery, today: NaiveDate) -> Vec<&'a Todo> {
    let needle = query.needle();
    let mut visible: Vec<&Todo> = todos
        .iter()
        .filter(|t| query.status.matches(t, today))
        .filter(|t| query.category.matches(t))
        .filter(|t| needle.as_deref().is_none_or(|n| t.matches_search(n)))
        .collect();
    sort(&mut visible, today);
    visible
}

/// Sort in display order. Stable, so equal records keep their relative order.
pub fn sort(todos: &mut [&Todo], today: NaiveDate) {
    todos.sort_by(|a, b| compare(a, b, today));
}

/// Display order, each tier only breaking ties of the one before:
///
/// 1. pending before completed
/// 2. among pending: overdue, then due today, then the rest
/// 3. priority, high first
/// 4. due date, earliest first; undated records after dated ones
/// 5. creation time, newest first
///
/// Tier 4 places undated records after dated ones instead of skipping the
/// tier when only one side has a date. Skipping it makes the order cyclic
/// (dated A < dated B by date, B < undated C and C < A by creation time),
/// which `sort_by` does not accept.
pub fn compare(a: &Todo, b: &Todo, today: NaiveDate) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| urgency(a, today).cmp(&urgency(b, today)))
        .then_with(|| b.priority.weight().cmp(&a.priority.weight()))
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
}

// Completed records all rank the same here.
fn urgency(todo: &Todo, today: NaiveDate) -> u8 {
    if todo.is_overdue(today) {
        0
    } else if todo.is_due_today(today) {
        1
    } else {
        2
    }
}

/// Counters shown above the list. Always computed from the full collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoCounts {
    pub pending: usize,
    pub due_today: usize,
    pub overdue: usize,
    pub completed: usize,
}

impl TodoCounts {
    pub fn compute(todos: &[Todo], today: NaiveDate) -> Self {
        todos.iter().fold(Self::default(), |mut counts, t| {
            if t.completed {
                counts.completed += 1;
            } else {
                counts.pending += 1;
            }
            if t.is_due_today(today) {
                counts.due_today += 1;
            }
            if t.is_overdue(today) {
                counts.overdue += 1;
            }
            counts
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 20).unwrap()
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, minute, 0).unwrap()
    }

    fn make(id: &str, priority: Priority, due_in: Option<i64>, completed: bool, minute: u32) -> Todo {
        Todo {
            id: id.into(),
            title: format!("Task {id}"),
            description: None,
            completed,
            priority,
            category: Category::Personal,
            due_date: due_in.map(|d| today() + Duration::days(d)),
            created_at: at(minute),
            completed_at: completed.then(|| at(minute + 1)),
        }
    }

    fn ids(todos: &[&Todo]) -> Vec<String> {
        todos.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_today_filter_only_pending_due_today() {
        let todos = vec![
            make("a", Priority::Medium, Some(0), false, 0),
            make("b", Priority::Medium, Some(0), true, 1),
            make("c", Priority::Medium, Some(1), false, 2),
            make("d", Priority::Medium, None, false, 3),
        ];
        let query = TodoQuery::default().with_status(StatusFilter::Today);
        let visible = apply(&todos, &query, today());
        assert_eq!(ids(&visible), vec!["a"]);
        assert!(visible.iter().all(|t| t.due_date == Some(today())));
    }

    #[test]
    fn test_overdue_filter_excludes_today_and_completed() {
        let todos = vec![
            make("late", Priority::Low, Some(-1), false, 0),
            make("late-done", Priority::Low, Some(-3), true, 1),
            make("now", Priority::Low, Some(0), false, 2),
        ];
        let query = TodoQuery::default().with_status(StatusFilter::Overdue);
        let visible = apply(&todos, &query, today());
        assert_eq!(ids(&visible), vec!["late"]);
        for t in visible {
            assert!(!t.completed);
            assert!(t.due_date.unwrap() < today());
        }
    }

    #[test]
    fn test_overdue_sorts_before_due_today() {
        let todos = vec![
            make("today", Priority::High, Some(0), false, 5),
            make("yesterday", Priority::Low, Some(-1), false, 0),
        ];
        let visible = apply(&todos, &TodoQuery::default(), today());
        assert_eq!(ids(&visible), vec!["yesterday", "today"]);
    }

    #[test]
    fn test_full_ordering() {
        let todos = vec![
            make("done-high", Priority::High, Some(-5), true, 0),
            make("later-low", Priority::Low, Some(3), false, 1),
            make("later-high-far", Priority::High, Some(9), false, 2),
            make("later-high-near", Priority::High, Some(2), false, 3),
            make("undated-high", Priority::High, None, false, 4),
            make("undated-high-newer", Priority::High, None, false, 6),
            make("today-low", Priority::Low, Some(0), false, 7),
            make("overdue-low", Priority::Low, Some(-2), false, 8),
        ];
        let visible = apply(&todos, &TodoQuery::default(), today());
        assert_eq!(
            ids(&visible),
            vec![
                "overdue-low",
                "today-low",
                "later-high-near",
                "later-high-far",
                "undated-high-newer",
                "undated-high",
                "later-low",
                "done-high",
            ]
        );
    }

    #[test]
    fn test_sort_is_idempotent() {
        let todos = vec![
            make("a", Priority::Low, None, false, 0),
            make("b", Priority::High, Some(4), false, 1),
            make("c", Priority::Medium, Some(-1), true, 2),
            make("d", Priority::Medium, None, false, 3),
            make("e", Priority::High, Some(-2), false, 4),
        ];
        let once = apply(&todos, &TodoQuery::default(), today());
        let mut twice = once.clone();
        sort(&mut twice, today());
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_search_and_category_compose() {
        let mut milk = make("milk", Priority::Low, None, false, 0);
        milk.title = "Buy MILK".into();
        milk.category = Category::Shopping;
        let mut notes = make("notes", Priority::Low, None, false, 1);
        notes.description = Some("milk the notes for ideas".into());
        notes.category = Category::Work;
        let todos = vec![milk, notes];

        let query = TodoQuery::default().with_search("  milk ");
        assert_eq!(apply(&todos, &query, today()).len(), 2);

        let query = query.with_category(CategoryFilter::Only(Category::Shopping));
        assert_eq!(ids(&apply(&todos, &query, today())), vec!["milk"]);

        let query = query.with_status(StatusFilter::Completed);
        assert!(apply(&todos, &query, today()).is_empty());
    }

    #[test]
    fn test_counts() {
        let todos = vec![
            make("a", Priority::Low, Some(-1), false, 0),
            make("b", Priority::Low, Some(0), false, 1),
            make("c", Priority::Low, Some(0), true, 2),
            make("d", Priority::Low, None, false, 3),
        ];
        assert_eq!(
            TodoCounts::compute(&todos, today()),
            TodoCounts {
                pending: 3,
                due_today: 1,
                overdue: 1,
                completed: 1,
            }
        );
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!("Overdue".parse::<StatusFilter>(), Ok(StatusFilter::Overdue));
        assert_eq!("All".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!(
            "work".parse::<CategoryFilter>(),
            Ok(CategoryFilter::Only(Category::Work))
        );
        assert!("someday".parse::<StatusFilter>().is_err());
    }
}

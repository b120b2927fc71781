use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const COLUMN_TODO: &str = "todo";
pub const COLUMN_IN_PROGRESS: &str = "in-progress";
pub const COLUMN_REVIEW: &str = "review";
pub const COLUMN_DONE: &str = "done";

pub const STATUS_ARCHIVED: &str = "archived";
pub const STATUS_DELETED: &str = "deleted";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub order: i64,
}

impl Task {
    pub fn new(title: impl Into<String>, status: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, status)
    }

    pub fn with_id(
        id: impl Into<String>,
        title: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: Some(status.into()),
            priority: Priority::default(),
            due_date: None,
            assignee: None,
            subtasks: Vec::new(),
            tags: Vec::new(),
            order: 0,
        }
    }

    pub fn status_str(&self) -> &str {
        self.status.as_deref().unwrap_or("")
    }

    /// Archived and deleted tasks are soft-removed and stay in the list.
    pub fn is_archived(&self) -> bool {
        matches!(self.status_str(), STATUS_ARCHIVED | STATUS_DELETED)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub wip_limit: Option<usize>,
    pub color: String,
}

impl Column {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            wip_limit: None,
            color: color.into(),
        }
    }

    pub fn with_wip_limit(mut self, limit: usize) -> Self {
        self.wip_limit = Some(limit);
        self
    }
}

pub fn default_columns() -> Vec<Column> {
    vec![
        Column::new(COLUMN_TODO, "To Do", "#64748b"),
        Column::new(COLUMN_IN_PROGRESS, "In Progress", "#3b82f6"),
        Column::new(COLUMN_REVIEW, "Review", "#f59e0b"),
        Column::new(COLUMN_DONE, "Done", "#22c55e"),
    ]
}

pub fn visible_tasks(tasks: &[Task]) -> Vec<Task> {
    tasks.iter().filter(|t| !t.is_archived()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_as_str() {
        assert_eq!(Priority::Low.as_str(), "low");
        assert_eq!(Priority::Urgent.as_str(), "urgent");
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_task_new_generates_unique_ids() {
        let a = Task::new("A", "todo");
        let b = Task::new("B", "todo");
        assert_ne!(a.id, b.id);
        assert_eq!(a.status_str(), "todo");
    }

    #[test]
    fn test_task_deserializes_with_missing_optional_fields() {
        let task: Task = serde_json::from_str(r#"{"id":"t1","title":"Write docs"}"#)
            .expect("minimal task should parse");
        assert_eq!(task.status, None);
        assert_eq!(task.status_str(), "");
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.tags.is_empty());
        assert_eq!(task.order, 0);
    }

    #[test]
    fn test_task_priority_and_due_date_parse() {
        let task: Task = serde_json::from_str(
            r#"{"id":"t1","title":"Ship","priority":"urgent","due_date":"2024-05-01"}"#,
        )
        .expect("task should parse");
        assert_eq!(task.priority, Priority::Urgent);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn test_archived_tasks_are_hidden() {
        let tasks = vec![
            Task::with_id("a", "A", "todo"),
            Task::with_id("b", "B", STATUS_ARCHIVED),
            Task::with_id("c", "C", STATUS_DELETED),
        ];
        let visible = visible_tasks(&tasks);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "a");
    }

    #[test]
    fn test_default_columns() {
        let columns = default_columns();
        let ids: Vec<&str> = columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["todo", "in-progress", "review", "done"]);
        assert!(columns.iter().all(|c| c.wip_limit.is_none()));
        assert_eq!(
            Column::new("x", "X", "#000").with_wip_limit(3).wip_limit,
            Some(3)
        );
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Progress state of a task. The wire form is snake_case; the legacy
/// spelling `"en progreso"` is still accepted on input but never emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pendiente,
    #[serde(alias = "en progreso")]
    EnProgreso,
    Completada,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Alta,
    #[default]
    Media,
    Baja,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("`{field}` is required and must not be blank")]
    Blank { field: &'static str },
}

/// A task record. `deleted_at` is `None` while the task is active and set
/// while it sits in the trash; it is omitted from the wire when absent, so
/// active and trashed records serialize to their respective shapes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Payload for creating a task. Omitted status and priority fall back to
/// the schema defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update. Absent fields keep their previous value; an explicit
/// `"dueDate": null` clears the due date.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(
        deserialize_with = "patch_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Wraps a present field in `Some`, so `null` becomes `Some(None)` while a
/// missing field stays `None`.
fn patch_field<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Receipt returned when the trash is emptied.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TrashEmptied {
    pub removed: usize,
}

impl Task {
    /// Build a task from a create payload, trimming the required text
    /// fields and stamping both timestamps to now.
    pub fn new(input: NewTask) -> Result<Self, ValidationError> {
        let title = required(&input.title, "title")?;
        let description = required(&input.description, "description")?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            title,
            description,
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Apply a partial update. All fields are validated before anything is
    /// assigned, so a rejected patch leaves the task untouched.
    pub fn apply(&mut self, patch: TaskUpdate) -> Result<(), ValidationError> {
        let title = match &patch.title {
            Some(title) => Some(required(title, "title")?),
            None => None,
        };
        let description = match &patch.description {
            Some(description) => Some(required(description, "description")?),
            None => None,
        };

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }

        self.updated_at = Utc::now();

        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }

    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn new_task() -> NewTask {
        NewTask {
            title: String::from("Write spec"),
            description: String::from("Draft doc"),
            status: None,
            priority: None,
            due_date: None,
        }
    }

    #[test]
    fn defaults_applied() {
        let task = Task::new(new_task()).unwrap();

        assert_eq!(task.status, TaskStatus::Pendiente);
        assert_eq!(task.priority, TaskPriority::Media);
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.deleted_at.is_none());
    }

    #[test]
    fn text_fields_trimmed() {
        let task = Task::new(NewTask {
            title: String::from("  Write spec  "),
            description: String::from("\tDraft doc\n"),
            ..new_task()
        })
        .unwrap();

        assert_eq!(task.title, "Write spec");
        assert_eq!(task.description, "Draft doc");
    }

    #[test]
    fn blank_title_rejected() {
        let err = Task::new(NewTask {
            title: String::from("   "),
            ..new_task()
        })
        .unwrap_err();

        assert_eq!(err, ValidationError::Blank { field: "title" });
    }

    #[test]
    fn blank_description_rejected() {
        let err = Task::new(NewTask {
            description: String::new(),
            ..new_task()
        })
        .unwrap_err();

        assert_eq!(err, ValidationError::Blank { field: "description" });
    }

    #[test]
    fn status_accepts_legacy_spelling() {
        let status: TaskStatus = serde_json::from_str("\"en progreso\"").unwrap();
        assert_eq!(status, TaskStatus::EnProgreso);

        // The canonical form is the only one emitted.
        assert_eq!(
            serde_json::to_string(&TaskStatus::EnProgreso).unwrap(),
            "\"en_progreso\""
        );
    }

    #[test]
    fn unknown_enum_values_rejected() {
        assert!(serde_json::from_str::<TaskStatus>("\"archivada\"").is_err());
        assert!(serde_json::from_str::<TaskPriority>("\"urgente\"").is_err());
    }

    #[test]
    fn task_wire_shape() {
        let task = Task::new(new_task()).unwrap();
        let value = serde_json::to_value(&task).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(value["status"], "pendiente");
        assert_eq!(value["priority"], "media");
        assert!(object.contains_key("createdAt"));
        assert!(object.contains_key("updatedAt"));
        assert!(!object.contains_key("dueDate"));
        assert!(!object.contains_key("deletedAt"));
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let patch: TaskUpdate = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(patch.due_date, Some(None));

        let patch: TaskUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.due_date, None);
    }

    #[test]
    fn apply_retains_unspecified_fields() {
        let due = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();
        let mut task = Task::new(NewTask {
            due_date: Some(due),
            ..new_task()
        })
        .unwrap();
        let created = task.created_at;
        task.updated_at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        task.apply(TaskUpdate {
            status: Some(TaskStatus::Completada),
            ..TaskUpdate::default()
        })
        .unwrap();

        assert_eq!(task.status, TaskStatus::Completada);
        assert_eq!(task.title, "Write spec");
        assert_eq!(task.description, "Draft doc");
        assert_eq!(task.priority, TaskPriority::Media);
        assert_eq!(task.due_date, Some(due));
        assert_eq!(task.created_at, created);
        assert!(task.updated_at > Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn apply_clears_due_date_on_explicit_null() {
        let due = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();
        let mut task = Task::new(NewTask {
            due_date: Some(due),
            ..new_task()
        })
        .unwrap();

        task.apply(TaskUpdate {
            due_date: Some(None),
            ..TaskUpdate::default()
        })
        .unwrap();

        assert_eq!(task.due_date, None);
    }

    #[test]
    fn rejected_patch_changes_nothing() {
        let mut task = Task::new(new_task()).unwrap();
        let original = task.clone();

        let err = task
            .apply(TaskUpdate {
                title: Some(String::from("  ")),
                description: Some(String::from("rewritten")),
                ..TaskUpdate::default()
            })
            .unwrap_err();

        assert_eq!(err, ValidationError::Blank { field: "title" });
        assert_eq!(task, original);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Student entity. `name`, `enrollment` and `email` are encrypted at rest.
///
/// Any encrypted field may come back as `None` when its stored value is
/// unreadable; the rest of the record still loads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Student {
    pub id: Uuid,
    pub name: Option<String>,
    /// Institutional enrollment number (matrícula).
    pub enrollment: Option<i32>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when registering a student.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewStudent {
    pub name: Option<String>,
    pub enrollment: Option<i32>,
    pub email: Option<String>,
}

impl Student {
    pub fn new(fields: NewStudent) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: fields.name,
            enrollment: fields.enrollment,
            email: fields.email,
            created_at: Utc::now(),
        }
    }
}

/// Repository contract for student persistence.
pub trait StudentRepository: Send + Sync {
    fn list(&self) -> anyhow::Result<Vec<Student>>;
    fn get(&self, id: Uuid) -> anyhow::Result<Option<Student>>;
    fn create(&self, fields: NewStudent) -> anyhow::Result<Student>;
    /// Overwrite the encrypted fields of an existing student; `false` if absent.
    fn update(&self, student: &Student) -> anyhow::Result<bool>;
    /// Remove a student (idempotent); `false` if it did not exist.
    fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

//! SQLite-backed student repository. Encrypted columns go through explicit
//! attribute codecs on every read and write.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use conecta_core::{
    cipher::Cipher,
    codec::{AttributeCodec, IntegerCodec, TextCodec},
    connection::{ConnectionFactory, ConnectionProvider},
    diagnostics::DiagnosticSink,
    students::{NewStudent, Student, StudentRepository},
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS students (
    id          TEXT PRIMARY KEY,
    name        TEXT,
    enrollment  TEXT,
    email       TEXT,
    created_at  TEXT NOT NULL
);
";

const SELECT_COLUMNS: &str = "SELECT id, name, enrollment, email, created_at FROM students";

/// Column values as stored, before decoding.
struct StoredRow {
    id: String,
    name: Option<String>,
    enrollment: Option<String>,
    email: Option<String>,
    created_at: String,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            enrollment: row.get(2)?,
            email: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

/// Encrypted columns of one student, ready to bind.
struct EncodedFields {
    name: Option<String>,
    enrollment: Option<String>,
    email: Option<String>,
}

/// Student repository over a shared [`ConnectionProvider`].
/// Each operation takes its own connection handle and releases it on return.
pub struct SqliteStudentRepo<F, C>
where
    F: ConnectionFactory<Handle = Connection>,
    C: Cipher,
{
    provider: Arc<ConnectionProvider<F>>,
    name: TextCodec<C>,
    enrollment: IntegerCodec<C>,
    email: TextCodec<C>,
}

impl<F, C> SqliteStudentRepo<F, C>
where
    F: ConnectionFactory<Handle = Connection>,
    C: Cipher,
{
    /// Build the repository and make sure the `students` table exists.
    pub fn new(
        provider: Arc<ConnectionProvider<F>>,
        cipher: Arc<C>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self> {
        let repo = Self {
            name: TextCodec::new("student.name", cipher.clone(), sink.clone()),
            enrollment: IntegerCodec::new("student.enrollment", cipher.clone(), sink.clone()),
            email: TextCodec::new("student.email", cipher, sink),
            provider,
        };
        repo.connection()?
            .execute_batch(SCHEMA)
            .context("creating students table")?;
        Ok(repo)
    }

    fn connection(&self) -> Result<Connection> {
        self.provider
            .open_connection()
            .context("opening storage connection")
    }

    fn encode(
        &self,
        name: Option<&String>,
        enrollment: Option<&i32>,
        email: Option<&String>,
    ) -> Result<EncodedFields> {
        Ok(EncodedFields {
            name: self.name.to_storage(name)?,
            enrollment: self.enrollment.to_storage(enrollment)?,
            email: self.email.to_storage(email)?,
        })
    }

    fn decode(&self, row: StoredRow) -> Result<Student> {
        let id = Uuid::parse_str(&row.id).context("stored student id is not a uuid")?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .context("stored created_at is not rfc3339")?
            .with_timezone(&Utc);
        Ok(Student {
            id,
            name: self.name.from_storage(row.name.as_deref()),
            enrollment: self.enrollment.from_storage(row.enrollment.as_deref()),
            email: self.email.from_storage(row.email.as_deref()),
            created_at,
        })
    }
}

impl<F, C> StudentRepository for SqliteStudentRepo<F, C>
where
    F: ConnectionFactory<Handle = Connection>,
    C: Cipher,
{
    #[instrument(skip_all)]
    fn list(&self) -> Result<Vec<Student>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at"))?;
        let rows = stmt
            .query_map([], StoredRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(count = rows.len(), "loaded student rows");
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    #[instrument(skip(self))]
    fn get(&self, id: Uuid) -> Result<Option<Student>> {
        let conn = self.connection()?;
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id.to_string()],
                StoredRow::from_row,
            )
            .optional()?;
        row.map(|row| self.decode(row)).transpose()
    }

    #[instrument(skip_all)]
    fn create(&self, fields: NewStudent) -> Result<Student> {
        let student = Student::new(fields);
        let encoded = self.encode(
            student.name.as_ref(),
            student.enrollment.as_ref(),
            student.email.as_ref(),
        )?;
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO students (id, name, enrollment, email, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                student.id.to_string(),
                encoded.name,
                encoded.enrollment,
                encoded.email,
                student.created_at.to_rfc3339(),
            ],
        )?;
        debug!(id = %student.id, "student created");
        Ok(student)
    }

    #[instrument(skip_all, fields(id = %student.id))]
    fn update(&self, student: &Student) -> Result<bool> {
        let encoded = self.encode(
            student.name.as_ref(),
            student.enrollment.as_ref(),
            student.email.as_ref(),
        )?;
        let conn = self.connection()?;
        let changed = conn.execute(
            "UPDATE students SET name = ?2, enrollment = ?3, email = ?4 WHERE id = ?1",
            params![
                student.id.to_string(),
                encoded.name,
                encoded.enrollment,
                encoded.email,
            ],
        )?;
        Ok(changed > 0)
    }

    #[instrument(skip(self))]
    fn delete(&self, id: Uuid) -> Result<bool> {
        let conn = self.connection()?;
        let removed = conn.execute("DELETE FROM students WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }
}

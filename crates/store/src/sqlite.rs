//! SQLite student store.
//!
//! Three tables:
//! - `students`: identity and contact details
//! - `student_profiles`: one row per student, created with the student
//! - `documents`: uploaded document records
//!
//! Profiles and documents cascade-delete with their student. Set-valued
//! profile fields are stored as JSON arrays in TEXT columns.

use async_trait::async_trait;
use campusfed_core::error::StoreError;
use campusfed_core::store::{NewDocument, StudentStore};
use campusfed_core::student::{DocumentRecord, NewStudent, Profile, ProfileUpdate, StudentId, VerificationStatus};
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const PROFILE_SELECT: &str = r#"
    SELECT p.student_id, s.full_name, p.highest_percentage, p.degrees, p.annual_income, p.verified_skills
    FROM student_profiles p
    JOIN students s ON s.id = p.student_id
"#;

const DOCUMENT_SELECT: &str = r#"
    SELECT id, student_id, document_type, verification_status, uploaded_at
    FROM documents
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite student store initialized at {url}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name    TEXT NOT NULL,
                email        TEXT UNIQUE NOT NULL,
                phone_number TEXT,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("students table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS student_profiles (
                student_id         INTEGER PRIMARY KEY REFERENCES students(id) ON DELETE CASCADE,
                highest_percentage REAL NOT NULL DEFAULT 0.0,
                degrees            TEXT NOT NULL DEFAULT '[]',
                annual_income      INTEGER,
                verified_skills    TEXT NOT NULL DEFAULT '[]'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("student_profiles table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id          INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                document_type       TEXT NOT NULL,
                verification_status TEXT NOT NULL DEFAULT 'Pending',
                uploaded_at         TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("documents table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_student ON documents(student_id, uploaded_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("documents index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_profile(row: &SqliteRow) -> Result<Profile, StoreError> {
        let owner: i64 = row
            .try_get("student_id")
            .map_err(|e| StoreError::QueryFailed(format!("student_id column: {e}")))?;
        let full_name: String = row
            .try_get("full_name")
            .map_err(|e| StoreError::QueryFailed(format!("full_name column: {e}")))?;
        let highest_percentage: f64 = row
            .try_get("highest_percentage")
            .map_err(|e| StoreError::QueryFailed(format!("highest_percentage column: {e}")))?;
        let degrees: String = row
            .try_get("degrees")
            .map_err(|e| StoreError::QueryFailed(format!("degrees column: {e}")))?;
        let annual_income: Option<i64> = row
            .try_get("annual_income")
            .map_err(|e| StoreError::QueryFailed(format!("annual_income column: {e}")))?;
        let verified_skills: String = row
            .try_get("verified_skills")
            .map_err(|e| StoreError::QueryFailed(format!("verified_skills column: {e}")))?;

        let annual_income = annual_income
            .map(|v| {
                u64::try_from(v).map_err(|_| StoreError::Corrupt(format!("negative income for student {owner}")))
            })
            .transpose()?;

        Ok(Profile {
            owner: StudentId(owner),
            full_name,
            highest_percentage,
            degrees: Self::decode_set(owner, "degrees", &degrees)?,
            annual_income,
            verified_skills: Self::decode_set(owner, "verified_skills", &verified_skills)?,
        })
    }

    fn row_to_document(row: &SqliteRow) -> Result<DocumentRecord, StoreError> {
        let document_id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let owner: i64 = row
            .try_get("student_id")
            .map_err(|e| StoreError::QueryFailed(format!("student_id column: {e}")))?;
        let document_type: String = row
            .try_get("document_type")
            .map_err(|e| StoreError::QueryFailed(format!("document_type column: {e}")))?;
        let status: String = row
            .try_get("verification_status")
            .map_err(|e| StoreError::QueryFailed(format!("verification_status column: {e}")))?;
        let uploaded_at: String = row
            .try_get("uploaded_at")
            .map_err(|e| StoreError::QueryFailed(format!("uploaded_at column: {e}")))?;

        let verification_status = VerificationStatus::from_str(&status).map_err(StoreError::Corrupt)?;
        let uploaded_at = chrono::DateTime::parse_from_rfc3339(&uploaded_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt(format!("document {document_id} uploaded_at: {e}")))?;

        Ok(DocumentRecord {
            document_id,
            owner: StudentId(owner),
            document_type,
            verification_status,
            uploaded_at,
        })
    }

    fn decode_set(owner: i64, column: &str, json: &str) -> Result<BTreeSet<String>, StoreError> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::Corrupt(format!("student {owner} {column}: {e}")))
    }

    fn encode_set(set: &BTreeSet<String>) -> Result<String, StoreError> {
        serde_json::to_string(set).map_err(|e| StoreError::Storage(format!("set serialization: {e}")))
    }

    /// The read-modify-write half of `merge_profile`, run inside an
    /// immediate transaction on `conn`.
    async fn merge_in(
        conn: &mut SqliteConnection,
        owner: StudentId,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query(&format!("{PROFILE_SELECT} WHERE p.student_id = ?1"))
            .bind(owner.0)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("profile lookup: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut profile = Self::row_to_profile(&row)?;
        profile.merge(update);

        let income = profile
            .annual_income
            .map(|v| i64::try_from(v).map_err(|_| StoreError::Storage(format!("income {v} out of range"))))
            .transpose()?;

        sqlx::query(
            r#"
            UPDATE student_profiles
            SET highest_percentage = ?2, degrees = ?3, annual_income = ?4, verified_skills = ?5
            WHERE student_id = ?1
            "#,
        )
        .bind(owner.0)
        .bind(profile.highest_percentage)
        .bind(Self::encode_set(&profile.degrees)?)
        .bind(income)
        .bind(Self::encode_set(&profile.verified_skills)?)
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::Storage(format!("UPDATE profile failed: {e}")))?;

        Ok(Some(profile))
    }
}

/// Fixed-width RFC 3339 so TEXT ordering matches time ordering.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl StudentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_student(&self, student: NewStudent) -> Result<StudentId, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO students (full_name, email, phone_number, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&student.full_name)
        .bind(&student.email)
        .bind(&student.phone_number)
        .bind(timestamp())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT student failed: {e}")))?;

        let id = StudentId(result.last_insert_rowid());

        sqlx::query("INSERT INTO student_profiles (student_id) VALUES (?1)")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT profile failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("commit: {e}")))?;

        debug!(student_id = %id, "Created student");
        Ok(id)
    }

    async fn add_document(&self, document: NewDocument) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (student_id, document_type, verification_status, uploaded_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(document.owner.0)
        .bind(&document.document_type)
        .bind(document.verification_status.as_str())
        .bind(timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT document failed: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    async fn get_profile(&self, owner: StudentId) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query(&format!("{PROFILE_SELECT} WHERE p.student_id = ?1"))
            .bind(owner.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("profile lookup: {e}")))?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let rows = sqlx::query(&format!("{PROFILE_SELECT} ORDER BY p.student_id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("profile listing: {e}")))?;

        rows.iter().map(Self::row_to_profile).collect()
    }

    async fn list_documents(&self, owner: StudentId) -> Result<Vec<DocumentRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "{DOCUMENT_SELECT} WHERE student_id = ?1 ORDER BY uploaded_at DESC, id DESC"
        ))
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("document listing: {e}")))?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn list_all_documents(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let rows = sqlx::query(&format!("{DOCUMENT_SELECT} ORDER BY uploaded_at DESC, id DESC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("document listing: {e}")))?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn merge_profile(&self, owner: StudentId, update: &ProfileUpdate) -> Result<Option<Profile>, StoreError> {
        // Take the write lock up front so concurrent merges serialize instead
        // of failing on a deferred lock upgrade. Dropping `tx` rolls back.
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| StoreError::Storage(format!("begin: {e}")))?;

        let result = Self::merge_in(&mut *tx, owner, update).await;
        if result.is_ok() {
            tx.commit()
                .await
                .map_err(|e| StoreError::Storage(format!("commit: {e}")))?;
        }

        if let Ok(Some(profile)) = &result {
            debug!(student_id = %owner, percentage = profile.highest_percentage, "Merged profile update");
        }
        result
    }

    async fn delete_student(&self, owner: StudentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?1")
            .bind(owner.0)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    fn student(name: &str, email: &str) -> NewStudent {
        NewStudent {
            full_name: name.into(),
            email: email.into(),
            phone_number: None,
        }
    }

    #[tokio::test]
    async fn creating_a_student_creates_an_empty_profile() {
        let store = store().await;
        let id = store.create_student(student("Asha Rao", "asha@example.com")).await.unwrap();

        let profile = store.get_profile(id).await.unwrap().unwrap();
        assert_eq!(profile.full_name, "Asha Rao");
        assert_eq!(profile.highest_percentage, 0.0);
        assert!(profile.degrees.is_empty());
        assert!(profile.annual_income.is_none());
    }

    #[tokio::test]
    async fn unknown_student_has_no_profile() {
        let store = store().await;
        assert!(store.get_profile(StudentId(99)).await.unwrap().is_none());
        assert!(store
            .merge_profile(StudentId(99), &ProfileUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = store().await;
        store.create_student(student("A", "same@example.com")).await.unwrap();
        let err = store.create_student(student("B", "same@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(store.list_profiles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn merge_persists_max_and_union() {
        let store = store().await;
        let id = store.create_student(student("Asha Rao", "asha@example.com")).await.unwrap();

        store
            .merge_profile(
                id,
                &ProfileUpdate {
                    percentage: Some(78.0),
                    skills: ["Python".to_string()].into(),
                    annual_income: Some(200_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let merged = store
            .merge_profile(
                id,
                &ProfileUpdate {
                    percentage: Some(65.0),
                    skills: ["SQL".to_string()].into(),
                    degrees: ["B.Tech".to_string()].into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(merged.highest_percentage, 78.0);
        assert_eq!(merged.annual_income, Some(200_000));

        let reloaded = store.get_profile(id).await.unwrap().unwrap();
        assert_eq!(reloaded, merged);
        assert!(reloaded.has_skill("python") && reloaded.has_skill("sql"));
        assert!(reloaded.has_degree("B.Tech"));
    }

    #[tokio::test]
    async fn concurrent_merges_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("merge.db").display());
        let store = std::sync::Arc::new(SqliteStore::new(&url).await.unwrap());
        let id = store.create_student(student("Ravi", "ravi@example.com")).await.unwrap();

        let mut handles = Vec::new();
        for skill in ["Rust", "Go", "SQL", "Python"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .merge_profile(
                        id,
                        &ProfileUpdate {
                            skills: [skill.to_string()].into(),
                            ..Default::default()
                        },
                    )
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let profile = store.get_profile(id).await.unwrap().unwrap();
        assert_eq!(profile.verified_skills.len(), 4);
    }

    #[tokio::test]
    async fn abandoned_merge_does_not_leave_a_transaction_open() {
        use futures::FutureExt;

        let store = store().await;
        let id = store.create_student(student("Ravi", "ravi@example.com")).await.unwrap();
        let update = ProfileUpdate {
            skills: ["Rust".to_string()].into(),
            ..Default::default()
        };

        // Polled once then dropped, like a cancelled request.
        let _ = store.merge_profile(id, &update).now_or_never();

        // The in-memory pool has a single connection; a leaked transaction
        // would make this BEGIN fail.
        let merged = store.merge_profile(id, &update).await.unwrap().unwrap();
        assert!(merged.has_skill("Rust"));
        assert_eq!(store.get_profile(id).await.unwrap().unwrap(), merged);
    }

    #[tokio::test]
    async fn documents_are_scoped_and_newest_first() {
        let store = store().await;
        let a = store.create_student(student("A", "a@example.com")).await.unwrap();
        let b = store.create_student(student("B", "b@example.com")).await.unwrap();

        let first = store
            .add_document(NewDocument {
                owner: a,
                document_type: "10th Marksheet".into(),
                verification_status: VerificationStatus::Verified,
            })
            .await
            .unwrap();
        let second = store
            .add_document(NewDocument {
                owner: a,
                document_type: "Income Certificate".into(),
                verification_status: VerificationStatus::Pending,
            })
            .await
            .unwrap();
        store
            .add_document(NewDocument {
                owner: b,
                document_type: "Aadhar".into(),
                verification_status: VerificationStatus::Rejected,
            })
            .await
            .unwrap();

        let docs = store.list_documents(a).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].document_id, second);
        assert_eq!(docs[1].document_id, first);
        assert_eq!(docs[1].verification_status, VerificationStatus::Verified);

        assert_eq!(store.list_all_documents().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn deleting_a_student_cascades() {
        let store = store().await;
        let id = store.create_student(student("Gone", "gone@example.com")).await.unwrap();
        store
            .add_document(NewDocument {
                owner: id,
                document_type: "Resume".into(),
                verification_status: VerificationStatus::Pending,
            })
            .await
            .unwrap();

        assert!(store.delete_student(id).await.unwrap());
        assert!(store.get_profile(id).await.unwrap().is_none());
        assert!(store.list_all_documents().await.unwrap().is_empty());
        assert!(!store.delete_student(id).await.unwrap());
    }

    #[tokio::test]
    async fn document_for_unknown_student_is_rejected() {
        let store = store().await;
        let err = store
            .add_document(NewDocument {
                owner: StudentId(404),
                document_type: "Resume".into(),
                verification_status: VerificationStatus::Pending,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }
}

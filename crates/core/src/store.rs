//! StudentStore trait: the relational profile/document collaborator.
//!
//! The query pipeline only reads through this trait. The ETL updater is the
//! single writer of profile rows, via `merge_profile`, which must apply the
//! merge as one read-modify-write per owner.
//!
//! Implementations: SQLite, in-memory (for testing).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::student::{DocumentRecord, NewStudent, Profile, ProfileUpdate, StudentId, VerificationStatus};

/// A document to attach to a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub owner: StudentId,
    pub document_type: String,
    #[serde(default = "default_status")]
    pub verification_status: VerificationStatus,
}

fn default_status() -> VerificationStatus {
    VerificationStatus::Pending
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Create a student together with its empty profile.
    async fn create_student(&self, student: NewStudent) -> Result<StudentId, StoreError>;

    /// Attach a document record; returns its id.
    async fn add_document(&self, document: NewDocument) -> Result<i64, StoreError>;

    /// The owner's profile, or `None` if the student does not exist.
    async fn get_profile(&self, owner: StudentId) -> Result<Option<Profile>, StoreError>;

    /// Every profile, ordered by owner id.
    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError>;

    /// The owner's documents, newest first.
    async fn list_documents(&self, owner: StudentId) -> Result<Vec<DocumentRecord>, StoreError>;

    /// Every document across all students, newest first.
    async fn list_all_documents(&self) -> Result<Vec<DocumentRecord>, StoreError>;

    /// Merge an update into the owner's profile atomically.
    /// Returns the merged profile, or `None` if the student does not exist.
    async fn merge_profile(&self, owner: StudentId, update: &ProfileUpdate) -> Result<Option<Profile>, StoreError>;

    /// Delete a student; the profile and documents go with it.
    async fn delete_student(&self, owner: StudentId) -> Result<bool, StoreError>;
}

//! In-memory store: useful for testing and demos.

use async_trait::async_trait;
use campusfed_core::error::StoreError;
use campusfed_core::store::{NewDocument, StudentStore};
use campusfed_core::student::{DocumentRecord, NewStudent, Profile, ProfileUpdate, StudentId};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    next_student: i64,
    next_document: i64,
    emails: BTreeMap<String, StudentId>,
    profiles: BTreeMap<StudentId, Profile>,
    documents: Vec<DocumentRecord>,
}

/// A store that keeps everything behind one lock.
/// Merges run under the write lock, so they are atomic per owner.
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(docs: &mut [DocumentRecord]) {
    docs.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then(b.document_id.cmp(&a.document_id))
    });
}

#[async_trait]
impl StudentStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_student(&self, student: NewStudent) -> Result<StudentId, StoreError> {
        let mut t = self.tables.write().await;
        if t.emails.contains_key(&student.email) {
            return Err(StoreError::Storage(format!("email already registered: {}", student.email)));
        }
        t.next_student += 1;
        let id = StudentId(t.next_student);
        t.emails.insert(student.email, id);
        t.profiles.insert(id, Profile::empty(id, student.full_name));
        Ok(id)
    }

    async fn add_document(&self, document: NewDocument) -> Result<i64, StoreError> {
        let mut t = self.tables.write().await;
        if !t.profiles.contains_key(&document.owner) {
            return Err(StoreError::Storage(format!("no student {}", document.owner)));
        }
        t.next_document += 1;
        let document_id = t.next_document;
        t.documents.push(DocumentRecord {
            document_id,
            owner: document.owner,
            document_type: document.document_type,
            verification_status: document.verification_status,
            uploaded_at: Utc::now(),
        });
        Ok(document_id)
    }

    async fn get_profile(&self, owner: StudentId) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(&owner).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self.tables.read().await.profiles.values().cloned().collect())
    }

    async fn list_documents(&self, owner: StudentId) -> Result<Vec<DocumentRecord>, StoreError> {
        let t = self.tables.read().await;
        let mut docs: Vec<_> = t.documents.iter().filter(|d| d.owner == owner).cloned().collect();
        newest_first(&mut docs);
        Ok(docs)
    }

    async fn list_all_documents(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut docs = self.tables.read().await.documents.clone();
        newest_first(&mut docs);
        Ok(docs)
    }

    async fn merge_profile(&self, owner: StudentId, update: &ProfileUpdate) -> Result<Option<Profile>, StoreError> {
        let mut t = self.tables.write().await;
        Ok(t.profiles.get_mut(&owner).map(|p| {
            p.merge(update);
            p.clone()
        }))
    }

    async fn delete_student(&self, owner: StudentId) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        if t.profiles.remove(&owner).is_none() {
            return Ok(false);
        }
        t.emails.retain(|_, id| *id != owner);
        t.documents.retain(|d| d.owner != owner);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusfed_core::student::VerificationStatus;

    fn student(name: &str, email: &str) -> NewStudent {
        NewStudent {
            full_name: name.into(),
            email: email.into(),
            phone_number: None,
        }
    }

    #[tokio::test]
    async fn create_merge_and_list() {
        let store = InMemoryStore::new();
        let a = store.create_student(student("Asha", "a@example.com")).await.unwrap();
        let b = store.create_student(student("Ben", "b@example.com")).await.unwrap();
        assert_ne!(a, b);

        store
            .merge_profile(
                b,
                &ProfileUpdate {
                    skills: ["Python".to_string()].into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let profiles = store.list_profiles().await.unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].owner, a);
        assert!(profiles[1].has_skill("python"));
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = InMemoryStore::new();
        store.create_student(student("A", "x@example.com")).await.unwrap();
        assert!(store.create_student(student("B", "x@example.com")).await.is_err());
    }

    #[tokio::test]
    async fn documents_newest_first_and_cascade() {
        let store = InMemoryStore::new();
        let a = store.create_student(student("A", "a@example.com")).await.unwrap();
        let first = store
            .add_document(NewDocument {
                owner: a,
                document_type: "Resume".into(),
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

        let docs = store.list_documents(a).await.unwrap();
        assert_eq!(
            docs.iter().map(|d| d.document_id).collect::<Vec<_>>(),
            vec![second, first]
        );

        assert!(store.delete_student(a).await.unwrap());
        assert!(store.list_all_documents().await.unwrap().is_empty());
        assert!(store.get_profile(a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn merge_for_unknown_student_is_none() {
        let store = InMemoryStore::new();
        let merged = store
            .merge_profile(StudentId(5), &ProfileUpdate::default())
            .await
            .unwrap();
        assert!(merged.is_none());
    }
}

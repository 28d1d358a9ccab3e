//! Student service

use chrono::Utc;
use std::sync::Arc;

use super::ServiceResult;
use crate::files::FileStore;
use crate::storage::{NewStudent, StorageEngine, StorageResult, Student, StudentPatch};

pub struct StudentService {
    store: Arc<StorageEngine>,
    files: FileStore,
}

impl StudentService {
    pub fn new(store: Arc<StorageEngine>, files: FileStore) -> Self {
        Self { store, files }
    }

    /// All students, ordered by name
    pub fn list(&self) -> StorageResult<Vec<Student>> {
        self.store.list_students(None)
    }

    pub fn list_by_class(&self, class: &str) -> StorageResult<Vec<Student>> {
        self.store.list_students(Some(class))
    }

    pub fn get(&self, id: &str) -> StorageResult<Student> {
        self.store.get_student(id)
    }

    pub fn count(&self) -> StorageResult<usize> {
        self.store.count_students()
    }

    /// Create a student and return its id
    pub fn create(&self, new: NewStudent) -> StorageResult<String> {
        let student = self.store.insert_student(new, Utc::now())?;
        tracing::info!(student_id = %student.id, class = %student.class, "Student created");
        Ok(student.id)
    }

    pub fn update(&self, id: &str, patch: &StudentPatch) -> StorageResult<Student> {
        self.store.update_student(id, patch, Utc::now())
    }

    pub fn delete(&self, id: &str) -> StorageResult<()> {
        self.store.delete_student(id)?;
        tracing::info!(student_id = %id, "Student deleted");
        Ok(())
    }

    /// Store a photo at `students/{id}/{file_name}` and record its URL
    pub async fn upload_photo(
        &self,
        id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> ServiceResult<String> {
        // fail before writing the file for unknown students
        self.store.get_student(id)?;

        let url = self.files.put_student_photo(id, file_name, bytes).await?;
        self.store
            .update_student(id, &StudentPatch::photo(url.clone()), Utc::now())?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::storage::StorageError;
    use tempfile::tempdir;

    fn service(dir: &std::path::Path) -> StudentService {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        StudentService::new(store, FileStore::new(dir, "http://files"))
    }

    #[test]
    fn test_create_returns_id() {
        let dir = tempdir().unwrap();
        let students = service(dir.path());

        let id = students
            .create(NewStudent::new("SV001", "An", "12A1").major("Math"))
            .unwrap();
        let student = students.get(&id).unwrap();
        assert!(student.is_synced);
        assert_eq!(student.created_at, student.updated_at);
        assert_eq!(students.list_by_class("12A1").unwrap().len(), 1);
        assert!(students.list_by_class("12A2").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_photo_sets_url() {
        let dir = tempdir().unwrap();
        let students = service(dir.path());
        let id = students.create(NewStudent::new("SV001", "An", "12A1")).unwrap();

        let url = students.upload_photo(&id, "face.png", b"png").await.unwrap();

        assert_eq!(url, format!("http://files/students/{}/face.png", id));
        assert_eq!(students.get(&id).unwrap().photo_url, Some(url));
    }

    #[tokio::test]
    async fn test_upload_photo_unknown_student() {
        let dir = tempdir().unwrap();
        let students = service(dir.path());

        let err = students
            .upload_photo("missing", "face.png", b"png")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Storage(StorageError::NotFound { .. })
        ));
        assert!(!dir.path().join("students").exists());
    }
}

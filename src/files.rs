//! File storage for uploaded student photos
//!
//! Files live under a root directory at `students/{id}/{file_name}` and are
//! served read-only at `public_base_url`.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("Empty upload")]
    Empty,
}

pub type FileResult<T> = Result<T, FileError>;

/// Local directory acting as the photo bucket
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    public_base_url: String,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a student's photo and return its public URL
    pub async fn put_student_photo(
        &self,
        student_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> FileResult<String> {
        if bytes.is_empty() {
            return Err(FileError::Empty);
        }
        let student_id = safe_component(student_id)?;
        let file_name = safe_component(file_name)?;

        let dir = self.root.join("students").join(&student_id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        tracing::debug!(
            student_id = %student_id,
            file_name = %file_name,
            size = bytes.len(),
            "Stored student photo"
        );

        Ok(self.public_url(&["students", &student_id, &file_name]))
    }

    fn public_url(&self, segments: &[&str]) -> String {
        let path: Vec<String> = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, path.join("/"))
    }
}

/// Reduce a client-supplied name to its final path component
fn safe_component(name: &str) -> FileResult<String> {
    let last = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        return Err(FileError::InvalidName(name.to_string()));
    }
    Ok(last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_safe_component() {
        assert_eq!(safe_component("avatar.png").unwrap(), "avatar.png");
        assert_eq!(safe_component("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(safe_component("C:\\pics\\me.jpg").unwrap(), "me.jpg");
        assert!(safe_component("dir/").is_err());
        assert!(safe_component("..").is_err());
        assert!(safe_component("").is_err());
    }

    #[tokio::test]
    async fn test_put_student_photo() {
        let dir = tempdir().unwrap();
        let files = FileStore::new(dir.path(), "http://localhost:8090/files/");

        let url = files
            .put_student_photo("s1", "my photo.jpg", b"jpeg-bytes")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:8090/files/students/s1/my%20photo.jpg");
        let stored = std::fs::read(dir.path().join("students/s1/my photo.jpg")).unwrap();
        assert_eq!(stored, b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let dir = tempdir().unwrap();
        let files = FileStore::new(dir.path(), "http://x/files");
        assert!(matches!(
            files.put_student_photo("s1", "a.png", b"").await,
            Err(FileError::Empty)
        ));
    }
}

//! The document repository.
//!
//! Documents are flat files identified only by name. New names must match
//! `^[A-Za-z0-9_-]+\.(md|txt)$`; existing files with other names can still
//! be listed, read, edited and deleted, as long as they are plain names that
//! cannot escape the directory.

use std::sync::Arc;

use tracing::info;

use docshelf_storage::{StorageBackend, validate_key};

use crate::error::{DocumentError, FilenameError};
use crate::render::{Rendered, render};

/// Extensions accepted for new documents.
const ALLOWED_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// Classify a proposed filename.
///
/// Checks run in priority order: empty, then extension, then characters.
///
/// # Errors
///
/// Returns the first [`FilenameError`] that applies.
pub fn classify_filename(name: &str) -> Result<(), FilenameError> {
    if name.trim().is_empty() {
        return Err(FilenameError::Empty);
    }

    let Some((base, extension)) = name.rsplit_once('.') else {
        return Err(FilenameError::BadExtension);
    };
    if !ALLOWED_EXTENSIONS.contains(&extension) {
        return Err(FilenameError::BadExtension);
    }

    let valid_base = !base.is_empty()
        && base
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_base {
        return Err(FilenameError::InvalidCharacters);
    }

    Ok(())
}

/// True iff `name` is acceptable for a new document.
#[must_use]
pub fn validate_filename(name: &str) -> bool {
    classify_filename(name).is_ok()
}

/// Documents stored in a sandboxed flat namespace.
#[derive(Clone)]
pub struct DocumentRepository {
    storage: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for DocumentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRepository").finish_non_exhaustive()
    }
}

/// Names that cannot be storage keys can never exist.
fn addressable(name: &str) -> Result<(), DocumentError> {
    validate_key(name).map_err(|_| DocumentError::NotFound {
        name: name.to_owned(),
    })
}

impl DocumentRepository {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// All document names, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Storage`] if the directory cannot be listed.
    pub async fn list(&self) -> Result<Vec<String>, DocumentError> {
        Ok(self.storage.list("").await?)
    }

    /// Whether a document with this name exists.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Storage`] if the check itself fails.
    pub async fn exists(&self, name: &str) -> Result<bool, DocumentError> {
        if addressable(name).is_err() {
            return Ok(false);
        }
        Ok(self.storage.exists(name).await?)
    }

    /// Raw contents of a document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] if there is no such document.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, DocumentError> {
        addressable(name)?;
        self.storage
            .get(name)
            .await?
            .ok_or_else(|| DocumentError::NotFound {
                name: name.to_owned(),
            })
    }

    /// Read a document and render it for display.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    pub async fn render(&self, name: &str) -> Result<Rendered, DocumentError> {
        let content = self.read(name).await?;
        Ok(render(name, &content))
    }

    /// Replace a document's contents wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] if the document does not exist;
    /// edits never create files.
    pub async fn write(&self, name: &str, content: &[u8]) -> Result<(), DocumentError> {
        if !self.exists(name).await? {
            return Err(DocumentError::NotFound {
                name: name.to_owned(),
            });
        }
        self.storage.put(name, content).await?;
        info!(name = %name, bytes = content.len(), "document updated");
        Ok(())
    }

    /// Create an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidName`] if the name fails
    /// [`classify_filename`], or [`DocumentError::AlreadyExists`].
    pub async fn create(&self, name: &str) -> Result<(), DocumentError> {
        classify_filename(name)?;
        if self.storage.exists(name).await? {
            return Err(DocumentError::AlreadyExists {
                name: name.to_owned(),
            });
        }
        self.storage.put(name, b"").await?;
        info!(name = %name, "document created");
        Ok(())
    }

    /// Remove a document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] if the document does not exist.
    pub async fn delete(&self, name: &str) -> Result<(), DocumentError> {
        if !self.exists(name).await? {
            return Err(DocumentError::NotFound {
                name: name.to_owned(),
            });
        }
        self.storage.delete(name).await?;
        info!(name = %name, "document deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use docshelf_storage::{FsBackend, MemoryBackend};

    fn make_repo() -> DocumentRepository {
        DocumentRepository::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn accepts_well_formed_names() {
        for name in ["test.txt", "file_1.md", "A-b_C.txt", "x.md"] {
            assert!(validate_filename(name), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for name in [
            "", "test.doc", "test<>.doc", "new_file>.txt", ".md", "a b.md", "a.b.md",
            "../x.md", "dir/x.txt", "test.MD", "test", "test.txt.bak",
        ] {
            assert!(!validate_filename(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn classification_follows_priority() {
        assert_eq!(classify_filename(""), Err(FilenameError::Empty));
        assert_eq!(classify_filename("   "), Err(FilenameError::Empty));
        assert_eq!(classify_filename("test.doc"), Err(FilenameError::BadExtension));
        assert_eq!(classify_filename("test<>.doc"), Err(FilenameError::BadExtension));
        assert_eq!(classify_filename("noextension"), Err(FilenameError::BadExtension));
        assert_eq!(
            classify_filename("new_file>.txt"),
            Err(FilenameError::InvalidCharacters)
        );
        assert_eq!(classify_filename(".md"), Err(FilenameError::InvalidCharacters));
        assert_eq!(classify_filename("file_1.md"), Ok(()));
    }

    #[test]
    fn messages_are_distinct() {
        let messages = [
            FilenameError::Empty.to_string(),
            FilenameError::BadExtension.to_string(),
            FilenameError::InvalidCharacters.to_string(),
        ];
        assert_eq!(messages[0], "Please enter a filename.");
        assert!(messages[2].starts_with("Filename may only contain"));
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
    }

    #[tokio::test]
    async fn lists_documents_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("herstory.txt"), "Kamala Harris").unwrap();
        std::fs::write(dir.path().join("sample_markdown.md"), "This is a sample").unwrap();
        std::fs::create_dir(dir.path().join("drafts")).unwrap();
        let repo = DocumentRepository::new(Arc::new(FsBackend::open(dir.path()).unwrap()));

        let mut names = repo.list().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["herstory.txt", "sample_markdown.md"]);
    }

    #[tokio::test]
    async fn create_write_read_delete_lifecycle() {
        let repo = make_repo();
        repo.create("new_file.txt").await.unwrap();
        assert_eq!(repo.read("new_file.txt").await.unwrap(), b"");

        repo.write("new_file.txt", b"New Text.").await.unwrap();
        assert_eq!(repo.read("new_file.txt").await.unwrap(), b"New Text.");

        repo.delete("new_file.txt").await.unwrap();
        assert!(!repo.exists("new_file.txt").await.unwrap());
    }

    #[tokio::test]
    async fn create_validates_and_refuses_overwrite() {
        let repo = make_repo();
        assert!(matches!(
            repo.create("").await,
            Err(DocumentError::InvalidName(FilenameError::Empty))
        ));
        assert!(matches!(
            repo.create("bad>.txt").await,
            Err(DocumentError::InvalidName(FilenameError::InvalidCharacters))
        ));

        repo.create("notes.md").await.unwrap();
        repo.write("notes.md", b"keep me").await.unwrap();
        assert!(matches!(
            repo.create("notes.md").await,
            Err(DocumentError::AlreadyExists { .. })
        ));
        assert_eq!(repo.read("notes.md").await.unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let repo = make_repo();
        for result in [
            repo.read("nonexistentfile.txt").await.map(|_| ()),
            repo.write("nonexistentfile.txt", b"x").await,
            repo.delete("nonexistentfile.txt").await,
            repo.read("../credentials.json").await.map(|_| ()),
        ] {
            assert!(matches!(result, Err(DocumentError::NotFound { .. })));
        }
        assert_eq!(
            repo.read("nonexistentfile.txt").await.unwrap_err().to_string(),
            "nonexistentfile.txt was not found."
        );
    }

    #[tokio::test]
    async fn render_uses_extension() {
        let repo = make_repo();
        repo.create("sample_markdown.md").await.unwrap();
        repo.write("sample_markdown.md", b"**bold**").await.unwrap();
        assert_eq!(
            repo.render("sample_markdown.md").await.unwrap(),
            Rendered::Html("<p><strong>bold</strong></p>\n".to_owned())
        );
    }

    #[tokio::test]
    async fn legacy_names_remain_editable() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("Old Notes.txt", b"v1").await.unwrap();
        let repo = DocumentRepository::new(backend);

        repo.write("Old Notes.txt", b"v2").await.unwrap();
        assert_eq!(repo.read("Old Notes.txt").await.unwrap(), b"v2");
    }
}

use lb_core::BridgeError;
use lb_core::BridgeResult;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Source of raw legacy document bytes, keyed by document filename.
pub trait DocumentStore {
    fn load(&self, document_id: &str) -> BridgeResult<Vec<u8>>;
}

/// Reads legacy documents from a mirrored site directory.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentStore for FsDocumentStore {
    fn load(&self, document_id: &str) -> BridgeResult<Vec<u8>> {
        validate_document_id(document_id)?;
        let path = self.root.join(document_id);
        fs::read(&path).map_err(|error| {
            BridgeError::new(
                "html.store.read_failed",
                format!("failed reading legacy document `{}`: {error}", path.display()),
            )
        })
    }
}

/// In-memory store, mainly for fixtures.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: BTreeMap<String, Vec<u8>>,
}

impl MemoryDocumentStore {
    pub fn insert(&mut self, document_id: impl Into<String>, source: impl Into<Vec<u8>>) {
        self.documents.insert(document_id.into(), source.into());
    }

    pub fn with_document(
        mut self,
        document_id: impl Into<String>,
        source: impl Into<Vec<u8>>,
    ) -> Self {
        self.insert(document_id, source);
        self
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load(&self, document_id: &str) -> BridgeResult<Vec<u8>> {
        self.documents.get(document_id).cloned().ok_or_else(|| {
            BridgeError::new(
                "html.store.missing_document",
                format!("no legacy document named `{document_id}`"),
            )
        })
    }
}

fn validate_document_id(document_id: &str) -> BridgeResult<()> {
    let bare = !document_id.is_empty()
        && document_id != "."
        && document_id != ".."
        && !document_id.contains(['/', '\\']);
    if bare {
        Ok(())
    } else {
        Err(BridgeError::new(
            "html.store.invalid_document_id",
            format!("`{document_id}` is not a bare document filename"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentStore;
    use super::FsDocumentStore;
    use super::MemoryDocumentStore;
    use std::fs;

    #[test]
    fn memory_store_returns_inserted_bytes() {
        let store = MemoryDocumentStore::default().with_document("index.html", "<html></html>");
        let loaded = store.load("index.html");
        assert_eq!(loaded.ok().as_deref(), Some(b"<html></html>".as_slice()));
        assert_eq!(
            store.load("missing.html").err().map(|error| error.code),
            Some("html.store.missing_document")
        );
    }

    #[test]
    fn fs_store_rejects_path_traversal() {
        let store = FsDocumentStore::new(std::env::temp_dir());
        let error = store.load("../etc/passwd").err();
        assert_eq!(
            error.map(|error| error.code),
            Some("html.store.invalid_document_id")
        );
    }

    #[test]
    fn fs_store_reads_from_root() {
        let root = std::env::temp_dir().join(format!("lb-html-store-{}", std::process::id()));
        if let Err(error) = fs::create_dir_all(&root) {
            panic!("{error}");
        }
        if let Err(error) = fs::write(root.join("topo8esia.html"), "<p>map</p>") {
            panic!("{error}");
        }

        let store = FsDocumentStore::new(&root);
        let loaded = store.load("topo8esia.html");
        let _ = fs::remove_dir_all(&root);
        assert_eq!(loaded.ok().as_deref(), Some(b"<p>map</p>".as_slice()));
    }
}

//! File records keyed by opaque id

use crate::error::{SheetcalcError, SheetcalcResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::info;

/// Whether a file is read as source data or written into as a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    #[default]
    Upload,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub id: u64,
    pub file_name: String,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub kind: FileKind,
    pub created_at: DateTime<Utc>,
}

/// Record lookup consumed by the HTTP layer.
pub trait FileStore: Send + Sync {
    fn get_file_by_id(&self, id: u64) -> SheetcalcResult<FileRecord>;

    fn register(&self, path: &Path, kind: FileKind) -> SheetcalcResult<FileRecord>;

    fn list(&self) -> Vec<FileRecord>;
}

/// Manifest entry preloading a record under a fixed id.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub id: u64,
    pub path: PathBuf,
    #[serde(default)]
    pub kind: FileKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse a YAML manifest. Relative paths resolve against the manifest's directory.
    pub fn from_file(path: &Path) -> SheetcalcResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut manifest: Manifest = serde_yaml::from_str(&content)?;
        if let Some(base) = path.parent() {
            for entry in &mut manifest.files {
                if entry.path.is_relative() {
                    entry.path = base.join(&entry.path);
                }
            }
        }
        Ok(manifest)
    }
}

/// In-process store with ids handed out from 1.
#[derive(Debug)]
pub struct MemoryFileStore {
    records: RwLock<BTreeMap<u64, FileRecord>>,
    next_id: AtomicU64,
}

impl Default for MemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_manifest(manifest: &Manifest) -> SheetcalcResult<Self> {
        let store = Self::new();
        for entry in &manifest.files {
            store.insert(entry.id, &entry.path, entry.kind)?;
        }
        let max_id = manifest.files.iter().map(|f| f.id).max().unwrap_or(0);
        store.next_id.store(max_id + 1, Ordering::SeqCst);
        Ok(store)
    }

    fn insert(&self, id: u64, path: &Path, kind: FileKind) -> SheetcalcResult<FileRecord> {
        let metadata = fs::metadata(path)
            .map_err(|_| SheetcalcError::NotFound(format!("file {}", path.display())))?;
        if !has_workbook_extension(path) {
            return Err(SheetcalcError::InvalidRequest(format!(
                "only .xlsx and .xls files are allowed: {}",
                path.display()
            )));
        }

        let record = FileRecord {
            id,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_path: path.to_path_buf(),
            file_size: metadata.len(),
            kind,
            created_at: Utc::now(),
        };

        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, record.clone());
        info!(id, path = %path.display(), kind = ?kind, "file registered");
        Ok(record)
    }
}

fn has_workbook_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xls"))
        .unwrap_or(false)
}

impl FileStore for MemoryFileStore {
    fn get_file_by_id(&self, id: u64) -> SheetcalcResult<FileRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or_else(|| SheetcalcError::NotFound(format!("file id {}", id)))
    }

    fn register(&self, path: &Path, kind: FileKind) -> SheetcalcResult<FileRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.insert(id, path, kind)
    }

    fn list(&self) -> Vec<FileRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"stub").unwrap();
        path
    }

    #[test]
    fn test_register_and_lookup() {
        let dir = TempDir::new().unwrap();
        let store = MemoryFileStore::new();

        let first = store.register(&touch(&dir, "a.xlsx"), FileKind::Upload).unwrap();
        let second = store.register(&touch(&dir, "b.XLS"), FileKind::Template).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.file_name, "a.xlsx");
        assert_eq!(first.file_size, 4);

        let found = store.get_file_by_id(2).unwrap();
        assert_eq!(found.kind, FileKind::Template);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let store = MemoryFileStore::new();
        assert!(matches!(store.get_file_by_id(7), Err(SheetcalcError::NotFound(_))));
    }

    #[test]
    fn test_register_rejects_missing_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = MemoryFileStore::new();

        let missing = store.register(&dir.path().join("gone.xlsx"), FileKind::Upload);
        assert!(matches!(missing, Err(SheetcalcError::NotFound(_))));

        let csv = store.register(&touch(&dir, "data.csv"), FileKind::Upload);
        assert!(matches!(csv, Err(SheetcalcError::InvalidRequest(_))));
    }

    #[test]
    fn test_manifest_preloads_fixed_ids() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "data.xlsx");
        touch(&dir, "form.xlsx");
        let manifest_path = dir.path().join("files.yaml");
        fs::write(
            &manifest_path,
            "files:\n  - id: 4\n    path: data.xlsx\n  - id: 9\n    path: form.xlsx\n    kind: template\n",
        )
        .unwrap();

        let manifest = Manifest::from_file(&manifest_path).unwrap();
        let store = MemoryFileStore::from_manifest(&manifest).unwrap();

        assert_eq!(store.get_file_by_id(4).unwrap().kind, FileKind::Upload);
        assert_eq!(store.get_file_by_id(9).unwrap().kind, FileKind::Template);

        let next = store.register(&touch(&dir, "c.xlsx"), FileKind::Upload).unwrap();
        assert_eq!(next.id, 10);
    }
}

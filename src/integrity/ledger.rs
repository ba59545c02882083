//! The signature ledger: file identity → base64 signature, stored as JSON.
//!
//! ```json
//! {
//!   "src/lib.rs": "kq3L...==",
//!   "src/main.rs": "Xw9a...=="
//! }
//! ```
//!
//! Every [`Ledger::put`] rewrites the whole document, so a crash while
//! signing a large tree loses at most the file in flight. Writes go through
//! a temporary sibling file that is renamed into place.

use crate::error::{Result, ResultExt as _, SignerError};
use crate::integrity::identity::FileIdentity;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the temporary file used while persisting.
const TEMP_SUFFIX: &str = ".tmp";

/// In-memory ledger bound to its file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    path: PathBuf,
    records: BTreeMap<FileIdentity, String>,
}

impl Ledger {
    /// An empty ledger that will be persisted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: BTreeMap::new(),
        }
    }

    /// Load the ledger at `path`; a missing file yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::LedgerCorrupt`] if the file is not a JSON object
    /// of strings, and an I/O error if it exists but cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!("No ledger at {}, starting empty", path.display());
            return Ok(Self::new(path));
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read ledger {}", path.display()))?;
        let records = serde_json::from_str(&content).map_err(|e| SignerError::LedgerCorrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { path, records })
    }

    /// Write the whole ledger to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn store(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create ledger directory {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(&self.records)?;
        let temp_path = Self::temp_path_for(&self.path);
        fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write ledger to {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace ledger {}", self.path.display()))?;

        tracing::debug!(
            "Persisted {} signature(s) to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Record `signature` for `identity`, replacing any previous one, and
    /// persist immediately.
    ///
    /// Returns the replaced signature, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails; the in-memory record is kept.
    pub fn put(&mut self, identity: FileIdentity, signature: String) -> Result<Option<String>> {
        let previous = self.records.insert(identity, signature);
        self.store()?;
        Ok(previous)
    }

    /// Recorded signature for `identity`, if it was ever signed.
    pub fn get(&self, identity: &FileIdentity) -> Option<&str> {
        self.records.get(identity).map(String::as_str)
    }

    pub fn contains(&self, identity: &FileIdentity) -> bool {
        self.records.contains_key(identity)
    }

    /// Records in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&FileIdentity, &str)> {
        self.records.iter().map(|(id, sig)| (id, sig.as_str()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temporary file written before being renamed over `ledger_path`.
    pub fn temp_path_for(ledger_path: &Path) -> PathBuf {
        let mut name = ledger_path.as_os_str().to_owned();
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_ledger_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::load(temp_dir.path().join("signatures.json")).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_put_persists_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("signatures.json");

        let mut ledger = Ledger::load(&path).unwrap();
        ledger
            .put(FileIdentity::new("a.txt"), "c2lnQQ==".to_owned())
            .unwrap();

        let reloaded = Ledger::load(&path).unwrap();
        assert_eq!(reloaded.get(&FileIdentity::new("a.txt")), Some("c2lnQQ=="));
        assert!(!Ledger::temp_path_for(&path).exists());
    }

    #[test]
    fn test_put_overwrites_previous_signature() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("signatures.json");
        let id = FileIdentity::new("a.txt");

        let mut ledger = Ledger::new(&path);
        assert_eq!(ledger.put(id.clone(), "s1".to_owned()).unwrap(), None);
        assert_eq!(
            ledger.put(id.clone(), "s2".to_owned()).unwrap(),
            Some("s1".to_owned())
        );

        let reloaded = Ledger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(&id), Some("s2"));
    }

    #[test]
    fn test_unknown_identity_is_absent() {
        let ledger = Ledger::new("signatures.json");
        assert_eq!(ledger.get(&FileIdentity::new("never-signed.txt")), None);
    }

    #[test]
    fn test_store_is_pretty_json_object() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("signatures.json");

        let mut ledger = Ledger::new(&path);
        ledger
            .put(FileIdentity::new("src/lib.rs"), "AAAA".to_owned())
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n  \"src/lib.rs\": \"AAAA\"\n}");
    }

    #[test]
    fn test_corrupt_ledger_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("signatures.json");

        for bad in ["{ invalid json }", "[\"a.txt\"]", "{\"a.txt\": 42}", ""] {
            fs::write(&path, bad).unwrap();
            assert!(
                matches!(Ledger::load(&path), Err(SignerError::LedgerCorrupt { .. })),
                "{bad:?} should be reported as corrupt"
            );
        }
    }

    #[test]
    fn test_reads_ledger_written_by_hand() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("signatures.json");
        fs::write(&path, "{\n    \"b.py\": \"Yg==\",\n    \"a.py\": \"YQ==\"\n}").unwrap();

        let ledger = Ledger::load(&path).unwrap();
        let ids: Vec<&str> = ledger.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["a.py", "b.py"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_store_then_load_round_trips(
            records in prop::collection::btree_map("[a-z0-9/._ -]{1,24}", "[A-Za-z0-9+/=]{0,64}", 0..12)
        ) {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("signatures.json");

            let mut ledger = Ledger::new(&path);
            for (id, sig) in records {
                ledger.records.insert(FileIdentity::new(id), sig);
            }
            ledger.store().unwrap();

            prop_assert_eq!(Ledger::load(&path).unwrap(), ledger);
        }
    }
}

//! Signing configuration and the per-operation context.
//!
//! A [`SigningConfig`] says where things live (root, ledger, key directory)
//! and which files a tree signing covers. It can be persisted as
//! `codesign.json` in the root; command-line flags override it. A
//! [`SigningContext`] pairs a configuration with the key material of one
//! session and is passed explicitly to every sign/verify operation.

use crate::error::{Result, ResultExt as _, SignerError};
use crate::integrity::identity::FileIdentity;
use crate::integrity::keys::{KeyStore, Keyring};
use crate::integrity::ledger::Ledger;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional per-root configuration file.
pub const CONFIG_FILE: &str = "codesign.json";

/// Default ledger file name, relative to the root.
pub const DEFAULT_LEDGER_FILE: &str = "signatures.json";

/// Default key directory, relative to the root.
pub const DEFAULT_KEYS_DIR: &str = "keys";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Directory file identities are relative to; never persisted
    #[serde(skip)]
    pub root: PathBuf,
    /// Ledger location, relative to the root unless absolute
    pub ledger_file: PathBuf,
    /// Key directory, relative to the root unless absolute
    pub keys_dir: PathBuf,
    /// File name suffixes to sign (e.g. `.py`); empty means every file
    pub extensions: Vec<String>,
    /// Keep the ledger, key files and this configuration out of tree signing
    pub exclude_tool_files: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            ledger_file: PathBuf::from(DEFAULT_LEDGER_FILE),
            keys_dir: PathBuf::from(DEFAULT_KEYS_DIR),
            extensions: Vec::new(),
            exclude_tool_files: true,
        }
    }
}

impl SigningConfig {
    /// Default configuration for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load `codesign.json` from `root`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Config`] if the file exists but is malformed.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::new(root));
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&contents).map_err(|e| {
            SignerError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.root = root;
        Ok(config)
    }

    /// Write this configuration to `codesign.json` in the root.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        let path = self.config_path();
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(&self.ledger_file)
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.root.join(&self.keys_dir)
    }

    pub fn key_store(&self) -> KeyStore {
        KeyStore::new(self.keys_dir())
    }

    /// Load the ledger this configuration points at.
    ///
    /// # Errors
    ///
    /// See [`Ledger::load`].
    pub fn load_ledger(&self) -> Result<Ledger> {
        Ledger::load(self.ledger_path())
    }

    /// Identity of `path` under this root.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidPath`] for paths outside the root.
    pub fn identity_of(&self, path: &Path) -> Result<FileIdentity> {
        FileIdentity::from_path(&self.root, path)
    }

    /// On-disk location of an identity.
    pub fn resolve(&self, identity: &FileIdentity) -> PathBuf {
        identity.resolve(&self.root)
    }

    /// Whether `identity` is one of the tool's own files.
    pub fn is_tool_file(&self, identity: &FileIdentity) -> bool {
        if !self.exclude_tool_files {
            return false;
        }
        let ledger_path = self.ledger_path();
        let exact = [
            ledger_path.clone(),
            Ledger::temp_path_for(&ledger_path),
            self.config_path(),
        ];
        let is_exact = exact.iter().any(|path| {
            self.identity_of(path)
                .is_ok_and(|tool_file| &tool_file == identity)
        });
        is_exact
            || self
                .identity_of(&self.keys_dir())
                .is_ok_and(|keys| identity.is_within(Some(&keys)))
    }

    /// Whether `path`'s file name carries one of the configured extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|ext| {
            if ext.starts_with('.') {
                name.ends_with(ext.as_str())
            } else {
                name.ends_with(&format!(".{ext}"))
            }
        })
    }
}

/// Everything a sign or verify operation needs besides the ledger.
#[derive(Debug)]
pub struct SigningContext {
    pub config: SigningConfig,
    pub keys: Keyring,
}

impl SigningContext {
    pub fn new(config: SigningConfig, keys: Keyring) -> Self {
        Self { config, keys }
    }
}

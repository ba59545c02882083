//! Centralized error handling for codesign.
//!
//! Every fallible library operation returns [`Result`], whose error type
//! [`SignerError`] has one variant per failure category. Expected outcomes
//! such as "this file was never signed" or "this file no longer matches its
//! signature" are *not* errors; they are reported through
//! [`crate::integrity::VerificationResult`].
//!
//! ```
//! use codesign::error::SignerError;
//!
//! fn describe(err: &SignerError) -> &'static str {
//!     match err {
//!         SignerError::NoPrivateKey => "load a private key and retry",
//!         SignerError::LedgerCorrupt { .. } => "repair or remove the ledger",
//!         _ => "see the error message",
//!     }
//! }
//! ```
//!
//! The [`ResultExt`] trait adds `.context()` to any `Result` whose error
//! converts into [`SignerError`]:
//!
//! ```no_run
//! use codesign::error::ResultExt as _;
//!
//! fn read_manifest() -> codesign::error::Result<String> {
//!     std::fs::read_to_string("manifest.txt").context("Failed to read manifest")
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Main error type for codesign operations.
#[derive(Debug)]
pub enum SignerError {
    /// A key blob could not be parsed, or holds the wrong kind of key
    KeyFormat(String),

    /// Signing was attempted without a private key loaded
    NoPrivateKey,

    /// Verification was attempted without a public key loaded
    NoPublicKey,

    /// A file to sign or verify could not be read
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The persisted ledger exists but is not a valid signature mapping
    LedgerCorrupt { path: PathBuf, reason: String },

    /// The RSA backend failed while generating a key or signing
    Crypto(String),

    /// Path cannot be turned into a file identity
    InvalidPath(String),

    /// Directory traversal failed
    Walk(String),

    /// Configuration errors
    Config(String),

    /// Other I/O errors (writing the ledger, key files, ...)
    Io(std::io::Error),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyFormat(msg) => write!(f, "Invalid key: {msg}"),
            Self::NoPrivateKey => write!(f, "No private key loaded"),
            Self::NoPublicKey => write!(f, "No public key loaded"),
            Self::FileRead { path, source } => {
                write!(f, "Failed to read {}: {source}", path.display())
            }
            Self::LedgerCorrupt { path, reason } => {
                write!(f, "Signature ledger {} is corrupt: {reason}", path.display())
            }
            Self::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            Self::InvalidPath(msg) => write!(f, "Invalid path: {msg}"),
            Self::Walk(msg) => write!(f, "Directory walk failed: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SignerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileRead { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SignerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<rsa::Error> for SignerError {
    fn from(err: rsa::Error) -> Self {
        Self::Crypto(err.to_string())
    }
}

/// Result type alias for codesign operations.
pub type Result<T> = std::result::Result<T, SignerError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SignerError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: SignerError = e.into();
            SignerError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: SignerError = e.into();
            SignerError::Other(format!("{}: {}", f(), err))
        })
    }
}

//! Verification of files against the signature ledger.
//!
//! Verification never needs the private key. Expected outcomes (a file
//! never signed, a file gone from disk, a file whose content no longer
//! matches) come back as a failed [`VerificationResult`], not an error.

use crate::config::SigningContext;
use crate::error::Result;
use crate::integrity::hasher::digest_file;
use crate::integrity::identity::{FileIdentity, lexical_absolute};
use crate::integrity::keys::PublicKey;
use crate::integrity::ledger::Ledger;
use crate::integrity::signature::{SignatureCheck, check, decode_signature};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Why a signed file failed verification.
///
/// For diagnostics only: callers decide on [`VerificationResult::passed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    /// The signature is from this key, but the file content changed since
    ContentChanged,
    /// The stored signature is not decodable or has the wrong size
    SignatureCorrupted,
    /// The signature does not open under this public key
    UnknownSigner,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentChanged => write!(f, "content changed"),
            Self::SignatureCorrupted => write!(f, "signature corrupted"),
            Self::UnknownSigner => write!(
                f,
                "signature does not match this public key (corrupted, or signed with a different key)"
            ),
        }
    }
}

/// Outcome of verifying one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Valid,
    /// No ledger record for this file
    Unsigned,
    /// Ledger record exists but the file is gone
    Missing,
    Mismatch(MismatchReason),
    /// The file exists but could not be read
    Unreadable(String),
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "signature valid"),
            Self::Unsigned => write!(f, "not signed"),
            Self::Missing => write!(f, "file missing"),
            Self::Mismatch(reason) => write!(f, "{reason}"),
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
        }
    }
}

/// Result of an integrity verification check.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    /// Ledger identity of the file
    pub identity: FileIdentity,

    /// Whether verification passed
    pub passed: bool,

    pub status: VerificationStatus,

    /// Human-readable reason; never branch on it
    pub message: String,

    /// Current SHA-256 of the file, if it could be read
    pub digest: Option<String>,
}

impl VerificationResult {
    fn new(identity: FileIdentity, status: VerificationStatus, digest: Option<String>) -> Self {
        Self {
            identity,
            passed: status == VerificationStatus::Valid,
            message: status.to_string(),
            status,
            digest,
        }
    }

    /// One-line form for terminal output.
    pub fn format_cli(&self) -> String {
        if self.passed {
            format!("✓ PASS: {}", self.identity)
        } else if self.status == VerificationStatus::Missing {
            format!("⚠ MISSING: {}", self.identity)
        } else {
            format!("✗ FAIL: {} ({})", self.identity, self.message)
        }
    }
}

/// Outcome of [`verify_tree`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    /// One result per ledger entry, in identity order
    pub results: Vec<VerificationResult>,
}

impl VerifyReport {
    /// True iff every listed file exists and verifies.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn valid_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Ledger entries whose file no longer exists.
    pub fn missing(&self) -> impl Iterator<Item = &FileIdentity> {
        self.results
            .iter()
            .filter(|r| r.status == VerificationStatus::Missing)
            .map(|r| &r.identity)
    }
}

/// Verify one file against its ledger record.
///
/// # Errors
///
/// - [`crate::error::SignerError::NoPublicKey`] if the context has no public key
/// - [`crate::error::SignerError::InvalidPath`] if `path` is outside the root
pub fn verify_file(
    ctx: &SigningContext,
    ledger: &Ledger,
    path: &Path,
) -> Result<VerificationResult> {
    let key = ctx.keys.verifying_key()?;
    let identity = ctx.config.identity_of(path)?;
    let recorded = ledger.get(&identity);
    Ok(verify_entry(key, identity, recorded, path))
}

/// Verify every ledger entry under `dir`.
///
/// Only files already in the ledger are checked; files on disk that were
/// never signed are not reported.
///
/// # Errors
///
/// - [`crate::error::SignerError::NoPublicKey`] if the context has no public key
/// - [`crate::error::SignerError::InvalidPath`] if `dir` is outside the root
pub fn verify_tree(ctx: &SigningContext, ledger: &Ledger, dir: &Path) -> Result<VerifyReport> {
    let key = ctx.keys.verifying_key()?;
    let config = &ctx.config;

    let prefix = if lexical_absolute(dir)? == lexical_absolute(&config.root)? {
        None
    } else {
        Some(config.identity_of(dir)?)
    };

    let results: Vec<_> = ledger
        .iter()
        .filter(|(identity, _)| identity.is_within(prefix.as_ref()))
        .map(|(identity, signature)| {
            let path = config.resolve(identity);
            verify_entry(key, identity.clone(), Some(signature), &path)
        })
        .collect();

    let report = VerifyReport { results };
    tracing::info!(
        "Verified {}/{} file(s) under {}",
        report.valid_count(),
        report.results.len(),
        dir.display()
    );
    Ok(report)
}

fn verify_entry(
    key: &PublicKey,
    identity: FileIdentity,
    recorded: Option<&str>,
    path: &Path,
) -> VerificationResult {
    let result = check_entry(key, identity, recorded, path);
    if !result.passed {
        tracing::warn!("{}: {}", result.identity, result.message);
    }
    result
}

fn check_entry(
    key: &PublicKey,
    identity: FileIdentity,
    recorded: Option<&str>,
    path: &Path,
) -> VerificationResult {
    let Some(recorded) = recorded else {
        return VerificationResult::new(identity, VerificationStatus::Unsigned, None);
    };

    if !path.exists() {
        return VerificationResult::new(identity, VerificationStatus::Missing, None);
    }
    let digest = match digest_file(path) {
        Ok(digest) => digest,
        Err(e) => {
            return VerificationResult::new(
                identity,
                VerificationStatus::Unreadable(e.to_string()),
                None,
            );
        }
    };
    let hex = Some(digest.to_hex());

    let Some(signature) = decode_signature(recorded) else {
        return VerificationResult::new(
            identity,
            VerificationStatus::Mismatch(MismatchReason::SignatureCorrupted),
            hex,
        );
    };

    let status = match check(key, &digest, &signature) {
        SignatureCheck::Valid => VerificationStatus::Valid,
        SignatureCheck::DigestMismatch => {
            VerificationStatus::Mismatch(MismatchReason::ContentChanged)
        }
        SignatureCheck::Malformed => {
            VerificationStatus::Mismatch(MismatchReason::SignatureCorrupted)
        }
        SignatureCheck::ForeignKey => VerificationStatus::Mismatch(MismatchReason::UnknownSigner),
    };
    VerificationResult::new(identity, status, hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningConfig;
    use crate::error::SignerError;
    use crate::integrity::keys::Keyring;
    use crate::integrity::keys::testing::{other_signer, signer};
    use crate::integrity::signer::{sign_file, sign_tree};
    use std::fs;
    use tempfile::TempDir;

    fn contexts(root: &Path) -> (SigningContext, SigningContext) {
        let signing = SigningContext::new(
            SigningConfig::new(root),
            Keyring::with_key_pair(signer().clone()),
        );
        let verifying = SigningContext::new(
            SigningConfig::new(root),
            Keyring::verify_only(signer().public_key().clone()),
        );
        (signing, verifying)
    }

    #[test]
    fn test_verify_then_tamper() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let (signing, verifying) = contexts(root);
        let file = root.join("a.txt");
        fs::write(&file, "hello").unwrap();

        let mut ledger = signing.config.load_ledger().unwrap();
        sign_file(&signing, &mut ledger, &file).unwrap();
        assert!(ledger.contains(&FileIdentity::new("a.txt")));

        let ledger = verifying.config.load_ledger().unwrap();
        let result = verify_file(&verifying, &ledger, &file).unwrap();
        assert!(result.passed);
        assert_eq!(result.status, VerificationStatus::Valid);

        fs::write(&file, "goodbye").unwrap();
        let result = verify_file(&verifying, &ledger, &file).unwrap();
        assert!(!result.passed);
        assert_eq!(
            result.status,
            VerificationStatus::Mismatch(MismatchReason::ContentChanged)
        );
        assert_eq!(result.message, "content changed");
        assert!(result.format_cli().contains("✗ FAIL"));
    }

    #[test]
    fn test_unreadable_file_fails_the_tree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let (signing, verifying) = contexts(root);
        fs::write(root.join("a.txt"), "kept").unwrap();
        fs::write(root.join("b.txt"), "replaced").unwrap();

        let mut ledger = signing.config.load_ledger().unwrap();
        sign_tree(&signing, &mut ledger, root).unwrap();

        // A directory where the signed file was cannot be digested.
        fs::remove_file(root.join("b.txt")).unwrap();
        fs::create_dir(root.join("b.txt")).unwrap();

        let report = verify_tree(&verifying, &ledger, root).unwrap();
        assert!(!report.passed());
        assert_eq!(report.valid_count(), 1);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].identity.as_str(), "b.txt");
        assert!(matches!(
            failures[0].status,
            VerificationStatus::Unreadable(_)
        ));
        assert!(failures[0].digest.is_none());
        assert!(failures[0].format_cli().starts_with("✗ FAIL: b.txt"));
    }

    #[test]
    fn test_unsigned_file_is_a_result_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let (_, verifying) = contexts(root);
        fs::write(root.join("new.txt"), "fresh").unwrap();

        let ledger = verifying.config.load_ledger().unwrap();
        let result = verify_file(&verifying, &ledger, &root.join("new.txt")).unwrap();

        assert!(!result.passed);
        assert_eq!(result.status, VerificationStatus::Unsigned);
    }

    #[test]
    fn test_verify_without_public_key() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = SigningContext::new(SigningConfig::new(temp_dir.path()), Keyring::empty());
        let ledger = ctx.config.load_ledger().unwrap();

        assert!(matches!(
            verify_file(&ctx, &ledger, &temp_dir.path().join("a.txt")),
            Err(SignerError::NoPublicKey)
        ));
        assert!(matches!(
            verify_tree(&ctx, &ledger, temp_dir.path()),
            Err(SignerError::NoPublicKey)
        ));
    }

    #[test]
    fn test_wrong_public_key() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let (signing, _) = contexts(root);
        let file = root.join("a.txt");
        fs::write(&file, "hello").unwrap();
        let mut ledger = signing.config.load_ledger().unwrap();
        sign_file(&signing, &mut ledger, &file).unwrap();

        let stranger = SigningContext::new(
            SigningConfig::new(root),
            Keyring::verify_only(other_signer().public_key().clone()),
        );
        let result = verify_file(&stranger, &ledger, &file).unwrap();

        assert!(!result.passed);
        assert_eq!(
            result.status,
            VerificationStatus::Mismatch(MismatchReason::UnknownSigner)
        );
    }

    #[test]
    fn test_corrupted_ledger_value() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let (_, verifying) = contexts(root);
        fs::write(root.join("a.txt"), "hello").unwrap();

        let mut ledger = verifying.config.load_ledger().unwrap();
        ledger
            .put(FileIdentity::new("a.txt"), "%%% not base64 %%%".to_owned())
            .unwrap();
        let result = verify_file(&verifying, &ledger, &root.join("a.txt")).unwrap();
        assert_eq!(
            result.status,
            VerificationStatus::Mismatch(MismatchReason::SignatureCorrupted)
        );

        ledger
            .put(FileIdentity::new("a.txt"), "c2hvcnQ=".to_owned())
            .unwrap();
        let result = verify_file(&verifying, &ledger, &root.join("a.txt")).unwrap();
        assert_eq!(
            result.status,
            VerificationStatus::Mismatch(MismatchReason::SignatureCorrupted)
        );
    }

    #[test]
    fn test_verify_tree_reports_missing_files_separately() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let (signing, verifying) = contexts(root);
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/a.rs"), "a").unwrap();
        fs::write(root.join("src/b.rs"), "b").unwrap();
        fs::write(root.join("c.rs"), "c").unwrap();

        let mut ledger = signing.config.load_ledger().unwrap();
        sign_tree(&signing, &mut ledger, root).unwrap();
        fs::remove_file(root.join("src/b.rs")).unwrap();

        let ledger = verifying.config.load_ledger().unwrap();
        let report = verify_tree(&verifying, &ledger, root).unwrap();

        assert!(!report.passed());
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.valid_count(), 2);
        let missing: Vec<_> = report.missing().map(FileIdentity::as_str).collect();
        assert_eq!(missing, ["src/b.rs"]);
        assert_eq!(report.failures().count(), 1);

        let subtree = verify_tree(&verifying, &ledger, &root.join("src")).unwrap();
        assert_eq!(subtree.results.len(), 2);
        assert!(!subtree.passed());
    }

    #[test]
    fn test_verify_tree_all_valid() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let (signing, verifying) = contexts(root);
        fs::write(root.join("one.txt"), "1").unwrap();
        fs::write(root.join("two.txt"), "2").unwrap();

        let mut ledger = signing.config.load_ledger().unwrap();
        sign_tree(&signing, &mut ledger, root).unwrap();

        let report = verify_tree(&verifying, &ledger, root).unwrap();
        assert!(report.passed());
        assert_eq!(report.valid_count(), 2);
    }
}

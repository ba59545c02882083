//! Signing files and directory trees into the ledger.

use crate::config::SigningContext;
use crate::error::{Result, SignerError};
use crate::integrity::hasher::digest_file;
use crate::integrity::identity::FileIdentity;
use crate::integrity::ledger::Ledger;
use crate::integrity::signature::{encode_signature, sign};
use crate::integrity::walk::files_under;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A file that could not be signed during a tree signing.
#[derive(Debug, Clone, Serialize)]
pub struct SignFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of [`sign_tree`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignReport {
    /// Files signed and recorded, in walk order
    pub signed: Vec<FileIdentity>,
    /// The tool's own files, left unsigned
    pub skipped: Vec<FileIdentity>,
    pub failures: Vec<SignFailure>,
}

impl SignReport {
    /// True iff every matching file was signed.
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sign one file and record the signature under its identity.
///
/// The ledger is persisted before this returns. Returns the base64
/// signature value that was stored.
///
/// # Errors
///
/// - [`SignerError::NoPrivateKey`] if the context cannot sign
/// - [`SignerError::InvalidPath`] if `path` is outside the root
/// - [`SignerError::FileRead`] if the file cannot be read
/// - an I/O error if the ledger cannot be written
pub fn sign_file(ctx: &SigningContext, ledger: &mut Ledger, path: &Path) -> Result<String> {
    let key = ctx.keys.signing_key()?;
    let identity = ctx.config.identity_of(path)?;

    let digest = digest_file(path)?;
    let signature = encode_signature(&sign(key, &digest)?);

    if ledger.put(identity.clone(), signature.clone())?.is_some() {
        tracing::info!("Re-signed {identity}");
    } else {
        tracing::info!("Signed {identity}");
    }
    Ok(signature)
}

/// Sign every matching file under `dir`.
///
/// Files are filtered by the configured extensions and, unless disabled,
/// the ledger, key files and configuration file are skipped. Unreadable
/// files are recorded as failures and the walk goes on.
///
/// # Errors
///
/// Fails without signing anything if the context has no private key or
/// `dir` is not a directory, and stops early if the ledger cannot be
/// written.
pub fn sign_tree(ctx: &SigningContext, ledger: &mut Ledger, dir: &Path) -> Result<SignReport> {
    ctx.keys.signing_key()?;
    let config = &ctx.config;
    let walk = files_under(dir, |path| config.matches_extension(path))?;

    let mut report = SignReport::default();
    report
        .failures
        .extend(walk.errors.into_iter().map(|reason| SignFailure {
            path: dir.to_path_buf(),
            reason,
        }));

    for path in walk.files {
        let identity = match config.identity_of(&path) {
            Ok(identity) => identity,
            Err(e) => {
                report.failures.push(SignFailure {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if config.is_tool_file(&identity) {
            tracing::debug!("Skipping tool file {identity}");
            report.skipped.push(identity);
            continue;
        }

        match sign_file(ctx, ledger, &path) {
            Ok(_) => report.signed.push(identity),
            Err(e @ SignerError::FileRead { .. }) => {
                tracing::warn!("Could not sign {identity}: {e}");
                report.failures.push(SignFailure {
                    path,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        "Signed {} file(s) under {}, {} failure(s)",
        report.signed.len(),
        dir.display(),
        report.failures.len()
    );
    Ok(report)
}

//! Signature ledger system
//!
//! This module signs files with an RSA private key and verifies them later
//! with only the public key. Signatures are kept in a ledger: a JSON file
//! mapping each file's root-relative path to its base64 signature.
//!
//! ## Key Concepts
//!
//! - **Digest**: SHA-256 of the whole file, recomputed on every operation
//! - **Signature**: RSA-PSS over the digest, randomized by a maximal salt
//! - **Ledger**: identity → signature, persisted after every signing
//! - **Verification**: recompute the digest and check it against the stored
//!   signature; the outcome is a result value, never an error
//!
//! ## Usage
//!
//! ```no_run
//! use codesign::config::{SigningConfig, SigningContext};
//! use codesign::integrity::{self, KeyPair, KeyStore, Keyring};
//! use std::path::Path;
//!
//! # fn example() -> codesign::error::Result<()> {
//! // Signer side
//! let config = SigningConfig::new(".");
//! let pair = KeyPair::generate()?;
//! config.key_store().save(&pair)?;
//! let signer = SigningContext::new(config.clone(), Keyring::with_key_pair(pair));
//! let mut ledger = config.load_ledger()?;
//! integrity::sign_tree(&signer, &mut ledger, Path::new("src"))?;
//!
//! // Verifier side, public key only
//! let public = KeyStore::load_public_key(Path::new("keys/public_key.pem"))?;
//! let verifier = SigningContext::new(config.clone(), Keyring::verify_only(public));
//! let report = integrity::verify_tree(&verifier, &config.load_ledger()?, Path::new("."))?;
//! for result in &report.results {
//!     println!("{}", result.format_cli());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`hasher`]: whole-file SHA-256 digests
//! - [`signature`]: RSA-PSS sign/verify and base64 encoding
//! - [`keys`]: key generation, PEM encoding and the key directory
//! - [`identity`]: root-relative file identities
//! - [`ledger`]: the persisted identity → signature mapping
//! - [`walk`]: directory enumeration
//! - [`signer`]: signing files and trees
//! - [`verifier`]: verification logic and diagnostics

pub mod hasher;
pub mod identity;
pub mod keys;
pub mod ledger;
pub mod signature;
pub mod signer;
pub mod verifier;
pub mod walk;

pub use hasher::{Digest, digest, digest_file};
pub use identity::FileIdentity;
pub use keys::{KeyPair, KeyStore, Keyring, PublicKey};
pub use ledger::Ledger;
pub use signature::SignatureCheck;
pub use signer::{SignFailure, SignReport, sign_file, sign_tree};
pub use verifier::{
    MismatchReason, VerificationResult, VerificationStatus, VerifyReport, verify_file,
    verify_tree,
};

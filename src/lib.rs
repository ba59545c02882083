//! # codesign - directory signing with RSA-PSS
//!
//! codesign records a signature for every file in a directory tree and later
//! checks, with nothing but the public key, that each recorded file is
//! unchanged.
//!
//! ## Quick Start
//!
//! ```no_run
//! use codesign::config::{SigningConfig, SigningContext};
//! use codesign::integrity::{self, KeyStore, Keyring};
//! use std::path::Path;
//!
//! # fn example() -> codesign::error::Result<()> {
//! let config = SigningConfig::load(".")?;
//! let (pair, _generated) = config.key_store().load_or_generate()?;
//! let ctx = SigningContext::new(config, Keyring::with_key_pair(pair));
//!
//! let mut ledger = ctx.config.load_ledger()?;
//! let signature = integrity::sign_file(&ctx, &mut ledger, Path::new("a.txt"))?;
//! println!("a.txt -> {signature}");
//!
//! let result = integrity::verify_file(&ctx, &ledger, Path::new("a.txt"))?;
//! assert!(result.passed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`integrity`]: digests, signatures, keys, the ledger and sign/verify
//! - [`config`]: signing configuration and the per-operation context
//! - [`error`]: error types and handling utilities
//! - [`logging`]: tracing subscriber setup

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod integrity;
pub mod logging;

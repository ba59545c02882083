//! RSA-PSS signing and verification of file digests.
//!
//! Signatures use PSS with MGF1-SHA-256 and the largest salt the key size
//! allows, so signing the same digest twice gives two different signatures.
//! Both verify. The message handed to PSS is the 32-byte file digest, which
//! the scheme hashes once more; ledgers written by earlier releases of the
//! tool used the same construction.

use crate::error::Result;
use crate::integrity::hasher::{DIGEST_LEN, Digest};
use crate::integrity::keys::{KeyPair, PublicKey};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts as _;
use rsa::{BigUint, Pss, RsaPublicKey};
use sha2::{Digest as _, Sha256};

/// PSS trailer byte (RFC 8017, section 9.1.1).
const PSS_TRAILER: u8 = 0xbc;

/// Detailed outcome of checking a signature against a digest.
///
/// Only [`SignatureCheck::Valid`] means the signature holds. The other
/// variants exist for diagnostics and all mean "verification failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// Signature was made by the paired private key over this digest
    Valid,

    /// Signature was made by this key, but over a different digest
    DigestMismatch,

    /// Signature bytes have the wrong length or value for this key
    Malformed,

    /// Signature does not open under this key (corrupted, or another signer)
    ForeignKey,
}

impl SignatureCheck {
    /// Whether the signature holds.
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

/// Sign a digest with the private half of `key`.
///
/// # Errors
///
/// Returns [`crate::error::SignerError::Crypto`] if the RSA backend rejects
/// the operation.
pub fn sign(key: &KeyPair, digest: &Digest) -> Result<Vec<u8>> {
    let salt_len = max_salt_len(key.public_key().inner());
    let signature = key.private().sign_with_rng(
        &mut OsRng,
        Pss::new_with_salt::<Sha256>(salt_len),
        &message_hash(digest),
    )?;
    Ok(signature)
}

/// Return true iff `signature` was produced by the private key paired with
/// `key` over exactly `digest`.
pub fn verify(key: &PublicKey, digest: &Digest, signature: &[u8]) -> bool {
    let inner = key.inner();
    inner
        .verify(
            Pss::new_with_salt::<Sha256>(max_salt_len(inner)),
            &message_hash(digest),
            signature,
        )
        .is_ok()
}

/// Verify `signature` and, when it fails, work out why.
///
/// The pass/fail decision is exactly [`verify`]'s. On failure the PSS
/// encoding is opened with the public key: a well-formed encoding whose
/// embedded hash does not match means the signature came from this key but
/// covers other content.
pub fn check(key: &PublicKey, digest: &Digest, signature: &[u8]) -> SignatureCheck {
    if verify(key, digest, signature) {
        return SignatureCheck::Valid;
    }
    match open_pss(key.inner(), &message_hash(digest), signature) {
        // Opens cleanly but the strict verifier refused it: a salt length
        // this tool never produces.
        SignatureCheck::Valid => SignatureCheck::ForeignKey,
        other => other,
    }
}

/// Encode signature bytes for the ledger.
pub fn encode_signature(signature: &[u8]) -> String {
    STANDARD.encode(signature)
}

/// Decode a ledger signature value; `None` if it is not valid base64.
pub fn decode_signature(encoded: &str) -> Option<Vec<u8>> {
    STANDARD.decode(encoded.trim()).ok()
}

/// The hash PSS is applied to: SHA-256 over the file digest.
fn message_hash(digest: &Digest) -> [u8; DIGEST_LEN] {
    Sha256::digest(digest.as_bytes()).into()
}

/// Bits of the PSS encoded message for this modulus.
fn em_bits(key: &RsaPublicKey) -> usize {
    key.n().bits().saturating_sub(1)
}

/// Largest salt a PSS encoding with SHA-256 can carry for this key.
fn max_salt_len(key: &RsaPublicKey) -> usize {
    em_bits(key)
        .div_ceil(8)
        .saturating_sub(DIGEST_LEN + 2)
}

/// Recover and inspect the PSS encoded message (RFC 8017, 9.1.2).
fn open_pss(key: &RsaPublicKey, m_hash: &[u8], signature: &[u8]) -> SignatureCheck {
    if signature.len() != key.size() {
        return SignatureCheck::Malformed;
    }
    let s = BigUint::from_bytes_be(signature);
    if &s >= key.n() {
        return SignatureCheck::Malformed;
    }

    let em_bits = em_bits(key);
    let em_len = em_bits.div_ceil(8);
    if em_len < DIGEST_LEN + 2 {
        return SignatureCheck::ForeignKey;
    }

    let m = s.modpow(key.e(), key.n()).to_bytes_be();
    if m.len() > em_len {
        return SignatureCheck::ForeignKey;
    }
    let mut em = vec![0u8; em_len - m.len()];
    em.extend_from_slice(&m);

    let Some((&trailer, rest)) = em.split_last() else {
        return SignatureCheck::ForeignKey;
    };
    if trailer != PSS_TRAILER {
        return SignatureCheck::ForeignKey;
    }
    let (masked_db, h) = rest.split_at(em_len - DIGEST_LEN - 1);

    let top_mask = 0xffu8 >> (8 * em_len - em_bits);
    if masked_db.first().is_some_and(|b| b & !top_mask != 0) {
        return SignatureCheck::ForeignKey;
    }

    let mut db: Vec<u8> = masked_db
        .iter()
        .zip(mgf1_sha256(h, masked_db.len()))
        .map(|(a, b)| a ^ b)
        .collect();
    if let Some(first) = db.first_mut() {
        *first &= top_mask;
    }

    let Some(separator) = db.iter().position(|&b| b != 0) else {
        return SignatureCheck::ForeignKey;
    };
    if db.get(separator) != Some(&0x01) {
        return SignatureCheck::ForeignKey;
    }
    let salt = db.get(separator + 1..).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update([0u8; 8]);
    hasher.update(m_hash);
    hasher.update(salt);
    if hasher.finalize().as_slice() == h {
        SignatureCheck::Valid
    } else {
        SignatureCheck::DigestMismatch
    }
}

/// MGF1 mask generation with SHA-256.
fn mgf1_sha256(seed: &[u8], len: usize) -> Vec<u8> {
    let mut mask = Vec::with_capacity(len + DIGEST_LEN);
    let mut counter: u32 = 0;
    while mask.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(counter.to_be_bytes());
        mask.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    mask.truncate(len);
    mask
}

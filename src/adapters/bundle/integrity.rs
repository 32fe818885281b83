//! Bundle integrity: signed manifest of artifact digests.
//!
//! A signed bundle directory carries two extra files:
//! - `manifest.json`: `{ "version": 1, "files": { "<artifact>": "<sha256 hex>" } }`
//! - `bundle.sig`: raw 64-byte Ed25519 signature over the exact manifest bytes
//!
//! Verification checks the signature first, then binds every artifact the
//! loader reads to its digest in the manifest.

use std::collections::BTreeMap;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::BundleError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "bundle.sig";

/// Only manifest format understood by this build.
pub const MANIFEST_VERSION: u32 = 1;

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for equal-length ASCII digests.
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

/// Artifact digests covered by a bundle signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

impl BundleManifest {
    /// Hash the named artifacts inside `dir`.
    ///
    /// # Errors
    /// Returns `BundleError::MissingArtifact` or `BundleError::Io` if a file
    /// cannot be read.
    pub fn from_artifacts(dir: &Path, files: &[&str]) -> Result<Self, BundleError> {
        let mut digests = BTreeMap::new();
        for name in files {
            let bytes = super::read_file(&dir.join(name))?;
            digests.insert((*name).to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            files: digests,
        })
    }

    /// Check that `bytes` are the signed content of artifact `name`.
    ///
    /// # Errors
    /// Returns `BundleError::Integrity` if the artifact is not listed or its
    /// digest differs.
    pub fn check(&self, name: &str, bytes: &[u8]) -> Result<(), BundleError> {
        let expected = self.files.get(name).ok_or_else(|| {
            BundleError::Integrity(format!("{name} is not covered by {MANIFEST_FILE}"))
        })?;
        if !constant_time_eq_str(expected, &sha256_hex(bytes)) {
            return Err(BundleError::Integrity(format!(
                "{name} does not match its manifest digest"
            )));
        }
        Ok(())
    }
}

/// Verifies bundle manifests against a trusted Ed25519 public key.
#[derive(Debug, Clone)]
pub struct BundleVerifier {
    key: VerifyingKey,
}

impl BundleVerifier {
    #[must_use]
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Parse a base64-encoded 32-byte public key.
    ///
    /// # Errors
    /// Returns `BundleError::Integrity` on invalid base64 or key bytes.
    pub fn from_b64(b64: &str) -> Result<Self, BundleError> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| BundleError::Integrity(format!("invalid public key base64: {e}")))?;
        let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
            BundleError::Integrity(format!(
                "public key must be 32 bytes after base64 decode (got {})",
                raw.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|_| BundleError::Integrity("invalid Ed25519 public key".into()))?;
        Ok(Self::new(key))
    }

    /// Read, authenticate and parse the manifest of the bundle in `dir`.
    ///
    /// # Errors
    /// Returns `BundleError::Integrity` if the manifest or signature is
    /// missing, the signature does not verify, or the manifest version is
    /// unsupported.
    pub fn verify_manifest(&self, dir: &Path) -> Result<BundleManifest, BundleError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let sig_path = dir.join(SIGNATURE_FILE);
        if !manifest_path.exists() || !sig_path.exists() {
            return Err(BundleError::Integrity(format!(
                "signed bundle requires {MANIFEST_FILE} and {SIGNATURE_FILE} in {dir:?}"
            )));
        }

        let sig_bytes = super::read_file(&sig_path)?;
        let sig_bytes: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
            BundleError::Integrity("invalid signature length (expected 64 bytes)".into())
        })?;
        let signature = Signature::from_bytes(&sig_bytes);

        let manifest_bytes = super::read_file(&manifest_path)?;
        self.key
            .verify(&manifest_bytes, &signature)
            .map_err(|_| BundleError::Integrity("invalid bundle signature".into()))?;

        let manifest: BundleManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| BundleError::Integrity(format!("invalid {MANIFEST_FILE}: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(BundleError::Integrity(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }

        tracing::info!(
            "Verified bundle signature over {} artifact digests",
            manifest.files.len()
        );
        Ok(manifest)
    }
}

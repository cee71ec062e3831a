//! Signed-manifest verification for model artifacts.
//!
//! A model directory may ship `manifest.json` (SHA-256 of every bound file)
//! and `model.sig` (Ed25519 signature over the exact manifest bytes).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ArtifactError;

/// Manifest file name inside a model directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Detached signature file name inside a model directory.
pub const SIGNATURE_FILE_NAME: &str = "model.sig";

/// Only manifest version understood by this loader.
pub const MANIFEST_VERSION: u32 = 1;

/// Signed list of artifact files and their digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    /// Build number chosen by the signer. Checked against
    /// [`ArtifactPolicy::min_serial`] when a floor is configured.
    #[serde(default)]
    pub serial: Option<u64>,
    /// Unix timestamp (seconds) when the manifest was signed.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Relative file name -> lowercase SHA-256 hex.
    pub files: BTreeMap<String, String>,
}

/// How strictly artifacts are checked at load time.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPolicy {
    /// Accept artifacts that carry no manifest/signature.
    pub allow_unsigned: bool,
    /// Key that signed manifests must verify against.
    pub verifying_key: Option<VerifyingKey>,
    /// Lowest manifest serial accepted; older signed builds are refused.
    pub min_serial: Option<u64>,
}

impl ArtifactPolicy {
    /// Policy for local development: unsigned artifacts load with a warning.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            allow_unsigned: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_verifying_key(mut self, key: VerifyingKey) -> Self {
        self.verifying_key = Some(key);
        self
    }

    #[must_use]
    pub fn with_min_serial(mut self, serial: u64) -> Self {
        self.min_serial = Some(serial);
        self
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Parse a base64-encoded 32-byte Ed25519 verifying key.
///
/// # Errors
/// Returns `ArtifactError::Signature` on malformed input.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ArtifactError::Signature("verifying key is not valid base64".into()))?;
    let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Signature("verifying key must decode to exactly 32 bytes".into())
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| ArtifactError::Signature("verifying key is not a valid point".into()))
}

/// Read a verifying key from a file holding its base64 text.
///
/// # Errors
/// Returns `ArtifactError` if the file is unreadable or malformed.
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey, ArtifactError> {
    let b64 = fs::read_to_string(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    verifying_key_from_b64(&b64)
}

fn is_plain_relative(rel: &str) -> bool {
    let path = Path::new(rel);
    !rel.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Verify the manifest and signature in `dir`, requiring that `model_file`
/// is bound by the manifest.
///
/// `model_bytes` is the artifact content the caller is about to parse; its
/// digest is checked instead of re-reading `model_file` from disk. Other
/// bound files are read from `dir`.
///
/// Returns `Ok(None)` for an unsigned artifact the policy allows.
///
/// # Errors
/// Returns `ArtifactError::Signature` for any verification failure.
pub fn verify_artifact(
    dir: &Path,
    model_file: &str,
    model_bytes: &[u8],
    policy: &ArtifactPolicy,
) -> Result<Option<ModelManifest>, ArtifactError> {
    let sig_path = dir.join(SIGNATURE_FILE_NAME);
    let manifest_path = dir.join(MANIFEST_FILE_NAME);

    if !sig_path.exists() || !manifest_path.exists() {
        if policy.allow_unsigned {
            tracing::warn!("Loading UNSIGNED model artifact from {:?}", dir);
            return Ok(None);
        }
        return Err(ArtifactError::Signature(format!(
            "no {MANIFEST_FILE_NAME}/{SIGNATURE_FILE_NAME} in {dir:?}; \
             set VISIONCARE_ALLOW_UNSIGNED_MODELS=true to load unsigned artifacts"
        )));
    }

    let key = policy.verifying_key.as_ref().ok_or_else(|| {
        ArtifactError::Signature(
            "artifact is signed but no verifying key is configured (VISIONCARE_MODEL_PUBKEY_B64_FILE)"
                .into(),
        )
    })?;

    let sig_bytes = fs::read(&sig_path).map_err(|source| ArtifactError::Read {
        path: sig_path.clone(),
        source,
    })?;
    let sig_bytes: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| ArtifactError::Signature("signature must be exactly 64 bytes".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    let manifest_bytes = fs::read(&manifest_path).map_err(|source| ArtifactError::Read {
        path: manifest_path.clone(),
        source,
    })?;
    key.verify(&manifest_bytes, &signature)
        .map_err(|_| ArtifactError::Signature("manifest signature is invalid".into()))?;

    let manifest: ModelManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| ArtifactError::Signature(format!("manifest is malformed: {e}")))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(ArtifactError::Signature(format!(
            "unsupported manifest version {}",
            manifest.version
        )));
    }
    if !manifest.files.contains_key(model_file) {
        return Err(ArtifactError::Signature(format!(
            "manifest does not bind {model_file}"
        )));
    }
    if let Some(floor) = policy.min_serial {
        match manifest.serial {
            Some(serial) if serial >= floor => {}
            serial => {
                return Err(ArtifactError::Signature(format!(
                    "manifest serial {serial:?} is older than the required minimum {floor}"
                )));
            }
        }
    }

    for (rel, expected) in &manifest.files {
        if !is_plain_relative(rel) {
            return Err(ArtifactError::Signature(format!(
                "manifest entry {rel:?} escapes the model directory"
            )));
        }
        let digest = if rel == model_file {
            sha256_hex(model_bytes)
        } else {
            let bytes = fs::read(dir.join(rel)).map_err(|_| {
                ArtifactError::Signature(format!("bound file {rel} is missing or unreadable"))
            })?;
            sha256_hex(&bytes)
        };
        if !digest.eq_ignore_ascii_case(expected) {
            return Err(ArtifactError::Signature(format!(
                "hash mismatch for {rel}"
            )));
        }
    }

    tracing::info!(
        "Model manifest verified (serial={:?}, {} file(s))",
        manifest.serial,
        manifest.files.len()
    );
    Ok(Some(manifest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_relative_paths() {
        assert!(is_plain_relative("vision_model.json"));
        assert!(is_plain_relative("sub/extra.bin"));
        assert!(!is_plain_relative("../secret"));
        assert!(!is_plain_relative("/etc/passwd"));
        assert!(!is_plain_relative(""));
    }

    #[test]
    fn test_verifying_key_parsing() {
        assert!(verifying_key_from_b64("not base64!").is_err());
        let short = base64::engine::general_purpose::STANDARD.encode([1u8; 16]);
        assert!(verifying_key_from_b64(&short).is_err());
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

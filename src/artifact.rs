//! Persisted exertion model
//!
//! On-disk layout: gzip(bincode(envelope)), where the envelope holds a format
//! version, the SHA-256 of the payload, and the bincode-encoded
//! [`ModelArtifact`].

use chrono::{DateTime, Utc};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ModelError, RepCoachError, Result};
use crate::gbdt::{BoosterParams, GradientBoostedRegressor};
use crate::models::FEATURE_NAMES;

/// Bump when the envelope or artifact layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    format_version: u32,
    checksum: String,
    payload: Vec<u8>,
}

/// Fitted model plus the metadata needed to trust it at load time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature order the model was trained with
    pub feature_names: Vec<String>,

    pub trained_at: DateTime<Utc>,

    /// Seed used for both the split and the booster
    pub seed: u64,

    pub params: BoosterParams,

    pub train_rows: usize,

    pub test_rows: usize,

    /// Held-out mean absolute error, diagnostic only
    pub test_mae: Option<f64>,

    pub model: GradientBoostedRegressor,
}

impl ModelArtifact {
    pub fn new(model: GradientBoostedRegressor, params: BoosterParams, seed: u64) -> Self {
        Self {
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            trained_at: Utc::now(),
            seed,
            params,
            train_rows: 0,
            test_rows: 0,
            test_mae: None,
            model,
        }
    }

    /// Encode into the compressed, checksummed envelope
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self).map_err(|e| RepCoachError::Serialization(e.to_string()))?;
        let envelope = ArtifactEnvelope {
            format_version: ARTIFACT_FORMAT_VERSION,
            checksum: sha256_hex(&payload),
            payload,
        };
        let encoded =
            bincode::serialize(&envelope).map_err(|e| RepCoachError::Serialization(e.to_string()))?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&encoded)?;
        Ok(encoder.finish()?)
    }

    /// Decode and verify an envelope produced by [`ModelArtifact::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut decoder = GzDecoder::new(bytes);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| ModelError::Corrupted {
                reason: format!("decompression failed: {}", e),
            })?;

        let envelope: ArtifactEnvelope =
            bincode::deserialize(&decompressed).map_err(|e| ModelError::Corrupted {
                reason: format!("invalid envelope: {}", e),
            })?;

        if envelope.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                version: envelope.format_version,
            }
            .into());
        }

        let actual = sha256_hex(&envelope.payload);
        if actual != envelope.checksum {
            return Err(ModelError::ChecksumMismatch {
                expected: envelope.checksum,
                actual,
            }
            .into());
        }

        let artifact: ModelArtifact =
            bincode::deserialize(&envelope.payload).map_err(|e| ModelError::Corrupted {
                reason: format!("invalid payload: {}", e),
            })?;
        artifact.verify()?;
        Ok(artifact)
    }

    /// Check the feature layout and tree structure against this build
    pub fn verify(&self) -> Result<()> {
        let expected: Vec<String> = FEATURE_NAMES.iter().map(|name| name.to_string()).collect();
        if self.feature_names != expected || self.model.feature_count() != expected.len() {
            return Err(ModelError::FeatureMismatch {
                expected,
                actual: self.feature_names.clone(),
            }
            .into());
        }
        if !self.model.is_well_formed() {
            return Err(ModelError::Corrupted {
                reason: "malformed tree structure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Write atomically: a temporary sibling is renamed over `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let bytes = self.to_bytes()?;
        let tmp = temp_path(path);
        if let Err(e) = fs::write(&tmp, &bytes).and_then(|_| fs::rename(&tmp, path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        info!(path = %path.display(), bytes = bytes.len(), "model artifact saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RepCoachError::from(ModelError::NotFound {
                path: path.to_path_buf(),
            }),
            _ => RepCoachError::from(ModelError::Corrupted {
                reason: format!("cannot read {}: {}", path.display(), e),
            }),
        })?;
        Self::from_bytes(&bytes)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "model".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tiny_artifact() -> ModelArtifact {
        let features: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![(i % 10) as f64, 5.0, (i % 3) as f64, 4.0])
            .collect();
        let targets: Vec<f64> = features.iter().map(|row| row[0] * 0.6 + row[2]).collect();
        let params = BoosterParams {
            n_estimators: 5,
            min_samples_leaf: 2,
            ..BoosterParams::default()
        };
        let model = GradientBoostedRegressor::fit(&features, &targets, &params, 42).unwrap();
        ModelArtifact::new(model, params, 42)
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("exertion.bin");
        let artifact = tiny_artifact();

        artifact.save(&path).unwrap();
        assert!(!dir.path().join("models").join("exertion.bin.tmp").exists());

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);
    }

    #[test]
    fn test_failed_save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        // A non-empty directory at the target makes the final rename fail
        let path = dir.path().join("exertion.bin");
        fs::create_dir_all(path.join("occupied")).unwrap();

        assert!(tiny_artifact().save(&path).is_err());
        assert!(!dir.path().join("exertion.bin.tmp").exists());
        assert!(path.join("occupied").is_dir());
    }

    #[test]
    fn test_missing_file_is_model_unavailable() {
        let dir = tempdir().unwrap();
        let err = ModelArtifact::load(dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, RepCoachError::ModelUnavailable(ModelError::NotFound { .. })));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = ModelArtifact::from_bytes(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, RepCoachError::ModelUnavailable(ModelError::Corrupted { .. })));
    }

    #[test]
    fn test_tampered_payload_fails_checksum() {
        let artifact = tiny_artifact();
        let payload = bincode::serialize(&artifact).unwrap();
        let mut tampered = payload.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;

        let envelope = ArtifactEnvelope {
            format_version: ARTIFACT_FORMAT_VERSION,
            checksum: sha256_hex(&payload),
            payload: tampered,
        };
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bincode::serialize(&envelope).unwrap()).unwrap();
        let bytes = encoder.finish().unwrap();

        let err = ModelArtifact::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            RepCoachError::ModelUnavailable(ModelError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_feature_layout_is_checked() {
        let mut artifact = tiny_artifact();
        artifact.feature_names.swap(2, 3);
        assert!(matches!(
            artifact.verify().unwrap_err(),
            RepCoachError::ModelUnavailable(ModelError::FeatureMismatch { .. })
        ));
    }
}

//! Random-forest adapter: implementation of `ModelGateway` over an exported
//! forest artifact.
//!
//! The training pipeline exports each fitted tree as parallel node arrays
//! (`children_left`, `children_right`, `feature`, `threshold`, `value`). At
//! load time the arrays are validated and converted into an explicit node
//! tree; inference walks every tree and averages the leaf class shares.
//!
//! # Security
//!
//! Artifacts may be bound by a signed manifest (see [`signature`]). Unsigned
//! artifacts load only when the [`ArtifactPolicy`] allows it.

pub mod signature;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::FeatureVector;
use crate::ports::{ModelError, ModelGateway};

pub use signature::{
    load_verifying_key, sha256_hex, verify_artifact, verifying_key_from_b64, ArtifactPolicy,
    ModelManifest, MANIFEST_FILE_NAME, SIGNATURE_FILE_NAME,
};

/// Artifact file name expected inside a model directory.
pub const MODEL_FILE_NAME: &str = "vision_model.json";

/// Only export format understood by this loader.
pub const FORMAT_VERSION: u32 = 1;

/// Model artifact load failures. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("model artifact not found at {0:?}")]
    NotFound(PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model artifact is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("model artifact is incompatible: {0}")]
    Incompatible(String),

    #[error("model signature rejected: {0}")]
    Signature(String),
}

/// One tree as exported by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class counts (or weights): `[class 0, class 1]`.
    pub value: Vec<Vec<f64>>,
}

/// Forest export format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedForest {
    pub format_version: u32,
    pub classes: Vec<u8>,
    pub feature_names: Vec<String>,
    pub trees: Vec<ExportedTree>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Normalized `[p(class 0), p(class 1)]` at this leaf.
    Leaf([f64; 2]),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Convert and validate one exported tree.
    fn from_export(idx: usize, tree: &ExportedTree, n_features: usize) -> Result<Self, ArtifactError> {
        let n = tree.children_left.len();
        let bad = |msg: String| ArtifactError::Incompatible(format!("tree {idx}: {msg}"));

        if n == 0 {
            return Err(bad("no nodes".into()));
        }
        if tree.children_right.len() != n
            || tree.feature.len() != n
            || tree.threshold.len() != n
            || tree.value.len() != n
        {
            return Err(bad("node arrays differ in length".into()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = tree.children_left[i];
            let right = tree.children_right[i];

            if left < 0 {
                let counts = &tree.value[i];
                if counts.len() != 2 {
                    return Err(bad(format!("leaf {i} must have 2 class values")));
                }
                let total = counts[0] + counts[1];
                if !counts.iter().all(|c| c.is_finite() && *c >= 0.0) || total <= 0.0 {
                    return Err(bad(format!("leaf {i} has invalid class values")));
                }
                nodes.push(Node::Leaf([counts[0] / total, counts[1] / total]));
                continue;
            }

            // Children always come after their parent; this also rules out cycles.
            let forward = |child: i64| {
                usize::try_from(child)
                    .ok()
                    .filter(|&c| c > i && c < n)
            };
            let (Some(left), Some(right)) = (forward(left), forward(right)) else {
                return Err(bad(format!("node {i} has out-of-range children")));
            };
            let Some(feature) = usize::try_from(tree.feature[i])
                .ok()
                .filter(|&f| f < n_features)
            else {
                return Err(bad(format!("node {i} splits on an unknown feature")));
            };
            let threshold = tree.threshold[i];
            if !threshold.is_finite() {
                return Err(bad(format!("node {i} has a non-finite threshold")));
            }

            nodes.push(Node::Split {
                feature,
                threshold,
                left,
                right,
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_distribution(&self, x: &[f64]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(dist) => return *dist,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Forest {
    feature_names: Vec<String>,
    trees: Vec<Tree>,
}

impl Forest {
    fn from_export(export: &ExportedForest) -> Result<Self, ArtifactError> {
        if export.format_version != FORMAT_VERSION {
            return Err(ArtifactError::Incompatible(format!(
                "unsupported format_version {} (expected {FORMAT_VERSION})",
                export.format_version
            )));
        }
        if export.classes != [0, 1] {
            return Err(ArtifactError::Incompatible(format!(
                "expected binary classes [0, 1], got {:?}",
                export.classes
            )));
        }
        if export.feature_names.is_empty() {
            return Err(ArtifactError::Incompatible("feature_names is empty".into()));
        }
        if export.trees.is_empty() {
            return Err(ArtifactError::Incompatible("forest has no trees".into()));
        }

        let n_features = export.feature_names.len();
        let trees = export
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| Tree::from_export(i, t, n_features))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            feature_names: export.feature_names.clone(),
            trees,
        })
    }

    /// Mean of the per-tree leaf distributions.
    fn distribution(&self, x: &[f64]) -> [f64; 2] {
        let mut sum = [0.0; 2];
        for tree in &self.trees {
            let [p0, p1] = tree.leaf_distribution(x);
            sum[0] += p0;
            sum[1] += p1;
        }
        let n = self.trees.len() as f64;
        [sum[0] / n, sum[1] / n]
    }
}

/// Summary of the loaded artifact for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    pub source: PathBuf,
    pub n_trees: usize,
    pub n_features: usize,
    pub signed: bool,
}

/// Random-forest classifier loaded from an exported artifact.
pub struct RandomForestAdapter {
    model: Option<(Forest, ModelSummary)>,
}

impl RandomForestAdapter {
    /// Create an adapter with no model loaded.
    #[must_use]
    pub fn new() -> Self {
        Self { model: None }
    }

    /// Create an adapter and load the artifact at `path`.
    ///
    /// # Errors
    /// Returns `ArtifactError` if the artifact cannot be loaded.
    pub fn from_path(path: &Path, policy: &ArtifactPolicy) -> Result<Self, ArtifactError> {
        let mut adapter = Self::new();
        adapter.load_model(path, policy)?;
        Ok(adapter)
    }

    /// Load the forest from `path`, a model directory or the artifact file.
    ///
    /// # Errors
    /// Returns `ArtifactError` if the artifact is missing, unsigned (and the
    /// policy forbids it), fails verification, or is structurally invalid.
    pub fn load_model(&mut self, path: &Path, policy: &ArtifactPolicy) -> Result<(), ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }

        let (dir, model_path) = if path.is_dir() {
            (path.to_path_buf(), path.join(MODEL_FILE_NAME))
        } else {
            let dir = path
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            (dir, path.to_path_buf())
        };
        let file_name = model_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(MODEL_FILE_NAME)
            .to_string();

        if !model_path.is_file() {
            return Err(ArtifactError::NotFound(model_path));
        }
        // Read once: the bytes that are verified are the bytes that are parsed.
        let bytes = std::fs::read(&model_path).map_err(|source| ArtifactError::Read {
            path: model_path.clone(),
            source,
        })?;
        let manifest = verify_artifact(&dir, &file_name, &bytes, policy)?;

        let export: ExportedForest = serde_json::from_slice(&bytes)?;
        let forest = Forest::from_export(&export)?;

        let summary = ModelSummary {
            source: model_path,
            n_trees: forest.trees.len(),
            n_features: forest.feature_names.len(),
            signed: manifest.is_some(),
        };
        tracing::info!(
            "Loaded model from {:?} (trees={}, features={}, signed={})",
            summary.source,
            summary.n_trees,
            summary.n_features,
            summary.signed
        );

        self.model = Some((forest, summary));
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    #[must_use]
    pub fn summary(&self) -> Option<&ModelSummary> {
        self.model.as_ref().map(|(_, s)| s)
    }

    fn forest(&self) -> Result<&Forest, ModelError> {
        self.model
            .as_ref()
            .map(|(f, _)| f)
            .ok_or(ModelError::NotLoaded)
    }

    /// Check the vector was built for this model's schema.
    fn aligned<'a>(&'a self, features: &'a FeatureVector) -> Result<(&'a Forest, &'a [f64]), ModelError> {
        let forest = self.forest()?;
        if features.len() != forest.feature_names.len() {
            return Err(ModelError::Misaligned(format!(
                "expected {} features, got {}",
                forest.feature_names.len(),
                features.len()
            )));
        }
        if features.names() != forest.feature_names.as_slice() {
            return Err(ModelError::Misaligned(
                "feature names or order differ from the training schema".into(),
            ));
        }
        Ok((forest, features.values()))
    }
}

impl Default for RandomForestAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelGateway for RandomForestAdapter {
    fn feature_names(&self) -> Result<Vec<String>, ModelError> {
        self.model
            .as_ref()
            .map(|(f, _)| f.feature_names.clone())
            .ok_or_else(|| ModelError::SchemaUnavailable("no model loaded".into()))
    }

    fn predict(&self, features: &FeatureVector) -> Result<u8, ModelError> {
        let (forest, x) = self.aligned(features)?;
        let [p0, p1] = forest.distribution(x);
        // argmax; ties resolve to class 0
        Ok(u8::from(p1 > p0))
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let (forest, x) = self.aligned(features)?;
        Ok(forest.distribution(x)[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{encode, FeatureSchema, PatientInput};
    use ed25519_dalek::{Signer, SigningKey};
    use rand::RngCore;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn stump(feature: i64, threshold: f64, left: [f64; 2], right: [f64; 2]) -> ExportedTree {
        ExportedTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![feature, -2, -2],
            threshold: vec![threshold, -2.0, -2.0],
            value: vec![vec![0.0, 0.0], left.to_vec(), right.to_vec()],
        }
    }

    /// Two stumps over `[Age, HbA1c]`.
    fn small_forest() -> ExportedForest {
        ExportedForest {
            format_version: 1,
            classes: vec![0, 1],
            feature_names: vec!["Age".into(), "HbA1c".into()],
            trees: vec![
                stump(0, 50.5, [9.0, 1.0], [2.0, 8.0]),
                stump(1, 7.0, [3.0, 1.0], [1.0, 3.0]),
            ],
        }
    }

    fn write_model(dir: &Path, forest: &ExportedForest) -> Vec<u8> {
        let bytes = serde_json::to_vec(forest).expect("serialize forest");
        std::fs::write(dir.join(MODEL_FILE_NAME), &bytes).expect("write model");
        bytes
    }

    fn sign_dir(dir: &Path, key: &SigningKey, files: &[(&str, &[u8])]) {
        let files: BTreeMap<String, String> = files
            .iter()
            .map(|(name, bytes)| ((*name).to_string(), sha256_hex(bytes)))
            .collect();
        let manifest = ModelManifest {
            version: 1,
            serial: Some(7),
            created_at: Some(1_700_000_000),
            files,
        };
        let bytes = serde_json::to_vec(&manifest).expect("serialize manifest");
        std::fs::write(dir.join(MANIFEST_FILE_NAME), &bytes).expect("write manifest");
        std::fs::write(dir.join(SIGNATURE_FILE_NAME), key.sign(&bytes).to_bytes())
            .expect("write signature");
    }

    fn signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        SigningKey::from_bytes(&seed)
    }

    fn vector_for(adapter: &RandomForestAdapter, input: &PatientInput) -> crate::domain::FeatureVector {
        let names = adapter.feature_names().expect("schema");
        let schema = Arc::new(FeatureSchema::new(names).expect("valid schema"));
        encode(input, &schema)
    }

    fn loaded(forest: &ExportedForest) -> (tempfile::TempDir, RandomForestAdapter) {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), forest);
        let adapter = RandomForestAdapter::from_path(temp.path(), &ArtifactPolicy::permissive())
            .expect("load model");
        (temp, adapter)
    }

    #[test]
    fn test_probability_is_mean_of_leaf_shares() {
        let (_temp, adapter) = loaded(&small_forest());

        // Age 35 -> 0.1, HbA1c 6.5 -> 0.25
        let young = vector_for(&adapter, &PatientInput::default());
        let p = adapter.predict_probability(&young).expect("predict");
        assert!((p - 0.175).abs() < 1e-12);
        assert_eq!(adapter.predict(&young).expect("predict"), 0);

        // Age 70 -> 0.8, HbA1c 9.0 -> 0.75
        let older = vector_for(
            &adapter,
            &PatientInput {
                age: 70,
                hba1c: 9.0,
                ..PatientInput::default()
            },
        );
        let p = adapter.predict_probability(&older).expect("predict");
        assert!((p - 0.775).abs() < 1e-12);
        assert_eq!(adapter.predict(&older).expect("predict"), 1);
    }

    #[test]
    fn test_tie_resolves_to_low_class() {
        let mut forest = small_forest();
        forest.trees = vec![stump(0, 50.5, [1.0, 1.0], [1.0, 1.0])];
        let (_temp, adapter) = loaded(&forest);

        let x = vector_for(&adapter, &PatientInput::default());
        assert!((adapter.predict_probability(&x).expect("predict") - 0.5).abs() < 1e-12);
        assert_eq!(adapter.predict(&x).expect("predict"), 0);
    }

    #[test]
    fn test_load_accepts_file_path() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &small_forest());

        let adapter = RandomForestAdapter::from_path(
            &temp.path().join(MODEL_FILE_NAME),
            &ArtifactPolicy::permissive(),
        )
        .expect("load model file");
        let summary = adapter.summary().expect("summary");
        assert_eq!(summary.n_trees, 2);
        assert_eq!(summary.n_features, 2);
        assert!(!summary.signed);
    }

    #[test]
    fn test_missing_artifact_fails() {
        let temp = tempdir().expect("tempdir");
        let err = RandomForestAdapter::from_path(
            &temp.path().join("nope"),
            &ArtifactPolicy::permissive(),
        )
        .err()
        .expect("must fail");
        assert!(matches!(err, ArtifactError::NotFound(_)));

        // Directory exists but holds no artifact.
        let err = RandomForestAdapter::from_path(temp.path(), &ArtifactPolicy::permissive())
            .err()
            .expect("must fail");
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn test_incompatible_artifacts_rejected() {
        let mut multiclass = small_forest();
        multiclass.classes = vec![0, 1, 2];

        let mut backwards = small_forest();
        backwards.trees[0].children_left[0] = 0;

        let mut bad_feature = small_forest();
        bad_feature.trees[1].feature[0] = 5;

        let mut bad_leaf = small_forest();
        bad_leaf.trees[0].value[1] = vec![0.0, 0.0];

        let mut future_format = small_forest();
        future_format.format_version = 2;

        let mut no_trees = small_forest();
        no_trees.trees.clear();

        let mut no_names = small_forest();
        no_names.feature_names.clear();

        let mut ragged = small_forest();
        ragged.trees[1].threshold.pop();

        let mut empty_tree = small_forest();
        empty_tree.trees[0] = ExportedTree {
            children_left: vec![],
            children_right: vec![],
            feature: vec![],
            threshold: vec![],
            value: vec![],
        };

        for forest in [
            multiclass,
            backwards,
            bad_feature,
            bad_leaf,
            future_format,
            no_trees,
            no_names,
            ragged,
            empty_tree,
        ] {
            let temp = tempdir().expect("tempdir");
            write_model(temp.path(), &forest);
            let err = RandomForestAdapter::from_path(temp.path(), &ArtifactPolicy::permissive())
                .err()
                .expect("must fail");
            assert!(matches!(err, ArtifactError::Incompatible(_)), "{err}");
        }
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        // JSON has no NaN literal, so this check is exercised on the export directly.
        let mut forest = small_forest();
        forest.trees[0].threshold[0] = f64::NAN;
        let err = Forest::from_export(&forest).err().expect("must fail");
        assert!(err.to_string().contains("non-finite threshold"), "{err}");
    }

    #[test]
    fn test_corrupt_json_rejected() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join(MODEL_FILE_NAME), b"\x80\x04pickle").expect("write");
        let err = RandomForestAdapter::from_path(temp.path(), &ArtifactPolicy::permissive())
            .err()
            .expect("must fail");
        assert!(matches!(
            err,
            ArtifactError::Format(_) | ArtifactError::Read { .. }
        ));
    }

    #[test]
    fn test_unsigned_refused_by_default() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &small_forest());

        let err = RandomForestAdapter::from_path(temp.path(), &ArtifactPolicy::default())
            .err()
            .expect("must fail");
        assert!(matches!(err, ArtifactError::Signature(_)));
    }

    #[test]
    fn test_signed_artifact_loads() {
        let temp = tempdir().expect("tempdir");
        let bytes = write_model(temp.path(), &small_forest());
        let key = signing_key();
        sign_dir(temp.path(), &key, &[(MODEL_FILE_NAME, &bytes)]);

        let policy = ArtifactPolicy::default().with_verifying_key(key.verifying_key());
        let adapter = RandomForestAdapter::from_path(temp.path(), &policy).expect("load signed");
        assert!(adapter.summary().expect("summary").signed);
    }

    #[test]
    fn test_tampered_artifact_rejected() {
        let temp = tempdir().expect("tempdir");
        let bytes = write_model(temp.path(), &small_forest());
        let key = signing_key();
        sign_dir(temp.path(), &key, &[(MODEL_FILE_NAME, &bytes)]);

        let mut tampered = small_forest();
        tampered.trees[0].value[2] = vec![0.0, 10.0];
        write_model(temp.path(), &tampered);

        let policy = ArtifactPolicy::default().with_verifying_key(key.verifying_key());
        let err = RandomForestAdapter::from_path(temp.path(), &policy)
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_verification_hashes_supplied_bytes() {
        let temp = tempdir().expect("tempdir");
        let bytes = write_model(temp.path(), &small_forest());
        let key = signing_key();
        sign_dir(temp.path(), &key, &[(MODEL_FILE_NAME, &bytes)]);
        let policy = ArtifactPolicy::default().with_verifying_key(key.verifying_key());

        // Replace the file on disk after it was read: the signed bytes still verify.
        let mut swapped = small_forest();
        swapped.trees[0].value[2] = vec![0.0, 10.0];
        let swapped_bytes = write_model(temp.path(), &swapped);
        assert!(verify_artifact(temp.path(), MODEL_FILE_NAME, &bytes, &policy).is_ok());

        // Bytes that differ from the manifest are refused whatever is on disk.
        write_model(temp.path(), &small_forest());
        let err = verify_artifact(temp.path(), MODEL_FILE_NAME, &swapped_bytes, &policy)
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_serial_floor_enforced() {
        let temp = tempdir().expect("tempdir");
        let bytes = write_model(temp.path(), &small_forest());
        let key = signing_key();
        sign_dir(temp.path(), &key, &[(MODEL_FILE_NAME, &bytes)]);
        let policy = ArtifactPolicy::default().with_verifying_key(key.verifying_key());

        // sign_dir writes serial 7.
        assert!(RandomForestAdapter::from_path(temp.path(), &policy.clone().with_min_serial(7)).is_ok());
        let err = RandomForestAdapter::from_path(temp.path(), &policy.with_min_serial(8))
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("older than the required minimum"), "{err}");
    }

    #[test]
    fn test_wrong_key_rejected() {
        let temp = tempdir().expect("tempdir");
        let bytes = write_model(temp.path(), &small_forest());
        sign_dir(temp.path(), &signing_key(), &[(MODEL_FILE_NAME, &bytes)]);

        let policy = ArtifactPolicy::default().with_verifying_key(signing_key().verifying_key());
        let err = RandomForestAdapter::from_path(temp.path(), &policy)
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("signature is invalid"));
    }

    #[test]
    fn test_manifest_must_bind_model_file() {
        let temp = tempdir().expect("tempdir");
        write_model(temp.path(), &small_forest());
        std::fs::write(temp.path().join("notes.txt"), b"hello").expect("write");
        let key = signing_key();
        sign_dir(temp.path(), &key, &[("notes.txt", b"hello")]);

        let policy = ArtifactPolicy::default().with_verifying_key(key.verifying_key());
        let err = RandomForestAdapter::from_path(temp.path(), &policy)
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("does not bind"));
    }

    #[test]
    fn test_unloaded_adapter_has_no_schema() {
        let adapter = RandomForestAdapter::new();
        assert!(matches!(
            adapter.feature_names(),
            Err(ModelError::SchemaUnavailable(_))
        ));
    }

    #[test]
    fn test_misaligned_vector_rejected() {
        let (_temp, adapter) = loaded(&small_forest());
        let schema = Arc::new(FeatureSchema::new(["HbA1c", "Age"]).expect("valid schema"));
        let reversed = encode(&PatientInput::default(), &schema);

        assert!(matches!(
            adapter.predict(&reversed),
            Err(ModelError::Misaligned(_))
        ));
    }
}

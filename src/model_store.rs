// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Model archive persistence
//!
//! A trained pipeline is stored as a ZIP archive with two entries:
//! - `model.json`: the serialized `SentimentPipeline`
//! - `manifest.json`: format version, creation time, schema and a SHA-256
//!   digest of `model.json`
//!
//! Loading validates the format version and the digest before deserializing.

use crate::datasets::{LABEL_COLUMN, TEXT_COLUMN};
use crate::trainers::{Classifier, SentimentPipeline, TrainerConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const FORMAT_VERSION: u32 = 1;
const MODEL_ENTRY: &str = "model.json";
const MANIFEST_ENTRY: &str = "manifest.json";

/// Errors raised while reading or writing a model archive
#[derive(Error, Debug)]
pub enum ModelStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model archive is missing entry '{0}'")]
    MissingEntry(&'static str),

    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Checksum mismatch for '{entry}': expected {expected}, got {found}")]
    ChecksumMismatch {
        entry: &'static str,
        expected: String,
        found: String,
    },

    #[error("Refusing to save an untrained model")]
    Untrained,
}

/// Metadata stored next to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub format_version: u32,
    pub crate_version: String,
    pub created_at: DateTime<Utc>,
    /// Input column names, label first
    pub input_columns: Vec<String>,
    /// Class labels in score order
    pub classes: Vec<String>,
    pub trainer: TrainerConfig,
    pub model_sha256: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Save a trained pipeline to `path`, creating parent directories
pub fn save_model(model: &SentimentPipeline, path: &Path) -> Result<ModelManifest, ModelStoreError> {
    if !model.is_trained() {
        return Err(ModelStoreError::Untrained);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let model_bytes = serde_json::to_vec(model)?;
    let manifest = ModelManifest {
        format_version: FORMAT_VERSION,
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
        created_at: Utc::now(),
        input_columns: vec![LABEL_COLUMN.to_string(), TEXT_COLUMN.to_string()],
        classes: model.class_labels().to_vec(),
        trainer: *model.config(),
        model_sha256: sha256_hex(&model_bytes),
    };

    // An existing archive stays intact until the new one is complete
    let staging = staging_path(path);
    if let Err(e) = write_entries(&staging, &manifest, &model_bytes) {
        let _ = std::fs::remove_file(&staging);
        return Err(e);
    }
    std::fs::rename(&staging, path)?;

    tracing::debug!("Wrote model archive {} ({} classes)", path.display(), manifest.classes.len());
    Ok(manifest)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| MODEL_ENTRY.into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_entries(
    path: &Path,
    manifest: &ModelManifest,
    model_bytes: &[u8],
) -> Result<(), ModelStoreError> {
    let mut zip = ZipWriter::new(File::create(path)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, options)?;
    zip.write_all(&serde_json::to_vec_pretty(manifest)?)?;

    zip.start_file(MODEL_ENTRY, options)?;
    zip.write_all(model_bytes)?;

    zip.finish()?.sync_all()?;
    Ok(())
}

fn read_entry<R: Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &'static str,
) -> Result<Vec<u8>, ModelStoreError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Err(ModelStoreError::MissingEntry(name)),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Read only the manifest of an archive
pub fn read_manifest(path: &Path) -> Result<ModelManifest, ModelStoreError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let manifest: ModelManifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)?;
    Ok(manifest)
}

/// Load and verify a pipeline saved with [`save_model`]
pub fn load_model(path: &Path) -> Result<(SentimentPipeline, ModelManifest), ModelStoreError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let manifest: ModelManifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(ModelStoreError::UnsupportedVersion {
            found: manifest.format_version,
            expected: FORMAT_VERSION,
        });
    }

    let model_bytes = read_entry(&mut archive, MODEL_ENTRY)?;
    let digest = sha256_hex(&model_bytes);
    if digest != manifest.model_sha256 {
        return Err(ModelStoreError::ChecksumMismatch {
            entry: MODEL_ENTRY,
            expected: manifest.model_sha256.clone(),
            found: digest,
        });
    }

    let model: SentimentPipeline = serde_json::from_slice(&model_bytes)?;
    Ok((model, manifest))
}

use crate::store::DB_FILE_NAME;
use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/attendance.sqlite3";
pub const BUNDLE_FORMAT_V1: &str = "attendance-workspace-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub db_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub db_sha256: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let db_path = workspace_path.join(DB_FILE_NAME);
    if !db_path.is_file() {
        return Err(anyhow!(
            "workspace database not found: {}",
            db_path.to_string_lossy()
        ));
    }
    let db_bytes = std::fs::read(&db_path)
        .with_context(|| format!("failed to read database {}", db_path.to_string_lossy()))?;
    let db_sha256 = sha256_hex(&db_bytes);

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "dbSha256": db_sha256,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DB_ENTRY, opts)
        .context("failed to start database entry")?;
    zip.write_all(&db_bytes)
        .context("failed to write database entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 2,
        db_sha256,
    })
}

/// A verified bundle database written next to the workspace database but
/// not yet swapped in.
#[derive(Debug)]
pub struct StagedImport {
    staged_path: PathBuf,
    db_path: PathBuf,
    summary: ImportSummary,
}

impl StagedImport {
    /// Moves the staged database over the workspace database.
    ///
    /// The caller must not hold the workspace store open while this runs.
    pub fn commit(self) -> anyhow::Result<ImportSummary> {
        if let Err(e) = std::fs::rename(&self.staged_path, &self.db_path) {
            let _ = std::fs::remove_file(&self.staged_path);
            return Err(e).with_context(|| {
                format!(
                    "failed to move extracted database to {}",
                    self.db_path.to_string_lossy()
                )
            });
        }
        Ok(self.summary)
    }
}

/// Checks the bundle at `in_path` and extracts its database to a temp file
/// in the workspace. The live database is untouched.
pub fn stage_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<StagedImport> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }
    let expected_sha = manifest
        .get("dbSha256")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("manifest.json missing dbSha256"))?
        .to_string();

    let mut db_bytes = Vec::new();
    archive
        .by_name(DB_ENTRY)
        .context("bundle missing db/attendance.sqlite3")?
        .read_to_end(&mut db_bytes)
        .context("failed to extract database entry")?;
    let actual_sha = sha256_hex(&db_bytes);
    if actual_sha != expected_sha {
        return Err(anyhow!(
            "database checksum mismatch: manifest {} but bundle holds {}",
            expected_sha,
            actual_sha
        ));
    }

    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;
    let db_path = workspace_path.join(DB_FILE_NAME);
    let staged_path = workspace_path.join(format!("{}.importing", DB_FILE_NAME));
    if staged_path.exists() {
        let _ = std::fs::remove_file(&staged_path);
    }
    let written = File::create(&staged_path)
        .with_context(|| {
            format!(
                "failed to create temp database {}",
                staged_path.to_string_lossy()
            )
        })
        .and_then(|mut out| {
            out.write_all(&db_bytes)
                .context("failed to write extracted database")?;
            out.flush().context("failed to flush extracted database")
        });
    if let Err(e) = written {
        let _ = std::fs::remove_file(&staged_path);
        return Err(e);
    }

    Ok(StagedImport {
        staged_path,
        db_path,
        summary: ImportSummary {
            bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
            db_sha256: actual_sha,
        },
    })
}

/// Replaces the workspace database with the one in `in_path`.
///
/// The caller must not hold the workspace store open while this runs.
#[allow(dead_code)]
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    stage_workspace_bundle(in_path, workspace_path)?.commit()
}

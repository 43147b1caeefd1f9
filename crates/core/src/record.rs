//! Ingested record types and batch discriminators.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One file description from the manifest stream.
///
/// Only the fields the catalog needs are typed; everything else the
/// producer attached is kept in `extra` and written back out when the
/// record is serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Local staging path of the downloaded file.
    pub local_file: String,
    /// Base URL of the remote source.
    pub base_url: String,
    /// Path of the file on the remote source.
    pub srcfile: String,
    /// Content hash of the file.
    pub metahash: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ManifestRecord {
    /// Parse and validate a single JSON line.
    pub fn parse(line: &str) -> Result<Self> {
        let record: Self =
            serde_json::from_str(line).map_err(|e| Error::MalformedRecord(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    fn validate(&self) -> Result<()> {
        if self.local_file.trim().is_empty() {
            return Err(Error::MalformedRecord("empty local_file".to_string()));
        }
        if self.metahash.trim().is_empty() {
            return Err(Error::MalformedRecord("empty metahash".to_string()));
        }
        Ok(())
    }

    /// Catalog filename for this record.
    pub fn filename(&self) -> &str {
        &self.local_file
    }

    /// Final path component of the staged file, used as the object name.
    pub fn object_name(&self) -> &str {
        Path::new(&self.local_file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.local_file)
    }
}

/// A deletion-mode record naming a file that vanished from the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    pub deleted_filename: String,
}

impl DeletionRecord {
    /// Parse a deletion line. Accepts either a JSON object with
    /// `deleted_filename` or a bare filename as printed by deletion detection.
    pub fn parse(line: &str) -> Result<Self> {
        let trimmed = line.trim();
        let record = if trimmed.starts_with('{') {
            serde_json::from_str::<Self>(trimmed)
                .map_err(|e| Error::MalformedRecord(e.to_string()))?
        } else {
            Self {
                deleted_filename: trimmed.to_string(),
            }
        };
        if record.deleted_filename.trim().is_empty() {
            return Err(Error::MalformedRecord(
                "empty deleted_filename".to_string(),
            ));
        }
        Ok(record)
    }
}

/// Which write path a batch goes through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// New or changed files.
    #[default]
    Asset,
    /// Filenames to soft-delete.
    Deletion,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Asset => "asset",
            RecordType::Deletion => "deletion",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asset" => Ok(RecordType::Asset),
            "deletion" => Ok(RecordType::Deletion),
            other => Err(Error::UnrecognizedRecordType(other.to_string())),
        }
    }
}

/// How the dedup filter keys its catalog lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Match on content hash across the full history, deleted rows included.
    Hash,
    /// Match live rows by filename, then compare hashes.
    #[default]
    Filename,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Hash => "hash",
            MatchMode::Filename => "filename",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hash" => Ok(MatchMode::Hash),
            "filename" => Ok(MatchMode::Filename),
            other => Err(Error::UnrecognizedMatchMode(other.to_string())),
        }
    }
}

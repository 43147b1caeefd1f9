//! Deletion detection: which known files are missing from the latest manifest.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::BufRead;

#[derive(Deserialize)]
struct ManifestEntry {
    local_file: String,
}

/// Set of `local_file` values referenced by a manifest snapshot.
#[derive(Clone, Debug, Default)]
pub struct ManifestIndex {
    files: HashSet<String>,
}

impl ManifestIndex {
    /// Read a JSON-lines manifest. Blank lines are skipped; any other line
    /// must be a JSON object carrying `local_file`.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut files = HashSet::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let entry: ManifestEntry =
                serde_json::from_str(trimmed).map_err(|e| Error::Manifest {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            files.insert(entry.local_file);
        }
        Ok(Self { files })
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.files.contains(filename)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ManifestIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Read a plain filename list, one per line, trimming whitespace and
/// skipping blank lines.
pub fn read_filename_list<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            names.push(trimmed.to_string());
        }
    }
    Ok(names)
}

/// Filenames known to the catalog that the manifest no longer references,
/// in the order they were supplied.
pub fn detect_deletions<I, S>(catalog_filenames: I, manifest: &ManifestIndex) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    catalog_filenames
        .into_iter()
        .map(Into::into)
        .filter(|filename| {
            let missing = !manifest.contains(filename);
            if missing {
                tracing::info!(filename = %filename, "file deletion detected");
            }
            missing
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_detects_exactly_the_set_difference() {
        let manifest: ManifestIndex = ["a", "c"].into_iter().collect();
        let deleted = detect_deletions(["a", "b", "c"], &manifest);
        assert_eq!(deleted, vec!["b".to_string()]);
    }

    #[test]
    fn test_equal_sets_detect_nothing() {
        let manifest: ManifestIndex = ["a", "b"].into_iter().collect();
        assert!(detect_deletions(["b", "a"], &manifest).is_empty());
    }

    #[test]
    fn test_preserves_catalog_order() {
        let manifest: ManifestIndex = ["m"].into_iter().collect();
        let deleted = detect_deletions(["z", "m", "a", "k"], &manifest);
        assert_eq!(deleted, vec!["z", "a", "k"]);
    }

    #[test]
    fn test_manifest_from_reader_skips_blank_lines() {
        let input = "{\"local_file\":\"a.csv\",\"metahash\":\"1\"}\n\n   \n{\"local_file\":\"b.csv\"}\n";
        let index = ManifestIndex::from_reader(Cursor::new(input)).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.contains("a.csv"));
        assert!(index.contains("b.csv"));
    }

    #[test]
    fn test_manifest_from_reader_reports_bad_line() {
        let input = "{\"local_file\":\"a.csv\"}\n{\"srcfile\":\"x\"}\n";
        match ManifestIndex::from_reader(Cursor::new(input)) {
            Err(Error::Manifest { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_filename_list_trims() {
        let names = read_filename_list(Cursor::new(" a.csv \n\nb.csv\n")).unwrap();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }
}

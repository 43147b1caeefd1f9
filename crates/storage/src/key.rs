//! Object key handle returned by uploads.

use std::fmt;

/// A stored object's location: bucket plus full key, split into folder and name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectKey {
    pub bucket: String,
    pub folder_path: String,
    pub object_name: String,
    pub full_name: String,
}

impl ObjectKey {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        let full_name: String = key.into();
        let (folder_path, object_name) = match full_name.rsplit_once('/') {
            Some((folder, name)) => (folder.to_string(), name.to_string()),
            None => (String::new(), full_name.clone()),
        };
        Self {
            bucket: bucket.into(),
            folder_path,
            object_name,
            full_name,
        }
    }

    /// `s3://<bucket>/<key>` form stored in the catalog.
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.full_name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

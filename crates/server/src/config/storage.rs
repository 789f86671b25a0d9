use serde::Deserialize;

/// Where image blobs live.
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Bucket name; blobs are written under `{bucket}/images`.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
        }
    }
}

fn default_bucket() -> String {
    "imagecast".to_owned()
}

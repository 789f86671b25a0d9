use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Directory under the bucket where every uploaded image blob lives.
const IMAGES_DIR: &str = "images";

/// A persisted image record, as stored in the catalog.
///
/// `image_file_name` is the business key: it is unique across live records
/// and a live record always has a blob at `(image_path, image_file_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Catalog-assigned identity.
    pub id: i64,
    /// Free-form description supplied at upload time.
    pub description: Option<String>,
    /// Blob store path, `{bucket}/images`.
    pub image_path: String,
    /// Unique file name, also the blob key.
    pub image_file_name: String,
    /// Extension derived from the file name (may be empty).
    pub image_extension: String,
    /// Resolvable URL returned by the blob store.
    pub url: String,
    /// Size of the blob in bytes.
    pub image_size: u64,
    /// Upload date, serialized as `YYYY-MM-DD`.
    pub update_date: NaiveDate,
}

impl Image {
    /// Serialize the record into the notification message body.
    pub fn to_notification(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// An image record that has not been assigned an identity yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewImage {
    pub description: Option<String>,
    pub image_path: String,
    pub image_file_name: String,
    pub image_extension: String,
    pub url: String,
    pub image_size: u64,
    pub update_date: NaiveDate,
}

impl NewImage {
    /// Attach a catalog identity, producing the stored record.
    pub fn with_id(self, id: i64) -> Image {
        Image {
            id,
            description: self.description,
            image_path: self.image_path,
            image_file_name: self.image_file_name,
            image_extension: self.image_extension,
            url: self.url,
            image_size: self.image_size,
            update_date: self.update_date,
        }
    }

    /// Whether `image` is this record as stored, ignoring its id.
    pub fn describes(&self, image: &Image) -> bool {
        self.description == image.description
            && self.image_path == image.image_path
            && self.image_file_name == image.image_file_name
            && self.image_extension == image.image_extension
            && self.url == image.url
            && self.image_size == image.image_size
            && self.update_date == image.update_date
    }
}

/// A client upload before validation.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub description: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub content: Bytes,
}

impl ImageUpload {
    /// Create an upload without a description.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            description: None,
            file_name: file_name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Size of the uploaded content in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Storage metadata written alongside a blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub content_type: String,
    pub content_length: u64,
}

impl BlobMetadata {
    pub fn new(content_type: impl Into<String>, content_length: u64) -> Self {
        Self {
            content_type: content_type.into(),
            content_length,
        }
    }
}

/// Blob store path for images in the given bucket.
pub fn image_path(bucket: &str) -> String {
    format!("{bucket}/{IMAGES_DIR}")
}

/// Extension of a file name: the text after the last `.` of the final path
/// segment, or an empty string when there is none.
pub fn extension_of(file_name: &str) -> &str {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    base.rsplit_once('.').map_or("", |(_, ext)| ext)
}

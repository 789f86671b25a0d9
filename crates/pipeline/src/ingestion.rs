use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use rand::seq::SliceRandom;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, warn};

use imagecast_backend::{BackendError, BlobStore, Catalog, MessageQueue};
use imagecast_core::{
    BlobMetadata, Image, ImageContentType, ImageUpload, NewImage, extension_of, image_path,
};

use crate::error::PipelineError;
use crate::policy::CallPolicy;

/// An image record together with its blob content.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub image: Image,
    pub content: Bytes,
}

/// Result of writing an upload's blob.
struct BlobWrite {
    url: String,
    /// Whether this upload created the object, as opposed to finding its
    /// own bytes already stored.
    created: bool,
}

/// Validates uploads and coordinates the blob store, catalog and queue.
///
/// Notifications are enqueued on a background task after the catalog write
/// commits; [`shutdown`](Self::shutdown) waits for any still in flight.
pub struct IngestionService {
    blobs: Arc<dyn BlobStore>,
    catalog: Arc<dyn Catalog>,
    queue: Arc<dyn MessageQueue>,
    policy: CallPolicy,
    bucket: String,
    enqueue_tracker: TaskTracker,
}

impl IngestionService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        catalog: Arc<dyn Catalog>,
        queue: Arc<dyn MessageQueue>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            catalog,
            queue,
            policy: CallPolicy::default(),
            bucket: bucket.into(),
            enqueue_tracker: TaskTracker::new(),
        }
    }

    /// Replace the default call policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Blob store path all images are written under.
    pub fn image_path(&self) -> String {
        image_path(&self.bucket)
    }

    /// Validate and store an upload, returning the durably stored record.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.size()))]
    pub async fn upload(&self, upload: ImageUpload) -> Result<Image, PipelineError> {
        validate_upload(&upload)?;
        let file_name = upload.file_name.as_str();

        let existing = self
            .policy
            .call("catalog.find_by_key", || self.catalog.find_by_key(file_name))
            .await?;
        if existing.is_some() {
            return Err(PipelineError::Validation(format!(
                "an image named '{file_name}' already exists"
            )));
        }

        let path = self.image_path();
        let metadata = BlobMetadata::new(upload.content_type.as_str(), upload.size());
        let blob = self
            .policy
            .call("blob.put", || {
                self.put_blob(&path, file_name, &metadata, &upload.content)
            })
            .await?;
        debug!(url = %blob.url, created = blob.created, "blob stored");

        let record = NewImage {
            description: upload.description.clone(),
            image_path: path.clone(),
            image_file_name: upload.file_name.clone(),
            image_extension: extension_of(file_name).to_owned(),
            url: blob.url.clone(),
            image_size: upload.size(),
            update_date: Utc::now().date_naive(),
        };

        let stored = match self
            .policy
            .call("catalog.save", || self.catalog.save(record.clone()))
            .await
        {
            Ok(_) => self
                .policy
                .call("catalog.find_by_key", || self.catalog.find_by_key(file_name))
                .await?
                .ok_or_else(|| {
                    error!(file_name, "catalog record missing on read-back");
                    PipelineError::NotFound(file_name.to_owned())
                })?,
            Err(e) => self.recover_save(&record, &blob, e).await?,
        };

        self.enqueue_notification(&stored);
        info!(id = stored.id, "image uploaded");
        Ok(stored)
    }

    /// Create-only blob write.
    ///
    /// A `Conflict` whose stored bytes equal `content` is accepted as this
    /// upload's own earlier write (an acknowledgement lost to a timeout).
    async fn put_blob(
        &self,
        path: &str,
        key: &str,
        metadata: &BlobMetadata,
        content: &Bytes,
    ) -> Result<BlobWrite, BackendError> {
        match self.blobs.put(path, key, metadata, content.clone()).await {
            Ok(url) => Ok(BlobWrite { url, created: true }),
            Err(BackendError::Conflict(_)) => {
                let taken = || BackendError::Conflict(format!("an image named '{key}' already exists"));
                let existing = match self.blobs.get(path, key).await {
                    Ok(existing) => existing,
                    Err(BackendError::NotFound(_)) => return Err(taken()),
                    Err(e) => return Err(e),
                };
                if existing != *content {
                    return Err(taken());
                }
                debug!(key, "identical blob already stored");
                Ok(BlobWrite {
                    url: self.blobs.url(path, key)?,
                    created: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Settle a catalog save that reported failure.
    ///
    /// The insert may have committed before its acknowledgement timed out, in
    /// which case the retry reports a conflict. A stored record identical to
    /// `record` is that commit. With no record at all, a blob this upload
    /// created is removed again.
    async fn recover_save(
        &self,
        record: &NewImage,
        blob: &BlobWrite,
        err: PipelineError,
    ) -> Result<Image, PipelineError> {
        let file_name = record.image_file_name.as_str();
        let found = self
            .policy
            .call("catalog.find_by_key", || self.catalog.find_by_key(file_name))
            .await;

        match found {
            Ok(Some(stored)) if record.describes(&stored) => {
                warn!(file_name, id = stored.id, error = %err, "catalog save reported failure but the record is stored");
                Ok(stored)
            }
            Ok(Some(stored)) => {
                debug!(file_name, id = stored.id, "file name taken by another upload");
                Err(err)
            }
            Ok(None) if blob.created => {
                let removed = self
                    .policy
                    .call("blob.delete", || {
                        self.blobs.delete(&record.image_path, file_name)
                    })
                    .await;
                if let Err(e) = removed {
                    error!(file_name, path = %record.image_path, error = %e, "blob written without catalog record");
                }
                Err(err)
            }
            Ok(None) => Err(err),
            Err(e) => {
                error!(file_name, path = %record.image_path, error = %e, "blob written without catalog record");
                Err(err)
            }
        }
    }

    /// Queue the upload notification without blocking the caller.
    fn enqueue_notification(&self, image: &Image) {
        let body = match image.to_notification() {
            Ok(body) => body,
            Err(e) => {
                warn!(file_name = %image.image_file_name, error = %e, "failed to serialize notification");
                return;
            }
        };
        let queue = Arc::clone(&self.queue);
        let policy = self.policy;
        let file_name = image.image_file_name.clone();

        self.enqueue_tracker.spawn(async move {
            match policy.call("queue.send", || queue.send(&body)).await {
                Ok(message_id) => {
                    debug!(file_name = %file_name, message_id = %message_id, "upload notification enqueued");
                }
                Err(e) => {
                    warn!(file_name = %file_name, error = %e, "failed to enqueue upload notification");
                }
            }
        });
    }

    /// Fetch an image and its content by file name.
    #[instrument(skip(self))]
    pub async fn download(&self, file_name: &str) -> Result<DownloadedImage, PipelineError> {
        let image = self.find(file_name).await?;
        let content = self.fetch_blob(&image).await?;
        Ok(DownloadedImage { image, content })
    }

    /// Delete an image's blob and catalog record.
    ///
    /// The blob goes first; if that fails the catalog record is left in place.
    /// Returns the number of catalog records removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, file_name: &str) -> Result<u64, PipelineError> {
        let image = self.find(file_name).await?;

        if let Err(e) = self
            .policy
            .call("blob.delete", || {
                self.blobs.delete(&image.image_path, &image.image_file_name)
            })
            .await
        {
            error!(error = %e, "blob delete failed, catalog record kept");
            return Err(e);
        }

        let deleted = self
            .policy
            .call("catalog.delete_by_key", || {
                self.catalog.delete_by_key(file_name)
            })
            .await
            .inspect_err(|e| {
                warn!(error = %e, "blob deleted but catalog record remains");
            })?;

        info!(deleted, "image deleted");
        Ok(deleted)
    }

    /// Every catalog record.
    pub async fn list(&self) -> Result<Vec<Image>, PipelineError> {
        self.policy
            .call("catalog.find_all", || self.catalog.find_all())
            .await
    }

    /// Pick one image uniformly at random and fetch its content.
    #[instrument(skip(self))]
    pub async fn random_one(&self) -> Result<DownloadedImage, PipelineError> {
        let images = self.list().await?;
        let image = {
            let mut rng = rand::thread_rng();
            images.choose(&mut rng).cloned()
        }
        .ok_or(PipelineError::EmptyCollection)?;

        debug!(file_name = %image.image_file_name, "random image picked");
        let content = self.fetch_blob(&image).await?;
        Ok(DownloadedImage { image, content })
    }

    /// Wait for background notification tasks to finish.
    pub async fn shutdown(&self) {
        self.enqueue_tracker.close();
        self.enqueue_tracker.wait().await;
        debug!("pending notification enqueues drained");
    }

    /// Number of notification tasks still running.
    pub fn pending_notifications(&self) -> usize {
        self.enqueue_tracker.len()
    }

    async fn find(&self, file_name: &str) -> Result<Image, PipelineError> {
        self.policy
            .call("catalog.find_by_key", || self.catalog.find_by_key(file_name))
            .await?
            .ok_or_else(|| PipelineError::NotFound(file_name.to_owned()))
    }

    async fn fetch_blob(&self, image: &Image) -> Result<Bytes, PipelineError> {
        self.policy
            .call("blob.get", || {
                self.blobs.get(&image.image_path, &image.image_file_name)
            })
            .await
    }
}

/// Reject uploads that must not produce any side effect.
fn validate_upload(upload: &ImageUpload) -> Result<(), PipelineError> {
    if upload.content.is_empty() {
        return Err(PipelineError::Validation("cannot upload an empty file".into()));
    }
    if upload.file_name.trim().is_empty() {
        return Err(PipelineError::Validation("file name must not be empty".into()));
    }
    if ImageContentType::from_mime(&upload.content_type).is_none() {
        let allowed: Vec<&str> = ImageContentType::ALL
            .iter()
            .map(|ct| ct.as_mime())
            .collect();
        return Err(PipelineError::Validation(format!(
            "content type '{}' is not allowed (expected one of {})",
            upload.content_type,
            allowed.join(", ")
        )));
    }
    Ok(())
}

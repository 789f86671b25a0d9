//! The imagecast ingestion and notification pipeline.
//!
//! Every service receives its backends as `Arc<dyn Trait>` and routes each
//! backend call through a [`CallPolicy`] (per-attempt timeout plus a single
//! retry of transient failures).

pub mod error;
pub mod ingestion;
pub mod policy;
pub mod relay;
pub mod subscription;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use error::PipelineError;
pub use ingestion::{DownloadedImage, IngestionService};
pub use policy::CallPolicy;
pub use relay::{NotificationRelay, RelayConfig, RelayOutcome, RelayReport, RelayScheduler};
pub use subscription::{SubscriptionManager, UnsubscribeOutcome};
pub use trigger::ExternalTrigger;

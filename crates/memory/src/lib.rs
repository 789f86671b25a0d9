mod blob;
mod catalog;
mod function;
mod queue;
mod topic;

pub use blob::MemoryBlobStore;
pub use catalog::MemoryCatalog;
pub use function::MemoryFunctionInvoker;
pub use queue::MemoryQueue;
pub use topic::{DEFAULT_HISTORY, MemoryTopic, PublishedMessage};

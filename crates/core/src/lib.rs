pub mod content_type;
pub mod function;
pub mod image;
pub mod message;
pub mod subscription;

pub use content_type::ImageContentType;
pub use function::FunctionResponse;
pub use image::{BlobMetadata, Image, ImageUpload, NewImage, extension_of, image_path};
pub use message::QueuedMessage;
pub use subscription::{EMAIL_PROTOCOL, Subscription};

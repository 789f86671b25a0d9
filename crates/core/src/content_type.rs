use std::fmt;

use serde::{Deserialize, Serialize};

/// Content types accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageContentType {
    Png,
    Bmp,
    Gif,
    Jpeg,
}

impl ImageContentType {
    /// Every accepted content type, in allow-list order.
    pub const ALL: [Self; 4] = [Self::Png, Self::Bmp, Self::Gif, Self::Jpeg];

    /// Match a declared MIME type against the allow-list.
    ///
    /// The comparison is exact: parameters such as `; charset=` or a
    /// different case are rejected.
    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ct| ct.as_mime() == mime)
    }

    /// Guess the content type from a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "bmp" => Some(Self::Bmp),
            "gif" => Some(Self::Gif),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn as_mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

//! Error types for the snapshot cloner

use thiserror::Error;

/// Result type alias for snapshot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while snapshotting a render tree.
///
/// Only fatal conditions are represented here. Degradable conditions
/// (unreadable style sheets, unknown fonts, inaccessible frames) are reported
/// as [`crate::Diagnostic`] values and never abort a snapshot.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse markup or a style sheet
    #[error("Parse failed: {0}")]
    ParseError(String),

    /// A selector could not be parsed
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// A node id or lookup did not resolve to a node
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The node kind cannot be snapshotted (documents, doctypes, ...)
    #[error("Unsupported node: {0}")]
    UnsupportedNode(String),

    /// The content document of an embedded frame cannot be read
    #[error("Embedded frame is not accessible: {0}")]
    FrameAccess(String),

    /// The rules of a style sheet cannot be read
    #[error("Style sheet rules are not readable: {0}")]
    StyleSheetAccess(String),

    /// Malformed `unicode-range` descriptor
    #[error("Invalid unicode-range: {0}")]
    UnicodeRange(String),

    /// Failed to encode a raster payload
    #[error("Image encoding failed: {0}")]
    EncodeError(String),

    /// A resource could not be resolved into a data URI
    #[error("Failed to resolve resource {url}: {reason}")]
    ResourceError { url: String, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error
    #[cfg(feature = "fetch")]
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::EncodeError(err.to_string())
    }
}

#[cfg(feature = "fetch")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::ConfigError(format!("invalid URL: {}", err))
    }
}

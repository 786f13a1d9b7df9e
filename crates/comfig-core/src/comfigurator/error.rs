//! Pipeline error types

use thiserror::Error;

use crate::fs::FsError;
use crate::template::TemplateError;

/// Errors that abort a `generate_from_path` call
///
/// Every variant names the location or file it happened at. No partial
/// results accompany an error.
#[derive(Error, Debug)]
pub enum ComfigError {
    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to resolve '{location}': {source}")]
    Resolution {
        location: String,
        #[source]
        source: FsError,
    },

    #[error("Failed to list '{location}': {source}")]
    Listing {
        location: String,
        #[source]
        source: FsError,
    },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: FsError,
    },

    #[error("Failed to parse template '{path}': {source}")]
    TemplateParse {
        path: String,
        #[source]
        source: TemplateError,
    },

    #[error("Failed to render template '{path}': {source}")]
    TemplateRender {
        path: String,
        #[source]
        source: TemplateError,
    },

    #[error("Failed to decode '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ComfigError {
    /// The location or file path the error refers to
    pub fn path(&self) -> &str {
        match self {
            ComfigError::InvalidPattern { pattern, .. } => pattern,
            ComfigError::Resolution { location, .. } | ComfigError::Listing { location, .. } => location,
            ComfigError::Read { path, .. }
            | ComfigError::TemplateParse { path, .. }
            | ComfigError::TemplateRender { path, .. }
            | ComfigError::Decode { path, .. } => path,
        }
    }
}

pub type ComfigResult<T> = Result<T, ComfigError>;

//! Error taxonomy for layout resolution.

use std::path::PathBuf;

/// Errors raised while scanning an iglu directory tree.
///
/// All variants are fatal for the scan: nothing downstream can be trusted
/// once the layout is wrong.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("unhandled schema type '{suffix}' in vendor {vendor}")]
    UnrecognizedType { vendor: String, suffix: String },

    #[error("path {path:?} does not split into vendor/name/format/version")]
    MalformedPath { path: PathBuf },

    #[error("schema root not found: {0:?}")]
    RootNotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

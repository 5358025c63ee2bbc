//! Barrage Services Layer
//!
//! File-backed settings and style sheets for hosts embedding the core.

pub mod settings;
pub mod style_sheet;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode settings")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Style(#[from] barrage_core::style::StyleError),
}

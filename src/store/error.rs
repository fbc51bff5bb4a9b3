use std::path::PathBuf;

use thiserror::Error;

use crate::domain::track::TrackId;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate track id {0}")]
    DuplicateId(TrackId),

    #[error("track {0} has a zero BPM")]
    InvalidBpm(TrackId),

    #[error("track {0} not found")]
    TrackNotFound(TrackId),
}

//! Error types shared by the engine modules.

/// Failure of a single resource fetch (transport or payload).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<ureq::Error> for FetchError {
    fn from(e: ureq::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    /// Directory or segment manifest could not be fetched or decoded.
    #[error("failed to load manifest {url}: {source}")]
    ManifestFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// Render or prefetch requested before the segment directory finished loading.
    #[error("segment directory not loaded yet")]
    LayoutPrecondition,
}

impl GalleryError {
    pub(crate) fn manifest(url: &str, source: impl Into<FetchError>) -> Self {
        GalleryError::ManifestFetch {
            url: url.to_string(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;

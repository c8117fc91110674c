//! Document store error types.

/// Errors from a document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store rejected our credentials
    #[error("unauthorized: check FIRESTORE_ACCESS_TOKEN")]
    Unauthorized,

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// An update or delete targeted a missing document
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// A document could not be encoded or decoded
    #[error("JSON error: {message}")]
    Json { message: String },

    /// Reading or writing the local snapshot file failed
    #[error("snapshot error: {message}")]
    Snapshot { message: String },
}

impl StoreError {
    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Json {
            message: err.to_string(),
        }
    }
}

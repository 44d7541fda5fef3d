// Error types for the holocron catalog layers.
// Every error is local to one request descriptor and is shown inline where
// that descriptor's data would have appeared.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog service unreachable: {0}")]
    UnreachableService(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("Page numbers start at 1")]
    InvalidPage,
}

impl CatalogError {
    /// Whether another attempt could succeed. Only transport-level failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::UnreachableService(_))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::MalformedResponse(err.to_string())
        } else {
            CatalogError::UnreachableService(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::MalformedResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_retry() {
        assert!(CatalogError::UnreachableService("reset".into()).is_retryable());
        assert!(!CatalogError::NotFound("/people/99/".into()).is_retryable());
        assert!(!CatalogError::MalformedResponse("missing url".into()).is_retryable());
        assert!(!CatalogError::InvalidPage.is_retryable());
    }

    #[test]
    fn test_json_errors_are_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(
            CatalogError::from(err),
            CatalogError::MalformedResponse(_)
        ));
    }
}

// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

/// All errors a single panel request can end in.
///
/// The panel API is polled on a best-effort basis, so these never reach the
/// `fetch_*` methods' callers: they are logged and collapsed to `None`.
/// The `try_*` methods surface them unchanged.
#[derive(Debug, thiserror::Error)]
pub enum LaresError {
    /// Network-level failure: refusal, timeout, DNS, broken body stream.
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// Anything else: body not UTF-8, malformed XML, missing elements.
    #[error("Unexpected response: {details}")]
    Unexpected { details: String },
}

impl LaresError {
    pub fn unexpected(details: impl Into<String>) -> Self {
        Self::Unexpected {
            details: details.into(),
        }
    }

    /// Whether the panel could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, LaresError::Connection(_))
    }
}

impl From<roxmltree::Error> for LaresError {
    fn from(e: roxmltree::Error) -> Self {
        Self::unexpected(format!("malformed XML: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, LaresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_is_not_connection() {
        let err = LaresError::unexpected("missing <zone>");
        assert!(!err.is_connection());
        assert_eq!(err.to_string(), "Unexpected response: missing <zone>");
    }

    #[test]
    fn test_xml_error_maps_to_unexpected() {
        let xml_err = roxmltree::Document::parse("<open>").unwrap_err();
        let err = LaresError::from(xml_err);
        assert!(matches!(err, LaresError::Unexpected { .. }));
        assert!(err.to_string().contains("malformed XML"));
    }
}

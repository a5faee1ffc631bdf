use thiserror::Error;

#[derive(Debug, Error)]
pub enum HierarchyError {
    /// An input entity lacks its identity; the build is aborted before any record is created.
    #[error("malformed input at {location}: {reason}")]
    MalformedInput { location: String, reason: String },
    #[error("the document failed to parse")]
    Xml(#[from] roxmltree::Error),
}

impl HierarchyError {
    pub(crate) fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

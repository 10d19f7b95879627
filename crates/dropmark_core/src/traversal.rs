use url::Url;

/// Outcome of resolving an item's link to its ultimate destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub original_url: String,
    pub final_url: Url,
    pub redirect_count: usize,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraversalError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("redirect limit exceeded")]
    RedirectLimitExceeded,
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Other(String),
}

/// Link traversal sub-state of a finalized item. Leaves `NotAttempted` at
/// most once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkTraversal {
    #[default]
    NotAttempted,
    /// Attempted, but the item or the traverser rejected the link.
    Untraversable,
    Resolved(ResolvedLink),
    Failed(TraversalError),
}

impl LinkTraversal {
    pub fn is_attempted(&self) -> bool {
        !matches!(self, LinkTraversal::NotAttempted)
    }

    pub fn is_traversable(&self) -> bool {
        matches!(self, LinkTraversal::Resolved(_) | LinkTraversal::Failed(_))
    }

    pub fn resolved(&self) -> Option<&ResolvedLink> {
        match self {
            LinkTraversal::Resolved(link) => Some(link),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&TraversalError> {
        match self {
            LinkTraversal::Failed(err) => Some(err),
            _ => None,
        }
    }
}

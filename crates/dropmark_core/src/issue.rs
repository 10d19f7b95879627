use std::fmt;

/// Stable diagnostic codes. Callers may branch on these; the message text is
/// free to change.
pub mod codes {
    pub const UNABLE_TO_CREATE_HTTP_REQUEST: &str = "DROPMARKAPIE-0100";
    pub const UNABLE_TO_EXECUTE_HTTP_GET_REQUEST: &str = "DROPMARKAPIE-0200";
    pub const INVALID_API_RESP_HTTP_STATUS_CODE: &str = "DROPMARKAPIE-0300";
    pub const UNABLE_TO_READ_BODY_FROM_HTTP_RESPONSE: &str = "DROPMARKAPIE-0400";
    pub const UNABLE_TO_DECODE_JSON_BODY: &str = "DROPMARKAPIE-0500";

    pub const UNRECOGNIZED_API_ENDPOINT: &str = "DROPMARKAPIW-0100";
    pub const ITEM_SKIPPED_DURING_DECODE: &str = "DROPMARKAPIW-0200";

    pub const ITEM_DELETED: &str = "DMIWARN-001-ITEMDELETED";
    pub const ITEM_NOT_LINK: &str = "DMIWARN-002-ITEMNOTLINK";
    pub const LINK_EMPTY: &str = "DMIWARN-003-LINKEMPTY";

    pub const LINK_TRAVERSAL_FAILED: &str = "DMIERR-001-TRAVERSALFAILED";
    pub const INVALID_TIMESTAMP: &str = "DMIERR-002-INVALIDTIMESTAMP";
    pub const FRONT_MATTER_INVALID: &str = "DMIERR-003-FRONTMATTERINVALID";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A coded problem encountered while importing one collection.
///
/// `context` is the API endpoint of the fetch the issue belongs to. Item-level
/// issues also carry the zero-based index of the offending item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct Issue {
    context: String,
    code: String,
    message: String,
    severity: Severity,
    item_index: Option<usize>,
}

impl Issue {
    pub fn new(
        context: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            context: context.into(),
            code: code.into(),
            message: message.into(),
            severity,
            item_index: None,
        }
    }

    pub fn error(
        context: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(context, code, message, Severity::Error)
    }

    pub fn warning(
        context: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(context, code, message, Severity::Warning)
    }

    /// Attributes the issue to the item at `index`.
    pub fn for_item(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn item_index(&self) -> Option<usize> {
        self.item_index
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

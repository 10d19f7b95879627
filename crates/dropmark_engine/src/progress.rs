use dropmark_logging::dropmark_info;

/// Observes the download of the API response body.
///
/// Implementations only observe: the bytes themselves are never handed to
/// the reporter, so reporting cannot alter the stream.
pub trait ByteProgress: Send + Sync {
    /// `expected` is the declared content length, `None` when unknown.
    fn start_bytes(&self, summary: &str, expected: Option<u64>);
    fn advance_bytes(&self, count: u64);
    fn complete_bytes(&self, summary: &str);
}

/// Observes item finalization, where the number of items is known up front.
///
/// `increment_items` may be called once per completed item in any order.
pub trait ItemProgress: Send + Sync {
    fn start_items(&self, summary: &str, expected: usize);
    fn increment_items(&self, by: usize);
    fn complete_items(&self, summary: &str);
}

/// Reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ByteProgress for SilentProgress {
    fn start_bytes(&self, _summary: &str, _expected: Option<u64>) {}
    fn advance_bytes(&self, _count: u64) {}
    fn complete_bytes(&self, _summary: &str) {}
}

impl ItemProgress for SilentProgress {
    fn start_items(&self, _summary: &str, _expected: usize) {}
    fn increment_items(&self, _by: usize) {}
    fn complete_items(&self, _summary: &str) {}
}

/// Logs start and completion summaries at info level, prefixed with a label.
#[derive(Debug, Clone)]
pub struct LoggingProgress {
    prefix: String,
}

impl LoggingProgress {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl ByteProgress for LoggingProgress {
    fn start_bytes(&self, summary: &str, _expected: Option<u64>) {
        dropmark_info!("[{}] {}", self.prefix, summary);
    }

    fn advance_bytes(&self, _count: u64) {}

    fn complete_bytes(&self, summary: &str) {
        dropmark_info!("[{}] {}", self.prefix, summary);
    }
}

impl ItemProgress for LoggingProgress {
    fn start_items(&self, summary: &str, _expected: usize) {
        dropmark_info!("[{}] {}", self.prefix, summary);
    }

    fn increment_items(&self, _by: usize) {}

    fn complete_items(&self, summary: &str) {
        dropmark_info!("[{}] {}", self.prefix, summary);
    }
}

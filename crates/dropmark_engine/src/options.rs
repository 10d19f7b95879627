use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use dropmark_core::{FrontMatterParser, Issue, TidySink};

use crate::prepare::RequestPreparer;
use crate::progress::{ByteProgress, ItemProgress, SilentProgress};
use crate::sinks::{ErrorSink, WarningSink};
use crate::traverse::LinkTraverser;

/// Timeout of the client built when the caller supplies none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// How items are finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    #[default]
    Sequential,
    /// Finalize items concurrently. `limit` caps the number in flight;
    /// `None` starts every item at once.
    Concurrent { limit: Option<NonZeroUsize> },
}

/// What to do with a body that is not a decodable collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Fail the import.
    #[default]
    Strict,
    /// Keep whatever decodes and record the rest as issues.
    Lenient,
}

/// Capabilities for one import. Every field has a no-op default, so callers
/// only set what they need; setting a field again replaces the earlier value.
#[derive(Clone)]
pub struct ImportOptions {
    /// Shared client for the API request. Must tolerate concurrent use.
    pub client: Option<reqwest::Client>,
    /// Timeout for the default client; ignored when `client` is set.
    pub timeout: Duration,
    pub preparers: Vec<Arc<dyn RequestPreparer>>,
    pub byte_progress: Arc<dyn ByteProgress>,
    pub item_progress: Arc<dyn ItemProgress>,
    pub tidy: Option<Arc<dyn TidySink>>,
    pub errors: Option<Arc<dyn ErrorSink>>,
    pub warnings: Option<Arc<dyn WarningSink>>,
    pub link_traverser: Option<Arc<dyn LinkTraverser>>,
    pub front_matter: Option<Arc<dyn FrontMatterParser>>,
    pub concurrency: Concurrency,
    pub decode_policy: DecodePolicy,
    /// Record a warning when the endpoint does not look like an API URL.
    pub check_endpoint_shape: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            client: None,
            timeout: DEFAULT_TIMEOUT,
            preparers: Vec::new(),
            byte_progress: Arc::new(SilentProgress),
            item_progress: Arc::new(SilentProgress),
            tidy: None,
            errors: None,
            warnings: None,
            link_traverser: None,
            front_matter: None,
            concurrency: Concurrency::Sequential,
            decode_policy: DecodePolicy::Strict,
            check_endpoint_shape: false,
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Appends a preparer; preparers run in the order they were added.
    pub fn with_preparer(mut self, preparer: impl RequestPreparer + 'static) -> Self {
        self.preparers.push(Arc::new(preparer));
        self
    }

    pub fn with_byte_progress(mut self, progress: Arc<dyn ByteProgress>) -> Self {
        self.byte_progress = progress;
        self
    }

    pub fn with_item_progress(mut self, progress: Arc<dyn ItemProgress>) -> Self {
        self.item_progress = progress;
        self
    }

    pub fn with_tidy_sink(mut self, sink: Arc<dyn TidySink>) -> Self {
        self.tidy = Some(sink);
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.errors = Some(sink);
        self
    }

    pub fn with_warning_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.warnings = Some(sink);
        self
    }

    pub fn with_link_traverser(mut self, traverser: Arc<dyn LinkTraverser>) -> Self {
        self.link_traverser = Some(traverser);
        self
    }

    pub fn with_front_matter(mut self, parser: Arc<dyn FrontMatterParser>) -> Self {
        self.front_matter = Some(parser);
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_endpoint_check(mut self, enabled: bool) -> Self {
        self.check_endpoint_shape = enabled;
        self
    }

    /// Forwards `issue` to the error or warning sink matching its severity.
    pub(crate) fn report(&self, issue: &Issue) {
        if issue.is_error() {
            if let Some(sink) = &self.errors {
                sink.on_error(issue.code(), issue);
            }
        } else if let Some(sink) = &self.warnings {
            sink.on_warning(issue.code(), issue.message());
        }
    }
}

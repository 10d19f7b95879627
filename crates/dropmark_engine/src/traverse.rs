use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use dropmark_core::{ResolvedLink, TraversalError};
use dropmark_logging::dropmark_trace;
use reqwest::header::CONTENT_TYPE;

/// Warning code for links whose scheme cannot be followed over HTTP.
pub const UNSUPPORTED_SCHEME: &str = "DMTWARN-001-UNSUPPORTEDSCHEME";

/// Resolves an item's link to its ultimate destination.
#[async_trait::async_trait]
pub trait LinkTraverser: Send + Sync {
    /// Final say on whether `url` should be traversed. `suggested` is the
    /// item's own verdict; rejections may be explained through `warn`.
    fn is_url_traversable(
        &self,
        _url: &str,
        suggested: bool,
        _warn: &mut dyn FnMut(&str, String),
    ) -> bool {
        suggested
    }

    async fn traverse_link(&self, url: &str) -> Result<ResolvedLink, TraversalError>;
}

#[derive(Debug, Clone)]
pub struct TraverseSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
}

impl Default for TraverseSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 10,
        }
    }
}

/// Follows HTTP redirects and reports where a link finally lands. The
/// response body is never read.
#[derive(Debug, Clone, Default)]
pub struct HttpLinkTraverser {
    settings: TraverseSettings,
}

impl HttpLinkTraverser {
    pub fn new(settings: TraverseSettings) -> Self {
        Self { settings }
    }

    fn build_client(
        &self,
        redirect_counter: Arc<AtomicUsize>,
    ) -> Result<reqwest::Client, TraversalError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count > redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| TraversalError::Network(err.to_string()))
    }
}

#[async_trait::async_trait]
impl LinkTraverser for HttpLinkTraverser {
    fn is_url_traversable(
        &self,
        url: &str,
        suggested: bool,
        warn: &mut dyn FnMut(&str, String),
    ) -> bool {
        if !suggested {
            return false;
        }
        match reqwest::Url::parse(url.trim()) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => true,
            Ok(parsed) => {
                warn(
                    UNSUPPORTED_SCHEME,
                    format!("Link scheme {:?} is not traversable", parsed.scheme()),
                );
                false
            }
            // Unparsable links still reach traverse_link so the failure is recorded.
            Err(_) => true,
        }
    }

    async fn traverse_link(&self, url: &str) -> Result<ResolvedLink, TraversalError> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|err| TraversalError::InvalidUrl(err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;

        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TraversalError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let redirect_count = redirect_counter.load(Ordering::Relaxed);
        dropmark_trace!(
            "traversed {} -> {} ({} redirects)",
            url,
            response.url(),
            redirect_count
        );

        Ok(ResolvedLink {
            original_url: url.to_string(),
            final_url: response.url().clone(),
            redirect_count,
            content_type,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TraversalError {
    if err.is_timeout() {
        return TraversalError::Timeout;
    }
    if err.is_redirect() {
        return TraversalError::RedirectLimitExceeded;
    }
    TraversalError::Network(err.to_string())
}

use reqwest::header::{HeaderValue, USER_AGENT};

/// User-Agent callers may choose to send; none is sent unless configured.
pub const DEFAULT_USER_AGENT: &str = "dropmark-client/0.1";

/// Hook that may mutate the API request before it is sent (headers, auth,
/// tracing). Preparers run in registration order.
pub trait RequestPreparer: Send + Sync {
    fn prepare(&self, client: &reqwest::Client, request: &mut reqwest::Request);
}

impl<F> RequestPreparer for F
where
    F: Fn(&reqwest::Client, &mut reqwest::Request) + Send + Sync,
{
    fn prepare(&self, client: &reqwest::Client, request: &mut reqwest::Request) {
        self(client, request)
    }
}

/// Sets the `User-Agent` header.
#[derive(Debug, Clone)]
pub struct UserAgent(HeaderValue);

impl UserAgent {
    /// Fails when `value` is not a valid header value.
    pub fn new(value: &str) -> Result<Self, reqwest::header::InvalidHeaderValue> {
        HeaderValue::from_str(value).map(Self)
    }
}

impl Default for UserAgent {
    fn default() -> Self {
        Self(HeaderValue::from_static(DEFAULT_USER_AGENT))
    }
}

impl RequestPreparer for UserAgent {
    fn prepare(&self, _client: &reqwest::Client, request: &mut reqwest::Request) {
        request.headers_mut().insert(USER_AGENT, self.0.clone());
    }
}

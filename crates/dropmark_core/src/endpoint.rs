use url::Url;

const API_HOST_SUFFIX: &str = ".dropmark.com";

/// Advisory check that `endpoint` has the shape of a collection API URL:
/// `https://<user>.dropmark.com/<digits>.json`.
pub fn is_valid_api_endpoint(endpoint: &str) -> bool {
    let Ok(url) = Url::parse(endpoint) else {
        return false;
    };
    if url.scheme() != "https" || url.query().is_some() || url.fragment().is_some() {
        return false;
    }
    let host_ok = url
        .host_str()
        .and_then(|host| host.strip_suffix(API_HOST_SUFFIX))
        .is_some_and(|user| !user.is_empty());
    if !host_ok {
        return false;
    }
    url.path()
        .strip_prefix('/')
        .and_then(|path| path.strip_suffix(".json"))
        .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
}

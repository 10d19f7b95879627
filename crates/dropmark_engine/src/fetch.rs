use dropmark_core::{codes, is_valid_api_endpoint, Collection, CollectionPayload, Issue};
use dropmark_logging::{dropmark_error, dropmark_info, dropmark_warn};
use futures_util::StreamExt;
use reqwest::StatusCode;

use crate::finalize::finalize_collection;
use crate::options::{DecodePolicy, ImportOptions};

/// Fetches the collection at `endpoint` and finalizes its items.
///
/// Request construction, transport, non-200 status, body read and (under
/// `DecodePolicy::Strict`) decode failures abort the import with an issue
/// carrying the stage's code. Everything else is collected on the returned
/// collection.
pub async fn import_collection(
    endpoint: &str,
    options: &ImportOptions,
) -> Result<Collection, Issue> {
    let mut issues = Vec::new();
    if options.check_endpoint_shape && !is_valid_api_endpoint(endpoint) {
        let issue = Issue::warning(
            endpoint,
            codes::UNRECOGNIZED_API_ENDPOINT,
            format!("{endpoint:?} does not look like a Dropmark API endpoint"),
        );
        dropmark_warn!("{issue}");
        options.report(&issue);
        issues.push(issue);
    }

    let client = resolve_client(options).map_err(|err| {
        fatal(
            options,
            endpoint,
            codes::UNABLE_TO_CREATE_HTTP_REQUEST,
            format!("Unable to create HTTP client: {err}"),
        )
    })?;

    let mut request = client.get(endpoint).build().map_err(|err| {
        fatal(
            options,
            endpoint,
            codes::UNABLE_TO_CREATE_HTTP_REQUEST,
            format!("Unable to create HTTP request: {err}"),
        )
    })?;
    for preparer in &options.preparers {
        preparer.prepare(&client, &mut request);
    }

    dropmark_info!("GET {endpoint}");
    let response = client.execute(request).await.map_err(|err| {
        fatal(
            options,
            endpoint,
            codes::UNABLE_TO_EXECUTE_HTTP_GET_REQUEST,
            format!("Unable to execute HTTP GET request: {err}"),
        )
    })?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(fatal(
            options,
            endpoint,
            codes::INVALID_API_RESP_HTTP_STATUS_CODE,
            format!(
                "Dropmark API status is not HTTP OK (200): {}",
                status.as_u16()
            ),
        ));
    }

    let body = read_body(endpoint, response, options).await?;

    let payload = match options.decode_policy {
        DecodePolicy::Strict => CollectionPayload::from_json(&body).map_err(|err| {
            fatal(
                options,
                endpoint,
                codes::UNABLE_TO_DECODE_JSON_BODY,
                format!("Unable to decode API response body as JSON: {err}"),
            )
        })?,
        DecodePolicy::Lenient => {
            let (payload, decode_issues) = CollectionPayload::from_json_lenient(endpoint, &body);
            for issue in &decode_issues {
                dropmark_warn!("{issue}");
                options.report(issue);
            }
            issues.extend(decode_issues);
            payload
        }
    };
    dropmark_info!(
        "decoded {} items from {endpoint} ({} bytes)",
        payload.items.len(),
        body.len()
    );

    Ok(finalize_collection(endpoint, payload, issues, options).await)
}

fn resolve_client(options: &ImportOptions) -> Result<reqwest::Client, reqwest::Error> {
    match &options.client {
        Some(client) => Ok(client.clone()),
        None => reqwest::Client::builder().timeout(options.timeout).build(),
    }
}

/// Streams the body while reporting byte progress. The bytes collected are
/// exactly the bytes received.
async fn read_body(
    endpoint: &str,
    response: reqwest::Response,
    options: &ImportOptions,
) -> Result<Vec<u8>, Issue> {
    let progress = &options.byte_progress;
    let expected = response.content_length();
    let expected_label = expected.map_or_else(|| "unknown".to_string(), |len| len.to_string());
    progress.start_bytes(
        &format!("Processing Dropmark API request {endpoint:?} ({expected_label} bytes)"),
        expected,
    );

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => {
                body.extend_from_slice(&chunk);
                progress.advance_bytes(chunk.len() as u64);
            }
            Err(err) => {
                progress.complete_bytes(&format!(
                    "Failed Dropmark API request {endpoint:?} after {} bytes",
                    body.len()
                ));
                return Err(fatal(
                    options,
                    endpoint,
                    codes::UNABLE_TO_READ_BODY_FROM_HTTP_RESPONSE,
                    format!("Unable to read body from HTTP response: {err}"),
                ));
            }
        }
    }

    progress.complete_bytes(&format!(
        "Completed Dropmark API request {endpoint:?} ({} bytes)",
        body.len()
    ));
    Ok(body)
}

fn fatal(options: &ImportOptions, endpoint: &str, code: &str, message: String) -> Issue {
    let issue = Issue::error(endpoint, code, message);
    dropmark_error!("{issue}");
    options.report(&issue);
    issue
}

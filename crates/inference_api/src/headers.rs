use std::collections::BTreeMap;

use crate::config::InferenceSettings;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_CONTENT_TYPE: &str = "content-type";

/// Deterministic header set for a request. The bearer header is only present when a
/// non-blank key is configured.
pub fn build_headers(settings: &InferenceSettings, streaming: bool) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(HEADER_CONTENT_TYPE.to_owned(), "application/json".to_owned());

    if streaming {
        headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
    }

    if let Some(key) = settings
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
    {
        headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {key}"));
    }

    headers
}

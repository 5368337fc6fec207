use crate::transport::TransportRequest;
use netcache_core::{ClassifiedError, FailureKind, RequestDescriptor, TransportFailure};
use tracing::warn;
use url::Url;

/// Reduce a reqwest error to the transport failure kinds the classifier knows
pub(crate) fn map_reqwest_error(error: &reqwest::Error) -> TransportFailure {
    let kind = if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_connect() {
        FailureKind::Connect
    } else if error.is_body() || error.is_decode() {
        FailureKind::MalformedResponse
    } else {
        FailureKind::Other
    };

    TransportFailure::new(kind, error.to_string())
}

/// Resolve a descriptor against `base_url` into a wire request
pub(crate) fn build_request(
    base_url: &Url,
    descriptor: &RequestDescriptor,
) -> Result<TransportRequest, ClassifiedError> {
    let url = build_url(base_url, descriptor)?;
    let body = descriptor
        .body()
        .map(serde_json::to_vec)
        .transpose()
        .map_err(|_| ClassifiedError::InvalidEndpoint)?;

    Ok(TransportRequest {
        method: descriptor.method(),
        url,
        headers: descriptor.headers().clone(),
        body,
    })
}

/// Build `base_url` + path + query, failing with `InvalidEndpoint`
pub(crate) fn build_url(
    base_url: &Url,
    descriptor: &RequestDescriptor,
) -> Result<Url, ClassifiedError> {
    descriptor.validate()?;
    if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
        return Err(ClassifiedError::InvalidEndpoint);
    }

    // Url::join replaces the last segment unless the base ends with a slash
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let mut url = base
        .join(descriptor.normalized_path())
        .map_err(|_| ClassifiedError::InvalidEndpoint)?;

    // The joined URL must stay on the base host and below the base path
    if url.origin() != base.origin() || !url.path().starts_with(base.path()) {
        return Err(ClassifiedError::InvalidEndpoint);
    }

    if !descriptor.query_params().is_empty() {
        url.query_pairs_mut()
            .extend_pairs(descriptor.query_params().iter());
    }

    Ok(url)
}

/// Standard cache error handling - logs but doesn't fail the operation
pub(crate) fn handle_cache_error(error: impl std::fmt::Display, operation: &str) {
    warn!(
        error = %error,
        operation = %operation,
        "Cache operation failed, continuing without cache"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcache_core::HttpMethod;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://api.rawg.io/api").unwrap()
    }

    #[test]
    fn test_build_url_with_query() {
        let descriptor = RequestDescriptor::get("/games/")
            .query("page", 1)
            .query("page_size", 20);
        let url = build_url(&base(), &descriptor).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.rawg.io/api/games?page=1&page_size=20"
        );
    }

    #[test]
    fn test_build_url_keeps_base_path() {
        let url = build_url(
            &Url::parse("https://api.rawg.io/api/").unwrap(),
            &RequestDescriptor::get("games/3498/screenshots"),
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://api.rawg.io/api/games/3498/screenshots");
    }

    #[test]
    fn test_build_url_encodes_values() {
        let descriptor = RequestDescriptor::get("games").query("search", "zelda & link");
        let url = build_url(&base(), &descriptor).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.rawg.io/api/games?search=zelda+%26+link"
        );
    }

    #[test]
    fn test_build_url_stays_on_base_host() {
        let base = Url::parse("https://api.rawg.io/api/").unwrap();
        for path in [
            "http://evil.example.com/steal",
            "//evil.example.com/steal",
            "../admin",
            "games/%2e%2e/%2e%2e/admin",
        ] {
            let descriptor = RequestDescriptor::get(path);
            assert_eq!(
                build_url(&base, &descriptor),
                Err(ClassifiedError::InvalidEndpoint),
                "{path} should not leave the base URL"
            );
        }
    }

    #[test]
    fn test_unusable_base_is_invalid_endpoint() {
        let descriptor = RequestDescriptor::get("games");
        for base in ["mailto:games@example.com", "file:///tmp/api/"] {
            assert_eq!(
                build_url(&Url::parse(base).unwrap(), &descriptor),
                Err(ClassifiedError::InvalidEndpoint)
            );
        }
    }

    #[test]
    fn test_build_request_carries_headers_and_body() {
        let descriptor = RequestDescriptor::post("search")
            .header("X-Api-Key", "secret")
            .json_body(json!({"query": "zelda"}));
        let request = build_request(&base(), &descriptor).unwrap();

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.headers.get("X-Api-Key").map(String::as_str),
            Some("secret")
        );
        assert_eq!(request.body.as_deref(), Some(&br#"{"query":"zelda"}"#[..]));
    }
}

/// Check a request's credentials against the configured token.
///
/// With no token configured every request is allowed. Otherwise the bearer
/// header wins when present; the `?token=` query parameter is the fallback
/// for clients that can't set headers.
pub fn validate_token(expected: Option<&str>, bearer: Option<&str>, query_token: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|t| !t.is_empty()) else {
        return true;
    };
    match bearer {
        Some(given) => given == expected,
        None => query_token == Some(expected),
    }
}

/// Extract token from the query string (?token=...).
pub fn extract_token_from_query(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
}

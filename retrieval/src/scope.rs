use url::Url;

/// Canonical form of a scope identifier (a source URL).
///
/// Keeps `scheme://host[:port]/path`, drops the query string and fragment and
/// strips trailing slashes. Ingestion and query-time filtering must both go
/// through this so stored and requested scopes compare equal.
///
/// Only the scheme is lowercased. Host case, explicit ports and the path
/// bytes are kept as written, since stored rows carry them verbatim.
pub fn normalize_scope(scope: &str) -> String {
    let scope = scope.trim();

    let authority_and_path = match Url::parse(scope) {
        Ok(url) if url.has_host() => scope
            .split_once("://")
            .map(|(_, rest)| (url.scheme().to_string(), rest)),
        _ => None,
    };

    match authority_and_path {
        Some((scheme, rest)) => format!("{scheme}://{}", strip_suffix(rest)),
        None => strip_suffix(scope).to_string(),
    }
}

/// Drop the query string, fragment and trailing slashes.
fn strip_suffix(text: &str) -> &str {
    let end = text.find(['?', '#']).unwrap_or(text.len());
    text[..end].trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strips_trailing_slash() {
        assert_eq!(
            normalize_scope("https://example.com/docs/"),
            "https://example.com/docs"
        );
        assert_eq!(normalize_scope("https://example.com/"), "https://example.com");
        assert_eq!(normalize_scope("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_drops_query_and_fragment() {
        assert_eq!(
            normalize_scope("https://example.com/docs/?page=2#intro"),
            "https://example.com/docs"
        );
    }

    #[test]
    fn test_keeps_port() {
        assert_eq!(
            normalize_scope("http://localhost:8080/a/b/"),
            "http://localhost:8080/a/b"
        );
    }

    #[test]
    fn test_equivalent_forms_match() {
        let a = normalize_scope("https://example.com/help");
        let b = normalize_scope("  https://example.com/help//?utm=x ");
        assert_eq!(a, b);
    }

    #[test]
    fn test_host_case_and_default_port_kept() {
        assert_eq!(
            normalize_scope("https://Help.Example.com/Docs/"),
            "https://Help.Example.com/Docs"
        );
        assert_eq!(
            normalize_scope("https://example.com:443/docs"),
            "https://example.com:443/docs"
        );
        assert_eq!(normalize_scope("HTTPS://example.com/"), "https://example.com");
    }

    #[test]
    fn test_path_not_percent_encoded() {
        assert_eq!(
            normalize_scope("https://example.com/café/"),
            "https://example.com/café"
        );
        assert_eq!(
            normalize_scope("https://example.com/a b/?q=1"),
            "https://example.com/a b"
        );
    }

    #[test]
    fn test_idempotent() {
        for scope in [
            "https://Help.Example.com:443/Docs//?x=1#top",
            "https://example.com/café/",
            "site-42/",
        ] {
            let once = normalize_scope(scope);
            assert_eq!(normalize_scope(&once), once);
        }
    }

    #[test]
    fn test_non_url_fallback() {
        assert_eq!(normalize_scope("site-42/"), "site-42");
        assert_eq!(normalize_scope("docs/page?x=1"), "docs/page");
    }
}

use url::Url;

/// Reduces a URL or bare domain to its website identity
///
/// # Normalization Steps
///
/// 1. Prefix `https://` when the input has no scheme
/// 2. Lowercase the host
/// 3. Remove a leading `www.` from the host
/// 4. Keep an explicit non-default port (`host:port`)
/// 5. Drop scheme, path, query and fragment
///
/// The result is itself a valid input, so normalization is idempotent. Every
/// page of a site reduces to the same identity regardless of which handler
/// produced its record.
///
/// # Examples
///
/// ```
/// use sitemap_survey::url::website_identity;
///
/// assert_eq!(website_identity("http://www.x.nz/about-us"), "x.nz");
/// assert_eq!(website_identity("https://x.nz/"), "x.nz");
/// assert_eq!(website_identity("x.nz"), "x.nz");
/// ```
pub fn website_identity(input: &str) -> String {
    let trimmed = input.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    match Url::parse(&with_scheme) {
        Ok(url) => match url.host_str() {
            Some(host) => {
                let host = strip_www(&host.to_lowercase());
                match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host,
                }
            }
            None => netloc_fallback(trimmed),
        },
        Err(_) => netloc_fallback(trimmed),
    }
}

fn strip_www(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Best-effort identity for inputs the URL parser rejects
fn netloc_fallback(input: &str) -> String {
    let without_scheme = input
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(input);
    let netloc = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    strip_www(&netloc)
}

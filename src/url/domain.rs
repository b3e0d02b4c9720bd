use crate::{UrlError, UrlResult};
use url::Url;

/// Builds the homepage URL of a bare domain (`{scheme}://{domain}/`)
///
/// # Examples
///
/// ```
/// use sitemap_survey::url::homepage_url;
///
/// let url = homepage_url("https", "x.nz").unwrap();
/// assert_eq!(url.as_str(), "https://x.nz/");
/// ```
pub fn homepage_url(scheme: &str, domain: &str) -> UrlResult<Url> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(UrlError::MissingDomain);
    }
    if scheme != "https" && scheme != "http" {
        return Err(UrlError::InvalidScheme(scheme.to_string()));
    }

    let url = Url::parse(&format!("{}://{}", scheme, domain))
        .map_err(|e| UrlError::Parse(format!("{}: {}", domain, e)))?;
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }
    Ok(url)
}

/// Returns the page level: number of non-empty path segments plus one
///
/// The homepage is level 1. Inputs that do not parse as absolute URLs are
/// treated as a bare path.
///
/// # Examples
///
/// ```
/// use sitemap_survey::url::url_level;
///
/// assert_eq!(url_level("https://x.nz/"), 1);
/// assert_eq!(url_level("https://x.nz/about-us/team"), 3);
/// ```
pub fn url_level(url: &str) -> u32 {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    path.split('/').filter(|segment| !segment.is_empty()).count() as u32 + 1
}

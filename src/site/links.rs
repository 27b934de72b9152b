use url::Url;

/// Resolves an href against the page it was found on
///
/// Returns None if the link should not be followed:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only anchors
/// - Anything that is not HTTP(S) after resolution
///
/// # Example
///
/// ```
/// use olympedia_harvest::site::resolve_link;
///
/// let link = resolve_link("/athletes/42", "https://www.olympedia.org/results/9");
/// assert_eq!(link.as_deref(), Some("https://www.olympedia.org/athletes/42"));
/// ```
pub fn resolve_link(href: &str, page_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let base = Url::parse(page_url).ok()?;
    let absolute = base.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

//! URL normalization and identifier recovery.

use url::Url;

use showcase_core::AffiliatePlatform;

use super::ExtractionError;

/// Click-tracking parameters dropped during normalization, besides `utm_*`.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref_src"];

/// Normalize a user-submitted URL.
///
/// Adds `https://` when no scheme is given, rejects anything but http(s),
/// drops the fragment and strips click-tracking parameters. Hosts are
/// lowercased by the parser.
///
/// # Errors
///
/// Returns `ExtractionError::InvalidUrl` for empty, unparseable, host-less or
/// non-http(s) input.
pub fn normalize(input: &str) -> Result<Url, ExtractionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::InvalidUrl("url is empty".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut url =
        Url::parse(&with_scheme).map_err(|e| ExtractionError::InvalidUrl(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ExtractionError::InvalidUrl(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ExtractionError::InvalidUrl("url has no host".to_string()));
    }

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    Ok(url)
}

fn is_tracking_param(key: &str) -> bool {
    key.to_ascii_lowercase().starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Platform for a normalized URL.
#[must_use]
pub fn detect_platform(url: &Url) -> AffiliatePlatform {
    url.host_str()
        .map_or(AffiliatePlatform::Other, AffiliatePlatform::detect)
}

/// Retailer product identifier, when the URL shape carries one.
///
/// Amazon ASINs come from `/dp/<asin>` or `/gp/product/<asin>`; eBay item
/// numbers from the last numeric segment after `/itm/`.
#[must_use]
pub fn product_identifier(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    match detect_platform(url) {
        AffiliatePlatform::Amazon => segments
            .windows(2)
            .find_map(|w| match w {
                ["dp" | "product", id] if is_asin(id) => Some((*id).to_ascii_uppercase()),
                _ => None,
            }),
        AffiliatePlatform::Ebay => {
            let start = segments.iter().position(|s| *s == "itm")?;
            segments
                .get(start + 1..)?
                .iter()
                .rev()
                .find(|s| s.chars().all(|c| c.is_ascii_digit()))
                .map(|s| (*s).to_string())
        }
        _ => None,
    }
}

fn is_asin(candidate: &str) -> bool {
    candidate.len() == 10 && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Best-effort title from the URL path, used when the page yields none.
///
/// Picks the longest hyphenated or underscored segment that is not an
/// identifier and title-cases its words.
#[must_use]
pub fn title_from_path(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()?
        .map(|s| s.rsplit_once('.').map_or(s, |(stem, _)| stem))
        .filter(|s| s.contains(['-', '_']))
        .filter(|s| s.chars().any(char::is_alphabetic))
        .max_by_key(|s| s.len())?;

    let decoded = urlencoding_decode(segment);
    let title = decoded
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    (title.chars().count() >= 3).then_some(title)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn urlencoding_decode(segment: &str) -> String {
    url::form_urlencoded::parse(format!("x={segment}").as_bytes())
        .next()
        .map_or_else(|| segment.to_string(), |(_, v)| v.into_owned())
}

//! HTML metadata parsing.
//!
//! Retailer pages are parsed with a handful of regexes rather than a DOM:
//! only `<meta>`, `<title>` and JSON-LD `<script>` blocks are read.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use showcase_core::Price;

static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("Invalid regex"));

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid regex")
});

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("Invalid regex"));

static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("Invalid regex")
});

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg)[^>]*>.*?</(script|style|noscript|svg)>")
        .expect("Invalid regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("Invalid regex"));

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("Invalid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// Fields recovered from a page's markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    /// Raw currency as found on the page (`"USD"`, `"$"`).
    pub currency: Option<String>,
    pub site_name: Option<String>,
}

/// Parse metadata from an HTML document.
///
/// Precedence is `og:*`, then `twitter:*`, then `<title>` and
/// `<meta name="description">`. Prices come from `product:price:*` meta tags
/// or a JSON-LD `Product` offer.
#[must_use]
pub fn parse(html: &str) -> PageMetadata {
    let meta = meta_tags(html);
    let first = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| meta.get(*k))
            .map(|v| decode_entities(v).trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let title = first(&["og:title", "twitter:title"]).or_else(|| {
        TITLE_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| collapse_whitespace(&decode_entities(m.as_str())))
            .filter(|t| !t.is_empty())
    });

    let ld = json_ld_offer(html);

    let price = first(&["product:price:amount", "og:price:amount"])
        .and_then(|p| Price::parse_amount(&p))
        .or_else(|| ld.as_ref().and_then(|o| o.price));

    let currency = first(&["product:price:currency", "og:price:currency"])
        .or_else(|| ld.as_ref().and_then(|o| o.currency.clone()));

    PageMetadata {
        title,
        description: first(&["og:description", "twitter:description", "description"]),
        image_url: first(&["og:image", "og:image:url", "twitter:image", "twitter:image:src"]),
        price,
        currency,
        site_name: first(&["og:site_name"]),
    }
}

/// Collect `<meta>` tags keyed by lowercased `property` or `name`.
/// The first occurrence of a key wins.
fn meta_tags(html: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();

    for tag in META_TAG_RE.find_iter(html) {
        let mut key = None;
        let mut content = None;

        for cap in ATTR_RE.captures_iter(tag.as_str()) {
            let value = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str());
            match cap.get(1).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
                Some("property" | "name" | "itemprop") if key.is_none() => {
                    key = value.map(str::to_ascii_lowercase);
                }
                Some("content") => content = value.map(str::to_string),
                _ => {}
            }
        }

        if let (Some(k), Some(c)) = (key, content) {
            tags.entry(k).or_insert(c);
        }
    }

    tags
}

struct LdOffer {
    price: Option<Decimal>,
    currency: Option<String>,
}

/// Find the first JSON-LD `Product` with an offer price.
fn json_ld_offer(html: &str) -> Option<LdOffer> {
    JSON_LD_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str().trim()).ok())
        .find_map(|doc| find_product(&doc))
}

fn find_product(value: &Value) -> Option<LdOffer> {
    match value {
        Value::Array(items) => items.iter().find_map(find_product),
        Value::Object(obj) => {
            if let Some(graph) = obj.get("@graph") {
                return find_product(graph);
            }
            if !is_product_type(obj.get("@type")) {
                return None;
            }
            let offer = match obj.get("offers")? {
                Value::Array(offers) => offers.first()?,
                other => other,
            };
            let price = offer
                .get("price")
                .or_else(|| offer.get("lowPrice"))
                .and_then(|p| match p {
                    Value::String(s) => Price::parse_amount(s),
                    Value::Number(n) => Price::parse_amount(&n.to_string()),
                    _ => None,
                });
            let currency = offer
                .get("priceCurrency")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(LdOffer { price, currency })
        }
        _ => None,
    }
}

fn is_product_type(ty: Option<&Value>) -> bool {
    match ty {
        Some(Value::String(s)) => s.eq_ignore_ascii_case("product"),
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| t.as_str().is_some_and(|s| s.eq_ignore_ascii_case("product"))),
        _ => false,
    }
}

/// Decode the common named entities and numeric character references.
#[must_use]
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    ENTITY_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let entity = caps.get(1).map_or("", |m| m.as_str());
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "ndash" => Some('\u{2013}'),
                    "mdash" => Some('\u{2014}'),
                    "hellip" => Some('\u{2026}'),
                    "reg" => Some('\u{00AE}'),
                    "trade" => Some('\u{2122}'),
                    "copy" => Some('\u{00A9}'),
                    _ => None,
                }
            };
            decoded.map_or_else(
                || caps.get(0).map_or_else(String::new, |m| m.as_str().to_string()),
                String::from,
            )
        })
        .into_owned()
}

fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RE.replace_all(input, " ").trim().to_string()
}

/// Visible text of a page, truncated to `max_chars` characters.
#[must_use]
pub fn visible_text(html: &str, max_chars: usize) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    let text = collapse_whitespace(&decode_entities(&without_tags));
    text.chars().take(max_chars).collect()
}

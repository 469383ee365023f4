//! Small lookups shared by the HTML-based extractors.
//!
//! Everything here returns `Option`; extractors decide which absences are
//! fatal for their shop.

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::info;

/// Pass an optional field through, noting at info level when it is absent.
pub(crate) fn optional<T>(shop: &str, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        info!(shop, field, "optional field not found, leaving it unset");
    }
    value
}

/// First element in `doc` matching `css`.
pub(crate) fn first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

/// First descendant of `el` matching `css`.
pub(crate) fn first_in<'a>(el: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    el.select(&selector).next()
}

/// Every element in `doc` matching `css`, in document order.
pub(crate) fn all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|selector| doc.select(&selector).collect())
        .unwrap_or_default()
}

/// Trimmed text content; `None` when blank.
pub(crate) fn text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Trimmed attribute value; `None` when absent or blank.
pub(crate) fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    let value = el.value().attr(name)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `content` of `<meta property="…">`, falling back to `<meta name="…">`.
pub(crate) fn meta(doc: &Html, key: &str) -> Option<String> {
    first(doc, &format!(r#"meta[property="{key}"]"#))
        .and_then(|el| attr(el, "content"))
        .or_else(|| {
            first(doc, &format!(r#"meta[name="{key}"]"#)).and_then(|el| attr(el, "content"))
        })
}

/// JSON-LD objects on the page whose `@type` is `wanted`, including those
/// nested in `@graph`. Blocks that fail to parse are skipped.
pub(crate) fn jsonld_objects(doc: &Html, css: &str, wanted: &str) -> Vec<Value> {
    let mut found = Vec::new();
    for script in all(doc, css) {
        let raw = script.text().collect::<String>();
        if let Ok(json) = serde_json::from_str::<Value>(&raw) {
            collect_typed(&json, wanted, &mut found);
        }
    }
    found
}

fn collect_typed(value: &Value, wanted: &str, found: &mut Vec<Value>) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::Array(graph)) = obj.get("@graph") {
                for item in graph {
                    collect_typed(item, wanted, found);
                }
            }
            if obj.get("@type").is_some_and(|t| type_matches(t, wanted)) {
                found.push(value.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_typed(item, wanted, found);
            }
        }
        _ => {}
    }
}

/// Whether a JSON-LD `@type` (string or array) names `wanted`, ignoring a
/// schema.org prefix.
pub(crate) fn type_matches(value: &Value, wanted: &str) -> bool {
    let matches = |t: &str| {
        t.strip_prefix("https://schema.org/")
            .or_else(|| t.strip_prefix("http://schema.org/"))
            .unwrap_or(t)
            == wanted
    };
    match value {
        Value::String(t) => matches(t),
        Value::Array(types) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

/// String field, accepting numbers as well. Blank strings count as absent.
pub(crate) fn json_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric field, accepting numeric strings as well.
pub(crate) fn json_f64(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

/// Plain decimal price such as "12.95"; `None` for anything else.
pub(crate) fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

/// EAN from a number or a digit string. Leading zeros are not significant.
pub(crate) fn parse_ean(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

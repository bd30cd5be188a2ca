//! Upstream product normalization.
//!
//! The two product feeds ship overlapping but different shapes (`imagini` vs
//! `images`, `pret` vs `price`/`mdlPrice`, `subcategorie` vs `category`).
//! `normalize_product` maps either shape onto the canonical [`Product`] and
//! never fails: every missing or malformed field degrades to a documented
//! default. Re-normalizing a canonical product is a no-op.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use super::product::{Product, SourceTag, Subcategory, PLACEHOLDER_IMAGE};

/// Coerce a JSON scalar into a number, stripping everything but digits, `.`
/// and `-` from strings ("1,299.50 MDL" parses as 1299.50). Anything else is 0.
fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            digits.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// Ids arrive both as strings and as numbers.
fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| raw.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Pull one image URL out of an array element, which may be a plain string or
/// an object carrying `url`, `pathGlobal` or `path`.
fn image_url(item: &Value) -> Option<String> {
    match item {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(_) => ["url", "pathGlobal", "path"]
            .iter()
            .filter_map(|k| item.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Flatten `imagini`/`images`/`image` into a de-duplicated, non-empty list.
fn collect_images(raw: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in ["imagini", "images"] {
        if let Some(arr) = raw.get(key).and_then(Value::as_array) {
            for item in arr {
                if let Some(url) = image_url(item) {
                    if !out.contains(&url) {
                        out.push(url);
                    }
                }
            }
        }
    }
    if out.is_empty() {
        if let Some(single) = raw.get("image").and_then(Value::as_str) {
            if !single.is_empty() {
                out.push(single.to_string());
            }
        }
    }
    if out.is_empty() {
        trace!(id = ?raw.get("id"), "product has no usable image, substituting placeholder");
        out.push(PLACEHOLDER_IMAGE.to_string());
    }
    out
}

/// List price: first non-zero of `price`/`pret`/`mdlPrice`, rounded up;
/// `originalPrice` as the last resort.
fn list_price(raw: &Value) -> i64 {
    let base = ["price", "pret", "mdlPrice"]
        .iter()
        .filter_map(|k| raw.get(*k))
        .map(coerce_number)
        .find(|p| *p != 0.0)
        .unwrap_or(0.0);
    let mut price = base.ceil() as i64;
    if price == 0 {
        if let Some(original) = raw.get("originalPrice") {
            price = coerce_number(original).ceil() as i64;
        }
    }
    price
}

/// Discount resolution, first applicable wins:
/// (a) explicit `pretRedus` when positive and strictly below the list price;
/// (b) explicit `discount` percentage applied to the list price;
/// (c) `originalPrice` above the list price, in which case the feed put the
///     sale price in the price field and the pre-sale price in
///     `originalPrice` (list and discounted swap).
///
/// Returns `(list, discounted)`. No default discount is ever synthesized.
fn resolve_discount(raw: &Value, list: i64) -> (i64, Option<f64>) {
    if let Some(v) = raw.get("pretRedus").filter(|v| !v.is_null()) {
        let redus = coerce_number(v);
        if redus > 0.0 && redus < list as f64 {
            return (list, Some(redus));
        }
    }
    if let Some(v) = raw.get("discount").filter(|v| !v.is_null()) {
        let percent = coerce_number(v);
        if percent > 0.0 {
            let discounted = round2(list as f64 * (1.0 - percent / 100.0));
            if discounted > 0.0 && discounted < list as f64 {
                return (list, Some(discounted));
            }
        }
    }
    if let Some(v) = raw.get("originalPrice") {
        let original = coerce_number(v);
        if original > list as f64 && list > 0 {
            return (original.ceil() as i64, Some(list as f64));
        }
    }
    (list, None)
}

/// Specification map: `specificatii` entries plus any `caracteristici` list
/// entries not already present, values stringified.
fn collect_specs(raw: &Value) -> IndexMap<String, String> {
    let mut specs = IndexMap::new();
    if let Some(map) = raw.get("specificatii").and_then(Value::as_object) {
        for (key, value) in map {
            if let Some(text) = scalar_text(value) {
                specs.insert(key.clone(), text);
            }
        }
    }
    if let Some(list) = characteristics(raw) {
        for entry in list {
            let name = string_field(entry, &["nume", "name", "cod", "code"]);
            let value = entry
                .get("valoare")
                .or_else(|| entry.get("value"))
                .and_then(scalar_text);
            if let (Some(name), Some(value)) = (name, value) {
                specs.entry(name.to_string()).or_insert(value);
            }
        }
    }
    specs
}

fn characteristics(raw: &Value) -> Option<&Vec<Value>> {
    raw.get("caracteristici")
        .or_else(|| raw.get("characteristics"))
        .and_then(Value::as_array)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Brand: first non-empty of the top-level `brand` field, the specification
/// map's `brand` entry, or a characteristic named/coded Brand.
fn extract_brand(raw: &Value, specs: &IndexMap<String, String>) -> String {
    if let Some(brand) = raw.get("brand").and_then(Value::as_str) {
        if !brand.is_empty() {
            return brand.to_string();
        }
    }
    if let Some(brand) = specs.get("brand").filter(|b| !b.is_empty()) {
        return brand.clone();
    }
    if let Some(list) = characteristics(raw) {
        for entry in list {
            let tag = string_field(entry, &["nume", "name", "cod", "code"]).unwrap_or("");
            if tag.eq_ignore_ascii_case("brand") {
                if let Some(value) = entry
                    .get("valoare")
                    .or_else(|| entry.get("value"))
                    .and_then(Value::as_str)
                    .filter(|v| !v.is_empty())
                {
                    return value.to_string();
                }
            }
        }
    }
    "Unknown".to_string()
}

fn parse_subcategory(raw: &Value) -> Subcategory {
    let node = match raw
        .get("subcategorie")
        .or_else(|| raw.get("category"))
        .filter(|v| !v.is_null())
    {
        Some(node) => node,
        None => return Subcategory::default(),
    };
    if let Some(name) = node.as_str() {
        let name = if name.is_empty() { "Electronics" } else { name };
        return Subcategory {
            id: "1".to_string(),
            name: name.to_string(),
            category_id: "1".to_string(),
            category_name: name.to_string(),
        };
    }
    let id = node
        .get("id")
        .and_then(coerce_id)
        .unwrap_or_else(|| "1".to_string());
    let name = string_field(node, &["nume", "name"])
        .unwrap_or("Electronics")
        .to_string();
    let parent = node
        .get("categoriePrincipala")
        .or_else(|| node.get("parent"))
        .filter(|v| v.is_object());
    let (category_id, category_name) = match parent {
        Some(parent) => (
            parent
                .get("id")
                .and_then(coerce_id)
                .unwrap_or_else(|| "1".to_string()),
            string_field(parent, &["nume", "name"])
                .unwrap_or("Electronics")
                .to_string(),
        ),
        None => (
            node.get("categoryId")
                .and_then(coerce_id)
                .unwrap_or_else(|| "1".to_string()),
            string_field(node, &["categoryName"])
                .unwrap_or("Electronics")
                .to_string(),
        ),
    };
    Subcategory {
        id,
        name,
        category_id,
        category_name,
    }
}

/// Convert an upstream product object of either known shape into the
/// canonical record. Never fails; see the field rules above.
pub fn normalize_product(raw: &Value) -> Product {
    let source = match raw.get("source").and_then(Value::as_str) {
        Some("rost") => SourceTag::Rost,
        _ => SourceTag::Local,
    };

    let id = raw
        .get("id")
        .or_else(|| raw.get("_id"))
        .and_then(coerce_id)
        .unwrap_or_else(|| "0".to_string());

    let list = list_price(raw);
    let (pret, pret_redus) = resolve_discount(raw, list);

    let mut specificatii = collect_specs(raw);
    let brand = extract_brand(raw, &specificatii);
    specificatii.insert("brand".to_string(), brand);

    let in_stock = match raw.get("inStock").and_then(Value::as_bool) {
        Some(flag) => flag,
        None => raw.get("stoc").map(coerce_number).unwrap_or(0.0) > 0.0,
    };
    let stock_quantity = raw
        .get("stockQuantity")
        .or_else(|| raw.get("stoc"))
        .map(|v| coerce_number(v) as i64)
        .unwrap_or(0);

    Product {
        id,
        name: string_field(raw, &["name", "nume", "title"])
            .unwrap_or_default()
            .to_string(),
        code: string_field(raw, &["code", "cod"]).unwrap_or_default().to_string(),
        pret,
        pret_redus,
        imagini: collect_images(raw),
        stock_quantity,
        in_stock,
        description: string_field(raw, &["description", "descriere"])
            .unwrap_or_default()
            .to_string(),
        specificatii,
        subcategorie: parse_subcategory(raw),
        source,
    }
}

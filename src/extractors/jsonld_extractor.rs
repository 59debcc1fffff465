//! Structured-data scanning for Product nodes.
//!
//! Parses every `<script type="application/ld+json">` block and recursively
//! discovers `@type == "Product"` nodes, including nodes nested under a
//! `@graph` container. A block that fails to parse is skipped on its own;
//! scanning never fails globally.

use scraper::{Html, Selector};
use serde_json::Value;

use crate::extractors::{fill_if_empty, ProductRecord};
use crate::images::{ImageCandidate, ImageTier};

/// Collect every Product-typed node, in document order of appearance.
pub fn scan_product_nodes(document: &Html) -> Vec<Value> {
    let selector = match Selector::parse(r#"script[type="application/ld+json"]"#) {
        Ok(s) => s,
        Err(_) => return vec![],
    };

    let mut nodes = Vec::new();
    for element in document.select(&selector) {
        let raw = element.inner_html();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Ok(tree) = serde_json::from_str::<Value>(trimmed) {
            collect_product_nodes(&tree, &mut nodes);
        }
    }
    nodes
}

fn collect_product_nodes(value: &Value, nodes: &mut Vec<Value>) {
    match value {
        Value::Object(obj) => {
            if obj.get("@type").and_then(Value::as_str) == Some("Product") {
                nodes.push(value.clone());
            }
            if let Some(Value::Array(graph)) = obj.get("@graph") {
                for item in graph {
                    collect_product_nodes(item, nodes);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_product_nodes(item, nodes);
            }
        }
        _ => {}
    }
}

/// Copy fields from a chosen Product node into the record and push its
/// image URLs as candidates tagged Structured.
pub fn apply_structured(
    record: &mut ProductRecord,
    product: &Value,
    candidates: &mut Vec<ImageCandidate>,
) {
    fill_if_empty(&mut record.name, product.get("name").and_then(Value::as_str));
    fill_if_empty(
        &mut record.description,
        product.get("description").and_then(Value::as_str),
    );
    fill_if_empty(&mut record.sku, product.get("sku").and_then(Value::as_str));

    // brand is either a string or an object carrying a name.
    match product.get("brand") {
        Some(Value::Object(brand)) => {
            fill_if_empty(&mut record.brand, brand.get("name").and_then(Value::as_str));
        }
        Some(Value::String(brand)) => fill_if_empty(&mut record.brand, Some(brand)),
        _ => {}
    }

    match product.get("image") {
        Some(Value::String(url)) => {
            candidates.push(ImageCandidate::new(url, ImageTier::Structured));
        }
        Some(Value::Array(urls)) => {
            for url in urls.iter().filter_map(Value::as_str) {
                candidates.push(ImageCandidate::new(url, ImageTier::Structured));
            }
        }
        _ => {}
    }

    // offers is an object or a list of objects; the first one wins.
    let offer = match product.get("offers") {
        Some(Value::Array(list)) => list.first(),
        Some(single) => Some(single),
        None => None,
    };
    if let Some(Value::Object(offer)) = offer {
        if record.price.is_empty() {
            let price = match offer.get("price") {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => String::new(),
            };
            if !price.is_empty() {
                record.price = price;
            }
        }
        fill_if_empty(
            &mut record.currency,
            offer.get("priceCurrency").and_then(Value::as_str),
        );
    }
}

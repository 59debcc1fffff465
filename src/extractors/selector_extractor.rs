//! Theme-selector fallbacks for name, description, and price.
//!
//! The selector table encodes a priority policy: most site-specific first,
//! most generic last. The first matching element wins per field, so adding
//! support for a new theme is a data change, not a control-flow change.

use scraper::{Html, Selector};

use crate::extractors::ProductRecord;
use crate::images::{ImageCandidate, ImageTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Description,
    Price,
}

const FIELD_SELECTORS: [(Field, &str); 13] = [
    (Field::Name, ".product__title h1"),
    (Field::Name, "h1.product-single__title"),
    (Field::Name, "h1.product-title"),
    (Field::Name, r#"[itemprop="name"]"#),
    (Field::Name, "h1"),
    (Field::Description, ".product__description"),
    (Field::Description, ".product-single__description"),
    (Field::Description, r#"[itemprop="description"]"#),
    (Field::Description, ".product-description"),
    (Field::Price, ".price__regular .price-item"),
    (Field::Price, "span.product__price"),
    (Field::Price, r#"[itemprop="price"]"#),
    (Field::Price, ".price"),
];

const MEDIA_SELECTORS: [&str; 3] = [
    ".product__media img",
    ".product-single__photo img",
    ".product-gallery img",
];

fn first_text(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Fill name/description/price still empty after the richer tiers. The
/// document `<title>` is the last resort for a name; description and price
/// stay empty when nothing matches.
pub fn apply_selectors(record: &mut ProductRecord, document: &Html) {
    for (field, selector_str) in FIELD_SELECTORS {
        let slot = match field {
            Field::Name => &mut record.name,
            Field::Description => &mut record.description,
            Field::Price => &mut record.price,
        };
        if !slot.is_empty() {
            continue;
        }
        if let Some(text) = first_text(document, selector_str) {
            *slot = text;
        }
    }

    if record.name.is_empty() {
        if let Some(title) = first_text(document, "title") {
            record.name = title;
        }
    }
}

/// Theme media images, tagged Selector.
pub fn selector_image_candidates(document: &Html, candidates: &mut Vec<ImageCandidate>) {
    for selector_str in MEDIA_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let src = element
                .value()
                .attr("src")
                .or_else(|| element.value().attr("data-src"));
            if let Some(src) = src {
                let src = src.trim();
                if !src.is_empty() {
                    candidates.push(ImageCandidate::new(src, ImageTier::Selector));
                }
            }
        }
    }
}

//! Social-preview and generic meta fallbacks.
//!
//! Consulted only for fields left empty by structured data. Each read is a
//! direct string copy, trimmed of surrounding whitespace.

use scraper::{Html, Selector};

use crate::extractors::ProductRecord;
use crate::images::{ImageCandidate, ImageTier};

fn meta_content(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Fill name and description from social-preview meta; the generic
/// description meta is read only when the social preview had none.
pub fn apply_meta(record: &mut ProductRecord, document: &Html) {
    if record.name.is_empty() {
        if let Some(title) = meta_content(document, r#"meta[property="og:title"]"#) {
            record.name = title;
        }
    }
    if record.description.is_empty() {
        if let Some(desc) = meta_content(document, r#"meta[property="og:description"]"#) {
            record.description = desc;
        }
    }
    if record.description.is_empty() {
        if let Some(desc) = meta_content(document, r#"meta[name="description"]"#) {
            record.description = desc;
        }
    }
}

/// Social-preview image candidates, in document order per source.
pub fn meta_image_candidates(document: &Html, candidates: &mut Vec<ImageCandidate>) {
    for selector_str in [
        r#"meta[property="og:image"]"#,
        r#"meta[name="twitter:image"]"#,
    ] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(content) = element.value().attr("content") {
                let content = content.trim();
                if !content.is_empty() {
                    candidates.push(ImageCandidate::new(content, ImageTier::Meta));
                }
            }
        }
    }
}

/// Generic `<img>` scan. Lazy-load attributes are accepted as fallbacks
/// for `src`. The orchestrator consults this tier only when the richer
/// tiers are thin.
pub fn generic_img_candidates(document: &Html, candidates: &mut Vec<ImageCandidate>) {
    let Ok(selector) = Selector::parse("img") else {
        return;
    };
    for element in document.select(&selector) {
        let src = element
            .value()
            .attr("src")
            .or_else(|| element.value().attr("data-src"))
            .or_else(|| element.value().attr("data-original"));
        if let Some(src) = src {
            let src = src.trim();
            if !src.is_empty() {
                candidates.push(ImageCandidate::new(src, ImageTier::Img));
            }
        }
    }
}

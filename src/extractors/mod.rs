//! Product extraction pipeline.
//!
//! Resolution is tiered: structured data first (highest trust), then
//! social-preview meta, then theme selectors. A tier only writes into
//! fields that are still empty — first writer wins, per field, not
//! globally. Image candidates merge across every tier before resolution.

mod jsonld_extractor;
mod meta_extractor;
mod selector_extractor;

pub use jsonld_extractor::*;
pub use meta_extractor::*;
pub use selector_extractor::*;

use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::benefits::split_benefits;
use crate::error::{Error, Result};
use crate::fetch;
use crate::images::{resolve_images, ImageCandidate, ImageFilterPolicy};

/// Canonical product record. Unresolved fields keep their defaults; the
/// pipeline never returns a partial record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub source_url: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub currency: String,
    pub brand: String,
    pub sku: String,
    pub benefits: Vec<String>,
    pub images: Vec<String>,
}

/// Below this many candidates from the richer tiers, the generic `<img>`
/// scan is consulted as well.
const THIN_CANDIDATE_THRESHOLD: usize = 3;

pub(crate) fn fill_if_empty(slot: &mut String, value: Option<&str>) {
    if !slot.is_empty() {
        return;
    }
    if let Some(value) = value {
        if !value.is_empty() {
            *slot = value.to_string();
        }
    }
}

/// Extract a product record from raw HTML and its source URL.
pub fn extract_product(html: &str, source_url: &str) -> Result<ProductRecord> {
    extract_product_with_policy(html, source_url, &ImageFilterPolicy::default())
}

/// As [`extract_product`], with an explicit image filter policy.
pub fn extract_product_with_policy(
    html: &str,
    source_url: &str,
    policy: &ImageFilterPolicy,
) -> Result<ProductRecord> {
    fetch::require_http_url(source_url)?;
    let base = Url::parse(source_url)
        .map_err(|e| Error::Validation(format!("invalid source url {source_url}: {e}")))?;

    let document = Html::parse_document(html);
    let mut record = ProductRecord {
        source_url: source_url.to_string(),
        ..Default::default()
    };
    let mut candidates: Vec<ImageCandidate> = Vec::new();

    // Only the first discovered Product node is authoritative; later
    // duplicate declarations on the same page are ignored.
    let nodes = scan_product_nodes(&document);
    if let Some(product) = nodes.first() {
        apply_structured(&mut record, product, &mut candidates);
    }

    apply_meta(&mut record, &document);
    apply_selectors(&mut record, &document);

    meta_image_candidates(&document, &mut candidates);
    selector_image_candidates(&document, &mut candidates);
    if candidates.len() < THIN_CANDIDATE_THRESHOLD {
        generic_img_candidates(&document, &mut candidates);
    }

    record.images = resolve_images(&candidates, &base, policy);
    record.benefits = split_benefits(&record.description);

    Ok(record)
}

/// Download a product page and extract its record in one call.
///
/// A fetch failure stays a transport error; a page that yields nothing at
/// all is an extraction error, so callers can tell a network problem from
/// a content problem.
pub fn crawl_product_page(url: &str, timeout_secs: u64) -> Result<ProductRecord> {
    let html = fetch::fetch_html(url, timeout_secs)?;
    let record = extract_product(&html, url)?;
    if record.name.is_empty() && record.description.is_empty() && record.images.is_empty() {
        return Err(Error::Extraction(format!(
            "no product data recovered from {url}"
        )));
    }
    Ok(record)
}

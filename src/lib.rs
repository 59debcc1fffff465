//! Product page extraction and media pipeline.
//!
//! Turns raw commerce-page HTML into a canonical product record:
//! - JSON-LD Product nodes (with `@graph` support), highest trust
//! - Social-preview meta fallbacks
//! - Theme-selector fallbacks
//! - Benefit sentence extraction from the resolved description
//! - Image URL canonicalization, deduplication, and policy filtering
//! - Optional local materialization, with a 1920x1080 cover-crop for the
//!   social-card path

pub mod benefits;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod images;
pub mod media;

pub use error::{Error, Result};
pub use extractors::{
    crawl_product_page, extract_product, extract_product_with_policy, ProductRecord,
};
pub use fetch::fetch_html;
pub use images::{ImageCandidate, ImageFilterPolicy, ImageTier};
pub use media::{materialize, materialize_batch, MediaType};

//! Image URL canonicalization, deduplication, and policy filtering.
//!
//! Candidates from every discovery tier are normalized to a single
//! canonical `https` form (protocol promotion, size-variant stripping,
//! fragment removal, relative resolution), deduplicated in first-seen
//! order, then run through a configurable allow/deny policy.

use std::collections::HashSet;

use url::Url;

/// Hard cap on the resolved image list.
pub const MAX_IMAGES: usize = 12;

/// Where an image URL candidate was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTier {
    /// JSON-LD Product `image` field.
    Structured,
    /// Social-preview meta (`og:image`, `twitter:image`).
    Meta,
    /// Theme media selectors.
    Selector,
    /// Generic `<img>` scan, consulted only when richer tiers are thin.
    Img,
}

/// A raw URL plus its discovery tier. Never mutated; canonicalization
/// produces a new string.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub url: String,
    pub tier: ImageTier,
}

impl ImageCandidate {
    pub fn new(url: impl Into<String>, tier: ImageTier) -> Self {
        Self {
            url: url.into(),
            tier,
        }
    }
}

/// Which canonical URLs survive filtering.
///
/// The two shipped policies reflect the two deployments this filter grew
/// out of: keyword denial for general pages, and a required asset-host
/// allow list for multi-tenant storefront platforms where most `<img>`
/// tags are page chrome rather than product photography.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageFilterPolicy {
    /// Drop URLs matching deny keywords or non-raster extensions.
    #[default]
    DenyKeywords,
    /// Keyword denial plus a required host (or host-suffix) allow list.
    AllowHosts(Vec<String>),
}

const DENY_KEYWORDS: [&str; 8] = [
    "icon",
    "logo",
    "sprite",
    "favicon",
    "pixel",
    "badge",
    "placeholder",
    "blank",
];

const DENY_EXTENSIONS: [&str; 2] = [".svg", ".ico"];

/// Thumbnail size-variant markers stripped from the filename stem so a
/// size-suffixed thumbnail collapses to the same canonical path as its
/// original.
const SIZE_VARIANT_MARKERS: [&str; 8] = [
    "_pico", "_icon", "_thumb", "_small", "_compact", "_medium", "_large", "_grande",
];

impl ImageFilterPolicy {
    pub fn allows(&self, canonical: &str) -> bool {
        let lower = canonical.to_ascii_lowercase();
        if DENY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return false;
        }
        let path = match lower.find('?') {
            Some(i) => &lower[..i],
            None => lower.as_str(),
        };
        if DENY_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return false;
        }
        match self {
            Self::DenyKeywords => true,
            Self::AllowHosts(hosts) => host_allowed(canonical, hosts),
        }
    }
}

fn host_allowed(canonical: &str, hosts: &[String]) -> bool {
    let Ok(parsed) = Url::parse(canonical) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    hosts.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    })
}

/// Canonicalize one raw candidate against the source page URL.
///
/// Protocol-relative URLs are promoted to `https`, plain `http` is
/// rewritten to `https`, size-variant markers are stripped, the fragment
/// is dropped, and relative paths resolve against `base`. Anything that
/// is not `http`/`https` after all that is discarded.
pub fn canonicalize_image_url(raw: &str, base: &Url) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut cleaned = trimmed.to_string();
    if let Some(rest) = cleaned.strip_prefix("//") {
        cleaned = format!("https://{rest}");
    } else if let Some(rest) = cleaned.strip_prefix("http://") {
        cleaned = format!("https://{rest}");
    }
    let cleaned = strip_size_variant(&cleaned);

    let mut parsed = match Url::parse(&cleaned) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(&cleaned).ok()?,
        Err(_) => return None,
    };
    match parsed.scheme() {
        "https" => {}
        // Relative paths joined against an http page keep its scheme.
        "http" => parsed.set_scheme("https").ok()?,
        _ => return None,
    }
    parsed.set_fragment(None);
    Some(parsed.into())
}

/// Rewrite the filename stem only; directories, query, and fragment are
/// left alone.
fn strip_size_variant(url: &str) -> String {
    let (path, rest) = match url.find(['?', '#']) {
        Some(i) => (&url[..i], &url[i..]),
        None => (url, ""),
    };
    let (dir, file) = match path.rfind('/') {
        Some(i) => (&path[..=i], &path[i + 1..]),
        None => ("", path),
    };
    let (stem, ext) = match file.rfind('.') {
        Some(i) => (&file[..i], &file[i..]),
        None => (file, ""),
    };
    format!("{dir}{}{ext}{rest}", strip_marker(stem))
}

fn strip_marker(stem: &str) -> &str {
    for marker in SIZE_VARIANT_MARKERS {
        if let Some(stripped) = stem.strip_suffix(marker) {
            return stripped;
        }
    }
    // Pixel-dimension markers like `_1024x1024`, `_300x`, or `_x300`.
    if let Some(pos) = stem.rfind('_') {
        if is_pixel_marker(&stem[pos + 1..]) {
            return &stem[..pos];
        }
    }
    stem
}

fn is_pixel_marker(tail: &str) -> bool {
    let Some((w, h)) = tail.split_once('x') else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if w.is_empty() && h.is_empty() {
        return false;
    }
    (digits(w) || w.is_empty()) && (digits(h) || h.is_empty())
}

/// Canonicalize, dedup in first-seen order, filter, and cap.
pub fn resolve_images(
    candidates: &[ImageCandidate],
    base: &Url,
    policy: &ImageFilterPolicy,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for candidate in candidates {
        let Some(canonical) = canonicalize_image_url(&candidate.url, base) else {
            continue;
        };
        if !seen.insert(canonical.clone()) {
            continue;
        }
        if !policy.allows(&canonical) {
            continue;
        }
        resolved.push(canonical);
        if resolved.len() >= MAX_IMAGES {
            break;
        }
    }
    resolved
}

//! CSS selector chains for the classifieds markup.
//!
//! Every chain is an ordered list of candidates; the first candidate that yields
//! a usable value wins. Update this file when the site changes its HTML
//! structure, or override individual chains under `[selectors]` in the config.
//!
//! **Update process**: when extraction degrades, capture the page with
//! `inspect`, update the chains, and add a test fixture.

use crate::error::FetchError;
use crate::render::element::parse_selector;
use serde::{Deserialize, Serialize};

/// Listing container candidates.
pub const CONTAINERS: &[&str] = &["[data-marker='item']", "[data-marker*='item']"];

/// Title candidates: microdata name, title marker, heading link, class-based,
/// partial marker, then any anchor carrying a title attribute.
pub const TITLE: &[&str] = &[
    "[itemprop='name']",
    "[data-marker='item-title']",
    "h3 a",
    ".item-title a",
    "[data-marker*='title']",
    "a[title]",
];

/// Price candidates.
pub const PRICE: &[&str] = &[
    "[itemprop='price']",
    "[data-marker='item-price']",
    ".price",
    "[data-marker*='price']",
    ".item-price",
];

/// Link candidates; the `href` of the first match is used.
pub const LINK: &[&str] = &["a[href]"];

/// Location candidates.
pub const LOCATION: &[&str] = &[
    "[data-marker='item-address']",
    "[itemprop='address']",
    "[class*='geo-address']",
    "[data-marker*='address']",
];

/// Description candidates.
pub const DESCRIPTION: &[&str] = &[
    "[data-marker='item-description']",
    "meta[itemprop='description']",
    "[class*='item-description']",
];

/// Image candidates; every match contributes.
pub const IMAGES: &[&str] = &["img[src]", "img[data-src]"];

/// Phrases that mark a blocked or challenge page. Matched case-insensitively.
pub const BLOCKING_KEYWORDS: &[&str] = &[
    "доступ ограничен",
    "доступ запрещен",
    "блокировка",
    "проверка браузера",
    "access denied",
    "access restricted",
    "captcha",
    "are you a robot",
];

/// Selectors checked by `inspect` when diagnosing a page.
pub const DIAGNOSTIC: &[&str] = &[
    "[data-marker='item']",
    "[data-marker*='item']",
    ".item",
    ".listing-item",
    "[data-marker='catalog-serp']",
    "[data-marker*='catalog']",
    "article",
    ".js-catalog_after-ads",
    "[data-marker*='snippet']",
];

fn owned(chain: &[&str]) -> Vec<String> {
    chain.iter().map(|s| s.to_string()).collect()
}

/// The full set of selector chains used by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    pub containers: Vec<String>,
    pub title: Vec<String>,
    pub price: Vec<String>,
    pub link: Vec<String>,
    pub location: Vec<String>,
    pub description: Vec<String>,
    pub images: Vec<String>,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            containers: owned(CONTAINERS),
            title: owned(TITLE),
            price: owned(PRICE),
            link: owned(LINK),
            location: owned(LOCATION),
            description: owned(DESCRIPTION),
            images: owned(IMAGES),
        }
    }
}

impl SelectorSet {
    /// Checks that every selector compiles and that the required chains are non-empty.
    pub fn validate(&self) -> Result<(), FetchError> {
        for (name, chain) in [
            ("containers", &self.containers),
            ("title", &self.title),
            ("link", &self.link),
        ] {
            if chain.is_empty() {
                return Err(FetchError::InvalidSelector {
                    selector: name.to_string(),
                    reason: "chain must list at least one selector".to_string(),
                });
            }
        }

        self.all().try_for_each(|s| parse_selector(s).map(|_| ()))
    }

    fn all(&self) -> impl Iterator<Item = &String> {
        self.containers
            .iter()
            .chain(&self.title)
            .chain(&self.price)
            .chain(&self.link)
            .chain(&self.location)
            .chain(&self.description)
            .chain(&self.images)
    }
}

/// Returns the first blocking keyword found in `text`.
pub fn find_blocking_keyword(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    BLOCKING_KEYWORDS.iter().copied().find(|keyword| lowered.contains(keyword))
}

//! Page validity heuristic.

use super::loader::PageLoader;
use crate::error::FetchError;
use serde::Serialize;
use tracing::{debug, warn};

/// Minimum number of listing elements for a page to count as real results.
///
/// Past the last results page the site still renders a small block of
/// related ads, so a handful of elements does not mean the page has results.
pub const DEFAULT_MIN_LISTINGS: usize = 3;

/// Outcome of checking one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCheck {
    pub valid: bool,
    pub count: usize,
    pub blocked_keyword: Option<&'static str>,
}

/// Decides whether a page holds a genuine page of results.
#[derive(Clone)]
pub struct PageValidator {
    loader: PageLoader,
    min_listings: usize,
}

impl PageValidator {
    pub fn new(loader: PageLoader, min_listings: usize) -> Self {
        Self { loader, min_listings }
    }

    /// Loads `url` and counts its listing elements.
    pub async fn check(&self, url: &str) -> Result<PageCheck, FetchError> {
        let page = self.loader.load(url).await?;
        let count = page.elements.len();
        let valid = count >= self.min_listings;

        if !valid {
            if let Some(keyword) = page.blocked_keyword {
                warn!("Page {} might be blocked - found keyword: {}", url, keyword);
            }
        }

        debug!("Page {} has {} listing elements (valid: {})", url, count, valid);

        Ok(PageCheck { valid, count, blocked_keyword: page.blocked_keyword })
    }
}

//! Listing fetcher: page load plus per-element extraction.

use super::loader::PageLoader;
use crate::error::FetchError;
use crate::listing::{FieldExtractor, Listing};
use tracing::debug;

/// Loads a results page and extracts every listing on it.
#[derive(Clone)]
pub struct ListingFetcher {
    loader: PageLoader,
    extractor: FieldExtractor,
}

impl ListingFetcher {
    pub fn new(loader: PageLoader, extractor: FieldExtractor) -> Self {
        Self { loader, extractor }
    }

    /// Fetches the listings on `url`.
    ///
    /// A page with no listing elements yields an empty vector; only renderer
    /// failures are errors. Elements that fail extraction are skipped.
    pub async fn fetch(&self, url: &str) -> Result<Vec<Listing>, FetchError> {
        let page = self.loader.load(url).await?;

        if page.elements.is_empty() {
            debug!("No listing elements on {}", url);
            return Ok(Vec::new());
        }

        let mut listings = Vec::with_capacity(page.elements.len());
        for (i, element) in page.elements.iter().enumerate() {
            match self.extractor.extract(element) {
                Ok(listing) => listings.push(listing),
                Err(e) => debug!("Failed to parse listing {} on {}: {}", i, url, e),
            }
        }

        debug!("Extracted {} of {} listings from {}", listings.len(), page.elements.len(), url);
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::SelectorSet;
    use crate::render::StaticRenderer;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    const URL: &str = "https://site.test/flats";

    fn fetcher(renderer: Arc<StaticRenderer>) -> ListingFetcher {
        let selectors = Arc::new(SelectorSet::default());
        let loader = PageLoader::new(renderer, Duration::ZERO, selectors.containers.clone());
        let extractor =
            FieldExtractor::new(selectors, Url::parse("https://site.test").unwrap());
        ListingFetcher::new(loader, extractor)
    }

    #[tokio::test]
    async fn test_skips_elements_without_title() {
        let html = r#"<html><body>
            <div data-marker="item"><h3><a href="/item/1">One</a></h3><span class="price">1 ₽</span></div>
            <div data-marker="item"><span class="price">2 ₽</span></div>
            <div data-marker="item"><h3><a href="/item/3">Three</a></h3></div>
        </body></html>"#;
        let renderer = Arc::new(StaticRenderer::new().with_page(URL, html));

        let listings = fetcher(Arc::clone(&renderer)).fetch(URL).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].url, "https://site.test/item/1");
        assert_eq!(listings[1].title, "Three");
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_is_not_an_error() {
        let renderer = Arc::new(StaticRenderer::new());
        let listings = fetcher(renderer).fetch(URL).await.unwrap();
        assert!(listings.is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_propagates() {
        let renderer = Arc::new(StaticRenderer::new().failing(URL, 1));
        let result = fetcher(renderer).fetch(URL).await;
        assert!(matches!(result, Err(FetchError::Navigation { .. })));
    }
}

//! Shared page loading for the validator and the fetcher.
//!
//! Both stages must see the same listing elements for a page, so the
//! load / settle / container lookup sequence lives here once.

use crate::error::FetchError;
use crate::listing::selectors::find_blocking_keyword;
use crate::render::{Element, PageHandle, Renderer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Listing elements found on one page.
#[derive(Debug, Clone, Default)]
pub struct LoadedPage {
    /// Materialized listing elements from the first container selector that returned anything
    pub elements: Vec<Element>,
    /// Blocking keyword seen in the page body, if any
    pub blocked_keyword: Option<&'static str>,
}

/// Opens pages through the renderer and locates listing containers.
#[derive(Clone)]
pub struct PageLoader {
    renderer: Arc<dyn Renderer>,
    settle: Duration,
    containers: Arc<Vec<String>>,
}

impl PageLoader {
    pub fn new(renderer: Arc<dyn Renderer>, settle: Duration, containers: Vec<String>) -> Self {
        Self { renderer, settle, containers: Arc::new(containers) }
    }

    /// Loads `url` and returns its listing elements. The page is always closed.
    pub async fn load(&self, url: &str) -> Result<LoadedPage, FetchError> {
        let mut page = self.renderer.open_page(url).await?;

        let result = self.scan(page.as_mut()).await;

        if let Err(e) = page.close().await {
            warn!("Failed to close page {}: {}", url, e);
        }

        result
    }

    async fn scan(&self, page: &mut dyn PageHandle) -> Result<LoadedPage, FetchError> {
        page.wait_load().await?;

        // Client-side rendering may still be filling the DOM after the load event.
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let mut elements = Vec::new();
        for selector in self.containers.iter() {
            let found = page.query_selector_all(selector).await?;
            // The first candidate with any result wins, even if none of it materializes.
            if !found.is_empty() {
                let total = found.len();
                elements = found.into_iter().flatten().collect::<Vec<Element>>();
                debug!("Selector '{}' matched {} elements ({} usable)", selector, total, elements.len());
                break;
            }
        }

        let blocked_keyword = match page.query_selector_all("body").await?.into_iter().flatten().next() {
            Some(body) => find_blocking_keyword(&body.text()),
            None => None,
        };

        Ok(LoadedPage { elements, blocked_keyword })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::selectors::CONTAINERS;
    use crate::render::StaticRenderer;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const URL: &str = "https://site.test/flats";

    fn loader(renderer: Arc<dyn Renderer>) -> PageLoader {
        PageLoader::new(renderer, Duration::ZERO, CONTAINERS.iter().map(|s| s.to_string()).collect())
    }

    /// Answers each selector with a fixed list of present/detached nodes.
    #[derive(Default)]
    struct ScriptedRenderer {
        answers: HashMap<String, Vec<bool>>,
        closed: Arc<AtomicUsize>,
    }

    impl ScriptedRenderer {
        fn answer(mut self, selector: &str, nodes: &[bool]) -> Self {
            self.answers.insert(selector.to_string(), nodes.to_vec());
            self
        }
    }

    struct ScriptedPage {
        answers: HashMap<String, Vec<bool>>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        async fn open_page(&self, _url: &str) -> Result<Box<dyn PageHandle>, FetchError> {
            Ok(Box::new(ScriptedPage {
                answers: self.answers.clone(),
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    #[async_trait]
    impl PageHandle for ScriptedPage {
        async fn wait_load(&mut self) -> Result<(), FetchError> {
            Ok(())
        }

        async fn query_selector_all(&self, selector: &str) -> Result<Vec<Option<Element>>, FetchError> {
            let nodes = self.answers.get(selector).cloned().unwrap_or_default();
            Ok(nodes
                .into_iter()
                .map(|present| present.then(|| Element::from_html("<div data-marker=\"item-title\">x</div>")))
                .collect())
        }

        async fn close(self: Box<Self>) -> Result<(), FetchError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_primary_selector_wins() {
        let html = r#"<body>
            <div data-marker="item"></div><div data-marker="item"></div>
            <div data-marker="item-extra"></div>
        </body>"#;
        let renderer = Arc::new(StaticRenderer::new().with_page(URL, html));

        let page = loader(renderer.clone()).load(URL).await.unwrap();
        // No merging with the broader fallback candidate.
        assert_eq!(page.elements.len(), 2);
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test]
    async fn test_fallback_selector_used() {
        let html = r#"<body><div data-marker="item-card"></div><div data-marker="item-card"></div></body>"#;
        let renderer = Arc::new(StaticRenderer::new().with_page(URL, html));

        let page = loader(renderer).load(URL).await.unwrap();
        assert_eq!(page.elements.len(), 2);
    }

    #[tokio::test]
    async fn test_detached_nodes_not_counted() {
        let html = r#"<body><div data-marker="item"></div></body>"#;
        let renderer = Arc::new(StaticRenderer::new().with_page(URL, html).with_detached_nodes(4));

        let page = loader(renderer).load(URL).await.unwrap();
        assert_eq!(page.elements.len(), 1);
    }

    #[tokio::test]
    async fn test_blocking_keyword_detected() {
        let html = r#"<body><h2>Доступ ограничен: проблема с IP</h2></body>"#;
        let renderer = Arc::new(StaticRenderer::new().with_page(URL, html));

        let page = loader(renderer).load(URL).await.unwrap();
        assert!(page.elements.is_empty());
        assert_eq!(page.blocked_keyword, Some("доступ ограничен"));
    }

    #[tokio::test]
    async fn test_open_failure_propagates() {
        let renderer = Arc::new(StaticRenderer::new().failing(URL, 1));
        assert!(loader(renderer.clone()).load(URL).await.is_err());
        assert_eq!(renderer.opened(), 0);
    }

    #[tokio::test]
    async fn test_detached_primary_does_not_fall_through() {
        let renderer = Arc::new(
            ScriptedRenderer::default()
                .answer("[data-marker='item']", &[false, false, false])
                .answer("[data-marker*='item']", &[true, true, true]),
        );

        let page = loader(renderer.clone()).load(URL).await.unwrap();
        assert!(page.elements.is_empty());
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_primary_falls_through() {
        let renderer = Arc::new(
            ScriptedRenderer::default().answer("[data-marker*='item']", &[true, false, true]),
        );

        let page = loader(renderer).load(URL).await.unwrap();
        assert_eq!(page.elements.len(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_still_closes_page() {
        let renderer = Arc::new(StaticRenderer::new().with_page(URL, "<body></body>").failing_load(URL, 1));

        let err = loader(renderer.clone()).load(URL).await.unwrap_err();
        assert!(matches!(err, FetchError::Navigation { .. }));
        assert_eq!(renderer.opened(), 1);
        assert_eq!(renderer.closed(), 1);

        // The script is spent, so the next load succeeds and closes too.
        loader(renderer.clone()).load(URL).await.unwrap();
        assert_eq!(renderer.opened(), 2);
        assert_eq!(renderer.closed(), 2);
    }
}

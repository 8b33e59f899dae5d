//! Renderer serving fixed HTML documents.
//!
//! Used by the test suite and by `inspect --html-file` for offline selector work.

use super::element::select_document;
use super::{Element, PageHandle, Renderer};
use crate::error::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const EMPTY_PAGE: &str = "<html><head></head><body></body></html>";

/// In-memory renderer keyed by URL.
#[derive(Default)]
pub struct StaticRenderer {
    pages: HashMap<String, String>,
    fallback: Option<String>,
    failures: Mutex<HashMap<String, u32>>,
    load_failures: Mutex<HashMap<String, u32>>,
    detached_nodes: usize,
    visits: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl StaticRenderer {
    /// Creates a renderer where every URL serves an empty page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `html` for `url`.
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Serves `html` for any URL without an explicit page.
    pub fn with_fallback(mut self, html: impl Into<String>) -> Self {
        self.fallback = Some(html.into());
        self
    }

    /// Makes the next `times` opens of `url` fail with a navigation error.
    pub fn failing(self, url: impl Into<String>, times: u32) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(url.into(), times);
        }
        self
    }

    /// Makes the next `times` opens of `url` succeed but fail while waiting for the load event.
    pub fn failing_load(self, url: impl Into<String>, times: u32) -> Self {
        if let Ok(mut failures) = self.load_failures.lock() {
            failures.insert(url.into(), times);
        }
        self
    }

    /// Appends `count` unmaterialized nodes to every query result.
    pub fn with_detached_nodes(mut self, count: usize) -> Self {
        self.detached_nodes = count;
        self
    }

    /// URLs requested so far, failed attempts included.
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Number of requests made for `url`.
    pub fn visit_count(&self, url: &str) -> usize {
        self.visits().iter().filter(|v| v.as_str() == url).count()
    }

    /// Pages successfully opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Pages closed.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn take_failure(failures: &Mutex<HashMap<String, u32>>, url: &str) -> bool {
        let Ok(mut failures) = failures.lock() else {
            return false;
        };
        match failures.get_mut(url) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn open_page(&self, url: &str) -> Result<Box<dyn PageHandle>, FetchError> {
        if let Ok(mut visits) = self.visits.lock() {
            visits.push(url.to_string());
        }

        if Self::take_failure(&self.failures, url) {
            return Err(FetchError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }

        let html = self
            .pages
            .get(url)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| EMPTY_PAGE.to_string());

        let fail_load = Self::take_failure(&self.load_failures, url);
        self.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(StaticPage {
            url: url.to_string(),
            html,
            fail_load,
            detached_nodes: self.detached_nodes,
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct StaticPage {
    url: String,
    html: String,
    fail_load: bool,
    detached_nodes: usize,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl PageHandle for StaticPage {
    async fn wait_load(&mut self) -> Result<(), FetchError> {
        if self.fail_load {
            return Err(FetchError::Navigation {
                url: self.url.clone(),
                reason: "scripted load failure".to_string(),
            });
        }
        Ok(())
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<Option<Element>>, FetchError> {
        let mut found: Vec<Option<Element>> =
            select_document(&self.html, selector)?.into_iter().map(Some).collect();
        found.extend((0..self.detached_nodes).map(|_| None));
        Ok(found)
    }

    async fn close(self: Box<Self>) -> Result<(), FetchError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

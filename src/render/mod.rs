//! Page renderer capability.
//!
//! The engine never fetches or renders pages itself. It consumes a [`Renderer`]
//! that hands out [`PageHandle`]s queryable by CSS selectors.

pub mod element;
pub mod fixture;
pub mod http;

use crate::error::FetchError;
use async_trait::async_trait;

pub use element::Element;
pub use fixture::StaticRenderer;
pub use http::HttpRenderer;

/// Opens pages by URL.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Starts loading `url` and returns a handle to the page.
    async fn open_page(&self, url: &str) -> Result<Box<dyn PageHandle>, FetchError>;
}

/// One loaded page. Callers must [`close`](PageHandle::close) it on every path.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Waits for the page's load event.
    async fn wait_load(&mut self) -> Result<(), FetchError>;

    /// Returns every element matching `selector`.
    ///
    /// Entries are `None` for placeholder or detached nodes the renderer could
    /// not materialize. An empty result is legitimate.
    async fn query_selector_all(&self, selector: &str) -> Result<Vec<Option<Element>>, FetchError>;

    /// Releases the page.
    async fn close(self: Box<Self>) -> Result<(), FetchError>;
}

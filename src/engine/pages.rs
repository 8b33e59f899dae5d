//! Pagination URL generation.

use anyhow::{Context, Result};
use url::Url;

/// Builds per-page URLs from the first results page.
#[derive(Debug, Clone)]
pub struct PageUrls {
    raw: String,
    base: Url,
}

impl PageUrls {
    /// Parses the page-1 URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        Ok(Self { raw: base_url.to_string(), base })
    }

    /// Origin of the results site, e.g. `https://www.avito.ru`.
    pub fn origin(&self) -> Url {
        let mut origin = self.base.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        origin
    }

    /// URL of results page `page` (1-based).
    pub fn page(&self, page: u32) -> String {
        if page <= 1 {
            return self.raw.clone();
        }

        let mut url = self.base.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "p" && k != "localPriority")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("p", &page.to_string())
            .append_pair("localPriority", "0");

        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_is_base_verbatim() {
        let urls = PageUrls::new("https://www.avito.ru/chelyabinsk/kvartiry?district=16").unwrap();
        assert_eq!(urls.page(1), "https://www.avito.ru/chelyabinsk/kvartiry?district=16");
    }

    #[test]
    fn test_later_pages_set_page_params() {
        let urls = PageUrls::new("https://www.avito.ru/chelyabinsk/kvartiry?district=16").unwrap();
        assert_eq!(
            urls.page(2),
            "https://www.avito.ru/chelyabinsk/kvartiry?district=16&p=2&localPriority=0"
        );
    }

    #[test]
    fn test_existing_page_param_replaced() {
        let urls = PageUrls::new("https://site.test/flats?p=7&localPriority=1&q=x").unwrap();
        assert_eq!(urls.page(3), "https://site.test/flats?q=x&p=3&localPriority=0");
    }

    #[test]
    fn test_base_without_query() {
        let urls = PageUrls::new("https://site.test/flats").unwrap();
        assert_eq!(urls.page(2), "https://site.test/flats?p=2&localPriority=0");
    }

    #[test]
    fn test_origin() {
        let urls = PageUrls::new("https://www.avito.ru/chelyabinsk/kvartiry?district=16").unwrap();
        assert_eq!(urls.origin().as_str(), "https://www.avito.ru/");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = PageUrls::new("not a url").unwrap_err();
        assert!(err.to_string().contains("Invalid base URL"));
    }
}

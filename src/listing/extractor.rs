//! Field extraction from a single listing element.

use crate::error::ExtractionError;
use crate::listing::models::{Listing, PRICE_NOT_SPECIFIED};
use crate::listing::selectors::SelectorSet;
use crate::render::Element;
use chrono::Utc;
use std::sync::Arc;
use tracing::trace;
use url::Url;

/// Builds [`Listing`]s from rendered listing elements.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    selectors: Arc<SelectorSet>,
    origin: Url,
}

impl FieldExtractor {
    /// Creates an extractor resolving relative links against `origin`.
    pub fn new(selectors: Arc<SelectorSet>, origin: Url) -> Self {
        Self { selectors, origin }
    }

    /// Extracts one listing. Fails only when no title can be found.
    pub fn extract(&self, element: &Element) -> Result<Listing, ExtractionError> {
        let title = first_text(element, &self.selectors.title).ok_or(ExtractionError::MissingTitle)?;

        let price = first_text_or_attr(element, &self.selectors.price, "content")
            .unwrap_or_else(|| PRICE_NOT_SPECIFIED.to_string());

        let url = self.resolve_link(element).unwrap_or_default();

        let location = first_text(element, &self.selectors.location).unwrap_or_default();

        let description = first_text_or_attr(element, &self.selectors.description, "content")
            .unwrap_or_default();

        let images = self.collect_images(element);

        let id = Listing::derive_id(&url, &title, &price, &location);
        let now = Utc::now();

        trace!("Extracted listing {} ({})", id, title);

        Ok(Listing {
            id,
            title,
            price,
            url,
            location,
            description,
            images,
            created_at: now,
            updated_at: now,
        })
    }

    /// Turns an href into an absolute URL.
    ///
    /// Hrefs that already carry a scheme are kept as they are; anything else is
    /// joined onto the site origin.
    pub fn absolutize(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }

        match Url::parse(href) {
            Ok(absolute) => Some(absolute.to_string()),
            Err(_) => self.origin.join(href).ok().map(|u| u.to_string()),
        }
    }

    fn resolve_link(&self, element: &Element) -> Option<String> {
        self.selectors.link.iter().find_map(|selector| {
            let anchor = element.query_selector(selector).ok().flatten()?;
            self.absolutize(&anchor.attribute("href")?)
        })
    }

    fn collect_images(&self, element: &Element) -> Vec<String> {
        let mut images: Vec<String> = Vec::new();
        for selector in &self.selectors.images {
            let Ok(found) = element.query_selector_all(selector) else {
                continue;
            };
            for img in found {
                let src = img.attribute("src").or_else(|| img.attribute("data-src"));
                if let Some(absolute) = src.and_then(|s| self.absolutize(&s)) {
                    if !images.contains(&absolute) {
                        images.push(absolute);
                    }
                }
            }
        }
        images
    }
}

/// Collapses whitespace runs and trims.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First non-blank text across the chain.
fn first_text(element: &Element, chain: &[String]) -> Option<String> {
    chain.iter().find_map(|selector| {
        let found = element.query_selector(selector).ok().flatten()?;
        Some(normalize(&found.text())).filter(|t| !t.is_empty())
    })
}

/// Like [`first_text`], but a match with blank text may supply `attr` instead.
fn first_text_or_attr(element: &Element, chain: &[String], attr: &str) -> Option<String> {
    chain.iter().find_map(|selector| {
        let found = element.query_selector(selector).ok().flatten()?;
        let text = normalize(&found.text());
        if !text.is_empty() {
            return Some(text);
        }
        found.attribute(attr).map(|v| normalize(&v)).filter(|v| !v.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(
            Arc::new(SelectorSet::default()),
            Url::parse("https://www.avito.ru").unwrap(),
        )
    }

    #[test]
    fn test_extract_complete_card() {
        let element = Element::from_html(
            r#"<div data-marker="item">
                <a itemprop="url" href="/chelyabinsk/kvartiry/2-k_55m_123">
                    <h3 itemprop="name">2-к. квартира,   55 м²</h3>
                </a>
                <span data-marker="item-price">30 000 ₽ в месяц</span>
                <div data-marker="item-address">ул. Ленина, 1</div>
                <img src="https://img.test/1.jpg">
            </div>"#,
        );

        let listing = extractor().extract(&element).unwrap();
        assert_eq!(listing.title, "2-к. квартира, 55 м²");
        assert_eq!(listing.price, "30 000 ₽ в месяц");
        assert_eq!(listing.url, "https://www.avito.ru/chelyabinsk/kvartiry/2-k_55m_123");
        assert_eq!(listing.id, "listing_https:__www.avito.ru_chelyabinsk_kvartiry_2-k_55m_123");
        assert_eq!(listing.location, "ул. Ленина, 1");
        assert_eq!(listing.images, vec!["https://img.test/1.jpg"]);
        assert_eq!(listing.created_at, listing.updated_at);
    }

    #[test]
    fn test_missing_title_fails() {
        let element = Element::from_html(
            r#"<div data-marker="item"><span class="price">10 ₽</span></div>"#,
        );
        assert_eq!(extractor().extract(&element), Err(ExtractionError::MissingTitle));
    }

    #[test]
    fn test_blank_title_falls_through_chain() {
        // The first candidate matches but is blank; the heading link wins.
        let element = Element::from_html(
            r#"<div><span itemprop="name">   </span><h3><a href="/x">Studio</a></h3></div>"#,
        );
        let listing = extractor().extract(&element).unwrap();
        assert_eq!(listing.title, "Studio");
    }

    #[test]
    fn test_all_blank_titles_fail() {
        let element = Element::from_html(
            r#"<div><span itemprop="name"> </span><h3><a href="/x">  </a></h3></div>"#,
        );
        assert!(extractor().extract(&element).is_err());
    }

    #[test]
    fn test_title_from_anchor_with_title_attribute() {
        let element = Element::from_html(r#"<div><a title="t" href="/y">Loft</a></div>"#);
        assert_eq!(extractor().extract(&element).unwrap().title, "Loft");
    }

    #[test]
    fn test_price_placeholder() {
        let element = Element::from_html(r#"<div><h3><a href="/x">Studio</a></h3></div>"#);
        let listing = extractor().extract(&element).unwrap();
        assert_eq!(listing.price, PRICE_NOT_SPECIFIED);
    }

    #[test]
    fn test_price_from_meta_content() {
        let element = Element::from_html(
            r#"<div><h3><a href="/x">Studio</a></h3><meta itemprop="price" content="25000"></div>"#,
        );
        assert_eq!(extractor().extract(&element).unwrap().price, "25000");
    }

    #[test]
    fn test_relative_href_is_absolutized() {
        let element = Element::from_html(r#"<div><h3><a href="/item/123">Flat</a></h3></div>"#);
        let listing = extractor().extract(&element).unwrap();
        assert_eq!(listing.url, "https://www.avito.ru/item/123");
    }

    #[test]
    fn test_absolute_href_kept() {
        let element = Element::from_html(
            r#"<div><h3><a href="https://other.test/item/9">Flat</a></h3></div>"#,
        );
        let listing = extractor().extract(&element).unwrap();
        assert_eq!(listing.url, "https://other.test/item/9");
    }

    #[test]
    fn test_missing_link_uses_content_id() {
        let element = Element::from_html(
            r#"<div><span data-marker="item-title">No link</span><span class="price">5 ₽</span></div>"#,
        );
        let listing = extractor().extract(&element).unwrap();
        assert_eq!(listing.url, "");
        assert!(listing.id.starts_with("listing_h_"));

        // Same content on the next sweep maps to the same key.
        let again = extractor().extract(&element).unwrap();
        assert_eq!(listing.id, again.id);
    }

    #[test]
    fn test_images_deduplicated_and_absolute() {
        let element = Element::from_html(
            r#"<div><h3><a href="/x">Flat</a></h3>
                <img src="/i/1.jpg"><img src="/i/1.jpg"><img data-src="/i/2.jpg">
            </div>"#,
        );
        let listing = extractor().extract(&element).unwrap();
        assert_eq!(
            listing.images,
            vec!["https://www.avito.ru/i/1.jpg", "https://www.avito.ru/i/2.jpg"]
        );
    }
}

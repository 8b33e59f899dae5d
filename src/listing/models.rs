//! Listing data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Placeholder stored when no price selector matches.
pub const PRICE_NOT_SPECIFIED: &str = "Price not specified";

/// Prefix shared by every listing key in the store.
pub const ID_PREFIX: &str = "listing_";

/// One harvested classified ad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Stable store key derived from the URL (or content when no URL resolved)
    pub id: String,
    /// Ad title, never empty
    pub title: String,
    /// Price text as displayed, or [`PRICE_NOT_SPECIFIED`]
    pub price: String,
    /// Absolute ad URL; empty when no link was found
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Derives the store key for a listing.
    ///
    /// With a URL the key is `listing_` followed by the URL with every `/`
    /// replaced by `_`. Without one, the key hashes title, price and location
    /// so the same ad still maps to the same key on the next sweep.
    pub fn derive_id(url: &str, title: &str, price: &str, location: &str) -> String {
        if !url.is_empty() {
            return format!("{}{}", ID_PREFIX, url.replace('/', "_"));
        }

        let mut hasher = Sha256::new();
        for part in [title, price, location] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        let hex: String = digest.iter().take(16).map(|b| format!("{:02x}", b)).collect();
        format!("{}h_{}", ID_PREFIX, hex)
    }

    /// Serializes to the persisted JSON record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a persisted JSON record.
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_listing(url: &str) -> Listing {
        let now = Utc::now();
        Listing {
            id: Listing::derive_id(url, "2-room flat", "30 000 ₽", ""),
            title: "2-room flat".to_string(),
            price: "30 000 ₽".to_string(),
            url: url.to_string(),
            location: String::new(),
            description: String::new(),
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_derive_id_from_url() {
        let id = Listing::derive_id("https://www.avito.ru/item/123", "t", "p", "");
        assert_eq!(id, "listing_https:__www.avito.ru_item_123");
    }

    #[test]
    fn test_derive_id_without_url_is_deterministic() {
        let a = Listing::derive_id("", "Flat", "10 ₽", "Center");
        let b = Listing::derive_id("", "Flat", "10 ₽", "Center");
        let c = Listing::derive_id("", "Flat", "11 ₽", "Center");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("listing_h_"));
        assert_eq!(a.len(), "listing_h_".len() + 32);
    }

    #[test]
    fn test_derive_id_field_boundaries() {
        // Shifting text between fields must change the key.
        let a = Listing::derive_id("", "ab", "c", "");
        let b = Listing::derive_id("", "a", "bc", "");
        assert_ne!(a, b);
    }

    #[test]
    fn test_json_omits_empty_optional_fields() {
        let listing = make_listing("https://site.test/item/1");
        let json = listing.to_json().unwrap();
        assert!(json.contains("\"created_at\""));
        assert!(!json.contains("\"location\""));
        assert!(!json.contains("\"images\""));

        let parsed = Listing::from_json(&json).unwrap();
        assert_eq!(parsed, listing);
    }
}

use serde::{Deserialize, Serialize};

/// Kind of media a request is for. Anything that is not a movie is treated as TV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MediaType {
    #[default]
    Tv,
    Movie,
}

impl MediaType {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("movie") {
            MediaType::Movie
        } else {
            MediaType::Tv
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Tv => "tv",
            MediaType::Movie => "movie",
        }
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|r| MediaType::parse(&r)).unwrap_or_default())
    }
}

/// The two streaming services searched for content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Svt,
    Nrk,
}

impl Provider {
    /// Fixed search order
    pub const ALL: [Provider; 2] = [Provider::Svt, Provider::Nrk];

    /// Short key used in responses and for offer matching
    pub fn key(&self) -> &'static str {
        match self {
            Provider::Svt => "svt",
            Provider::Nrk => "nrk",
        }
    }

    /// Provider name as listed in catalog offers
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Svt => "SVT Play",
            Provider::Nrk => "NRK TV",
        }
    }
}

/// A single catalog title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub object_type: Option<String>,
    pub full_path: Option<String>,
    pub original_release_year: Option<i32>,
    pub offers: Vec<Offer>,
}

impl CatalogItem {
    pub fn has_provider(&self, provider_name: &str) -> bool {
        self.offers.iter().any(|o| o.provider_id == provider_name)
    }
}

/// A (provider, URL) pairing inside a catalog item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Provider display name, e.g. "SVT Play"
    pub provider_id: String,
    pub monetization_type: Option<String>,
    pub urls: OfferUrls,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferUrls {
    pub standard_web: Option<String>,
}

/// Catalog hits per provider, in search order
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub svt: Vec<CatalogItem>,
    pub nrk: Vec<CatalogItem>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.svt.is_empty() && self.nrk.is_empty()
    }

    pub fn for_provider(&self, provider: Provider) -> &[CatalogItem] {
        match provider {
            Provider::Svt => &self.svt,
            Provider::Nrk => &self.nrk,
        }
    }
}

/// Body of POST /webhook (Overseerr/Jellyseerr style)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    pub media: Option<WebhookMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMedia {
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_parse() {
        assert_eq!(MediaType::parse("movie"), MediaType::Movie);
        assert_eq!(MediaType::parse("MOVIE"), MediaType::Movie);
        assert_eq!(MediaType::parse("tv"), MediaType::Tv);
        assert_eq!(MediaType::parse("anime"), MediaType::Tv);
        assert_eq!(MediaType::parse(""), MediaType::Tv);
    }

    #[test]
    fn test_webhook_payload_defaults() {
        let payload: WebhookPayload =
            serde_json::from_str(r#"{"media":{"title":"Skam"}}"#).unwrap();
        let media = payload.media.unwrap();
        assert_eq!(media.title, "Skam");
        assert_eq!(media.media_type, MediaType::Tv);

        let payload: WebhookPayload =
            serde_json::from_str(r#"{"media":{"mediaType":"movie","title":"Jul"}}"#).unwrap();
        assert_eq!(payload.media.unwrap().media_type, MediaType::Movie);

        let payload: WebhookPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.media.is_none());
    }

    #[test]
    fn test_search_results_by_provider() {
        let results = SearchResults {
            svt: Vec::new(),
            nrk: vec![CatalogItem {
                title: "Skam".to_string(),
                ..Default::default()
            }],
        };
        assert!(!results.is_empty());
        assert!(results.for_provider(Provider::Svt).is_empty());
        assert_eq!(results.for_provider(Provider::Nrk)[0].title, "Skam");
        assert_eq!(Provider::ALL[0].key(), "svt");
        assert!(SearchResults::default().is_empty());
    }
}

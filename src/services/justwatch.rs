// JustWatch catalog search
// GraphQL endpoint used by the public JustWatch web app

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::{CatalogItem, MediaType, Offer, OfferUrls, Provider, SearchResults};
use crate::settings::ProviderSettings;

const JUSTWATCH_GRAPHQL_URL: &str = "https://apis.justwatch.com/graphql";
const SEARCH_RESULT_LIMIT: u32 = 10;

const SEARCH_TITLES_QUERY: &str = r#"
query GetSearchTitles(
  $country: Country!
  $language: Language!
  $first: Int!
  $filter: TitleFilter
) {
  popularTitles(country: $country, first: $first, filter: $filter) {
    edges {
      node {
        id
        objectType
        content(country: $country, language: $language) {
          title
          fullPath
          originalReleaseYear
        }
        offers(country: $country, platform: WEB) {
          monetizationType
          standardWebURL
          package {
            clearName
            technicalName
          }
        }
      }
    }
  }
}
"#;

/// GraphQL request wrapper
#[derive(Debug, Serialize)]
struct GraphQLRequest {
    #[serde(rename = "operationName")]
    operation_name: &'static str,
    query: &'static str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<SearchData>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(rename = "popularTitles")]
    popular_titles: Option<TitleConnection>,
}

#[derive(Debug, Deserialize)]
struct TitleConnection {
    #[serde(default)]
    edges: Vec<TitleEdge>,
}

#[derive(Debug, Deserialize)]
struct TitleEdge {
    node: TitleNode,
}

#[derive(Debug, Deserialize)]
struct TitleNode {
    id: String,
    #[serde(rename = "objectType")]
    object_type: Option<String>,
    content: Option<TitleContent>,
    #[serde(default)]
    offers: Vec<OfferNode>,
}

#[derive(Debug, Deserialize)]
struct TitleContent {
    title: Option<String>,
    #[serde(rename = "fullPath")]
    full_path: Option<String>,
    #[serde(rename = "originalReleaseYear")]
    original_release_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OfferNode {
    #[serde(rename = "monetizationType")]
    monetization_type: Option<String>,
    #[serde(rename = "standardWebURL")]
    standard_web_url: Option<String>,
    package: Option<PackageNode>,
}

#[derive(Debug, Deserialize)]
struct PackageNode {
    #[serde(rename = "clearName")]
    clear_name: Option<String>,
    #[serde(rename = "technicalName")]
    technical_name: Option<String>,
}

impl From<TitleNode> for CatalogItem {
    fn from(node: TitleNode) -> Self {
        let content = node.content;
        CatalogItem {
            id: node.id,
            title: content
                .as_ref()
                .and_then(|c| c.title.clone())
                .unwrap_or_default(),
            object_type: node.object_type,
            full_path: content.as_ref().and_then(|c| c.full_path.clone()),
            original_release_year: content.as_ref().and_then(|c| c.original_release_year),
            offers: node
                .offers
                .into_iter()
                .map(|o| Offer {
                    provider_id: o
                        .package
                        .and_then(|p| p.clear_name.or(p.technical_name))
                        .unwrap_or_default(),
                    monetization_type: o.monetization_type,
                    urls: OfferUrls {
                        standard_web: o.standard_web_url,
                    },
                })
                .collect(),
        }
    }
}

/// One regional JustWatch catalog
#[derive(Debug, Clone, Copy)]
struct Region {
    country: &'static str,
    language: &'static str,
}

impl Region {
    fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Svt => Region {
                country: "SE",
                language: "sv",
            },
            Provider::Nrk => Region {
                country: "NO",
                language: "nb",
            },
        }
    }
}

/// JustWatch client covering the Swedish and Norwegian catalogs
pub struct JustWatchClient {
    client: Client,
    endpoint: String,
}

impl JustWatchClient {
    pub fn new(client: Client, endpoint: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.unwrap_or_else(|| JUSTWATCH_GRAPHQL_URL.to_string()),
        }
    }

    /// Search both catalogs for `title`, keeping only items offered by
    /// SVT Play (SE) and NRK TV (NO). Disabled providers are skipped; a failing
    /// catalog is logged and contributes nothing.
    pub async fn search(
        &self,
        title: &str,
        media_type: MediaType,
        providers: &ProviderSettings,
    ) -> SearchResults {
        let svt = async {
            if providers.svt_play {
                self.search_provider(title, media_type, Provider::Svt).await
            } else {
                Vec::new()
            }
        };
        let nrk = async {
            if providers.nrk {
                self.search_provider(title, media_type, Provider::Nrk).await
            } else {
                Vec::new()
            }
        };

        let (svt, nrk) = tokio::join!(svt, nrk);
        SearchResults { svt, nrk }
    }

    async fn search_provider(
        &self,
        title: &str,
        media_type: MediaType,
        provider: Provider,
    ) -> Vec<CatalogItem> {
        let region = Region::for_provider(provider);
        match self.search_titles(title, region).await {
            Ok(items) => {
                let matching: Vec<CatalogItem> = items
                    .into_iter()
                    .filter(|item| item.has_provider(provider.display_name()))
                    .collect();
                tracing::debug!(
                    "JustWatch {}: {} titles on {} for '{}' ({} request)",
                    region.country,
                    matching.len(),
                    provider.display_name(),
                    title,
                    media_type.as_str()
                );
                matching
            }
            Err(e) => {
                tracing::error!("{} search error: {:#}", provider.key().to_uppercase(), e);
                Vec::new()
            }
        }
    }

    /// Plain title search. Results are not narrowed by object type, so a
    /// request typed as tv still finds a title JustWatch lists as a movie.
    async fn search_titles(&self, query: &str, region: Region) -> Result<Vec<CatalogItem>> {
        let request = GraphQLRequest {
            operation_name: "GetSearchTitles",
            query: SEARCH_TITLES_QUERY,
            variables: serde_json::json!({
                "country": region.country,
                "language": region.language,
                "first": SEARCH_RESULT_LIMIT,
                "filter": {
                    "searchQuery": query,
                },
            }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("Failed to search JustWatch")?;

        if !response.status().is_success() {
            anyhow::bail!("JustWatch search failed with status: {}", response.status());
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse JustWatch search response")?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            anyhow::bail!("JustWatch returned errors: {}", messages.join("; "));
        }

        Ok(body
            .data
            .and_then(|d| d.popular_titles)
            .map(|t| t.edges.into_iter().map(|e| e.node.into()).collect())
            .unwrap_or_default())
    }
}

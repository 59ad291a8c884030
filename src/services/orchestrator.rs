// Request orchestration: search -> match -> download -> notify

use crate::models::{MediaType, Provider, SearchResults};
use crate::services::arr::ArrIntegration;
use crate::services::downloader::Downloader;
use crate::services::justwatch::JustWatchClient;
use crate::services::matcher::{self, ContentMatcher};
use crate::settings::{ProviderSettings, Settings};

/// Final state of a media request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A download finished successfully
    Started,
    /// Neither catalog lists the title
    NotAvailable,
    /// Every candidate URL failed to download
    Failed,
}

pub struct Orchestrator {
    justwatch: JustWatchClient,
    matcher: ContentMatcher,
    downloader: Downloader,
    arr: ArrIntegration,
}

impl Orchestrator {
    pub fn new(
        justwatch: JustWatchClient,
        matcher: ContentMatcher,
        downloader: Downloader,
        arr: ArrIntegration,
    ) -> Self {
        Self {
            justwatch,
            matcher,
            downloader,
            arr,
        }
    }

    pub async fn search_content(
        &self,
        title: &str,
        media_type: MediaType,
        settings: &Settings,
    ) -> SearchResults {
        self.justwatch
            .search(title, media_type, &settings.providers)
            .await
    }

    /// Download `url` and tell Sonarr/Radarr about it. Returns whether the
    /// download succeeded; notification failures do not change the result.
    pub async fn download_content(
        &self,
        url: &str,
        title: &str,
        media_type: MediaType,
        settings: &Settings,
    ) -> bool {
        match self
            .downloader
            .download(url, title, media_type, settings)
            .await
        {
            Ok(path) => {
                if self.arr.is_tracked(media_type, title).await == Some(false) {
                    tracing::warn!(
                        "'{}' is not in the {} library; the scan may not import it",
                        title,
                        media_type.as_str()
                    );
                }
                self.arr
                    .notify(media_type, title, &path.to_string_lossy())
                    .await;
                true
            }
            Err(e) => {
                tracing::error!("Download failed: {:#}", e);
                false
            }
        }
    }

    /// Run a webhook request to completion.
    ///
    /// Catalog offers are tried first (SVT, then NRK), then the providers'
    /// own search pages. The first successful download wins.
    pub async fn process_request(
        &self,
        title: &str,
        media_type: MediaType,
        settings: &Settings,
    ) -> RequestOutcome {
        tracing::info!("Processing request for: {} ({})", title, media_type.as_str());

        let results = self.search_content(title, media_type, settings).await;
        if results.is_empty() {
            tracing::info!("Content not found on SVT/NRK: {}", title);
            return RequestOutcome::NotAvailable;
        }

        for provider in Provider::ALL {
            let items = results.for_provider(provider);
            if items.is_empty() {
                continue;
            }

            let urls = matcher::extract_urls_from_catalog(items, provider.key());
            if let Some(url) = matcher::get_best_match_url(&urls, title) {
                if !matcher::validate_url(&url, provider) {
                    tracing::debug!(
                        "Best match {} is not a known {} address",
                        url,
                        provider.display_name()
                    );
                }
                if self.download_content(&url, title, media_type, settings).await {
                    return RequestOutcome::Started;
                }
            }
        }

        for provider in Provider::ALL {
            if !provider_enabled(&settings.providers, provider) {
                continue;
            }

            let urls = self.matcher.find_direct_urls(title, provider).await;
            if let Some(url) = matcher::get_best_match_url(&urls, title) {
                if self.download_content(&url, title, media_type, settings).await {
                    return RequestOutcome::Started;
                }
            }
        }

        tracing::warn!("All download attempts failed for: {}", title);
        RequestOutcome::Failed
    }
}

fn provider_enabled(providers: &ProviderSettings, provider: Provider) -> bool {
    match provider {
        Provider::Svt => providers.svt_play,
        Provider::Nrk => providers.nrk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_enabled() {
        let providers = ProviderSettings {
            svt_play: false,
            nrk: true,
        };
        assert!(!provider_enabled(&providers, Provider::Svt));
        assert!(provider_enabled(&providers, Provider::Nrk));
    }
}

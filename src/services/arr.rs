// Sonarr / Radarr integration
// API Documentation: https://sonarr.tv/docs/api/ and https://radarr.video/docs/api/

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::config::ArrEndpoint;
use crate::models::MediaType;

/// Which library manager a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrService {
    Sonarr,
    Radarr,
}

impl ArrService {
    fn name(&self) -> &'static str {
        match self {
            ArrService::Sonarr => "Sonarr",
            ArrService::Radarr => "Radarr",
        }
    }

    /// Command that makes the service import a finished download folder
    fn scan_command(&self) -> &'static str {
        match self {
            ArrService::Sonarr => "DownloadedEpisodesScan",
            ArrService::Radarr => "DownloadedMoviesScan",
        }
    }

    /// Library listing endpoint
    fn library_path(&self) -> &'static str {
        match self {
            ArrService::Sonarr => "/api/v3/series",
            ArrService::Radarr => "/api/v3/movie",
        }
    }
}

#[derive(Debug, Serialize)]
struct ScanCommand<'a> {
    name: &'a str,
    path: &'a str,
}

/// Notifies Sonarr/Radarr about completed downloads
pub struct ArrIntegration {
    client: Client,
    sonarr: ArrEndpoint,
    radarr: ArrEndpoint,
}

impl ArrIntegration {
    pub fn new(client: Client, sonarr: ArrEndpoint, radarr: ArrEndpoint) -> Self {
        Self {
            client,
            sonarr,
            radarr,
        }
    }

    fn endpoint(&self, service: ArrService) -> &ArrEndpoint {
        match service {
            ArrService::Sonarr => &self.sonarr,
            ArrService::Radarr => &self.radarr,
        }
    }

    /// Route a finished download to the right service: movies to Radarr,
    /// everything else to Sonarr.
    pub async fn notify(&self, media_type: MediaType, title: &str, path: &str) -> bool {
        tracing::info!("Notifying arr services: {} at {}", title, path);
        match media_type {
            MediaType::Movie => self.notify_radarr_download(title, path).await,
            MediaType::Tv => self.notify_sonarr_download(title, path).await,
        }
    }

    /// Whether the matching service already has `title` in its library.
    /// None when that service is not configured.
    pub async fn is_tracked(&self, media_type: MediaType, title: &str) -> Option<bool> {
        let service = match media_type {
            MediaType::Movie => ArrService::Radarr,
            MediaType::Tv => ArrService::Sonarr,
        };
        if !self.endpoint(service).is_configured() {
            return None;
        }

        let found = match media_type {
            MediaType::Movie => self.get_movie(title).await,
            MediaType::Tv => self.get_series(title).await,
        };
        Some(found.is_some())
    }

    pub async fn notify_sonarr_download(&self, title: &str, path: &str) -> bool {
        self.notify_scan(ArrService::Sonarr, title, path).await
    }

    pub async fn notify_radarr_download(&self, title: &str, path: &str) -> bool {
        self.notify_scan(ArrService::Radarr, title, path).await
    }

    async fn notify_scan(&self, service: ArrService, title: &str, path: &str) -> bool {
        let endpoint = self.endpoint(service);
        let (Some(url), Some(api_key)) = (&endpoint.url, &endpoint.api_key) else {
            tracing::warn!("{} configuration missing", service.name());
            return false;
        };

        match self.post_scan(service, url, api_key, path).await {
            Ok(StatusCode::CREATED) => {
                tracing::info!("{} scan triggered for: {} ({})", service.name(), path, title);
                true
            }
            Ok(status) => {
                tracing::error!("{} notification failed: {}", service.name(), status);
                false
            }
            Err(e) => {
                tracing::error!("{} notification error: {:#}", service.name(), e);
                false
            }
        }
    }

    async fn post_scan(
        &self,
        service: ArrService,
        base_url: &str,
        api_key: &str,
        path: &str,
    ) -> Result<StatusCode> {
        let response = self
            .client
            .post(format!("{}/api/v3/command", base_url))
            .header("X-Api-Key", api_key)
            .json(&ScanCommand {
                name: service.scan_command(),
                path,
            })
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", service.name()))?;

        Ok(response.status())
    }

    /// First Sonarr series whose title contains `title` (case-insensitive)
    pub async fn get_series(&self, title: &str) -> Option<serde_json::Value> {
        self.find_in_library(ArrService::Sonarr, title).await
    }

    /// First Radarr movie whose title contains `title` (case-insensitive)
    pub async fn get_movie(&self, title: &str) -> Option<serde_json::Value> {
        self.find_in_library(ArrService::Radarr, title).await
    }

    async fn find_in_library(&self, service: ArrService, title: &str) -> Option<serde_json::Value> {
        let endpoint = self.endpoint(service);
        let (Some(url), Some(api_key)) = (&endpoint.url, &endpoint.api_key) else {
            return None;
        };

        match self.fetch_library(service, url, api_key).await {
            Ok(entries) => find_by_title(entries, title),
            Err(e) => {
                tracing::error!("{} lookup error: {:#}", service.name(), e);
                None
            }
        }
    }

    async fn fetch_library(
        &self,
        service: ArrService,
        base_url: &str,
        api_key: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let response = self
            .client
            .get(format!("{}{}", base_url, service.library_path()))
            .header("X-Api-Key", api_key)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", service.name()))?;

        if response.status() != StatusCode::OK {
            anyhow::bail!(
                "{} library request failed with status: {}",
                service.name(),
                response.status()
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} library response", service.name()))
    }
}

fn find_by_title(entries: Vec<serde_json::Value>, title: &str) -> Option<serde_json::Value> {
    let needle = title.to_lowercase();
    entries.into_iter().find(|entry| {
        entry
            .get("title")
            .and_then(|t| t.as_str())
            .map(|t| t.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorded {
        requests: Vec<(Option<String>, Value)>,
    }

    /// Local stand-in for a Sonarr/Radarr instance
    async fn spawn_mock_arr(status: AxumStatus) -> (String, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        async fn command(
            State((status, recorded)): State<(AxumStatus, Arc<Mutex<Recorded>>)>,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> AxumStatus {
            let key = headers
                .get("X-Api-Key")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            recorded.lock().unwrap().requests.push((key, body));
            status
        }

        async fn library() -> Json<Value> {
            Json(json!([
                {"id": 1, "title": "Bron"},
                {"id": 2, "title": "Skam"},
                {"id": 3, "title": "Skam Austin"}
            ]))
        }

        let app = Router::new()
            .route("/api/v3/command", post(command))
            .route("/api/v3/series", get(library))
            .route("/api/v3/movie", get(library))
            .with_state((status, recorded.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), recorded)
    }

    fn endpoint(url: Option<&str>, key: Option<&str>) -> ArrEndpoint {
        ArrEndpoint {
            url: url.map(str::to_string),
            api_key: key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_missing_config_makes_no_request() {
        let (url, recorded) = spawn_mock_arr(AxumStatus::CREATED).await;
        let arr = ArrIntegration::new(
            Client::new(),
            endpoint(Some(&url), None),
            endpoint(None, Some("key")),
        );

        assert!(!arr.notify_sonarr_download("Skam", "/downloads/tv/Skam").await);
        assert!(!arr.notify_radarr_download("Jul", "/downloads/movies/Jul").await);
        assert!(arr.get_series("Skam").await.is_none());
        assert_eq!(arr.is_tracked(MediaType::Tv, "Skam").await, None);
        assert!(recorded.lock().unwrap().requests.is_empty());
    }

    #[tokio::test]
    async fn test_sonarr_scan_command() {
        let (url, recorded) = spawn_mock_arr(AxumStatus::CREATED).await;
        let arr = ArrIntegration::new(
            Client::new(),
            endpoint(Some(&url), Some("sonarr-key")),
            ArrEndpoint::default(),
        );

        assert!(arr.notify(MediaType::Tv, "Skam", "/downloads/tv/Skam").await);

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.requests.len(), 1);
        let (key, body) = &recorded.requests[0];
        assert_eq!(key.as_deref(), Some("sonarr-key"));
        assert_eq!(
            body,
            &json!({"name": "DownloadedEpisodesScan", "path": "/downloads/tv/Skam"})
        );
    }

    #[tokio::test]
    async fn test_radarr_requires_201() {
        let (url, recorded) = spawn_mock_arr(AxumStatus::OK).await;
        let arr = ArrIntegration::new(
            Client::new(),
            ArrEndpoint::default(),
            endpoint(Some(&url), Some("radarr-key")),
        );

        assert!(!arr.notify(MediaType::Movie, "Jul", "/downloads/movies/Jul").await);
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.requests[0].1["name"], "DownloadedMoviesScan");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_failure() {
        let arr = ArrIntegration::new(
            Client::new(),
            endpoint(Some("http://127.0.0.1:9"), Some("key")),
            ArrEndpoint::default(),
        );
        assert!(!arr.notify_sonarr_download("Skam", "/x").await);
    }

    #[tokio::test]
    async fn test_library_lookup() {
        let (url, _) = spawn_mock_arr(AxumStatus::CREATED).await;
        let arr = ArrIntegration::new(
            Client::new(),
            endpoint(Some(&url), Some("k")),
            endpoint(Some(&url), Some("k")),
        );

        assert_eq!(arr.is_tracked(MediaType::Tv, "Bron").await, Some(true));
        assert_eq!(arr.is_tracked(MediaType::Movie, "Jul").await, Some(false));

        let series = arr.get_series("skam").await.unwrap();
        assert_eq!(series["id"], 2);
        let movie = arr.get_movie("AUSTIN").await.unwrap();
        assert_eq!(movie["id"], 3);
        assert!(arr.get_series("Wallander").await.is_none());
    }
}

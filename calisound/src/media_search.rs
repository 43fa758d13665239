//! YouTube/Spotify search proxy.
//!
//! Public clients never talk to the upstream APIs directly; this service
//! holds the API credentials, trims upstream responses down to
//! id/title/thumbnail triples, and caches results for a short TTL. Base URLs
//! are configurable so tests can point them at a local mock server.

use moka::future::Cache;
use serde::Deserialize;
use serde::Serialize;
use std::str::FromStr;
use tracing::instrument;
use utoipa::ToSchema;

use crate::config::SearchConfig;
use crate::errors::{Error, Result};

/// Which upstream to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Youtube,
    Spotify,
}

impl SearchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSource::Youtube => "youtube",
            SearchSource::Spotify => "spotify",
        }
    }
}

impl FromStr for SearchSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "youtube" => Ok(SearchSource::Youtube),
            "spotify" => Ok(SearchSource::Spotify),
            other => Err(Error::BadRequest {
                message: format!("Unknown search source: {other}"),
            }),
        }
    }
}

/// One trimmed search hit.
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
}

pub struct SearchService {
    http: reqwest::Client,
    cache: Cache<String, Vec<SearchHit>>,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(config: SearchConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            http: reqwest::Client::new(),
            cache,
            config,
        }
    }

    /// Search one upstream, serving repeats from the cache.
    #[instrument(skip(self), err)]
    pub async fn search(&self, source: SearchSource, query: &str) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::BadRequest {
                message: "Search query must not be empty".to_string(),
            });
        }

        let cache_key = format!("{}:{query}", source.as_str());
        if let Some(hits) = self.cache.get(&cache_key).await {
            return Ok(hits);
        }

        let hits = match source {
            SearchSource::Youtube => self.search_youtube(query).await?,
            SearchSource::Spotify => self.search_spotify(query).await?,
        };

        self.cache.insert(cache_key, hits.clone()).await;
        Ok(hits)
    }

    async fn search_youtube(&self, query: &str) -> Result<Vec<SearchHit>> {
        let api_key = self.config.youtube_api_key.as_ref().ok_or_else(|| Error::BadRequest {
            message: "YouTube search is not configured".to_string(),
        })?;

        let url = format!("{}/search", self.config.youtube_api_base);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "10"),
                ("q", query),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        if !response.status().is_success() {
            return Err(Error::Internal {
                operation: format!("YouTube search returned {}", response.status()),
            });
        }

        let body: YoutubeSearchResponse = response.json().await.map_err(anyhow::Error::from)?;
        Ok(body
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                Some(SearchHit {
                    id,
                    title: item.snippet.title,
                    thumbnail: item.snippet.thumbnails.default.map(|t| t.url),
                })
            })
            .collect())
    }

    async fn search_spotify(&self, query: &str) -> Result<Vec<SearchHit>> {
        let token = self.config.spotify_token.as_ref().ok_or_else(|| Error::BadRequest {
            message: "Spotify search is not configured".to_string(),
        })?;

        let url = format!("{}/v1/search", self.config.spotify_api_base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("type", "track"), ("limit", "10"), ("q", query)])
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        if !response.status().is_success() {
            return Err(Error::Internal {
                operation: format!("Spotify search returned {}", response.status()),
            });
        }

        let body: SpotifySearchResponse = response.json().await.map_err(anyhow::Error::from)?;
        Ok(body
            .tracks
            .items
            .into_iter()
            .map(|track| SearchHit {
                // Smallest image is listed last
                thumbnail: track.album.images.last().map(|i| i.url.clone()),
                id: track.id,
                title: track.name,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct YoutubeSearchResponse {
    #[serde(default)]
    items: Vec<YoutubeItem>,
}

#[derive(Debug, Deserialize)]
struct YoutubeItem {
    id: YoutubeItemId,
    snippet: YoutubeSnippet,
}

#[derive(Debug, Deserialize)]
struct YoutubeItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YoutubeSnippet {
    title: String,
    #[serde(default)]
    thumbnails: YoutubeThumbnails,
}

#[derive(Debug, Deserialize, Default)]
struct YoutubeThumbnails {
    default: Option<YoutubeThumbnail>,
}

#[derive(Debug, Deserialize)]
struct YoutubeThumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SpotifySearchResponse {
    tracks: SpotifyTracks,
}

#[derive(Debug, Deserialize)]
struct SpotifyTracks {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    album: SpotifyAlbum,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server_uri: &str) -> SearchConfig {
        SearchConfig {
            youtube_api_base: server_uri.to_string(),
            youtube_api_key: Some("yt-key".to_string()),
            spotify_api_base: server_uri.to_string(),
            spotify_token: Some("sp-token".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_youtube_results_are_trimmed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "cali sunset"))
            .and(query_param("key", "yt-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {
                        "id": {"videoId": "abc123"},
                        "snippet": {
                            "title": "Cali Sunset Mix",
                            "thumbnails": {"default": {"url": "https://img.example/abc.jpg"}}
                        }
                    },
                    {
                        "id": {},
                        "snippet": {"title": "Channel result, no video id"}
                    }
                ]
            })))
            .mount(&server)
            .await;

        let service = SearchService::new(config_for(&server.uri()));
        let hits = service.search(SearchSource::Youtube, "cali sunset").await.unwrap();

        assert_eq!(
            hits,
            vec![SearchHit {
                id: "abc123".to_string(),
                title: "Cali Sunset Mix".to_string(),
                thumbnail: Some("https://img.example/abc.jpg".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_spotify_results_use_smallest_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tracks": {
                    "items": [{
                        "id": "track1",
                        "name": "Night Drive",
                        "album": {"images": [
                            {"url": "https://img.example/big.jpg"},
                            {"url": "https://img.example/small.jpg"}
                        ]}
                    }]
                }
            })))
            .mount(&server)
            .await;

        let service = SearchService::new(config_for(&server.uri()));
        let hits = service.search(SearchSource::Spotify, "night drive").await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].thumbnail.as_deref(), Some("https://img.example/small.jpg"));
    }

    #[tokio::test]
    async fn test_results_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let service = SearchService::new(config_for(&server.uri()));
        service.search(SearchSource::Youtube, "query").await.unwrap();
        service.search(SearchSource::Youtube, "query").await.unwrap();
    }

    #[tokio::test]
    async fn test_unconfigured_source_rejected() {
        let service = SearchService::new(SearchConfig::default());
        let result = service.search(SearchSource::Youtube, "query").await;
        assert!(matches!(result.unwrap_err(), Error::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let service = SearchService::new(SearchConfig::default());
        let result = service.search(SearchSource::Youtube, "   ").await;
        assert!(matches!(result.unwrap_err(), Error::BadRequest { .. }));
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!("youtube".parse::<SearchSource>().unwrap(), SearchSource::Youtube);
        assert_eq!("SPOTIFY".parse::<SearchSource>().unwrap(), SearchSource::Spotify);
        assert!("soundcloud".parse::<SearchSource>().is_err());
    }
}

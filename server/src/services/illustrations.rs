//! Illustration widget backend
//!
//! Talks to the illustration app API with a bearer token and proxies images
//! from its CDN, which refuses requests without the right Referer.

use crate::config::{IllustrationSettings, UPSTREAM_TIMEOUT};
use crate::error::{AppError, Result};
use crate::storage::{image_cache, CachedImage, ImageCache};
use axum::body::Bytes;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Illustration {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub image_urls: ImageUrls,
    pub caption: String,
    pub user: Artist,
    pub tags: Vec<Tag>,
    pub width: u32,
    pub height: u32,
    pub is_bookmarked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrls {
    pub square_medium: String,
    pub medium: String,
    pub large: String,
    pub original: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub account: String,
    pub profile_image_urls: ProfileImageUrls,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileImageUrls {
    pub medium: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResponse {
    pub illustrations: Vec<Illustration>,
}

/// Image body returned by the proxy
#[derive(Debug, Clone)]
pub struct ProxiedImage {
    pub bytes: Bytes,
    pub content_type: String,
    pub cache_hit: bool,
}

// Upstream wire format (snake_case)

#[derive(Debug, Deserialize)]
struct UpstreamRanking {
    #[serde(default)]
    illusts: Vec<UpstreamIllust>,
}

#[derive(Debug, Deserialize)]
struct UpstreamIllust {
    id: i64,
    title: String,
    #[serde(rename = "type")]
    kind: String,
    image_urls: UpstreamImageUrls,
    #[serde(default)]
    caption: String,
    user: UpstreamUser,
    #[serde(default)]
    tags: Vec<Tag>,
    width: u32,
    height: u32,
    #[serde(default)]
    is_bookmarked: bool,
    #[serde(default)]
    meta_single_page: Option<UpstreamSinglePage>,
}

#[derive(Debug, Deserialize)]
struct UpstreamImageUrls {
    square_medium: String,
    medium: String,
    large: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamSinglePage {
    original_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamUser {
    id: i64,
    name: String,
    account: String,
    profile_image_urls: UpstreamProfileImageUrls,
}

#[derive(Debug, Deserialize)]
struct UpstreamProfileImageUrls {
    medium: String,
}

impl From<UpstreamIllust> for Illustration {
    fn from(raw: UpstreamIllust) -> Self {
        let original = raw
            .meta_single_page
            .and_then(|page| page.original_image_url)
            .unwrap_or_else(|| raw.image_urls.large.clone());

        Illustration {
            id: raw.id,
            title: raw.title,
            kind: raw.kind,
            image_urls: ImageUrls {
                square_medium: raw.image_urls.square_medium,
                medium: raw.image_urls.medium,
                large: raw.image_urls.large,
                original,
            },
            caption: raw.caption,
            user: Artist {
                id: raw.user.id,
                name: raw.user.name,
                account: raw.user.account,
                profile_image_urls: ProfileImageUrls {
                    medium: raw.user.profile_image_urls.medium,
                },
            },
            tags: raw.tags,
            width: raw.width,
            height: raw.height,
            is_bookmarked: raw.is_bookmarked,
        }
    }
}

/// Client for the illustration API plus the image proxy cache
pub struct IllustrationService {
    http: Client,
    settings: IllustrationSettings,
    cache: ImageCache,
}

impl IllustrationService {
    pub fn new(settings: IllustrationSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .user_agent(concat!("tora/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let cache = image_cache(settings.cache_max_entries, settings.cache_ttl);

        tracing::info!(
            "Illustration integration {}",
            if settings.access_token.is_some() {
                "enabled"
            } else {
                "disabled (no access token)"
            }
        );

        Ok(Self {
            http,
            settings,
            cache,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.settings.access_token.is_some()
    }

    fn token(&self) -> Result<&str> {
        self.settings
            .access_token
            .as_deref()
            .ok_or(AppError::IllustrationUnavailable)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.api_base, path)
    }

    /// Top `limit` illustrations of today's ranking
    pub async fn daily_ranking(&self, limit: usize) -> Result<Vec<Illustration>> {
        let token = self.token()?;
        tracing::debug!("Fetching daily illustration ranking");

        let response = self
            .http
            .get(self.endpoint("/v1/illust/ranking"))
            .query(&[("mode", "day")])
            .bearer_auth(token)
            .send()
            .await?;
        let response = check_status(response, "daily ranking")?;

        let ranking: UpstreamRanking = response.json().await?;
        Ok(ranking
            .illusts
            .into_iter()
            .take(limit)
            .map(Illustration::from)
            .collect())
    }

    pub async fn bookmark(&self, illust_id: i64) -> Result<()> {
        let token = self.token()?;
        let id = illust_id.to_string();

        let response = self
            .http
            .post(self.endpoint("/v2/illust/bookmark/add"))
            .bearer_auth(token)
            .form(&[("illust_id", id.as_str()), ("restrict", "public")])
            .send()
            .await?;
        check_status(response, "bookmark")?;

        tracing::info!("Bookmarked illustration {}", illust_id);
        Ok(())
    }

    pub async fn unbookmark(&self, illust_id: i64) -> Result<()> {
        let token = self.token()?;
        let id = illust_id.to_string();

        let response = self
            .http
            .post(self.endpoint("/v1/illust/bookmark/delete"))
            .bearer_auth(token)
            .form(&[("illust_id", id.as_str())])
            .send()
            .await?;
        check_status(response, "unbookmark")?;

        tracing::info!("Removed bookmark on illustration {}", illust_id);
        Ok(())
    }

    /// Fetch an image from the illustration CDN, serving repeats from cache
    pub async fn proxy_image(&self, url: &str) -> Result<ProxiedImage> {
        let target = self.check_image_url(url)?;

        if let Some(cached) = self.cache.get(target.as_str()).await {
            tracing::debug!("Image cache hit: {}", target);
            return Ok(ProxiedImage {
                bytes: cached.bytes,
                content_type: cached.content_type,
                cache_hit: true,
            });
        }

        tracing::debug!("Image cache miss: {}", target);
        let response = self
            .http
            .get(target.clone())
            .header(REFERER, &self.settings.referer)
            .send()
            .await?;
        let response = check_status(response, "image")?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await?;

        self.cache
            .insert(
                target.to_string(),
                CachedImage::new(bytes.clone(), content_type.clone()),
            )
            .await;

        Ok(ProxiedImage {
            bytes,
            content_type,
            cache_hit: false,
        })
    }

    /// Only https URLs on the illustration CDN are proxied
    fn check_image_url(&self, url: &str) -> Result<Url> {
        let parsed = Url::parse(url).map_err(|_| AppError::invalid("url", "Invalid image URL"))?;

        let suffix = self.settings.image_host_suffix.as_str();
        let allowed = parsed.scheme() == "https"
            && parsed
                .host_str()
                .is_some_and(|host| host == suffix || host.ends_with(&format!(".{suffix}")));

        if allowed {
            Ok(parsed)
        } else {
            Err(AppError::invalid(
                "url",
                format!("Only https images from {suffix} can be proxied"),
            ))
        }
    }
}

fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::warn!("Illustration API {} request failed: {}", what, status);
        Err(AppError::Upstream(format!(
            "Illustration API {what} request failed with status {status}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(token: Option<&str>) -> IllustrationService {
        IllustrationService::new(IllustrationSettings {
            access_token: token.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_maps_upstream_ranking_entry() {
        let raw = r#"{
            "illusts": [{
                "id": 123,
                "title": "Evening",
                "type": "illust",
                "image_urls": {
                    "square_medium": "https://i.pximg.net/sq.jpg",
                    "medium": "https://i.pximg.net/m.jpg",
                    "large": "https://i.pximg.net/l.jpg"
                },
                "caption": "",
                "user": {
                    "id": 9,
                    "name": "Artist",
                    "account": "artist",
                    "profile_image_urls": { "medium": "https://i.pximg.net/u.jpg" }
                },
                "tags": [{ "name": "landscape", "translated_name": null }],
                "width": 1200,
                "height": 800,
                "is_bookmarked": true,
                "meta_single_page": {}
            }]
        }"#;

        let ranking: UpstreamRanking = serde_json::from_str(raw).unwrap();
        let illustration = Illustration::from(ranking.illusts.into_iter().next().unwrap());

        assert_eq!(illustration.id, 123);
        assert_eq!(illustration.image_urls.original, "https://i.pximg.net/l.jpg");
        assert_eq!(illustration.tags, vec![Tag { name: "landscape".into() }]);
        assert!(illustration.is_bookmarked);

        let json = serde_json::to_value(&illustration).unwrap();
        assert_eq!(json["type"], "illust");
        assert_eq!(json["imageUrls"]["squareMedium"], "https://i.pximg.net/sq.jpg");
        assert_eq!(json["user"]["profileImageUrls"]["medium"], "https://i.pximg.net/u.jpg");
    }

    #[tokio::test]
    async fn test_unconfigured_service_is_unavailable() {
        let service = service(None);
        assert!(!service.is_configured());

        assert!(matches!(
            service.daily_ranking(15).await,
            Err(AppError::IllustrationUnavailable)
        ));
        assert!(matches!(
            service.bookmark(1).await,
            Err(AppError::IllustrationUnavailable)
        ));
    }

    #[test]
    fn test_image_url_must_be_on_cdn() {
        let service = service(Some("token"));

        assert!(service
            .check_image_url("https://i.pximg.net/img-original/1.png")
            .is_ok());
        assert!(service.check_image_url("http://i.pximg.net/1.png").is_err());
        assert!(service.check_image_url("https://evilpximg.net/1.png").is_err());
        assert!(service.check_image_url("https://localhost/1.png").is_err());
        assert!(service.check_image_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_cached_image_served_without_network() {
        let service = service(None);
        let url = "https://i.pximg.net/c/1.jpg";
        service
            .cache
            .insert(
                url.to_string(),
                CachedImage::new(Bytes::from_static(b"img"), "image/png"),
            )
            .await;

        let image = service.proxy_image(url).await.unwrap();
        assert!(image.cache_hit);
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.bytes.as_ref(), b"img");
    }
}

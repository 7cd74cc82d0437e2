//! YouTube Data API v3 client: display-name lookup and search.

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::error::LookupError;
use crate::reference::ContentKind;

/// Resolves a human-readable title for an id. Implementations must never
/// block: without a credential they answer `LookupError::Unavailable` at once.
pub trait NameLookup {
  fn lookup_name(&self, id: &str, kind: ContentKind) -> impl Future<Output = Result<String, LookupError>> + Send;
}

/// The kinds of item a search can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
  Video,
  Playlist,
  Channel,
}

impl SearchKind {
  fn from_api(kind: &str) -> Option<Self> {
    match kind {
      "youtube#video" => Some(SearchKind::Video),
      "youtube#playlist" => Some(SearchKind::Playlist),
      "youtube#channel" => Some(SearchKind::Channel),
      _ => None,
    }
  }

  pub fn content_kind(self) -> ContentKind {
    match self {
      SearchKind::Video => ContentKind::Video,
      SearchKind::Playlist => ContentKind::Playlist,
      SearchKind::Channel => ContentKind::Channel,
    }
  }

  pub fn label(self) -> &'static str {
    self.content_kind().label()
  }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
  pub id: String,
  pub title: String,
  pub thumbnail: Option<String>,
  pub kind: SearchKind,
}

// --- Wire types ---

#[derive(Debug, Deserialize, Default)]
struct Thumbnail {
  url: String,
}

#[derive(Debug, Deserialize, Default)]
struct Thumbnails {
  default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
  title: String,
  #[serde(default)]
  thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
struct ListItem {
  snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
  #[serde(default)]
  items: Vec<ListItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
  kind: String,
  video_id: Option<String>,
  playlist_id: Option<String>,
  channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
  id: SearchId,
  snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
  #[serde(default)]
  items: Vec<SearchResult>,
}

fn title_from(response: ListResponse) -> Result<String, LookupError> {
  response
    .items
    .into_iter()
    .next()
    .map(|item| item.snippet.title.trim().to_string())
    .filter(|t| !t.is_empty())
    .ok_or(LookupError::NotFound)
}

fn items_from(response: SearchResponse) -> Vec<SearchItem> {
  response
    .items
    .into_iter()
    .filter_map(|item| {
      let Some(kind) = SearchKind::from_api(&item.id.kind) else {
        warn!(kind = %item.id.kind, "search: skipping result of unknown kind");
        return None;
      };
      let id = match kind {
        SearchKind::Video => item.id.video_id,
        SearchKind::Playlist => item.id.playlist_id,
        SearchKind::Channel => item.id.channel_id,
      };
      let Some(id) = id.filter(|id| !id.is_empty()) else {
        warn!(kind = kind.label(), "search: skipping result without an id");
        return None;
      };
      Some(SearchItem {
        id,
        title: item.snippet.title,
        thumbnail: item.snippet.thumbnails.default.map(|t| t.url),
        kind,
      })
    })
    .collect()
}

#[derive(Clone)]
pub struct YouTubeClient {
  http: Client,
  api_key: Option<String>,
  base_url: String,
}

impl YouTubeClient {
  pub fn new(api_key: Option<String>) -> Self {
    Self {
      http: Client::new(),
      api_key: api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
      base_url: constants().api_base_url.clone(),
    }
  }

  pub fn has_key(&self) -> bool {
    self.api_key.is_some()
  }

  /// Endpoint URL for a title lookup, or `None` without a key.
  fn lookup_url(&self, id: &str, kind: ContentKind) -> Option<Url> {
    let key = self.api_key.as_deref()?;
    let (endpoint, id_param) = match kind {
      ContentKind::Video | ContentKind::Live => ("videos", "id"),
      ContentKind::Playlist => ("playlists", "id"),
      ContentKind::Channel if id.starts_with('@') => ("channels", "forHandle"),
      ContentKind::Channel => ("channels", "id"),
    };
    Url::parse_with_params(&format!("{}/{}", self.base_url, endpoint), [("part", "snippet"), (id_param, id), ("key", key)])
      .ok()
  }

  fn search_url(&self, term: &str) -> Result<Url> {
    let key = self.api_key.as_deref().ok_or_else(|| anyhow!("YouTube API key is not set (use --api-key or YOUTUBE_API_KEY)"))?;
    let max = constants().search_max_results.to_string();
    Url::parse_with_params(
      &format!("{}/search", self.base_url),
      [("part", "snippet"), ("q", term), ("type", "video,playlist,channel"), ("maxResults", max.as_str()), ("key", key)],
    )
    .context("Failed to build search URL")
  }

  pub async fn search(&self, term: &str) -> Result<Vec<SearchItem>> {
    let url = self.search_url(term)?;
    info!(term, "search: querying");
    let response: SearchResponse = self
      .http
      .get(url)
      .send()
      .await
      .context("Failed to reach the YouTube API")?
      .error_for_status()
      .context("YouTube search was rejected")?
      .json()
      .await
      .context("Failed to decode YouTube search response")?;
    let items = items_from(response);
    debug!(term, count = items.len(), "search: results");
    Ok(items)
  }
}

impl NameLookup for YouTubeClient {
  async fn lookup_name(&self, id: &str, kind: ContentKind) -> Result<String, LookupError> {
    let Some(url) = self.lookup_url(id, kind) else {
      return Err(LookupError::Unavailable);
    };
    let response = self
      .http
      .get(url)
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| LookupError::Request(e.to_string()))?;
    let body: ListResponse = response.json().await.map_err(|e| LookupError::Request(e.to_string()))?;
    let title = title_from(body);
    match &title {
      Ok(name) => debug!(id, name = %name, "lookup: title found"),
      Err(_) => info!(id, kind = kind.label(), "lookup: no title"),
    }
    title
  }
}

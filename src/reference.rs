//! Classification of pasted YouTube URLs and bare ids.
//!
//! Every watchable thing in the dashboard is identified by the id extracted
//! here, so two spellings of the same video (`watch?v=`, `youtu.be/`, a bare
//! id) collide on the same registry entry.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Length of a YouTube video id.
const VIDEO_ID_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
  Video,
  Live,
  Playlist,
  Channel,
}

impl ContentKind {
  pub const ALL: [ContentKind; 4] = [ContentKind::Video, ContentKind::Live, ContentKind::Playlist, ContentKind::Channel];

  pub fn label(self) -> &'static str {
    match self {
      ContentKind::Video => "video",
      ContentKind::Live => "live",
      ContentKind::Playlist => "playlist",
      ContentKind::Channel => "channel",
    }
  }

  pub fn from_label(s: &str) -> Option<Self> {
    ContentKind::ALL.into_iter().find(|k| k.label().eq_ignore_ascii_case(s.trim()))
  }

  /// Whether the embedded player can show this kind and it has a live chat.
  pub fn has_chat(self) -> bool {
    matches!(self, ContentKind::Video | ContentKind::Live)
  }
}

/// The outcome of classifying user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
  pub id: String,
  pub kind: ContentKind,
  /// A display name implied by the input itself (the `@handle`).
  pub name: Option<String>,
}

impl ResolvedRef {
  fn new(id: &str, kind: ContentKind) -> Self {
    Self { id: id.to_string(), kind, name: None }
  }
}

fn is_youtube_host(host: &str) -> bool {
  let host = host.to_ascii_lowercase();
  host == "youtube.com" || host.ends_with(".youtube.com") || host == "youtu.be"
}

fn looks_like_video_id(s: &str) -> bool {
  s.len() == VIDEO_ID_LEN && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Classify a pasted URL or bare id.
///
/// Shapes, checked in order:
/// - `/live/<id>` → live
/// - `/playlist?list=<id>` → playlist
/// - `/channel/<id>` → channel
/// - `/@handle` → channel with the lowercased handle as id and the handle as
///   typed as the fallback name
/// - `?v=<id>` → video
/// - `youtu.be/<id>` → video
/// - a bare 11-character token → video
pub fn resolve(input: &str) -> Result<ResolvedRef, GridError> {
  let trimmed = input.trim();
  let invalid = || GridError::InvalidReference(trimmed.to_string());

  if trimmed.is_empty() {
    return Err(invalid());
  }

  if !trimmed.contains('/') && !trimmed.contains('?') {
    return if looks_like_video_id(trimmed) { Ok(ResolvedRef::new(trimmed, ContentKind::Video)) } else { Err(invalid()) };
  }

  // Accept scheme-less pastes like "youtube.com/watch?v=...".
  let url = match Url::parse(trimmed) {
    Ok(url) => url,
    Err(_) => Url::parse(&format!("https://{}", trimmed)).map_err(|_| invalid())?,
  };
  let Some(host) = url.host_str() else { return Err(invalid()) };
  if !is_youtube_host(host) {
    return Err(invalid());
  }

  let segments: Vec<&str> = url.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect()).unwrap_or_default();
  let query = |key: &str| url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned());

  match segments.as_slice() {
    ["live", id, ..] => return Ok(ResolvedRef::new(id, ContentKind::Live)),
    ["playlist", ..] => {
      return match query("list") {
        Some(list) if !list.trim().is_empty() => Ok(ResolvedRef::new(list.trim(), ContentKind::Playlist)),
        _ => Err(invalid()),
      };
    }
    ["channel", id, ..] => return Ok(ResolvedRef::new(id, ContentKind::Channel)),
    [handle, ..] if handle.starts_with('@') && handle.len() > 1 => {
      // Handles are case-insensitive; the typed spelling stays as the name.
      return Ok(ResolvedRef { id: handle.to_lowercase(), kind: ContentKind::Channel, name: Some(handle.to_string()) });
    }
    _ => {}
  }

  if let Some(v) = query("v")
    && !v.trim().is_empty()
  {
    return Ok(ResolvedRef::new(v.trim(), ContentKind::Video));
  }

  if host.eq_ignore_ascii_case("youtu.be")
    && let [id] = segments.as_slice()
  {
    return Ok(ResolvedRef::new(id, ContentKind::Video));
  }

  Err(invalid())
}

/// Canonical URL for an id of the given kind. Used when content arrives from
/// search results rather than a pasted URL.
pub fn watch_url(kind: ContentKind, id: &str) -> String {
  match kind {
    ContentKind::Video => format!("https://www.youtube.com/watch?v={}", id),
    ContentKind::Live => format!("https://www.youtube.com/live/{}", id),
    ContentKind::Playlist => format!("https://www.youtube.com/playlist?list={}", id),
    ContentKind::Channel if id.starts_with('@') => format!("https://www.youtube.com/{}", id),
    ContentKind::Channel => format!("https://www.youtube.com/channel/{}", id),
  }
}

/// Embeddable player URL, or `None` for channels (which cannot be embedded).
pub fn embed_url(kind: ContentKind, id: &str) -> Option<String> {
  match kind {
    ContentKind::Video | ContentKind::Live => Some(format!("https://www.youtube.com/embed/{}", id)),
    ContentKind::Playlist => Some(format!("https://www.youtube.com/embed/videoseries?list={}", id)),
    ContentKind::Channel => None,
  }
}

/// Live chat popout URL for videos and live streams.
pub fn chat_url(kind: ContentKind, id: &str, embed_domain: &str) -> Option<String> {
  kind.has_chat().then(|| format!("https://www.youtube.com/live_chat?v={}&embed_domain={}", id, embed_domain))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ok(input: &str) -> ResolvedRef {
    resolve(input).unwrap_or_else(|e| panic!("{input}: {e}"))
  }

  // --- resolve ---

  #[test]
  fn watch_url_is_video() {
    let r = ok("https://www.youtube.com/watch?v=abcDEF12345");
    assert_eq!(r, ResolvedRef::new("abcDEF12345", ContentKind::Video));
  }

  #[test]
  fn watch_url_with_extra_params() {
    let r = ok("https://youtube.com/watch?feature=share&v=abcDEF12345&t=42");
    assert_eq!(r.id, "abcDEF12345");
    assert_eq!(r.kind, ContentKind::Video);
  }

  #[test]
  fn live_path_is_live() {
    let r = ok("https://www.youtube.com/live/jfKfPfyJRdk?si=xyz");
    assert_eq!(r, ResolvedRef::new("jfKfPfyJRdk", ContentKind::Live));
  }

  #[test]
  fn playlist_requires_list_param() {
    let r = ok("https://www.youtube.com/playlist?list=PL1234567890");
    assert_eq!(r, ResolvedRef::new("PL1234567890", ContentKind::Playlist));
    assert!(matches!(resolve("https://www.youtube.com/playlist"), Err(GridError::InvalidReference(_))));
  }

  #[test]
  fn channel_path_is_channel() {
    let r = ok("https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv");
    assert_eq!(r, ResolvedRef::new("UCabcdefghijklmnopqrstuv", ContentKind::Channel));
  }

  #[test]
  fn handle_is_channel_with_fallback_name() {
    let r = ok("https://www.youtube.com/@TwoSetViolin/videos");
    assert_eq!(r.id, "@twosetviolin");
    assert_eq!(r.kind, ContentKind::Channel);
    assert_eq!(r.name.as_deref(), Some("@TwoSetViolin"));
  }

  #[test]
  fn short_link_is_video() {
    let r = ok("https://youtu.be/abcDEF12345?t=10");
    assert_eq!(r, ResolvedRef::new("abcDEF12345", ContentKind::Video));
  }

  #[test]
  fn bare_id_is_video() {
    assert_eq!(ok("  abcDEF-_345 ").id, "abcDEF-_345");
  }

  #[test]
  fn scheme_less_url_is_accepted() {
    assert_eq!(ok("www.youtube.com/watch?v=abcDEF12345").id, "abcDEF12345");
  }

  #[test]
  fn rejects_unrecognized_shapes() {
    for input in ["", "   ", "short", "abcDEF123456", "https://vimeo.com/watch?v=abcDEF12345", "https://www.youtube.com/"] {
      assert!(matches!(resolve(input), Err(GridError::InvalidReference(_))), "accepted {input:?}");
    }
  }

  // --- URL builders ---

  #[test]
  fn watch_url_round_trips_through_resolve() {
    for kind in ContentKind::ALL {
      let id = match kind {
        ContentKind::Channel => "UCabcdefghijklmnopqrstuv",
        ContentKind::Playlist => "PL1234567890",
        _ => "abcDEF12345",
      };
      let r = ok(&watch_url(kind, id));
      assert_eq!((r.id.as_str(), r.kind), (id, kind));
    }
  }

  #[test]
  fn channels_have_no_embed_or_chat() {
    assert!(embed_url(ContentKind::Channel, "UCx").is_none());
    assert!(chat_url(ContentKind::Channel, "UCx", "localhost").is_none());
    assert!(chat_url(ContentKind::Playlist, "PLx", "localhost").is_none());
    assert_eq!(
      chat_url(ContentKind::Live, "abcDEF12345", "localhost").as_deref(),
      Some("https://www.youtube.com/live_chat?v=abcDEF12345&embed_domain=localhost")
    );
  }

  #[test]
  fn kind_labels_parse_case_insensitively() {
    assert_eq!(ContentKind::from_label("LIVE"), Some(ContentKind::Live));
    assert_eq!(ContentKind::from_label("podcast"), None);
  }
}

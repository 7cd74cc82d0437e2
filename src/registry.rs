use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::{GridError, LookupError};
use crate::reference::{self, ContentKind};

/// A saved watchable item. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
  pub id: String,
  /// The input the channel was added from.
  pub url: String,
  pub name: String,
  #[serde(rename = "type")]
  pub kind: ContentKind,
}

/// Input to `ContentRegistry::add`.
#[derive(Debug, Clone, Default)]
pub struct NewChannel {
  pub url: String,
  pub name: Option<String>,
  /// Overrides the kind inferred from `url`.
  pub kind: Option<ContentKind>,
}

impl NewChannel {
  #[cfg(test)]
  pub fn from_url(url: impl Into<String>) -> Self {
    Self { url: url.into(), ..Self::default() }
  }
}

/// Non-identity fields to change in place.
#[derive(Debug, Clone, Default)]
pub struct ChannelPatch {
  pub url: Option<String>,
  pub name: Option<String>,
  pub kind: Option<ContentKind>,
}

/// A display-name lookup to run for a freshly reserved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRequest {
  pub id: String,
  pub kind: ContentKind,
}

/// The result of a successful `add`: the committed entry, and the lookup to
/// run when no name was supplied.
#[derive(Debug, Clone)]
pub struct Reservation {
  pub channel: Channel,
  pub lookup: Option<NameRequest>,
}

/// Whatever holds references to channel ids and must drop them when a
/// channel is removed.
pub trait CascadeClear {
  /// Null every reference to `content_id`; returns how many were cleared.
  fn clear_content_everywhere(&mut self, content_id: &str) -> usize;
}

fn clean_name(name: Option<String>) -> Option<String> {
  name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

#[derive(Debug, Default)]
pub struct ContentRegistry {
  channels: Vec<Channel>,
  /// Ids committed with a placeholder name whose lookup has not landed yet.
  pending: HashSet<String>,
}

impl ContentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Rebuild from persisted channels, keeping the first entry per id.
  pub fn from_channels(channels: Vec<Channel>) -> Self {
    let mut seen = HashSet::new();
    let total = channels.len();
    let channels: Vec<Channel> = channels.into_iter().filter(|c| seen.insert(c.id.clone())).collect();
    if channels.len() != total {
      warn!(dropped = total - channels.len(), "registry: dropped duplicate persisted channels");
    }
    Self { channels, pending: HashSet::new() }
  }

  pub fn channels(&self) -> &[Channel] {
    &self.channels
  }

  pub fn get(&self, id: &str) -> Option<&Channel> {
    self.channels.iter().find(|c| c.id == id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.get(id).is_some()
  }

  pub fn len(&self) -> usize {
    self.channels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.channels.is_empty()
  }

  pub fn is_pending(&self, id: &str) -> bool {
    self.pending.contains(id)
  }

  /// Resolve and commit a new channel.
  ///
  /// The entry is inserted immediately under a placeholder name (the supplied
  /// name, else the handle, else the id), so a second add of the same id
  /// always fails with `DuplicateReference` no matter when lookups finish.
  /// When no name was supplied the id stays pending until
  /// `apply_resolved_name` is called.
  pub fn add(&mut self, new: NewChannel) -> Result<Reservation, GridError> {
    let resolved = reference::resolve(&new.url)?;
    if self.contains(&resolved.id) {
      info!(id = %resolved.id, "registry: duplicate rejected");
      return Err(GridError::DuplicateReference(resolved.id));
    }

    let kind = new.kind.unwrap_or(resolved.kind);
    let supplied = clean_name(new.name);
    let needs_lookup = supplied.is_none();
    let name = supplied.or(resolved.name).unwrap_or_else(|| resolved.id.clone());

    let channel = Channel { id: resolved.id, url: new.url.trim().to_string(), name, kind };
    let lookup = needs_lookup.then(|| NameRequest { id: channel.id.clone(), kind });
    if needs_lookup {
      self.pending.insert(channel.id.clone());
    }
    info!(id = %channel.id, kind = kind.label(), pending = needs_lookup, "registry: added");
    self.channels.push(channel.clone());
    Ok(Reservation { channel, lookup })
  }

  /// Patch in the outcome of a name lookup. A result for an id that is no
  /// longer pending (removed, or renamed in the meantime) is ignored.
  /// Returns whether the name changed.
  pub fn apply_resolved_name(&mut self, id: &str, result: Result<String, LookupError>) -> bool {
    if !self.pending.remove(id) {
      debug!(id, "registry: stale name lookup ignored");
      return false;
    }
    match result.map(|n| clean_name(Some(n))) {
      Ok(Some(name)) => match self.channels.iter_mut().find(|c| c.id == id) {
        Some(channel) => {
          info!(id, name = %name, "registry: name resolved");
          channel.name = name;
          true
        }
        None => false,
      },
      Ok(None) => false,
      Err(e) => {
        debug!(id, err = %e, "registry: keeping fallback name");
        false
      }
    }
  }

  /// Delete a channel, clearing every grid reference to it first.
  pub fn remove(&mut self, id: &str, cascade: &mut impl CascadeClear) -> Option<Channel> {
    let idx = self.channels.iter().position(|c| c.id == id)?;
    let cleared = cascade.clear_content_everywhere(id);
    self.pending.remove(id);
    let channel = self.channels.remove(idx);
    info!(id, cleared, "registry: removed");
    Some(channel)
  }

  pub fn rename(&mut self, id: &str, name: &str) -> Result<&Channel, GridError> {
    self.update(id, ChannelPatch { name: Some(name.to_string()), ..ChannelPatch::default() })
  }

  /// Change non-identity fields. Setting a name cancels a pending lookup.
  pub fn update(&mut self, id: &str, patch: ChannelPatch) -> Result<&Channel, GridError> {
    let channel =
      self.channels.iter_mut().find(|c| c.id == id).ok_or_else(|| GridError::UnknownChannel(id.to_string()))?;
    if let Some(url) = patch.url {
      channel.url = url;
    }
    if let Some(name) = clean_name(patch.name) {
      channel.name = name;
      self.pending.remove(id);
    }
    if let Some(kind) = patch.kind {
      channel.kind = kind;
    }
    debug!(id, "registry: updated");
    Ok(channel)
  }
}

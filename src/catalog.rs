use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::path::{Component, Path};
use std::sync::Arc;

/// How a catalog entry is delivered to the client
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    /// HLS manifest read from the media directory
    Manifest,
    /// Third-party player URL, answered with a redirect
    ExternalEmbed,
}

/// Catalog entry as it appears in the config file
///
/// ```toml
/// [videos.sample1]
/// kind = "manifest"
/// location = "sample1/master.m3u8"
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub kind: VideoKind,
    pub location: String,
}

impl VideoEntry {
    pub fn validate(&self, id: &str) -> anyhow::Result<()> {
        if self.location.is_empty() {
            anyhow::bail!("videos[{id}]: location cannot be empty");
        }

        match self.kind {
            VideoKind::Manifest => {
                let path = Path::new(&self.location);
                let escapes = path
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
                if escapes {
                    anyhow::bail!(
                        "videos[{id}]: manifest location must be a relative path inside the media directory"
                    );
                }
            }
            VideoKind::ExternalEmbed => {
                if !self.location.starts_with("http://") && !self.location.starts_with("https://")
                {
                    anyhow::bail!(
                        "videos[{id}]: external embed location must start with http:// or https://"
                    );
                }
                if axum::http::HeaderValue::from_str(&self.location).is_err() {
                    anyhow::bail!("videos[{id}]: external embed location is not a valid URL");
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VideoDescriptor {
    pub id: String,
    pub kind: VideoKind,
    pub location: String,
}

/// Read-only lookup from resource id to its descriptor
pub trait VideoRegistry: Debug + Send + Sync + 'static {
    fn get(&self, id: &str) -> Option<VideoDescriptor>;

    fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

pub type SharedRegistry = Arc<dyn VideoRegistry>;

/// Catalog fixed at startup
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    videos: HashMap<String, VideoDescriptor>,
}

impl StaticCatalog {
    pub fn from_entries(entries: &BTreeMap<String, VideoEntry>) -> Self {
        let videos = entries
            .iter()
            .map(|(id, entry)| {
                let descriptor = VideoDescriptor {
                    id: id.clone(),
                    kind: entry.kind,
                    location: entry.location.clone(),
                };
                (id.clone(), descriptor)
            })
            .collect();

        Self { videos }
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

impl VideoRegistry for StaticCatalog {
    fn get(&self, id: &str) -> Option<VideoDescriptor> {
        self.videos.get(id).cloned()
    }
}

/// Entries served when the config file does not list any
pub fn default_videos() -> BTreeMap<String, VideoEntry> {
    BTreeMap::from([
        (
            "sample1".to_string(),
            VideoEntry {
                kind: VideoKind::Manifest,
                location: "sample1/master.m3u8".to_string(),
            },
        ),
        (
            "yt1".to_string(),
            VideoEntry {
                kind: VideoKind::ExternalEmbed,
                location: "https://www.youtube.com/embed/dQw4w9WgXcQ".to_string(),
            },
        ),
    ])
}

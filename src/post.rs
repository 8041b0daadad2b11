use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
}

impl MediaItem {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            media_type: MediaType::Image,
            url: url.into(),
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self {
            media_type: MediaType::Video,
            url: url.into(),
        }
    }
}

/// A feed post as supplied by the data layer. Read-only to the card.
///
/// Upstream guarantees at most one media field is populated; the resolver
/// still checks them in a fixed order and takes the first non-empty one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub media_items: Vec<MediaItem>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub video_urls: Vec<String>,
    #[serde(default)]
    pub embed_urls: Vec<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

impl Post {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: String::new(),
            content: String::new(),
            created_at: epoch(),
            is_liked: false,
            is_bookmarked: false,
            likes: 0,
            comments_count: 0,
            media_items: Vec::new(),
            image_urls: Vec::new(),
            video_urls: Vec::new(),
            embed_urls: Vec::new(),
            embed_url: None,
            video_url: None,
            image_url: None,
        }
    }

    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        let elapsed = now.signed_duration_since(self.created_at);
        if elapsed.num_seconds() < 60 {
            "just now".to_string()
        } else if elapsed.num_minutes() < 60 {
            format!("{}m", elapsed.num_minutes())
        } else if elapsed.num_hours() < 24 {
            format!("{}h", elapsed.num_hours())
        } else {
            format!("{}d", elapsed.num_days())
        }
    }
}

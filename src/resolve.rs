use std::fmt;

use url::Url;

use crate::post::{MediaItem, MediaType, Post};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Image,
    Video,
    Embed,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Image => "image",
            PageKind::Video => "video",
            PageKind::Embed => "embed",
        }
    }

    /// Pages that hold a player (and so a decoder) while mounted.
    pub fn is_playable(&self) -> bool {
        matches!(self, PageKind::Video | PageKind::Embed)
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MediaType> for PageKind {
    fn from(value: MediaType) -> Self {
        match value {
            MediaType::Image => PageKind::Image,
            MediaType::Video => PageKind::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    pub index: usize,
    pub kind: PageKind,
    pub url: String,
}

impl PageDescriptor {
    /// Stable cache key: kind plus position, never the URL (URLs may repeat).
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.index)
    }
}

/// The media layout of a post, resolved once with a fixed priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaShape<'a> {
    MixedItems(Vec<&'a MediaItem>),
    MultiVideo(Vec<&'a str>),
    MultiImage(Vec<&'a str>),
    MultiEmbed(Vec<&'a str>),
    SingleEmbed(&'a str),
    SingleVideo(&'a str),
    SingleImage(&'a str),
    None,
}

impl<'a> MediaShape<'a> {
    pub fn of(post: &'a Post) -> Self {
        let items: Vec<&MediaItem> = post
            .media_items
            .iter()
            .filter(|item| !item.url.trim().is_empty())
            .collect();
        if !items.is_empty() {
            return MediaShape::MixedItems(items);
        }
        if let Some(urls) = non_blank(&post.video_urls) {
            return MediaShape::MultiVideo(urls);
        }
        if let Some(urls) = non_blank(&post.image_urls) {
            return MediaShape::MultiImage(urls);
        }
        if let Some(urls) = non_blank(&post.embed_urls) {
            return MediaShape::MultiEmbed(urls);
        }
        if let Some(url) = single(&post.embed_url) {
            return MediaShape::SingleEmbed(url);
        }
        if let Some(url) = single(&post.video_url) {
            return MediaShape::SingleVideo(url);
        }
        if let Some(url) = single(&post.image_url) {
            return MediaShape::SingleImage(url);
        }
        MediaShape::None
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaShape::MixedItems(_) => "mixed",
            MediaShape::MultiVideo(_) => "multi-video",
            MediaShape::MultiImage(_) => "multi-image",
            MediaShape::MultiEmbed(_) => "multi-embed",
            MediaShape::SingleEmbed(_) => "embed",
            MediaShape::SingleVideo(_) => "video",
            MediaShape::SingleImage(_) => "image",
            MediaShape::None => "text",
        }
    }

    pub fn pages(&self) -> Vec<PageDescriptor> {
        match self {
            MediaShape::MixedItems(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| page(index, item.media_type.into(), &item.url))
                .collect(),
            MediaShape::MultiVideo(urls) => pages_of(PageKind::Video, urls),
            MediaShape::MultiImage(urls) => pages_of(PageKind::Image, urls),
            MediaShape::MultiEmbed(urls) => pages_of(PageKind::Embed, urls),
            MediaShape::SingleEmbed(url) => vec![page(0, PageKind::Embed, url)],
            MediaShape::SingleVideo(url) => vec![page(0, PageKind::Video, url)],
            MediaShape::SingleImage(url) => vec![page(0, PageKind::Image, url)],
            MediaShape::None => Vec::new(),
        }
    }
}

pub fn resolve(post: &Post) -> Vec<PageDescriptor> {
    MediaShape::of(post).pages()
}

fn non_blank(urls: &[String]) -> Option<Vec<&str>> {
    let kept: Vec<&str> = urls
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

fn single(url: &Option<String>) -> Option<&str> {
    url.as_deref().map(str::trim).filter(|url| !url.is_empty())
}

fn page(index: usize, kind: PageKind, url: &str) -> PageDescriptor {
    PageDescriptor {
        index,
        kind,
        url: url.trim().to_string(),
    }
}

fn pages_of(kind: PageKind, urls: &[&str]) -> Vec<PageDescriptor> {
    urls.iter()
        .enumerate()
        .map(|(index, url)| page(index, kind, url))
        .collect()
}

/// What an embed page hands to its player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedTarget {
    YouTube { video_id: String },
    Raw(String),
}

impl EmbedTarget {
    pub fn of(raw: &str) -> Self {
        youtube_id(raw)
            .map(|video_id| EmbedTarget::YouTube { video_id })
            .unwrap_or_else(|| EmbedTarget::Raw(raw.trim().to_string()))
    }
}

fn youtube_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let id = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") | Some("shorts") | Some("live") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;
    if id.is_empty()
        || !id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return None;
    }
    Some(id)
}

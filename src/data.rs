use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};

use crate::debug::debug_log;
use crate::post::{MediaItem, Post};

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("unsupported feed file extension: {0}")]
    UnsupportedExtension(String),
}

/// Supplies the posts a feed renders. Paging and refresh live behind this.
pub trait FeedSource: Send + Sync {
    fn load_posts(&self) -> Result<Vec<Post>>;
    fn describe(&self) -> String;
}

pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FileFeedSource {
    fn load_posts(&self) -> Result<Vec<Post>> {
        let posts = dedupe_posts(read_posts(&self.path)?);
        debug_log(format!(
            "data: loaded {} posts from {}",
            posts.len(),
            self.path.display()
        ));
        Ok(posts)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

pub fn read_posts(path: &Path) -> Result<Vec<Post>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed file at {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let posts: Vec<Post> = match extension.as_str() {
        "json" => serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse feed file at {}", path.display()))?,
        "yaml" | "yml" => serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse feed file at {}", path.display()))?,
        other => return Err(FeedError::UnsupportedExtension(other.to_string()).into()),
    };
    Ok(posts)
}

/// Keeps the first post for each id. Cards, layout reports and media events
/// are all keyed by post id, so a repeated id would alias two cards.
pub fn dedupe_posts(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| {
            let fresh = seen.insert(post.id.clone());
            if !fresh {
                debug_log(format!("data: dropping repeated post id {}", post.id));
            }
            fresh
        })
        .collect()
}

#[derive(Default)]
pub struct SampleFeedSource;

impl FeedSource for SampleFeedSource {
    fn load_posts(&self) -> Result<Vec<Post>> {
        Ok(sample_posts())
    }

    fn describe(&self) -> String {
        "built-in sample feed".to_string()
    }
}

/// One post of every media shape, plus a text-only post and a couple of
/// media URLs that fail to load.
pub fn sample_posts() -> Vec<Post> {
    let now = Utc::now();
    let mut posts = Vec::new();

    let mut reunion = post("reunion", "alumni-office", "Reunion weekend highlights", now, 2);
    reunion.media_items = vec![
        MediaItem::image("https://cdn.example.com/reunion/quad.jpg#1600x1067"),
        MediaItem::video("https://cdn.example.com/reunion/toast.mp4#1280x720"),
        MediaItem::image("https://cdn.example.com/reunion/banner.jpg#1080x1350"),
    ];
    reunion.likes = 128;
    reunion.comments_count = 14;
    posts.push(reunion);

    let mut keynote = post("keynote", "events", "Keynote replay", now, 5);
    keynote.video_url = Some("https://cdn.example.com/keynote/full.mp4#1920x1080".into());
    keynote.likes = 56;
    posts.push(keynote);

    let mut gallery = post("gallery", "photo-club", "Campus in the fall", now, 9);
    gallery.image_urls = vec![
        "https://cdn.example.com/fall/1.jpg#1080x1080".into(),
        "https://cdn.example.com/fall/2.jpg#1080x1350".into(),
        "https://cdn.example.com/fall/3.jpg#1350x1080".into(),
        "https://cdn.example.com/fall/4.jpg#1080x1080".into(),
    ];
    gallery.is_liked = true;
    gallery.likes = 301;
    posts.push(gallery);

    let mut clips = post("clips", "athletics", "Game day clips", now, 20);
    clips.video_urls = vec![
        "https://cdn.example.com/game/kickoff.mp4#720x1280".into(),
        "https://cdn.example.com/game/corrupt-goal.mp4".into(),
        "https://cdn.example.com/game/crowd.mp4#1280x720".into(),
    ];
    clips.comments_count = 7;
    posts.push(clips);

    let mut note = post("note", "class-of-2009", "Dues are open for this year. No media here.", now, 30);
    note.is_bookmarked = true;
    posts.push(note);

    let mut talk = post("talk", "lecture-series", "Guest lecture on YouTube", now, 48);
    talk.embed_url = Some("https://www.youtube.com/watch?v=aqz-KE-bpKQ".into());
    posts.push(talk);

    let mut playlist = post("playlist", "lecture-series", "Lecture playlist", now, 60);
    playlist.embed_urls = vec![
        "https://youtu.be/aqz-KE-bpKQ".into(),
        "https://www.youtube.com/embed/ScMzIvxBSi4".into(),
    ];
    posts.push(playlist);

    let mut broken = post("broken", "alumni-office", "Photo from the gala", now, 72);
    broken.image_url = Some("https://cdn.unreachable.invalid/gala.jpg".into());
    posts.push(broken);

    posts
}

fn post(id: &str, author: &str, content: &str, now: chrono::DateTime<Utc>, hours_ago: i64) -> Post {
    let mut post = Post::new(id);
    post.author = author.to_string();
    post.content = content.to_string();
    post.created_at = now - Duration::hours(hours_ago);
    post
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{resolve, MediaShape};
    use tempfile::tempdir;

    #[test]
    fn sample_feed_covers_every_shape() {
        let posts = sample_posts();
        let labels: Vec<&str> = posts.iter().map(|p| MediaShape::of(p).label()).collect();
        for expected in [
            "mixed",
            "video",
            "multi-image",
            "multi-video",
            "text",
            "embed",
            "multi-embed",
            "image",
        ] {
            assert!(labels.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn reads_json_and_yaml_feeds() {
        let dir = tempdir().unwrap();
        let json = dir.path().join("feed.json");
        fs::write(
            &json,
            r#"[{"id":"a","image_urls":["https://x.test/1.jpg","https://x.test/2.jpg"]}]"#,
        )
        .unwrap();
        let posts = FileFeedSource::new(&json).load_posts().unwrap();
        assert_eq!(resolve(&posts[0]).len(), 2);

        let yaml = dir.path().join("feed.yaml");
        fs::write(
            &yaml,
            "- id: b\n  likes: 3\n  media_items:\n    - type: video\n      url: https://x.test/v.mp4\n",
        )
        .unwrap();
        let posts = read_posts(&yaml).unwrap();
        assert_eq!(posts[0].likes, 3);
        assert_eq!(posts[0].media_items.len(), 1);
    }

    #[test]
    fn repeated_ids_keep_the_first_post() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(
            &path,
            r#"[{"id":"a","likes":1},{"id":"b"},{"id":"a","likes":2}]"#,
        )
        .unwrap();
        let posts = FileFeedSource::new(&path).load_posts().unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(posts[0].likes, 1);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feed.toml");
        fs::write(&path, "").unwrap();
        let err = read_posts(&path).unwrap_err();
        assert!(err.downcast_ref::<FeedError>().is_some());
    }
}

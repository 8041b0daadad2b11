use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::card::{Card, CardProps};
use crate::config;
use crate::data::{FeedSource, FileFeedSource, SampleFeedSource};
use crate::debug::debug_log;
use crate::guard::{DecoderBudget, Mount, PlaceholderReason};
use crate::media;
use crate::post::Post;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub feed_path: Option<PathBuf>,
    pub dump: bool,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let feed_path = opts.feed_path.or_else(|| cfg.feed.feed_path.clone());
    let source: Box<dyn FeedSource> = match feed_path {
        Some(path) => Box::new(FileFeedSource::new(path)),
        None => Box::new(SampleFeedSource),
    };
    let posts = source
        .load_posts()
        .with_context(|| format!("load feed from {}", source.describe()))?;

    let budget = cfg.player.decoder_budget.resolve();
    debug_log(format!(
        "app: {} posts, budget {}, config {}",
        posts.len(),
        budget.as_str(),
        display_path
    ));

    if opts.dump {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        return dump(&posts, budget, &mut out);
    }

    let media_cfg = media::Config {
        load_delay: cfg.media.load_delay,
        workers: cfg.media.workers,
    };
    let media_host = media::Host::new(media_cfg).context("start media host")?;

    let options = ui::Options {
        posts,
        budget,
        visibility_threshold: cfg.feed.visibility_threshold,
        page_width: cfg.ui.page_width,
        tick_rate: cfg.ui.tick_rate,
        media_host: Some(media_host),
        source_label: source.describe(),
    };

    let mut model = ui::Model::new(options);
    model.run()?;

    Ok(())
}

/// Prints how each post resolves and mounts when it is the focused, visible
/// card sitting on its first page.
pub fn dump(posts: &[Post], budget: DecoderBudget, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "budget: {}", budget.as_str())?;
    for post in posts {
        let mut card = Card::new(post, budget);
        let props = CardProps {
            post,
            is_visible: true,
            is_muted: false,
            is_screen_focused: true,
        };
        let view = card.render(props).view();
        writeln!(
            out,
            "{} ({}, {} pages)",
            post.id,
            view.shape,
            view.pages.len()
        )?;
        for page in &view.pages {
            writeln!(
                out,
                "  [{}] {} {} -> {}",
                page.descriptor.index,
                page.descriptor.kind,
                page.descriptor.url,
                mount_label(page.mount)
            )?;
        }
    }
    Ok(())
}

fn mount_label(mount: Mount) -> &'static str {
    match mount {
        Mount::Static => "static",
        Mount::Live {
            playing: true,
            muted: false,
        } => "live playing",
        Mount::Live {
            playing: true,
            muted: true,
        } => "live playing muted",
        Mount::Live { playing: false, .. } => "live paused",
        Mount::Placeholder(PlaceholderReason::Ineligible) => "placeholder (ineligible)",
        Mount::Placeholder(PlaceholderReason::Failed) => "placeholder (failed)",
    }
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/feedcard/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::MediaItem;

    #[test]
    fn dump_lists_pages_and_mounts() {
        let mut post = Post::new("mixed");
        post.media_items = vec![
            MediaItem::image("https://cdn.test/a.jpg"),
            MediaItem::video("https://cdn.test/b.mp4"),
        ];
        let mut buf = Vec::new();
        dump(&[post, Post::new("plain")], DecoderBudget::Constrained, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("budget: constrained"));
        assert!(text.contains("mixed (mixed, 2 pages)"));
        assert!(text.contains("  [0] image https://cdn.test/a.jpg -> static"));
        assert!(text.contains("  [1] video https://cdn.test/b.mp4 -> placeholder (ineligible)"));
        assert!(text.contains("plain (text, 0 pages)"));
    }

    #[test]
    fn unconstrained_budget_keeps_paused_decoders() {
        let mut post = Post::new("clips");
        post.video_urls = vec![
            "https://cdn.test/1.mp4".into(),
            "https://cdn.test/2.mp4".into(),
        ];
        let mut buf = Vec::new();
        dump(&[post], DecoderBudget::Unconstrained, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("[0] video https://cdn.test/1.mp4 -> live playing"));
        assert!(text.contains("[1] video https://cdn.test/2.mp4 -> live paused"));
    }

    #[test]
    fn friendly_path_falls_back() {
        assert_eq!(friendly_path(None), "~/.config/feedcard/config.yaml");
    }
}

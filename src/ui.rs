use std::collections::HashMap;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::card::{Card, CardActions, CardProps, CardView, PageView};
use crate::data::dedupe_posts;
use crate::debug::debug_log;
use crate::feed::LayoutRegistry;
use crate::guard::{DecoderBudget, Mount, PlaceholderReason};
use crate::media;
use crate::post::Post;
use crate::resolve::{EmbedTarget, PageDescriptor, PageKind};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_MEDIA_BG: Color = Color::Rgb(17, 17, 27);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const CONTENT_ROWS: usize = 2;
const CHROME_ROWS: usize = CONTENT_ROWS + 3;
const MIN_MEDIA_ROWS: usize = 4;
const MAX_MEDIA_ROWS: usize = 14;
const DEFAULT_VIEW_WIDTH: u16 = 80;

pub struct Options {
    pub posts: Vec<Post>,
    pub budget: DecoderBudget,
    pub visibility_threshold: f64,
    pub page_width: f64,
    pub tick_rate: Duration,
    pub media_host: Option<media::Host>,
    pub source_label: String,
}

/// Interaction callbacks collected during a key press and applied to the
/// feed afterwards. Persistence is out of scope here; toggles are local.
#[derive(Default)]
struct PendingActions {
    likes: Vec<String>,
    bookmarks: Vec<String>,
    shares: Vec<String>,
}

impl CardActions for PendingActions {
    fn on_like_toggle(&mut self, post_id: &str) {
        self.likes.push(post_id.to_string());
    }

    fn on_bookmark_toggle(&mut self, post_id: &str) {
        self.bookmarks.push(post_id.to_string());
    }

    fn on_share_press(&mut self, post: &Post) {
        self.shares.push(post.id.clone());
    }
}

pub struct Model {
    posts: Vec<Post>,
    cards: Vec<Card>,
    layouts: LayoutRegistry,
    drag_offsets: HashMap<String, f64>,
    visible: Option<String>,
    scroll_y: usize,
    view_height: u16,
    view_width: u16,
    muted: bool,
    screen_focused: bool,
    budget: DecoderBudget,
    visibility_threshold: f64,
    page_width: f64,
    tick_rate: Duration,
    media_host: Option<media::Host>,
    status_message: String,
    fresh_renders: u64,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let posts = dedupe_posts(opts.posts);
        let cards = posts
            .iter()
            .map(|post| Card::new(post, opts.budget))
            .collect();
        let status_message = format!(
            "Loaded {} posts from {}.",
            posts.len(),
            opts.source_label
        );
        let mut model = Self {
            posts,
            cards,
            layouts: LayoutRegistry::new(),
            drag_offsets: HashMap::new(),
            visible: None,
            scroll_y: 0,
            view_height: 0,
            view_width: DEFAULT_VIEW_WIDTH,
            muted: false,
            screen_focused: true,
            budget: opts.budget,
            visibility_threshold: opts.visibility_threshold,
            page_width: opts.page_width,
            tick_rate: opts.tick_rate,
            media_host: opts.media_host,
            status_message,
            fresh_renders: 0,
            needs_redraw: true,
        };
        model.sync_cards();
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.poll_media() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                let size = terminal.size()?;
                // Status bar and footer take one row each.
                self.view_width = size.width.max(1);
                self.view_height = size.height.saturating_sub(2);
                self.sync_cards();
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code) {
                            break;
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn poll_media(&mut self) -> bool {
        let Some(host) = self.media_host.as_ref() else {
            return false;
        };
        let mut changed = false;
        for delivery in host.drain() {
            if let Some(card) = self
                .cards
                .iter_mut()
                .find(|card| card.post_id() == delivery.post_id)
            {
                changed |= card.handle_media_event(
                    &delivery.post_id,
                    delivery.page_index,
                    delivery.generation,
                    delivery.event,
                );
            }
        }
        changed
    }

    /// Lays cards out, reports geometry, picks the visible card and renders
    /// every card against the current signals. Cards whose inputs did not
    /// change come back cached.
    fn sync_cards(&mut self) {
        let width = self.view_width.max(1) as usize;
        let mut offset = 0usize;
        for card in self.cards.iter_mut() {
            let height = card_height(card, width);
            card.report_layout(offset as f64, height as f64, &mut self.layouts);
            offset += height;
        }

        let viewport = self.view_height.max(1) as f64;
        self.visible = self
            .layouts
            .most_visible(self.scroll_y as f64, viewport, self.visibility_threshold)
            .map(str::to_string);

        let mut mounts = Vec::new();
        for (card, post) in self.cards.iter_mut().zip(self.posts.iter()) {
            let props = CardProps {
                post,
                is_visible: self.visible.as_deref() == Some(post.id.as_str()),
                is_muted: self.muted,
                is_screen_focused: self.screen_focused,
            };
            if card.render(props).is_fresh() {
                self.fresh_renders += 1;
            }
            mounts.extend(card.take_mount_requests());
        }
        if let Some(host) = self.media_host.as_ref() {
            for request in mounts {
                host.mount(request);
            }
        }
    }

    fn total_height(&self) -> usize {
        let width = self.view_width.max(1) as usize;
        self.cards.iter().map(|card| card_height(card, width)).sum()
    }

    fn scroll_by(&mut self, delta: i64) {
        let max = self
            .total_height()
            .saturating_sub(self.view_height as usize);
        let next = (self.scroll_y as i64 + delta).clamp(0, max as i64);
        self.scroll_y = next as usize;
    }

    fn visible_index(&self) -> Option<usize> {
        let id = self.visible.as_deref()?;
        self.posts.iter().position(|post| post.id == id)
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('j') | KeyCode::Down => self.scroll_by(2),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_by(-2),
            KeyCode::Char(' ') | KeyCode::PageDown => {
                self.scroll_by(self.view_height.max(2) as i64 / 2)
            }
            KeyCode::PageUp => self.scroll_by(-(self.view_height.max(2) as i64 / 2)),
            KeyCode::Char('g') | KeyCode::Home => self.scroll_y = 0,
            KeyCode::Char('h') | KeyCode::Left => self.page_visible(-1),
            KeyCode::Char('l') | KeyCode::Right => self.page_visible(1),
            KeyCode::Char('[') => self.drag_visible(-0.25),
            KeyCode::Char(']') => self.drag_visible(0.25),
            KeyCode::Char('m') => {
                self.muted = !self.muted;
                self.status_message = if self.muted {
                    "Feed muted.".to_string()
                } else {
                    "Feed unmuted.".to_string()
                };
            }
            KeyCode::Char('f') => {
                self.screen_focused = !self.screen_focused;
                self.status_message = if self.screen_focused {
                    "Screen focused: playback resumes where it was.".to_string()
                } else {
                    "Screen blurred (navigated away): all playback stops.".to_string()
                };
            }
            KeyCode::Char('L') => self.act_on_visible(|card, _, actions| card.toggle_like(actions)),
            KeyCode::Char('b') => {
                self.act_on_visible(|card, _, actions| card.toggle_bookmark(actions))
            }
            KeyCode::Char('s') => self.act_on_visible(|card, post, actions| card.share(post, actions)),
            _ => return false,
        }
        self.mark_dirty();
        false
    }

    fn page_visible(&mut self, delta: i64) {
        let Some(index) = self.visible_index() else {
            self.status_message = "No card is visible enough to page.".to_string();
            return;
        };
        let page_width = self.page_width;
        let card = &mut self.cards[index];
        if card.step_page(delta) {
            self.drag_offsets.insert(
                card.post_id().to_string(),
                card.carousel().snap_offset(page_width),
            );
        }
    }

    fn drag_visible(&mut self, fraction: f64) {
        let Some(index) = self.visible_index() else {
            return;
        };
        let page_width = self.page_width;
        let card = &mut self.cards[index];
        let id = card.post_id().to_string();
        let count = card.carousel().page_count();
        let max = page_width * count.saturating_sub(1) as f64;
        let offset = self
            .drag_offsets
            .get(&id)
            .copied()
            .unwrap_or_else(|| card.carousel().snap_offset(page_width));
        let next = (offset + fraction * page_width).clamp(0.0, max.max(0.0));
        self.drag_offsets.insert(id.clone(), next);
        let changed = card.scroll_carousel(next, page_width);
        self.status_message = format!(
            "Dragged {id} to x={next:.0} ({}){}",
            card.carousel().label(),
            if changed { ", page changed" } else { "" }
        );
    }

    fn act_on_visible(&mut self, act: impl Fn(&Card, &Post, &mut PendingActions)) {
        let Some(index) = self.visible_index() else {
            self.status_message = "No card is visible.".to_string();
            return;
        };
        let mut pending = PendingActions::default();
        act(&self.cards[index], &self.posts[index], &mut pending);
        self.apply_actions(pending);
    }

    fn apply_actions(&mut self, pending: PendingActions) {
        for id in pending.likes {
            if let Some(post) = self.posts.iter_mut().find(|post| post.id == id) {
                post.is_liked = !post.is_liked;
                if post.is_liked {
                    post.likes += 1;
                } else {
                    post.likes = post.likes.saturating_sub(1);
                }
                self.status_message = format!("Toggled like on {id}.");
            }
        }
        for id in pending.bookmarks {
            if let Some(post) = self.posts.iter_mut().find(|post| post.id == id) {
                post.is_bookmarked = !post.is_bookmarked;
                self.status_message = format!("Toggled bookmark on {id}.");
            }
        }
        for id in pending.shares {
            debug_log(format!("ui: share requested for {id}"));
            self.status_message = format!("Share sheet requested for {id}.");
        }
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_line = Paragraph::new(self.status_text()).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        let area = layout[1];

        let width = area.width.max(1) as usize;
        let now = Utc::now();
        let mut lines: Vec<Line<'static>> = Vec::new();
        for (card, post) in self.cards.iter().zip(self.posts.iter()) {
            let visible = self.visible.as_deref() == Some(post.id.as_str());
            lines.extend(card_lines(
                post,
                card.view(),
                visible,
                media_rows(card, width),
                width,
                now,
            ));
        }

        let feed = Paragraph::new(Text::from(lines))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .scroll((self.scroll_y.min(u16::MAX as usize) as u16, 0));
        frame.render_widget(feed, area);

        let footer = Paragraph::new(footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);
    }

    fn status_text(&self) -> String {
        let live: usize = self.cards.iter().map(|card| card.view().live_decoders()).sum();
        let playing: usize = self.cards.iter().map(|card| card.view().eligible_pages()).sum();
        format!(
            " {} · {} · {} · decoders {live} · playing {playing} · visible {} · renders {} · {}",
            if self.screen_focused { "focused" } else { "blurred" },
            if self.muted { "muted" } else { "sound on" },
            self.budget.as_str(),
            self.visible.as_deref().unwrap_or("none"),
            self.fresh_renders,
            self.status_message
        )
    }
}

fn media_rows(card: &Card, width: usize) -> usize {
    let Some(page) = card.pages().get(card.active_index()) else {
        return 0;
    };
    let ratio = card.ratios().ratio(&page.key());
    // Terminal cells are roughly twice as tall as they are wide.
    let rows = (width as f64 / ratio / 2.0).round();
    if !rows.is_finite() {
        return MIN_MEDIA_ROWS;
    }
    (rows as usize).clamp(MIN_MEDIA_ROWS, MAX_MEDIA_ROWS)
}

fn card_height(card: &Card, width: usize) -> usize {
    CHROME_ROWS + media_rows(card, width)
}

fn card_lines(
    post: &Post,
    view: &CardView,
    visible: bool,
    media_rows: usize,
    width: usize,
    now: chrono::DateTime<Utc>,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let marker = if visible { "▌" } else { " " };
    let mut header = vec![
        Span::styled(marker.to_string(), Style::default().fg(COLOR_ACCENT)),
        Span::styled(
            format!("@{}", post.author),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" · {} · {}", post.age_label(now), view.shape),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ),
    ];
    if view.indicator.len() > 1 {
        let dots: String = view
            .indicator
            .iter()
            .map(|active| if *active { '●' } else { '○' })
            .collect();
        header.push(Span::styled(
            format!("  {dots}"),
            Style::default().fg(COLOR_ACCENT),
        ));
    }
    lines.push(Line::from(header));

    let options = WrapOptions::new(width.saturating_sub(2).max(1));
    let wrapped = wrap(&post.content, options);
    for row in 0..CONTENT_ROWS {
        let text = wrapped.get(row).map(|line| line.to_string()).unwrap_or_default();
        lines.push(Line::from(Span::styled(
            format!("  {text}"),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )));
    }

    if let Some(page) = view.active_page() {
        lines.extend(media_box(page, media_rows, width));
    }

    let heart = if view.is_liked { "♥" } else { "♡" };
    let bookmark = if view.is_bookmarked { "■ saved" } else { "□ save" };
    let like_style = if view.is_liked {
        Style::default().fg(COLOR_ERROR)
    } else {
        Style::default().fg(COLOR_TEXT_SECONDARY)
    };
    lines.push(Line::from(vec![
        Span::styled(format!("  {heart} {}", view.likes), like_style),
        Span::styled(
            format!("   ✎ {}   {bookmark}", view.comments_count),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ),
    ]));
    lines.push(Line::default());
    lines
}

fn media_box(page: &PageView, rows: usize, width: usize) -> Vec<Line<'static>> {
    let (label, style) = page_label(page);
    let inner = width.saturating_sub(4).max(1);
    let label = truncate_to_width(&label, inner);
    let mut out = Vec::with_capacity(rows);
    for row in 0..rows {
        let text = if row == rows / 2 { label.as_str() } else { "" };
        let pad_left = inner.saturating_sub(UnicodeWidthStr::width(text)) / 2;
        let mut content = " ".repeat(pad_left);
        content.push_str(text);
        let used = UnicodeWidthStr::width(content.as_str());
        content.push_str(&" ".repeat(inner.saturating_sub(used)));
        out.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content, style.bg(COLOR_MEDIA_BG)),
        ]));
    }
    out
}

fn page_label(page: &PageView) -> (String, Style) {
    let name = short_name(&page.descriptor);
    let ratio = format!("{:.2}:1", page.ratio);
    match page.mount {
        Mount::Static if page.ready => (
            format!("[image] {name} · {ratio}"),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        ),
        Mount::Static => (
            format!("loading {name}…"),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ),
        Mount::Live { playing: true, muted } => (
            format!(
                "▶ playing {name} · {} · decoder #{}",
                if muted { "muted" } else { "sound on" },
                page.generation.unwrap_or_default()
            ),
            Style::default().fg(COLOR_SUCCESS),
        ),
        Mount::Live { playing: false, .. } => (
            format!(
                "❚❚ paused {name} · decoder #{}",
                page.generation.unwrap_or_default()
            ),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ),
        Mount::Placeholder(PlaceholderReason::Ineligible) => (
            format!("▷ {name}"),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ),
        Mount::Placeholder(PlaceholderReason::Failed) => (
            format!("⚠ {name} unavailable"),
            Style::default().fg(COLOR_ERROR),
        ),
    }
}

fn short_name(page: &PageDescriptor) -> String {
    match page.kind {
        PageKind::Embed => match EmbedTarget::of(&page.url) {
            EmbedTarget::YouTube { video_id } => format!("youtube:{video_id}"),
            EmbedTarget::Raw(url) => url,
        },
        PageKind::Image | PageKind::Video => {
            let trimmed = page.url.split('#').next().unwrap_or(&page.url);
            trimmed
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .unwrap_or(trimmed)
                .to_string()
        }
    }
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn footer_text() -> String {
    [
        "j/k scroll",
        "h/l page",
        "[/] drag",
        "m mute",
        "f focus",
        "L like",
        "b bookmark",
        "s share",
        "q quit",
    ]
    .join(" · ")
}

//! One feed card: resolved pages, carousel, measured ratios and the
//! re-render boundary.
//!
//! A card renders only when its [`MemoKey`] changes or when its own state
//! (active page, a measured ratio, a media failure) changes. Everything the
//! render produces is derived from those inputs at render time.

use std::collections::HashMap;

use crate::aspect::AspectRatioCache;
use crate::carousel::CarouselState;
use crate::debug::debug_log;
use crate::guard::{mount_for, DecoderBudget, Mount};
use crate::media::{MediaEvent, MountRequest};
use crate::playback::{page_playback, PagePlayback, Signals};
use crate::post::Post;
use crate::resolve::{MediaShape, PageDescriptor};

#[derive(Debug, Clone, Copy)]
pub struct CardProps<'a> {
    pub post: &'a Post,
    pub is_visible: bool,
    pub is_muted: bool,
    pub is_screen_focused: bool,
}

/// The complete set of inputs a card's output depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoKey {
    pub post_id: String,
    pub is_liked: bool,
    pub is_bookmarked: bool,
    pub likes: u64,
    pub comments_count: u64,
    pub is_visible: bool,
    pub is_muted: bool,
    pub is_screen_focused: bool,
}

impl MemoKey {
    pub fn of(props: &CardProps<'_>) -> Self {
        Self {
            post_id: props.post.id.clone(),
            is_liked: props.post.is_liked,
            is_bookmarked: props.post.is_bookmarked,
            likes: props.post.likes,
            comments_count: props.post.comments_count,
            is_visible: props.is_visible,
            is_muted: props.is_muted,
            is_screen_focused: props.is_screen_focused,
        }
    }

    fn matches(&self, props: &CardProps<'_>) -> bool {
        self.post_id == props.post.id
            && self.is_liked == props.post.is_liked
            && self.is_bookmarked == props.post.is_bookmarked
            && self.likes == props.post.likes
            && self.comments_count == props.post.comments_count
            && self.is_visible == props.is_visible
            && self.is_muted == props.is_muted
            && self.is_screen_focused == props.is_screen_focused
    }
}

/// Interaction callbacks, implemented by the like/bookmark/share layer.
pub trait CardActions {
    fn on_like_toggle(&mut self, post_id: &str);
    fn on_bookmark_toggle(&mut self, post_id: &str);
    fn on_share_press(&mut self, post: &Post);
}

/// Receives the card's on-screen geometry; the feed uses it to pick the
/// visible card.
pub trait LayoutObserver {
    fn on_layout(&mut self, post_id: &str, offset_y: f64, height: f64);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub descriptor: PageDescriptor,
    pub playback: PagePlayback,
    pub mount: Mount,
    pub ratio: f64,
    pub ready: bool,
    /// Identifies the live element backing this page; changes on remount.
    pub generation: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub post_id: String,
    pub shape: &'static str,
    pub pages: Vec<PageView>,
    pub active_index: usize,
    pub indicator: Vec<bool>,
    pub is_liked: bool,
    pub is_bookmarked: bool,
    pub likes: u64,
    pub comments_count: u64,
}

impl CardView {
    fn empty(post_id: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
            shape: MediaShape::None.label(),
            pages: Vec::new(),
            active_index: 0,
            indicator: Vec::new(),
            is_liked: false,
            is_bookmarked: false,
            likes: 0,
            comments_count: 0,
        }
    }

    pub fn live_decoders(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.descriptor.kind.is_playable() && page.mount.holds_decoder())
            .count()
    }

    pub fn eligible_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|page| page.playback.should_play())
            .count()
    }

    pub fn active_page(&self) -> Option<&PageView> {
        self.pages.get(self.active_index)
    }
}

#[derive(Debug)]
pub enum Render<'a> {
    Fresh(&'a CardView),
    Cached(&'a CardView),
}

impl<'a> Render<'a> {
    pub fn view(&self) -> &'a CardView {
        match self {
            Render::Fresh(view) | Render::Cached(view) => view,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Render::Fresh(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    /// Set once the page has been observed ineligible after failing; the
    /// next eligible render mounts a fresh element.
    torn_down: bool,
}

/// Per-post state. Replaced wholesale when the post id changes.
#[derive(Debug)]
struct CardState {
    post_id: String,
    shape: &'static str,
    pages: Vec<PageDescriptor>,
    carousel: CarouselState,
    ratios: AspectRatioCache,
    failures: HashMap<usize, Failure>,
    ready: Vec<bool>,
    mounts: Vec<Option<u64>>,
    layout: Option<(f64, f64)>,
}

impl CardState {
    fn for_post(post: &Post) -> Self {
        let shape = MediaShape::of(post);
        let pages = shape.pages();
        let count = pages.len();
        Self {
            post_id: post.id.clone(),
            shape: shape.label(),
            pages,
            carousel: CarouselState::new(count),
            ratios: AspectRatioCache::new(),
            failures: HashMap::new(),
            ready: vec![false; count],
            mounts: vec![None; count],
            layout: None,
        }
    }
}

#[derive(Debug)]
pub struct Card {
    budget: DecoderBudget,
    state: CardState,
    memo: Option<MemoKey>,
    dirty: bool,
    view: CardView,
    render_count: u64,
    next_generation: u64,
    pending_mounts: Vec<MountRequest>,
}

impl Card {
    pub fn new(post: &Post, budget: DecoderBudget) -> Self {
        Self {
            budget,
            state: CardState::for_post(post),
            memo: None,
            dirty: true,
            view: CardView::empty(&post.id),
            render_count: 0,
            next_generation: 1,
            pending_mounts: Vec::new(),
        }
    }

    pub fn post_id(&self) -> &str {
        &self.state.post_id
    }

    pub fn pages(&self) -> &[PageDescriptor] {
        &self.state.pages
    }

    pub fn active_index(&self) -> usize {
        self.state.carousel.active_index()
    }

    pub fn carousel(&self) -> &CarouselState {
        &self.state.carousel
    }

    pub fn ratios(&self) -> &AspectRatioCache {
        &self.state.ratios
    }

    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    /// Output of the most recent render.
    pub fn view(&self) -> &CardView {
        &self.view
    }

    pub fn render(&mut self, props: CardProps<'_>) -> Render<'_> {
        if props.post.id != self.state.post_id {
            debug_log(format!(
                "card: post swapped {} -> {}",
                self.state.post_id, props.post.id
            ));
            self.state = CardState::for_post(props.post);
            self.pending_mounts.clear();
            self.dirty = true;
        }

        let unchanged = !self.dirty
            && self
                .memo
                .as_ref()
                .map(|memo| memo.matches(&props))
                .unwrap_or(false);
        if unchanged {
            return Render::Cached(&self.view);
        }

        self.view = self.build_view(&props);
        self.memo = Some(MemoKey::of(&props));
        self.dirty = false;
        self.render_count += 1;
        Render::Fresh(&self.view)
    }

    fn build_view(&mut self, props: &CardProps<'_>) -> CardView {
        let signals = Signals {
            screen_focused: props.is_screen_focused,
            card_visible: props.is_visible,
            muted: props.is_muted,
        };
        let active = self.state.carousel.active_index();
        let mut pages = Vec::with_capacity(self.state.pages.len());

        for descriptor in &self.state.pages {
            let index = descriptor.index;
            let key = descriptor.key();
            let playback = page_playback(signals, descriptor.kind, index, active);

            if let Some(failure) = self.state.failures.get_mut(&index) {
                if descriptor.kind.is_playable() {
                    if !playback.should_play() {
                        failure.torn_down = true;
                    } else if failure.torn_down {
                        debug_log(format!(
                            "card: {} page {} eligible again, remounting",
                            self.state.post_id, index
                        ));
                        self.state.failures.remove(&index);
                        self.state.mounts[index] = None;
                    }
                }
            }

            let failed = self.state.failures.contains_key(&index);
            let mount = mount_for(self.budget, descriptor.kind, playback, failed);
            let generation = if matches!(mount, Mount::Static | Mount::Live { .. }) {
                match self.state.mounts[index] {
                    Some(current) => Some(current),
                    None => {
                        let generation = self.next_generation;
                        self.next_generation += 1;
                        self.state.mounts[index] = Some(generation);
                        self.state.ready[index] = false;
                        self.pending_mounts.push(MountRequest {
                            post_id: self.state.post_id.clone(),
                            page_index: index,
                            kind: descriptor.kind,
                            url: descriptor.url.clone(),
                            generation,
                        });
                        Some(generation)
                    }
                }
            } else {
                if self.state.mounts[index].take().is_some() {
                    debug_log(format!(
                        "card: {} page {} unmounted ({:?})",
                        self.state.post_id, index, mount
                    ));
                }
                self.state.ready[index] = false;
                None
            };

            pages.push(PageView {
                descriptor: descriptor.clone(),
                playback,
                mount,
                ratio: self.state.ratios.ratio(&key),
                ready: self.state.ready[index],
                generation,
            });
        }

        CardView {
            post_id: self.state.post_id.clone(),
            shape: self.state.shape,
            pages,
            active_index: active,
            indicator: self.state.carousel.indicator(),
            is_liked: props.post.is_liked,
            is_bookmarked: props.post.is_bookmarked,
            likes: props.post.likes,
            comments_count: props.post.comments_count,
        }
    }

    /// Elements mounted since the last call, for the host to start loading.
    pub fn take_mount_requests(&mut self) -> Vec<MountRequest> {
        std::mem::take(&mut self.pending_mounts)
    }

    pub fn scroll_carousel(&mut self, offset_x: f64, page_width: f64) -> bool {
        let changed = self.state.carousel.on_scroll(offset_x, page_width);
        self.note_page_change(changed)
    }

    pub fn step_page(&mut self, delta: i64) -> bool {
        let changed = self.state.carousel.step(delta);
        self.note_page_change(changed)
    }

    fn note_page_change(&mut self, changed: bool) -> bool {
        if changed {
            debug_log(format!(
                "card: {} active page -> {}",
                self.state.post_id,
                self.state.carousel.active_index()
            ));
            self.dirty = true;
        }
        changed
    }

    /// Applies a lifecycle event from a mounted element. Events for another
    /// post or an element that has since been unmounted are dropped. Returns
    /// whether the card needs to render again.
    pub fn handle_media_event(
        &mut self,
        post_id: &str,
        page_index: usize,
        generation: u64,
        event: MediaEvent,
    ) -> bool {
        if post_id != self.state.post_id {
            return false;
        }
        let Some(descriptor) = self.state.pages.get(page_index) else {
            return false;
        };
        if self.state.mounts[page_index] != Some(generation) {
            debug_log(format!(
                "card: {} page {} dropped stale event for gen {}",
                post_id, page_index, generation
            ));
            return false;
        }
        let key = descriptor.key();

        match event {
            MediaEvent::Loaded { width, height } => {
                let before = self.state.ratios.ratio(&key);
                let measured = self.state.ratios.is_measured(&key);
                if !self.state.ratios.record_ratio(&key, width, height) {
                    debug_log(format!(
                        "card: {} {} ignored size {}x{}",
                        post_id, key, width, height
                    ));
                    return false;
                }
                let changed = !measured || self.state.ratios.ratio(&key) != before;
                self.dirty |= changed;
                changed
            }
            MediaEvent::ReadyForDisplay => {
                if self.state.ready[page_index] {
                    return false;
                }
                self.state.ready[page_index] = true;
                self.dirty = true;
                true
            }
            MediaEvent::Error(err) => {
                debug_log(format!("card: {} {} failed: {}", post_id, key, err));
                // Only a render that sees the page ineligible tears it down.
                self.state
                    .failures
                    .insert(page_index, Failure { torn_down: false });
                self.dirty = true;
                true
            }
        }
    }

    /// Reports geometry upward, but only when it actually moved. Non-finite
    /// or negative geometry is ignored.
    pub fn report_layout(
        &mut self,
        offset_y: f64,
        height: f64,
        observer: &mut dyn LayoutObserver,
    ) -> bool {
        if !offset_y.is_finite() || !height.is_finite() || height < 0.0 {
            return false;
        }
        if self.state.layout == Some((offset_y, height)) {
            return false;
        }
        self.state.layout = Some((offset_y, height));
        observer.on_layout(&self.state.post_id, offset_y, height);
        true
    }

    pub fn toggle_like(&self, actions: &mut dyn CardActions) {
        actions.on_like_toggle(&self.state.post_id);
    }

    pub fn toggle_bookmark(&self, actions: &mut dyn CardActions) {
        actions.on_bookmark_toggle(&self.state.post_id);
    }

    pub fn share(&self, post: &Post, actions: &mut dyn CardActions) {
        if post.id == self.state.post_id {
            actions.on_share_press(post);
        }
    }
}

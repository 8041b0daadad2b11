use feedcard::card::{Card, CardProps, LayoutObserver};
use feedcard::data::sample_posts;
use feedcard::feed::LayoutRegistry;
use feedcard::guard::{DecoderBudget, Mount, PlaceholderReason};
use feedcard::playback::Eligibility;
use feedcard::post::{MediaItem, Post};

fn mixed_post() -> Post {
    let mut post = Post::new("p1");
    post.media_items = vec![
        MediaItem::image("https://cdn.test/a.jpg"),
        MediaItem::video("https://cdn.test/b.mp4"),
    ];
    post
}

fn props(post: &Post, visible: bool, focused: bool, muted: bool) -> CardProps<'_> {
    CardProps {
        post,
        is_visible: visible,
        is_muted: muted,
        is_screen_focused: focused,
    }
}

#[test]
fn video_behind_an_image_stays_a_placeholder_until_swiped_to() {
    let post = mixed_post();
    let mut card = Card::new(&post, DecoderBudget::Constrained);

    let view = card.render(props(&post, true, true, false)).view().clone();
    assert_eq!(view.pages[0].mount, Mount::Static);
    assert_eq!(view.pages[1].playback.eligibility, Eligibility::Ineligible);
    assert_eq!(
        view.pages[1].mount,
        Mount::Placeholder(PlaceholderReason::Ineligible)
    );
    assert_eq!(view.live_decoders(), 0);

    assert!(card.scroll_carousel(400.0, 400.0));
    let view = card.render(props(&post, true, true, false)).view().clone();
    assert_eq!(view.active_index, 1);
    assert_eq!(view.pages[1].playback.eligibility, Eligibility::Eligible);
    assert!(!view.pages[1].playback.muted);
    assert_eq!(
        view.pages[1].mount,
        Mount::Live {
            playing: true,
            muted: false
        }
    );
}

#[test]
fn swiping_one_card_leaves_its_siblings_cached() {
    let posts: Vec<Post> = ["p1", "p2", "p3"]
        .iter()
        .map(|id| {
            let mut post = mixed_post();
            post.id = id.to_string();
            post
        })
        .collect();
    let mut cards: Vec<Card> = posts
        .iter()
        .map(|post| Card::new(post, DecoderBudget::Constrained))
        .collect();
    for (index, (card, post)) in cards.iter_mut().zip(posts.iter()).enumerate() {
        card.render(props(post, index == 1, true, false));
    }
    let before: Vec<u64> = cards.iter().map(Card::render_count).collect();

    assert!(cards[1].scroll_carousel(400.0, 400.0));
    for (index, (card, post)) in cards.iter_mut().zip(posts.iter()).enumerate() {
        let fresh = card.render(props(post, index == 1, true, false)).is_fresh();
        assert_eq!(fresh, index == 1, "card {index}");
    }
    let after: Vec<u64> = cards.iter().map(Card::render_count).collect();
    assert_eq!(after, vec![before[0], before[1] + 1, before[2]]);
    assert_eq!(cards[1].view().pages[1].playback.eligibility, Eligibility::Eligible);
    assert_eq!(cards[0].view().active_index, 0);
}

#[test]
fn focus_loss_stops_playback_and_refocus_resumes_without_scrolling() {
    let mut post = Post::new("v");
    post.video_url = Some("https://cdn.test/v.mp4".into());
    let mut card = Card::new(&post, DecoderBudget::Constrained);

    let view = card.render(props(&post, true, true, false)).view().clone();
    assert!(view.pages[0].playback.should_play());

    let view = card.render(props(&post, true, false, false)).view().clone();
    assert_eq!(view.pages[0].playback.eligibility, Eligibility::Ineligible);
    assert!(view.pages[0].playback.muted);
    assert_eq!(view.live_decoders(), 0);

    let view = card.render(props(&post, true, true, false)).view().clone();
    assert_eq!(view.pages[0].playback.eligibility, Eligibility::Eligible);
    assert_eq!(view.active_index, 0);
}

#[test]
fn global_mute_applies_to_the_eligible_page() {
    let mut post = Post::new("v");
    post.video_url = Some("https://cdn.test/v.mp4".into());
    let mut card = Card::new(&post, DecoderBudget::Unconstrained);
    let view = card.render(props(&post, true, true, true)).view().clone();
    assert!(view.pages[0].playback.should_play());
    assert_eq!(
        view.pages[0].mount,
        Mount::Live {
            playing: true,
            muted: true
        }
    );
}

#[test]
fn unrelated_prop_changes_are_memoized() {
    let mut post = mixed_post();
    let mut card = Card::new(&post, DecoderBudget::Constrained);
    card.render(props(&post, false, true, false));
    for caption in ["one", "two", "three"] {
        post.content = caption.to_string();
        assert!(!card.render(props(&post, false, true, false)).is_fresh());
    }
    assert_eq!(card.render_count(), 1);

    post.is_bookmarked = true;
    assert!(card.render(props(&post, false, true, false)).is_fresh());
    assert_eq!(card.render_count(), 2);
}

#[test]
fn constrained_feed_never_holds_more_decoders_than_eligible_pages() {
    let posts = sample_posts();
    let mut cards: Vec<Card> = posts
        .iter()
        .map(|post| Card::new(post, DecoderBudget::Constrained))
        .collect();
    let mut registry = LayoutRegistry::new();
    for (index, card) in cards.iter_mut().enumerate() {
        card.report_layout(index as f64 * 500.0, 500.0, &mut registry);
    }

    for scroll_y in (0..posts.len() * 500).step_by(125) {
        let visible = registry
            .most_visible(scroll_y as f64, 700.0, 0.6)
            .map(str::to_string);
        let mut live = 0;
        let mut eligible = 0;
        for (card, post) in cards.iter_mut().zip(posts.iter()) {
            let is_visible = visible.as_deref() == Some(post.id.as_str());
            let view = card.render(props(post, is_visible, true, false)).view();
            live += view.live_decoders();
            eligible += view.eligible_pages();
        }
        assert!(eligible <= 1, "scroll {scroll_y}: {eligible} eligible pages");
        assert!(live <= eligible, "scroll {scroll_y}: {live} > {eligible}");
    }
}

#[test]
fn registry_is_a_layout_observer() {
    let mut registry = LayoutRegistry::new();
    registry.on_layout("a", 0.0, 100.0);
    assert_eq!(registry.most_visible(0.0, 100.0, 0.5), Some("a"));
}

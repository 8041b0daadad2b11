//! Playback eligibility for carousel pages.
//!
//! Nothing here is stored: every render recomputes eligibility from the
//! current screen focus, card visibility and active page, so a flip of any
//! input is reflected on the very next render.

use crate::resolve::PageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    pub screen_focused: bool,
    pub card_visible: bool,
    pub muted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

pub fn eligible(
    screen_focused: bool,
    card_visible: bool,
    page_index: usize,
    active_index: usize,
) -> bool {
    screen_focused && card_visible && page_index == active_index
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlayback {
    pub eligibility: Eligibility,
    pub muted: bool,
}

impl PagePlayback {
    pub fn should_play(&self) -> bool {
        self.eligibility.is_eligible()
    }
}

/// Images never play; video and embed pages follow the eligibility rule.
/// Only an eligible page may be unmuted, and only when the feed is unmuted.
pub fn page_playback(
    signals: Signals,
    kind: PageKind,
    page_index: usize,
    active_index: usize,
) -> PagePlayback {
    let is_eligible = kind.is_playable()
        && eligible(
            signals.screen_focused,
            signals.card_visible,
            page_index,
            active_index,
        );
    PagePlayback {
        eligibility: if is_eligible {
            Eligibility::Eligible
        } else {
            Eligibility::Ineligible
        },
        muted: signals.muted || !is_eligible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truth_table() {
        for focused in [false, true] {
            for visible in [false, true] {
                for (page, active) in [(0, 0), (0, 1), (1, 0), (2, 2)] {
                    let expected = focused && visible && page == active;
                    assert_eq!(eligible(focused, visible, page, active), expected);
                    assert_eq!(
                        eligible(focused, visible, page, active),
                        eligible(focused, visible, page, active)
                    );
                }
            }
        }
    }

    #[test]
    fn unfocused_screen_never_plays() {
        for visible in [false, true] {
            for page in 0..3 {
                for active in 0..3 {
                    assert!(!eligible(false, visible, page, active));
                }
            }
        }
    }

    #[test]
    fn only_eligible_page_is_audible() {
        let signals = Signals {
            screen_focused: true,
            card_visible: true,
            muted: false,
        };
        let active = page_playback(signals, PageKind::Video, 1, 1);
        assert!(active.should_play());
        assert!(!active.muted);

        let sibling = page_playback(signals, PageKind::Video, 0, 1);
        assert_eq!(sibling.eligibility, Eligibility::Ineligible);
        assert!(sibling.muted);
    }

    #[test]
    fn global_mute_applies_to_eligible_page() {
        let signals = Signals {
            screen_focused: true,
            card_visible: true,
            muted: true,
        };
        let playback = page_playback(signals, PageKind::Embed, 0, 0);
        assert!(playback.should_play());
        assert!(playback.muted);
    }

    #[test]
    fn images_are_never_eligible() {
        let signals = Signals {
            screen_focused: true,
            card_visible: true,
            muted: false,
        };
        let playback = page_playback(signals, PageKind::Image, 0, 0);
        assert!(!playback.should_play());
        assert!(playback.muted);
    }
}

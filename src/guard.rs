use serde::{Deserialize, Serialize};

use crate::playback::PagePlayback;
use crate::resolve::PageKind;

/// Whether mounting a video decoder is expensive on the host platform.
///
/// This is the only platform-dependent input to the card; everything else is
/// derived the same way everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderBudget {
    Constrained,
    Unconstrained,
}

impl DecoderBudget {
    pub fn for_current_platform() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            DecoderBudget::Constrained
        } else {
            DecoderBudget::Unconstrained
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecoderBudget::Constrained => "constrained",
            DecoderBudget::Unconstrained => "unconstrained",
        }
    }
}

impl Default for DecoderBudget {
    fn default() -> Self {
        Self::for_current_platform()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderReason {
    Ineligible,
    Failed,
}

/// How a page is put on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount {
    /// A plain image view.
    Static,
    /// A live player holding a decoder.
    Live { playing: bool, muted: bool },
    /// Same-sized inert box with a play glyph; holds no decoder.
    Placeholder(PlaceholderReason),
}

impl Mount {
    pub fn holds_decoder(&self) -> bool {
        matches!(self, Mount::Live { .. })
    }
}

pub fn mount_for(
    budget: DecoderBudget,
    kind: PageKind,
    playback: PagePlayback,
    failed: bool,
) -> Mount {
    if failed {
        return Mount::Placeholder(PlaceholderReason::Failed);
    }
    if !kind.is_playable() {
        return Mount::Static;
    }
    if playback.should_play() {
        return Mount::Live {
            playing: true,
            muted: playback.muted,
        };
    }
    match budget {
        DecoderBudget::Constrained => Mount::Placeholder(PlaceholderReason::Ineligible),
        DecoderBudget::Unconstrained => Mount::Live {
            playing: false,
            muted: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{page_playback, Signals};

    fn signals(focused: bool, visible: bool) -> Signals {
        Signals {
            screen_focused: focused,
            card_visible: visible,
            muted: false,
        }
    }

    #[test]
    fn constrained_budget_never_mounts_ineligible_decoder() {
        let playback = page_playback(signals(true, true), PageKind::Video, 1, 0);
        let mount = mount_for(DecoderBudget::Constrained, PageKind::Video, playback, false);
        assert_eq!(mount, Mount::Placeholder(PlaceholderReason::Ineligible));
        assert!(!mount.holds_decoder());
    }

    #[test]
    fn unconstrained_budget_mounts_paused_muted_decoder() {
        let playback = page_playback(signals(false, true), PageKind::Video, 0, 0);
        let mount = mount_for(DecoderBudget::Unconstrained, PageKind::Video, playback, false);
        assert_eq!(
            mount,
            Mount::Live {
                playing: false,
                muted: true
            }
        );
    }

    #[test]
    fn eligible_page_plays_on_any_budget() {
        let playback = page_playback(signals(true, true), PageKind::Video, 0, 0);
        for budget in [DecoderBudget::Constrained, DecoderBudget::Unconstrained] {
            assert_eq!(
                mount_for(budget, PageKind::Video, playback, false),
                Mount::Live {
                    playing: true,
                    muted: false
                }
            );
        }
    }

    #[test]
    fn failures_render_placeholder() {
        let playback = page_playback(signals(true, true), PageKind::Image, 0, 0);
        assert_eq!(
            mount_for(DecoderBudget::Constrained, PageKind::Image, playback, true),
            Mount::Placeholder(PlaceholderReason::Failed)
        );
        assert_eq!(
            mount_for(DecoderBudget::Constrained, PageKind::Image, playback, false),
            Mount::Static
        );
    }
}

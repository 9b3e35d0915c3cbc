//! Presentation collaborator
//!
//! Whether a surfaced notification produces visible feedback (snackbar,
//! banner, sound) is decided by the UI layer. The monitor only hands events
//! to a [`Presenter`] through the observer registry.

use app_state::NotificationObserver;
use notify_client::{NotificationEvent, NotificationKind};
use unicode_segmentation::UnicodeSegmentation;

/// Longest direct chat preview, in graphemes
pub const CHAT_PREVIEW_LEN: usize = 100;

/// Longest race chat preview, in graphemes
pub const RACE_CHAT_PREVIEW_LEN: usize = 80;

/// Receiver of surfaced notifications in the UI layer
#[cfg_attr(test, mockall::automock)]
pub trait Presenter: Send + Sync {
    /// Present a notification, or decide not to
    fn present(&self, event: &NotificationEvent) -> anyhow::Result<()>;
}

/// Adapts a [`Presenter`] into a [`NotificationObserver`]
pub struct PresentationObserver<P> {
    presenter: P,
}

impl<P: Presenter> PresentationObserver<P> {
    /// Wrap a presenter
    pub fn new(presenter: P) -> Self {
        Self { presenter }
    }
}

impl<P: Presenter> NotificationObserver for PresentationObserver<P> {
    fn name(&self) -> &str {
        "presentation"
    }

    fn on_notification(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        self.presenter.present(event)
    }
}

/// Truncate text to at most `max` graphemes, marking the cut with `…`
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();

    if graphemes.next().is_some() {
        format!("{}…", head.trim_end())
    } else {
        head
    }
}

/// Preview of a chat notification's message body
///
/// Returns `None` for non-chat notifications and for chat notifications
/// without a body.
pub fn body_preview(event: &NotificationEvent) -> Option<String> {
    let limit = match event.kind() {
        NotificationKind::ChatMessage => CHAT_PREVIEW_LEN,
        NotificationKind::RaceChatMessage => RACE_CHAT_PREVIEW_LEN,
        _ => return None,
    };

    let body = event.payload_str("body").or_else(|| event.payload_str("message"))?;
    Some(truncate_graphemes(body, limit))
}

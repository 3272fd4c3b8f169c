//! Translation-loop prevention.
//!
//! Every mirrored post carries an invisible marker character appended to its
//! webhook display name. A message is treated as the engine's own output when
//! its author is a bot, or when it arrived through a webhook and the author
//! name contains the marker. Known trade-off: a human who puts the marker in
//! their own name *and* posts through a webhook is misclassified.

/// Append the loop-prevention marker to a display name before posting.
pub fn mark_display_name(display_name: &str, marker: &str) -> String {
    format!("{display_name}{marker}")
}

/// Whether a message originated from the engine's own mirroring activity.
pub fn is_mirror_artifact(
    author_is_bot: bool,
    via_webhook: bool,
    author_name: &str,
    marker: &str,
) -> bool {
    if author_is_bot {
        return true;
    }

    via_webhook && author_name.contains(marker)
}

pub fn should_translate(
    author_is_bot: bool,
    via_webhook: bool,
    author_name: &str,
    marker: &str,
) -> bool {
    !is_mirror_artifact(author_is_bot, via_webhook, author_name, marker)
}

//! Project window entries into chat messages for context assembly.

use super::Entry;
use crate::Message;

/// Convert entries into alternating user/assistant messages.
///
/// Output order follows entry order; each entry yields exactly two messages.
/// No filtering by tag happens here, so callers choose which entries to
/// replay (all of them, or only [`Window::active_entries`](super::Window::active_entries)).
pub fn entries_to_context_messages<'a, I>(entries: I) -> Vec<Message>
where
    I: IntoIterator<Item = &'a Entry>,
{
    entries
        .into_iter()
        .flat_map(|e| {
            [
                Message::user(e.user.as_str()),
                Message::assistant(e.assistant.as_str()),
            ]
        })
        .collect()
}

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::contract::TitleRequest;
use crate::relay::RelayClient;
use crate::session::{SessionEvent, SessionId};

pub const DEFAULT_TITLE_PREFIX_CHARS: usize = 300;

/// First `max_chars` characters of `text`, never splitting a character.
pub fn title_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Fire-and-forget summary request for a finished answer. The result is
/// tagged with the answer's session so a newer query can ignore it.
pub fn spawn_title(
    relay: Arc<dyn RelayClient>,
    session: SessionId,
    answer: &str,
    max_chars: usize,
    events: UnboundedSender<SessionEvent>,
) -> JoinHandle<()> {
    let content = title_prefix(answer, max_chars).to_string();
    debug!(session_id = %session, chars = content.chars().count(), "requesting title");

    tokio::spawn(async move {
        let event = match relay.summarize_title(TitleRequest { content }).await {
            Ok(response) => SessionEvent::Title {
                session,
                title: response.title.trim().to_string(),
            },
            Err(error) => {
                warn!(session_id = %session, error = %error, "title request failed");
                SessionEvent::TitleFailed {
                    session,
                    message: error.user_message(),
                }
            }
        };
        let _ = events.send(event);
    })
}

#[cfg(test)]
mod tests {
    use super::title_prefix;

    #[test]
    fn prefix_counts_characters_not_bytes() {
        assert_eq!(title_prefix("héllo wörld", 5), "héllo");
        assert_eq!(title_prefix("short", 300), "short");
        assert_eq!(title_prefix("", 10), "");
    }

    #[test]
    fn prefix_of_exact_length_is_whole_text() {
        assert_eq!(title_prefix("abc", 3), "abc");
        assert_eq!(title_prefix("abcd", 3), "abc");
    }
}

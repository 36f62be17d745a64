use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Pending,
    Streaming,
    Done,
    Error,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Prompt { use_high_capability_model: bool },
    Translation,
}

/// One outstanding relay request. Only the dispatcher holds these.
#[derive(Debug)]
pub struct StreamSession {
    id: SessionId,
    kind: SessionKind,
    status: SessionStatus,
    cancel: CancellationToken,
}

impl StreamSession {
    pub fn new(id: SessionId, kind: SessionKind) -> Self {
        Self {
            id,
            kind,
            status: SessionStatus::Pending,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn mark_streaming(&mut self) {
        if self.status == SessionStatus::Pending {
            self.status = SessionStatus::Streaming;
        }
    }

    /// Moves a live session into a terminal state. Returns false when the
    /// session had already finished, leaving it untouched.
    pub fn finish(&mut self, status: SessionStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    /// Aborts the transport. A no-op once the session is terminal.
    pub fn cancel(&mut self) -> bool {
        if !self.finish(SessionStatus::Cancelled) {
            return false;
        }
        self.cancel.cancel();
        true
    }
}

/// Output of a background request, tagged with the session that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Chunk { session: SessionId, text: String },
    Finished { session: SessionId },
    Translated { session: SessionId, text: String },
    Failed { session: SessionId, message: String },
    Title { session: SessionId, title: String },
    TitleFailed { session: SessionId, message: String },
}

impl SessionEvent {
    pub fn session(&self) -> SessionId {
        match self {
            Self::Chunk { session, .. }
            | Self::Finished { session }
            | Self::Translated { session, .. }
            | Self::Failed { session, .. }
            | Self::Title { session, .. }
            | Self::TitleFailed { session, .. } => *session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionId, SessionKind, SessionStatus, StreamSession};

    #[test]
    fn session_ids_are_monotonic() {
        let first = SessionId::default().next();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second, SessionId(2));
    }

    #[test]
    fn cancel_trips_the_token_once() {
        let mut session = StreamSession::new(SessionId(1), SessionKind::Translation);
        let token = session.cancel_token();
        session.mark_streaming();

        assert!(session.cancel());
        assert!(token.is_cancelled());
        assert_eq!(session.status(), SessionStatus::Cancelled);
        assert!(!session.cancel());
    }

    #[test]
    fn cancel_after_done_is_a_no_op() {
        let mut session = StreamSession::new(
            SessionId(4),
            SessionKind::Prompt {
                use_high_capability_model: false,
            },
        );
        let token = session.cancel_token();
        session.mark_streaming();
        assert!(session.finish(SessionStatus::Done));

        assert!(!session.cancel());
        assert!(!token.is_cancelled());
        assert_eq!(session.status(), SessionStatus::Done);
    }

    #[test]
    fn finish_rejects_non_terminal_targets() {
        let mut session = StreamSession::new(SessionId(2), SessionKind::Translation);
        assert!(!session.finish(SessionStatus::Streaming));
        assert_eq!(session.status(), SessionStatus::Pending);
    }
}

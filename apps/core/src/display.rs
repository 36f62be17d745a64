use crate::command::Command;
use crate::contract::DisplaySnapshot;
use crate::session::{SessionId, SessionStatus};

pub const STREAMING_HEADING: &str = "Thinking...";
pub const DONE_HEADING: &str = "Your response";

/// What the host window shows. Written only on behalf of the latest session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    session: Option<SessionId>,
    status: SessionStatus,
    text: String,
    error: Option<String>,
    title: Option<String>,
    title_error: Option<String>,
    engine_badge: Option<String>,
    modifier_label: Option<String>,
}

impl DisplayState {
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn title_error(&self) -> Option<&str> {
        self.title_error.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.status == SessionStatus::Streaming
    }

    pub fn heading(&self) -> Option<&'static str> {
        match self.status {
            SessionStatus::Pending | SessionStatus::Streaming => Some(STREAMING_HEADING),
            SessionStatus::Done if !self.text.is_empty() => Some(DONE_HEADING),
            _ => None,
        }
    }

    /// Badge and modifier describe the session that owns the answer region,
    /// so only a session start should set them.
    pub fn show_command(&mut self, command: &Command) {
        self.engine_badge = Some(command.engine.as_char().to_string());
        self.modifier_label = command.modifier_label().map(str::to_string);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Resets every slot for a freshly issued session.
    pub fn begin(&mut self, session: SessionId) {
        self.session = Some(session);
        self.status = SessionStatus::Streaming;
        self.text.clear();
        self.error = None;
        self.title = None;
        self.title_error = None;
    }

    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    pub fn finish(&mut self, status: SessionStatus) {
        self.status = status;
    }

    /// Partial text already shown stays in place.
    pub fn fail(&mut self, message: String) {
        self.status = SessionStatus::Error;
        self.error = Some(message);
    }

    pub fn set_title(&mut self, title: String) {
        self.title = Some(title);
    }

    pub fn set_title_error(&mut self, message: String) {
        self.title_error = Some(message);
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            session_id: self.session,
            status: self.status,
            streaming: self.is_streaming(),
            heading: self.heading().map(str::to_string),
            text: self.text.clone(),
            error: self.error.clone(),
            title: self.title.clone(),
            title_error: self.title_error.clone(),
            engine_badge: self.engine_badge.clone(),
            modifier_label: self.modifier_label.clone(),
        }
    }
}

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::action_executor::{LaunchError, LinkOpener};
use crate::command::{Command, EngineCode};
use crate::config::Config;
use crate::contract::{PromptRequest, TranslateRequest};
use crate::display::DisplayState;
use crate::relay::RelayClient;
use crate::session::{SessionEvent, SessionId, SessionKind, SessionStatus, StreamSession};
use crate::stream_consumer::{spawn_stream, spawn_translation, StreamParams, TranslationParams};
use crate::title::{spawn_title, DEFAULT_TITLE_PREFIX_CHARS};
use crate::web_search::{search_url, EngineOverrides};

#[derive(Debug)]
pub enum DispatchError {
    Launch(LaunchError),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launch(error) => write!(f, "launch error: {error}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<LaunchError> for DispatchError {
    fn from(value: LaunchError) -> Self {
        Self::Launch(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    pub composing: bool,
}

impl KeyPress {
    pub fn enter() -> Self {
        Self {
            key: "Enter".to_string(),
            ..Self::default()
        }
    }

    /// Plain Enter submits. Shift+Enter is a newline, and an open IME
    /// composition owns the key.
    pub fn is_submit(&self) -> bool {
        self.key.eq_ignore_ascii_case("enter")
            && !self.shift
            && !self.ctrl
            && !self.alt
            && !self.meta
            && !self.composing
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored,
    Opened { url: String },
    Started { session: SessionId, kind: SessionKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub default_model: Option<String>,
    pub pro_model: Option<String>,
    pub system_prompt: Option<String>,
    pub translate_from: Option<String>,
    pub translate_to: Option<String>,
    pub title_prefix_chars: usize,
    pub engines: EngineOverrides,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            default_model: None,
            pro_model: None,
            system_prompt: None,
            translate_from: None,
            translate_to: None,
            title_prefix_chars: DEFAULT_TITLE_PREFIX_CHARS,
            engines: EngineOverrides::new(),
        }
    }
}

impl DispatchSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            default_model: non_blank(&cfg.default_model),
            pro_model: non_blank(&cfg.pro_model),
            system_prompt: cfg.system_prompt.as_deref().and_then(non_blank),
            translate_from: cfg.translate_from.as_deref().and_then(non_blank),
            translate_to: cfg.translate_to.as_deref().and_then(non_blank),
            title_prefix_chars: cfg.title_prefix_chars,
            engines: cfg.engine_overrides(),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Routes parsed commands and owns the single live relay session.
///
/// Background requests never touch [`DisplayState`] directly. They post
/// [`SessionEvent`]s tagged with the id they were issued under, and
/// [`Dispatcher::apply`] drops any event whose id is not the latest one.
/// Cancellation only stops the transport early; the id check is what keeps a
/// late chunk from a superseded request out of the display.
pub struct Dispatcher {
    settings: DispatchSettings,
    relay: Arc<dyn RelayClient>,
    opener: Box<dyn LinkOpener>,
    latest: SessionId,
    live: Option<StreamSession>,
    title_requested: bool,
    display: DisplayState,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
}

impl Dispatcher {
    pub fn new(
        settings: DispatchSettings,
        relay: Arc<dyn RelayClient>,
        opener: Box<dyn LinkOpener>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            relay,
            opener,
            latest: SessionId::default(),
            live: None,
            title_requested: false,
            display: DisplayState::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn latest_session(&self) -> SessionId {
        self.latest
    }

    pub fn live_status(&self) -> Option<SessionStatus> {
        self.live.as_ref().map(StreamSession::status)
    }

    /// Applies the submit-key filter, then parses and dispatches `line`.
    pub fn submit_key(
        &mut self,
        key: &KeyPress,
        line: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !key.is_submit() {
            return Ok(DispatchOutcome::Ignored);
        }
        self.dispatch(Command::parse(line))
    }

    pub fn dispatch(&mut self, command: Command) -> Result<DispatchOutcome, DispatchError> {
        if command.is_empty() {
            debug!(engine = %command.engine.as_char(), "empty term; nothing to dispatch");
            return Ok(DispatchOutcome::Ignored);
        }

        match command.engine {
            EngineCode::Url => {
                self.opener.open(&command.term)?;
                self.display.clear_error();
                info!(engine = "U", "opened url");
                Ok(DispatchOutcome::Opened { url: command.term })
            }
            EngineCode::Ai => {
                let kind = SessionKind::Prompt {
                    use_high_capability_model: command.uses_high_capability_model(),
                };
                Ok(self.start_session(&command, kind))
            }
            EngineCode::Translate => Ok(self.start_session(&command, SessionKind::Translation)),
            engine => {
                let Some(url) = search_url(engine, &command.term, &self.settings.engines) else {
                    return Ok(DispatchOutcome::Ignored);
                };
                self.opener.open(&url)?;
                self.display.clear_error();
                info!(engine = %engine.as_char(), "opened web search");
                Ok(DispatchOutcome::Opened { url })
            }
        }
    }

    fn start_session(&mut self, command: &Command, kind: SessionKind) -> DispatchOutcome {
        if let Some(previous) = self.live.as_mut() {
            if previous.cancel() {
                debug!(session_id = %previous.id(), "superseded live session");
            }
        }

        self.latest = self.latest.next();
        let session = self.latest;
        self.title_requested = false;
        self.display.show_command(command);
        self.display.begin(session);

        let mut live = StreamSession::new(session, kind);
        let cancel = live.cancel_token();
        match kind {
            SessionKind::Prompt {
                use_high_capability_model,
            } => {
                let model = if use_high_capability_model {
                    self.settings.pro_model.clone()
                } else {
                    self.settings.default_model.clone()
                };
                spawn_stream(StreamParams {
                    relay: Arc::clone(&self.relay),
                    request: PromptRequest {
                        prompt: command.term.clone(),
                        system: self.settings.system_prompt.clone(),
                        model,
                    },
                    use_high_capability_model,
                    session,
                    cancel,
                    events: self.events_tx.clone(),
                });
            }
            SessionKind::Translation => {
                spawn_translation(TranslationParams {
                    relay: Arc::clone(&self.relay),
                    request: TranslateRequest {
                        content: command.term.clone(),
                        from: self.settings.translate_from.clone(),
                        to: self.settings.translate_to.clone(),
                    },
                    session,
                    cancel,
                    events: self.events_tx.clone(),
                });
            }
        }
        live.mark_streaming();
        self.live = Some(live);

        info!(session_id = %session, kind = ?kind, chars = command.term.chars().count(), "session started");
        DispatchOutcome::Started { session, kind }
    }

    /// Waits for the next event from any background request.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Non-blocking variant of [`Dispatcher::next_event`].
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Folds one event into the display. Returns whether anything visible changed.
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        let session = event.session();
        if session != self.latest {
            debug!(session_id = %session, latest = %self.latest, "dropping stale event");
            return false;
        }
        let Some(live) = self.live.as_mut() else {
            return false;
        };

        match event {
            SessionEvent::Chunk { text, .. } => {
                if live.status().is_terminal() {
                    return false;
                }
                self.display.append(&text);
                true
            }
            SessionEvent::Translated { text, .. } => {
                if !live.finish(SessionStatus::Done) {
                    return false;
                }
                self.display.append(&text);
                self.display.finish(SessionStatus::Done);
                info!(session_id = %session, "translation complete");
                true
            }
            SessionEvent::Finished { .. } => {
                if !live.finish(SessionStatus::Done) {
                    return false;
                }
                self.display.finish(SessionStatus::Done);
                info!(session_id = %session, bytes = self.display.text().len(), "answer complete");
                self.request_title(session);
                true
            }
            SessionEvent::Failed { message, .. } => {
                if !live.finish(SessionStatus::Error) {
                    return false;
                }
                self.display.fail(message);
                true
            }
            SessionEvent::Title { title, .. } => {
                if live.status() != SessionStatus::Done || title.is_empty() {
                    return false;
                }
                self.display.set_title(title);
                true
            }
            SessionEvent::TitleFailed { message, .. } => {
                if live.status() != SessionStatus::Done {
                    return false;
                }
                self.display.set_title_error(message);
                true
            }
        }
    }

    fn request_title(&mut self, session: SessionId) {
        let is_prompt = matches!(
            self.live.as_ref().map(StreamSession::kind),
            Some(SessionKind::Prompt { .. })
        );
        if !is_prompt || self.title_requested || self.display.text().is_empty() {
            return;
        }
        self.title_requested = true;
        spawn_title(
            Arc::clone(&self.relay),
            session,
            self.display.text(),
            self.settings.title_prefix_chars,
            self.events_tx.clone(),
        );
    }

    /// Host teardown. Cancels the live session if it is still running.
    pub fn cancel_live(&mut self) -> bool {
        let Some(live) = self.live.as_mut() else {
            return false;
        };
        if !live.cancel() {
            return false;
        }
        self.display.finish(SessionStatus::Cancelled);
        info!(session_id = %live.id(), "session cancelled");
        true
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::action_executor::SystemLinkOpener;
use crate::command::Command;
use crate::config::{self, Config, ConfigError};
use crate::dispatcher::{DispatchOutcome, DispatchSettings, Dispatcher};
use crate::display::DisplayState;
use crate::relay::{HttpRelayClient, RelayError};
use crate::session::{SessionId, SessionStatus};
use crate::transport::{display_response, encode, handle_json};

#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
    Relay(RelayError),
    Io(std::io::Error),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "config error: {error}"),
            Self::Relay(error) => write!(f, "relay error: {error}"),
            Self::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<ConfigError> for RuntimeError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RelayError> for RuntimeError {
    fn from(value: RelayError) -> Self {
        Self::Relay(value)
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Parser)]
#[command(name = "quicksearch-core", about = "Quick search launcher core")]
struct Cli {
    /// Config file to load instead of the per-user default.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the relay base URL for this run.
    #[arg(long)]
    relay_url: Option<String>,
    /// Speak the JSON-lines host protocol on stdin/stdout.
    #[arg(long)]
    json: bool,
    /// Write the default config if none exists, then exit.
    #[arg(long)]
    write_default_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub config_path: Option<PathBuf>,
    pub relay_url: Option<String>,
    pub mode: HostMode,
    pub write_default_config: bool,
}

pub fn parse_cli_args(args: &[String]) -> Result<RuntimeOptions, String> {
    let cli = Cli::try_parse_from(std::iter::once("quicksearch-core".to_string()).chain(args.iter().cloned()))
        .map_err(|error| error.to_string())?;

    Ok(RuntimeOptions {
        config_path: cli.config,
        relay_url: cli.relay_url,
        mode: if cli.json { HostMode::Json } else { HostMode::Text },
        write_default_config: cli.write_default_config,
    })
}

pub fn load_config(options: &RuntimeOptions) -> Result<Config, RuntimeError> {
    let mut cfg = config::load(options.config_path.as_deref())?;
    if let Some(relay_url) = &options.relay_url {
        cfg.relay_base_url = relay_url.trim().to_string();
        config::validate(&cfg).map_err(ConfigError::Invalid)?;
    }
    Ok(cfg)
}

pub async fn run_with_options(options: RuntimeOptions) -> Result<(), RuntimeError> {
    let cfg = load_config(&options)?;

    if options.write_default_config {
        if !cfg.config_path.exists() {
            config::save(&cfg)?;
            eprintln!("[quicksearch-core] wrote default config to {}", cfg.config_path.display());
        }
        return Ok(());
    }

    if let Err(error) = crate::logging::init(&cfg.log_level) {
        eprintln!("[quicksearch-core] logging disabled: {error}");
    }
    info!(
        mode = ?options.mode,
        hotkey = %cfg.hotkey,
        relay = %cfg.relay_base_url,
        config_path = %cfg.config_path.display(),
        "startup"
    );

    let relay = HttpRelayClient::new(
        &cfg.relay_base_url,
        Duration::from_secs(cfg.connect_timeout_secs),
    )?;
    let dispatcher = Dispatcher::new(
        DispatchSettings::from_config(&cfg),
        Arc::new(relay),
        Box::new(SystemLinkOpener),
    );

    let result = run_loop(dispatcher, options.mode).await;
    info!("shutdown");
    result
}

async fn run_loop(mut dispatcher: Dispatcher, mode: HostMode) -> Result<(), RuntimeError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut renderer = TextRenderer::default();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    dispatcher.cancel_live();
                    break;
                };
                match mode {
                    HostMode::Json => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let response = handle_json(&mut dispatcher, &line);
                        write_line(&mut stdout, &response).await?;
                    }
                    HostMode::Text => {
                        let output = submit_text_line(&mut dispatcher, &mut renderer, &line);
                        write_text(&mut stdout, &output).await?;
                    }
                }
            }
            Some(event) = dispatcher.next_event() => {
                if !dispatcher.apply(event) {
                    continue;
                }
                match mode {
                    HostMode::Json => {
                        let response = encode(&display_response(&dispatcher));
                        write_line(&mut stdout, &response).await?;
                    }
                    HostMode::Text => {
                        let output = renderer.render(dispatcher.display());
                        write_text(&mut stdout, &output).await?;
                    }
                }
            }
        }
    }

    stdout.flush().await?;
    Ok(())
}

fn submit_text_line(
    dispatcher: &mut Dispatcher,
    renderer: &mut TextRenderer,
    line: &str,
) -> String {
    match dispatcher.dispatch(Command::parse(line)) {
        Ok(DispatchOutcome::Ignored) => String::new(),
        Ok(DispatchOutcome::Opened { url }) => format!("opened {url}\n"),
        Ok(DispatchOutcome::Started { .. }) => renderer.render(dispatcher.display()),
        Err(error) => {
            warn!(error = %error, "dispatch failed");
            format!("error: {error}\n")
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}

async fn write_text<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> std::io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}

/// Turns successive display states into terminal output, printing only what
/// is new since the previous call.
#[derive(Debug, Default)]
pub struct TextRenderer {
    session: Option<SessionId>,
    printed: usize,
    status: SessionStatus,
    title_shown: bool,
    title_error_shown: bool,
}

impl TextRenderer {
    pub fn render(&mut self, display: &DisplayState) -> String {
        let mut out = String::new();

        if display.session() != self.session {
            if self.session.is_some() && self.printed > 0 && !self.status.is_terminal() {
                out.push('\n');
            }
            self.session = display.session();
            self.printed = 0;
            self.status = SessionStatus::Idle;
            self.title_shown = false;
            self.title_error_shown = false;
            if let Some(heading) = display.heading() {
                out.push_str(&format!("-- {heading}\n"));
            }
        }

        let text = display.text();
        if text.len() > self.printed && text.is_char_boundary(self.printed) {
            out.push_str(&text[self.printed..]);
            self.printed = text.len();
        }

        if display.status() != self.status && display.status().is_terminal() {
            match display.status() {
                SessionStatus::Done => out.push('\n'),
                SessionStatus::Error => {
                    if self.printed > 0 {
                        out.push('\n');
                    }
                    if let Some(error) = display.error() {
                        out.push_str(&format!("error: {error}\n"));
                    }
                }
                SessionStatus::Cancelled => out.push_str("\n-- cancelled\n"),
                _ => {}
            }
        }
        self.status = display.status();

        if !self.title_shown {
            if let Some(title) = display.title() {
                out.push_str(&format!("-- {title}\n"));
                self.title_shown = true;
            }
        }
        if !self.title_error_shown {
            if let Some(error) = display.title_error() {
                out.push_str(&format!("-- title unavailable: {error}\n"));
                self.title_error_shown = true;
            }
        }

        out
    }
}

use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    EmptyTarget,
    InvalidUrl(String),
    LaunchFailed { message: String, code: Option<i32> },
}

impl Display for LaunchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTarget => write!(f, "empty launch target"),
            Self::InvalidUrl(target) => write!(f, "not a web URL: {target}"),
            Self::LaunchFailed { message, code } => match code {
                Some(code) => write!(f, "launch failed ({code}): {message}"),
                None => write!(f, "launch failed: {message}"),
            },
        }
    }
}

impl std::error::Error for LaunchError {}

/// Hands a navigation target to whatever shows it to the user.
pub trait LinkOpener: Send {
    fn open(&self, url: &str) -> Result<(), LaunchError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLinkOpener;

impl LinkOpener for SystemLinkOpener {
    fn open(&self, url: &str) -> Result<(), LaunchError> {
        launch_open_target(url)
    }
}

/// Records targets instead of launching them. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct RecordingLinkOpener {
    opened: Arc<Mutex<Vec<String>>>,
}

impl RecordingLinkOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }
}

impl LinkOpener for RecordingLinkOpener {
    fn open(&self, url: &str) -> Result<(), LaunchError> {
        let target = validate_web_target(url)?;
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(target.to_string());
        }
        Ok(())
    }
}

pub fn validate_web_target(target: &str) -> Result<&str, LaunchError> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(LaunchError::EmptyTarget);
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed),
        _ => Err(LaunchError::InvalidUrl(trimmed.to_string())),
    }
}

pub fn launch_open_target(target: &str) -> Result<(), LaunchError> {
    let target = validate_web_target(target)?;
    tracing::info!(bytes = target.len(), "opening external link");
    open_with_shell(target)
}

#[cfg(target_os = "windows")]
fn open_with_shell(target: &str) -> Result<(), LaunchError> {
    use windows_sys::Win32::UI::Shell::ShellExecuteW;
    use windows_sys::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

    let operation = to_wide("open");
    let file = to_wide(target);
    let result = unsafe {
        ShellExecuteW(
            std::ptr::null_mut(),
            operation.as_ptr(),
            file.as_ptr(),
            std::ptr::null(),
            std::ptr::null(),
            SW_SHOWNORMAL,
        )
    };

    // ShellExecuteW reports success with a value greater than 32.
    let code = result as isize;
    if code <= 32 {
        return Err(LaunchError::LaunchFailed {
            message: "ShellExecuteW failed".to_string(),
            code: Some(code as i32),
        });
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn to_wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

#[cfg(not(target_os = "windows"))]
fn open_with_shell(target: &str) -> Result<(), LaunchError> {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };

    let mut command = std::process::Command::new(program);
    command.arg(target);
    spawn_reaped(command, program).map(|_| ())
}

/// Spawns a short-lived helper and waits for it on a background thread so it
/// never lingers as a zombie. The handle yields the exit status once reaped.
#[cfg(not(target_os = "windows"))]
fn spawn_reaped(
    mut command: std::process::Command,
    program: &'static str,
) -> Result<std::thread::JoinHandle<Option<std::process::ExitStatus>>, LaunchError> {
    let mut child = command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|error| LaunchError::LaunchFailed {
            message: format!("failed to run {program}: {error}"),
            code: error.raw_os_error(),
        })?;

    Ok(std::thread::spawn(move || match child.wait() {
        Ok(status) => {
            if !status.success() {
                tracing::warn!(program, code = ?status.code(), "link opener exited with failure");
            }
            Some(status)
        }
        Err(error) => {
            tracing::warn!(program, error = %error, "failed to reap link opener");
            None
        }
    }))
}

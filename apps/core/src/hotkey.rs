#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    pub modifiers: Vec<String>,
    pub key: String,
}

/// Parses an accelerator such as `Alt+L` for the desktop shell to register.
pub fn parse_hotkey(input: &str) -> Result<Hotkey, String> {
    let parts: Vec<&str> = input.split('+').map(str::trim).collect();
    if parts.len() < 2 || parts.iter().any(|part| part.is_empty()) {
        return Err("invalid hotkey".into());
    }

    let (key, modifiers) = match parts.split_last() {
        Some((key, modifiers)) => (*key, modifiers),
        None => return Err("invalid hotkey".into()),
    };

    for modifier in modifiers {
        match modifier.to_ascii_lowercase().as_str() {
            "alt" | "ctrl" | "control" | "shift" | "super" | "meta" | "cmd" | "command"
            | "commandorcontrol" | "cmdorctrl" => {}
            _ => return Err(format!("unsupported modifier: {modifier}")),
        }
    }

    Ok(Hotkey {
        modifiers: modifiers.iter().map(|s| s.to_string()).collect(),
        key: key.to_string(),
    })
}

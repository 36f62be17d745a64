use url::Url;

pub const COMMAND_SENTINEL: char = '!';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineCode {
    Google,
    DuckDuckGo,
    Bing,
    Ask,
    Yahoo,
    ChatGpt,
    Perplexity,
    Ai,
    Translate,
    Url,
    /// Letter with no known destination. Kept for the badge, resolves to Google.
    Other(char),
}

impl EngineCode {
    pub fn from_char(ch: char) -> Self {
        let upper = ch.to_uppercase().next().unwrap_or(ch);
        match upper {
            'G' => Self::Google,
            'D' => Self::DuckDuckGo,
            'B' => Self::Bing,
            'A' => Self::Ask,
            'Y' => Self::Yahoo,
            'C' => Self::ChatGpt,
            'P' => Self::Perplexity,
            'I' => Self::Ai,
            'T' => Self::Translate,
            'U' => Self::Url,
            other => Self::Other(other),
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Self::Google => 'G',
            Self::DuckDuckGo => 'D',
            Self::Bing => 'B',
            Self::Ask => 'A',
            Self::Yahoo => 'Y',
            Self::ChatGpt => 'C',
            Self::Perplexity => 'P',
            Self::Ai => 'I',
            Self::Translate => 'T',
            Self::Url => 'U',
            Self::Other(ch) => *ch,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Google | Self::Other(_) => "Google",
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Bing => "Bing",
            Self::Ask => "Ask",
            Self::Yahoo => "Yahoo",
            Self::ChatGpt => "ChatGPT",
            Self::Perplexity => "Perplexity",
            Self::Ai => "AI",
            Self::Translate => "Translate",
            Self::Url => "URL",
        }
    }

    /// True for the engines that go through the relay and own a session.
    pub fn is_ai_class(&self) -> bool {
        matches!(self, Self::Ai | Self::Translate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub engine: EngineCode,
    pub modifier: Option<char>,
    pub term: String,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if is_web_url(trimmed) {
            return Self {
                engine: EngineCode::Url,
                modifier: None,
                term: trimmed.to_string(),
            };
        }

        let Some(token) = tokenize(trimmed)
            .into_iter()
            .find(|token| token.text.starts_with(COMMAND_SENTINEL))
        else {
            return Self {
                engine: EngineCode::Google,
                modifier: None,
                term: trimmed.to_string(),
            };
        };

        let mut rest = token.text[COMMAND_SENTINEL.len_utf8()..].chars();
        let engine = rest
            .next()
            .map(EngineCode::from_char)
            .unwrap_or(EngineCode::Google);
        let modifier = rest.next().map(|ch| ch.to_uppercase().next().unwrap_or(ch));

        Self {
            engine,
            modifier,
            term: remove_token(trimmed, &token),
        }
    }

    /// `+` always selects the higher-capability model. The older `!ip` spelling
    /// is still honored for the AI engine.
    pub fn uses_high_capability_model(&self) -> bool {
        match self.modifier {
            Some('+') => true,
            Some('P') => self.engine == EngineCode::Ai,
            _ => false,
        }
    }

    pub fn modifier_label(&self) -> Option<&'static str> {
        if self.uses_high_capability_model() {
            Some("Pro")
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }
}

fn is_web_url(candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (index, ch) in input.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                tokens.push(Token {
                    text: &input[begin..index],
                    start: begin,
                    end: index,
                });
            }
            continue;
        }
        if start.is_none() {
            start = Some(index);
        }
    }

    if let Some(begin) = start {
        tokens.push(Token {
            text: &input[begin..],
            start: begin,
            end: input.len(),
        });
    }

    tokens
}

// Drops the token together with the whitespace run that follows it so the
// words around it stay single-spaced.
fn remove_token(line: &str, token: &Token<'_>) -> String {
    let tail = &line[token.end..];
    let tail = tail.trim_start();
    let head = &line[..token.start];

    let mut out = String::with_capacity(head.len() + tail.len());
    out.push_str(head);
    out.push_str(tail);
    out.trim().to_string()
}

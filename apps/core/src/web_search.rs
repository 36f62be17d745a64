use std::collections::BTreeMap;

use crate::command::EngineCode;

const ENGINE_BASE_URLS: [(char, &str); 7] = [
    ('G', "https://www.google.com/search?q="),
    ('D', "https://www.duckduckgo.com/?q="),
    ('B', "https://www.bing.com/search?q="),
    ('A', "https://www.ask.com/web?q="),
    ('Y', "https://www.yahoo.com/search?p="),
    ('C', "https://chat.openai.com/?q="),
    ('P', "https://www.perplexity.ai/search?q="),
];

const FALLBACK_ENGINE: char = 'G';

/// Per-letter base URLs layered over the built-in table, keyed by uppercase letter.
pub type EngineOverrides = BTreeMap<char, String>;

pub fn base_url<'a>(code: char, overrides: &'a EngineOverrides) -> &'a str {
    let code = code.to_ascii_uppercase();
    if let Some(url) = overrides.get(&code) {
        return url;
    }
    if let Some(url) = builtin_base_url(code) {
        return url;
    }
    overrides
        .get(&FALLBACK_ENGINE)
        .map(String::as_str)
        .or_else(|| builtin_base_url(FALLBACK_ENGINE))
        .unwrap_or(ENGINE_BASE_URLS[0].1)
}

pub fn search_url(engine: EngineCode, term: &str, overrides: &EngineOverrides) -> Option<String> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return None;
    }
    let base = base_url(engine.as_char(), overrides);
    Some(format!("{base}{}", urlencoding::encode(trimmed)))
}

fn builtin_base_url(code: char) -> Option<&'static str> {
    ENGINE_BASE_URLS
        .iter()
        .find(|(letter, _)| *letter == code)
        .map(|(_, url)| *url)
}

#[cfg(test)]
mod tests {
    use super::{base_url, search_url, EngineOverrides};
    use crate::command::EngineCode;

    #[test]
    fn encodes_term_onto_engine_base() {
        let url = search_url(EngineCode::Google, "hello world", &EngineOverrides::new());
        assert_eq!(
            url.as_deref(),
            Some("https://www.google.com/search?q=hello%20world")
        );

        let yahoo = search_url(EngineCode::Yahoo, "a&b", &EngineOverrides::new());
        assert_eq!(yahoo.as_deref(), Some("https://www.yahoo.com/search?p=a%26b"));
    }

    #[test]
    fn empty_term_builds_nothing() {
        assert!(search_url(EngineCode::Bing, "   ", &EngineOverrides::new()).is_none());
    }

    #[test]
    fn unknown_letter_falls_back_to_google() {
        let url = search_url(EngineCode::Other('Z'), "rust", &EngineOverrides::new());
        assert_eq!(url.as_deref(), Some("https://www.google.com/search?q=rust"));
    }

    #[test]
    fn overrides_replace_and_extend_the_table() {
        let mut overrides = EngineOverrides::new();
        overrides.insert('G', "https://search.example/?q=".to_string());
        overrides.insert('W', "https://en.wikipedia.org/wiki/Special:Search?search=".to_string());

        assert_eq!(base_url('g', &overrides), "https://search.example/?q=");
        assert_eq!(
            search_url(EngineCode::Other('W'), "rust lang", &overrides).as_deref(),
            Some("https://en.wikipedia.org/wiki/Special:Search?search=rust%20lang")
        );
        assert_eq!(base_url('Q', &overrides), "https://search.example/?q=");
    }
}

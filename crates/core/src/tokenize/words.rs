use regex::Regex;
use std::sync::OnceLock;

use super::{Token, TokenKind};

fn word_or_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}_]+|\s+").unwrap())
}

/// Maximal runs of `[\p{L}\p{N}_]+` become word tokens, maximal runs of `\s+`
/// become whitespace tokens, and every remaining scalar becomes its own
/// single-character punctuation token.
pub fn tokenize_words(text: &str) -> Vec<Token> {
    let re = word_or_space_re();
    let mut tokens = Vec::new();
    let mut cursor = 0;

    for m in re.find_iter(text) {
        if m.start() > cursor {
            for c in text[cursor..m.start()].chars() {
                tokens.push(Token::new(c.to_string(), TokenKind::Punctuation));
            }
        }
        let kind = if m.as_str().chars().next().map(|c| c.is_whitespace()).unwrap_or(false) {
            TokenKind::Whitespace
        } else {
            TokenKind::Word
        };
        tokens.push(Token::new(m.as_str(), kind));
        cursor = m.end();
    }
    if cursor < text.len() {
        for c in text[cursor..].chars() {
            tokens.push(Token::new(c.to_string(), TokenKind::Punctuation));
        }
    }
    tokens
}

/// Identical token boundaries to [`tokenize_words`]; equality during alignment is
/// handled separately via `Tokenizer::tokens_equal`, so this is just an alias kept
/// for callers that want the distinction explicit.
pub fn tokenize_words_case_insensitive(text: &str) -> Vec<Token> {
    tokenize_words(text)
}

//! Tokenizer strategies used by the reconciler (`SPEC_FULL.md` §4.1).

mod characters;
mod words;

pub use characters::tokenize_characters;
pub use words::{tokenize_words, tokenize_words_case_insensitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Whitespace,
    Punctuation,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

impl Token {
    fn new(text: impl Into<String>, kind: TokenKind) -> Self {
        Self { text: text.into(), kind }
    }
}

/// The stable wire identifiers for the three tokenizer strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tokenizer {
    Characters,
    Words,
    WordsCaseInsensitive,
}

impl Tokenizer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tokenizer::Characters => "characters",
            Tokenizer::Words => "words",
            Tokenizer::WordsCaseInsensitive => "words-case-insensitive",
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        match self {
            Tokenizer::Characters => tokenize_characters(text),
            Tokenizer::Words => tokenize_words(text),
            Tokenizer::WordsCaseInsensitive => tokenize_words(text),
        }
    }

    /// Whether two tokens should be treated as equal for alignment purposes.
    pub fn tokens_equal(&self, a: &Token, b: &Token) -> bool {
        match self {
            Tokenizer::WordsCaseInsensitive if a.kind == TokenKind::Word && b.kind == TokenKind::Word => {
                unicase::eq(a.text.as_str(), b.text.as_str())
            }
            _ => a.text == b.text,
        }
    }
}

impl std::str::FromStr for Tokenizer {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "characters" => Ok(Tokenizer::Characters),
            "words" => Ok(Tokenizer::Words),
            "words-case-insensitive" => Ok(Tokenizer::WordsCaseInsensitive),
            other => Err(format!("unknown tokenizer: {other}")),
        }
    }
}

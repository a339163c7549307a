use super::{Token, TokenKind};

/// Each Unicode scalar value becomes its own token.
pub fn tokenize_characters(text: &str) -> Vec<Token> {
    text.chars()
        .map(|c| {
            let kind = if c.is_whitespace() {
                TokenKind::Whitespace
            } else if c.is_alphanumeric() || c == '_' {
                TokenKind::Word
            } else {
                TokenKind::Punctuation
            };
            Token::new(c.to_string(), kind)
        })
        .collect()
}

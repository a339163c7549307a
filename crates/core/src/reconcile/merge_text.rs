//! Convenience wrapper invoked by file-write operations: always `words` tokenizer,
//! always LF-normalized, always projects to plain text.

use super::reconcile_text;
use crate::tokenize::Tokenizer;

fn normalize_line_endings(s: &str) -> String {
    s.replace("\r\n", "\n")
}

/// Three-way merge of `original`/`current`/`incoming`, normalizing CRLF to LF first
/// and returning LF-terminated output.
pub fn merge_text(original: &str, current: &str, incoming: &str) -> String {
    let original = normalize_line_endings(original);
    let current = normalize_line_endings(current);
    let incoming = normalize_line_endings(incoming);
    reconcile_text(&original, &current, &incoming, Tokenizer::Words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_crlf_before_merging() {
        let merged = merge_text("a\r\nb", "a\r\nb", "a\r\nc");
        assert!(!merged.contains('\r'));
    }

    #[test]
    fn no_change_is_identity() {
        assert_eq!(merge_text("same", "same", "same"), "same");
    }
}

//! Classify a byte buffer as mergeable text or opaque binary.
//!
//! A file is text if it is valid UTF-8 and contains no NUL bytes within the first
//! scan window; this is the same heuristic most editors and `diff` tools use and is
//! cheap enough to run on every write.

const SCAN_WINDOW: usize = 8192;

pub fn is_text(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SCAN_WINDOW)];
    if window.contains(&0) {
        return false;
    }
    std::str::from_utf8(bytes).is_ok()
}

/// Host line ending applied to text content on its final write to disk. The engine
/// always reconciles over LF internally (`FileOps::read` normalizes CRLF away); this
/// only affects the bytes that land on a Windows host's filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NativeLineEndings {
    #[default]
    Lf,
    Crlf,
}

/// No-op for binary content or when the host's native ending is already `Lf`.
pub fn to_native_line_endings(bytes: &[u8], native: NativeLineEndings) -> Vec<u8> {
    if native != NativeLineEndings::Crlf || !is_text(bytes) {
        return bytes.to_vec();
    }
    let text = String::from_utf8_lossy(bytes);
    text.replace("\r\n", "\n").replace('\n', "\r\n").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_text() {
        assert!(is_text(b""));
    }

    #[test]
    fn plain_utf8_is_text() {
        assert!(is_text("hello \u{1F980}".as_bytes()));
    }

    #[test]
    fn nul_byte_is_binary() {
        assert!(!is_text(b"hello\0world"));
    }

    #[test]
    fn invalid_utf8_is_binary() {
        assert!(!is_text(&[0xff, 0xfe, 0x00, 0x01]));
    }

    #[test]
    fn crlf_conversion_only_applies_to_text_when_requested() {
        assert_eq!(to_native_line_endings(b"a\nb\n", NativeLineEndings::Lf), b"a\nb\n");
        assert_eq!(to_native_line_endings(b"a\nb\n", NativeLineEndings::Crlf), b"a\r\nb\r\n");
        assert_eq!(to_native_line_endings(b"a\r\nb\n", NativeLineEndings::Crlf), b"a\r\nb\r\n");
        assert_eq!(to_native_line_endings(&[0xff, 0xfe], NativeLineEndings::Crlf), vec![0xff, 0xfe]);
    }
}

//! # Line Framing
//!
//! Reassembles newline-delimited records from arbitrarily split byte
//! fragments. A fragment may end mid-record or even mid-character; the
//! unfinished tail is held back until the next fragment arrives.
//!
//! Lines are split on `\n`; a trailing `\r` is stripped and blank lines
//! are skipped. Bytes are decoded as UTF-8 only once a line is complete,
//! so multi-byte characters split across fragments survive intact. A
//! complete line that is not valid UTF-8 is handed back as an
//! [`InvalidLine`], never repaired.

use std::str::Utf8Error;

/// A complete line whose bytes are not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLine {
    pub bytes: Vec<u8>,
    pub error: Utf8Error,
}

impl InvalidLine {
    /// Printable excerpt for logs, with invalid sequences replaced.
    pub fn excerpt(&self, max_chars: usize) -> String {
        String::from_utf8_lossy(&self.bytes).chars().take(max_chars).collect()
    }
}

/// One framed line.
pub type FramedLine = Result<String, InvalidLine>;

/// Incremental newline splitter.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every line it completes, in order.
    pub fn push(&mut self, fragment: &[u8]) -> Vec<FramedLine> {
        let mut lines = Vec::new();
        let mut rest = fragment;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];
            let raw = std::mem::take(&mut self.pending);
            if let Some(line) = decode_line(&raw) {
                lines.push(line);
            }
        }
        self.pending.extend_from_slice(rest);
        lines
    }

    /// Flush the held-back tail once the source has ended.
    pub fn finish(&mut self) -> Option<FramedLine> {
        let raw = std::mem::take(&mut self.pending);
        decode_line(&raw)
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(raw: &[u8]) -> Option<FramedLine> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    match std::str::from_utf8(raw) {
        Ok(line) => {
            let trimmed = line.trim();
            (!trimmed.is_empty()).then(|| Ok(trimmed.to_string()))
        }
        Err(error) => Some(Err(InvalidLine {
            bytes: raw.to_vec(),
            error,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed_all(fragments: &[&[u8]]) -> Vec<String> {
        let mut framer = LineFramer::new();
        let mut out = Vec::new();
        for f in fragments {
            out.extend(framer.push(f));
        }
        out.extend(framer.finish());
        out.into_iter().map(|line| line.unwrap()).collect()
    }

    #[test]
    fn holds_back_partial_line() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"{\"type\":\"prog").is_empty());
        assert_eq!(framer.pending_len(), 13);
        let lines = framer.push(b"ress\"}\n{\"a\"");
        assert_eq!(lines, vec![Ok(r#"{"type":"progress"}"#.to_string())]);
        assert_eq!(framer.finish(), Some(Ok(r#"{"a""#.to_string())));
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn strips_cr_and_skips_blank_lines() {
        let lines = feed_all(&[b"one\r\n\r\n\n  \ntwo\n"]);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn multibyte_character_split_across_fragments() {
        let text = "café ✓\n".as_bytes();
        let (a, b) = text.split_at(4);
        assert_eq!(feed_all(&[a, b]), vec!["café ✓"]);
    }

    #[test]
    fn invalid_utf8_line_is_not_repaired() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"{\"q\":\"caf\xc3\"}\nok\n");
        assert_eq!(lines.len(), 2);
        let invalid = lines[0].clone().unwrap_err();
        assert_eq!(invalid.error.valid_up_to(), 9);
        assert!(invalid.excerpt(80).contains('\u{FFFD}'));
        assert_eq!(lines[1], Ok("ok".to_string()));
    }

    #[test]
    fn finish_on_empty_buffer() {
        assert_eq!(LineFramer::new().finish(), None);
    }

    // ── split invariance ─────────────────────────────────────────────

    fn arb_stream() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z0-9{}\":, é]{0,24}", 0..12).prop_map(|lines| {
            let mut s = lines.join("\n");
            s.push('\n');
            s
        })
    }

    proptest! {
        #[test]
        fn any_split_yields_same_lines(
            stream in arb_stream(),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let bytes = stream.as_bytes();
            let whole = feed_all(&[bytes]);

            let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
            offsets.sort_unstable();
            offsets.dedup();
            let mut fragments = Vec::new();
            let mut start = 0;
            for off in offsets {
                fragments.push(&bytes[start..off]);
                start = off;
            }
            fragments.push(&bytes[start..]);

            prop_assert_eq!(feed_all(&fragments), whole);
        }
    }
}

//! # Event Decoding
//!
//! Turns raw stream fragments into [`StreamEvent`]s. Each completed line
//! is parsed on its own; a line that fails to parse, or is not valid
//! UTF-8, is logged, counted and dropped, and decoding continues with the
//! next line.

use rai_core::{StreamEvent, StreamParseError};

use crate::framing::{FramedLine, LineFramer};

const EXCERPT_CHARS: usize = 120;

/// Parse one stream line.
pub fn parse_line(line_no: u64, line: &str) -> Result<StreamEvent, StreamParseError> {
    serde_json::from_str(line).map_err(|e| StreamParseError {
        line_no,
        message: e.to_string(),
        excerpt: line.chars().take(EXCERPT_CHARS).collect(),
    })
}

/// Fragment-to-event decoder for one analysis run.
#[derive(Debug, Default)]
pub struct EventDecoder {
    framer: LineFramer,
    lines_seen: u64,
    dropped: Vec<StreamParseError>,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every event completed by `fragment`.
    pub fn push(&mut self, fragment: &[u8]) -> Vec<StreamEvent> {
        let lines = self.framer.push(fragment);
        lines.into_iter().filter_map(|l| self.decode(l)).collect()
    }

    /// Decode whatever the source left unterminated.
    ///
    /// A stream may end without a final newline; the tail gets one chance
    /// to parse as a complete record.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let tail = self.framer.finish()?;
        self.decode(tail)
    }

    /// Non-blank lines seen so far.
    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    /// Lines dropped as malformed, in stream order.
    pub fn dropped(&self) -> &[StreamParseError] {
        &self.dropped
    }

    fn decode(&mut self, line: FramedLine) -> Option<StreamEvent> {
        self.lines_seen += 1;
        let parsed = match line {
            Ok(text) => parse_line(self.lines_seen, &text),
            Err(invalid) => Err(StreamParseError {
                line_no: self.lines_seen,
                message: invalid.error.to_string(),
                excerpt: invalid.excerpt(EXCERPT_CHARS),
            }),
        };
        match parsed {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(
                    line_no = err.line_no,
                    excerpt = %err.excerpt,
                    "dropping malformed stream line: {}",
                    err.message
                );
                self.dropped.push(err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rai_core::{
        AnalysisProgress, CompletePayload, ComplianceResultItem, DeterminationStatus,
    };

    fn sample_stream() -> (Vec<StreamEvent>, String) {
        let mut events = vec![StreamEvent::Progress(AnalysisProgress::starting(3))];
        for (i, status) in [
            DeterminationStatus::Yes,
            DeterminationStatus::No,
            DeterminationStatus::NotApplicable,
        ]
        .into_iter()
        .enumerate()
        {
            let mut item = ComplianceResultItem::new(format!("IAS_1_q{}", i + 1), "IAS 1", status);
            item.explanation = "Disclosed in note 4, \"Revenue\"\nsecond line".to_string();
            events.push(StreamEvent::Result(item));
        }
        events.push(StreamEvent::Complete(CompletePayload {
            total: 3,
            ..CompletePayload::default()
        }));
        let body: String = events.iter().map(|e| e.to_line().unwrap()).collect();
        (events, body)
    }

    fn decode_fragments(fragments: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = EventDecoder::new();
        let mut out = Vec::new();
        for f in fragments {
            out.extend(decoder.push(f));
        }
        out.extend(decoder.finish());
        out
    }

    #[test]
    fn decodes_whole_stream() {
        let (events, body) = sample_stream();
        assert_eq!(decode_fragments(&[body.as_bytes()]), events);
    }

    #[test]
    fn malformed_line_is_dropped_and_run_continues() {
        let body = concat!(
            r#"{"type":"progress","data":{"total_questions":2,"completed_questions":0}}"#,
            "\n",
            r#"{"type":"result","data":{"question_id":"#,
            "\n",
            r#"{"type":"heartbeat","data":{}}"#,
            "\n",
            r#"{"type":"complete","data":{"total":2}}"#,
            "\n",
        );
        let mut decoder = EventDecoder::new();
        let events = decoder.push(body.as_bytes());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), "progress");
        assert_eq!(events[1].kind(), "complete");
        assert_eq!(decoder.lines_seen(), 4);
        let dropped: Vec<u64> = decoder.dropped().iter().map(|e| e.line_no).collect();
        assert_eq!(dropped, vec![2, 3]);
    }

    #[test]
    fn invalid_utf8_result_is_dropped_not_mangled() {
        let mut body = Vec::new();
        body.extend_from_slice(br#"{"type":"result","data":{"question_id":"IAS_1_q1","section":"IAS 1","status":"YES","explanation":"caf"#);
        body.push(0xff);
        body.extend_from_slice(b"\"}}\n");
        body.extend_from_slice(br#"{"type":"complete","data":{"total":1}}"#);
        body.push(b'\n');

        let mut decoder = EventDecoder::new();
        let events = decoder.push(&body);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "complete");
        assert_eq!(decoder.dropped().len(), 1);
        assert_eq!(decoder.dropped()[0].line_no, 1);
        assert!(decoder.dropped()[0].message.contains("utf-8"));
    }

    #[test]
    fn unterminated_final_record_is_parsed() {
        let mut decoder = EventDecoder::new();
        assert!(decoder
            .push(br#"{"type":"complete","data":{"total":1}}"#)
            .is_empty());
        assert_eq!(decoder.finish().map(|e| e.kind()), Some("complete"));
    }

    #[test]
    fn truncated_final_record_is_dropped() {
        let mut decoder = EventDecoder::new();
        decoder.push(br#"{"type":"complete","da"#);
        assert!(decoder.finish().is_none());
        assert_eq!(decoder.dropped().len(), 1);
    }

    // ── split invariance ─────────────────────────────────────────────

    proptest! {
        #[test]
        fn arbitrary_splits_yield_identical_events(
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..16),
        ) {
            let (events, body) = sample_stream();
            let bytes = body.as_bytes();
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
            prop_assert_eq!(decode_fragments(&fragments), events);
        }
    }

    #[test]
    fn byte_at_a_time() {
        let (events, body) = sample_stream();
        let fragments: Vec<&[u8]> = body.as_bytes().chunks(1).collect();
        assert_eq!(decode_fragments(&fragments), events);
    }
}

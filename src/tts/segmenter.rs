//! Incremental sentence segmentation for speech synthesis
//!
//! Slices the growing answer buffer into sentence spans at punctuation
//! boundaries. Spans are emitted in textual order exactly once; a monotone
//! cursor marks how far the buffer has been dispatched. Short clauses are
//! skipped over rather than synthesized on their own, and the remainder is
//! flushed once the stream completes.

/// Outcome of one segmentation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmenterStep {
    /// A span is ready for synthesis; the cursor advances to `next_cursor`
    Emit {
        /// The sentence text, including its terminating punctuation run
        span: String,
        /// Byte index just past the emitted span
        next_cursor: usize,
    },
    /// No boundary yet and the stream is still producing — poll again shortly
    Wait,
    /// The stream is done and the buffer is fully dispatched
    Complete,
}

/// Finds sentence boundaries in a growing text buffer
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    boundary: Vec<char>,
    min_len: usize,
}

impl SentenceSegmenter {
    /// Create a segmenter with the given boundary marks and minimum span
    /// length (in chars, measured up to the boundary mark)
    #[must_use]
    pub fn new(marks: &str, min_len: usize) -> Self {
        Self {
            boundary: marks.chars().collect(),
            min_len,
        }
    }

    /// Whether `c` is a configured boundary mark
    fn is_boundary(&self, c: char) -> bool {
        self.boundary.contains(&c)
    }

    /// Compute the next step for `text` given the current `cursor` position
    ///
    /// Emits at most one span per call. `cursor` must lie on a char boundary;
    /// the returned `next_cursor` always does.
    #[must_use]
    pub fn next_step(&self, text: &str, cursor: usize, stream_done: bool) -> SegmenterStep {
        debug_assert!(cursor <= text.len());

        if cursor >= text.len() {
            return if stream_done {
                SegmenterStep::Complete
            } else {
                SegmenterStep::Wait
            };
        }

        let mut scan_from = cursor;
        loop {
            // Earliest boundary mark at or after the scan position. Scanning
            // forward char by char gives the same answer as taking the minimum
            // over each mark's first occurrence.
            let found = text[scan_from..]
                .char_indices()
                .find(|&(_, c)| self.is_boundary(c))
                .map(|(i, c)| (scan_from + i, c));

            let Some((pos, mark)) = found else {
                // No boundary in the unscanned tail.
                return if stream_done {
                    SegmenterStep::Emit {
                        span: text[cursor..].to_string(),
                        next_cursor: text.len(),
                    }
                } else {
                    SegmenterStep::Wait
                };
            };

            let span_chars = text[cursor..pos].chars().count();
            if span_chars >= self.min_len {
                // Consecutive boundary marks ("?!", "。。") collapse into one
                // boundary; the whole run rides along with the span.
                let mut end = pos + mark.len_utf8();
                for c in text[end..].chars() {
                    if self.is_boundary(c) {
                        end += c.len_utf8();
                    } else {
                        break;
                    }
                }
                return SegmenterStep::Emit {
                    span: text[cursor..end].to_string(),
                    next_cursor: end,
                };
            }

            // Too short — keep scanning past this boundary without emitting.
            scan_from = pos + mark.len_utf8();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter(min_len: usize) -> SentenceSegmenter {
        SentenceSegmenter::new("。！？；.!?;", min_len)
    }

    #[test]
    fn emits_first_sentence_at_boundary() {
        let seg = segmenter(5);
        let text = "Hello world. How are you? Fine";

        let step = seg.next_step(text, 0, false);
        assert_eq!(
            step,
            SegmenterStep::Emit {
                span: "Hello world.".to_string(),
                next_cursor: 12,
            }
        );
    }

    #[test]
    fn scenario_walkthrough_with_held_remainder() {
        let seg = segmenter(5);
        let text = "Hello world. How are you? Fine";

        let SegmenterStep::Emit { next_cursor, .. } = seg.next_step(text, 0, false) else {
            panic!("expected first sentence");
        };

        let step = seg.next_step(text, next_cursor, false);
        let SegmenterStep::Emit { span, next_cursor } = step else {
            panic!("expected second sentence");
        };
        assert_eq!(span, " How are you?");

        // The unterminated remainder is held back while the stream produces...
        assert_eq!(seg.next_step(text, next_cursor, false), SegmenterStep::Wait);

        // ...and flushed once it completes, even though it is short.
        let step = seg.next_step(text, next_cursor, true);
        assert_eq!(
            step,
            SegmenterStep::Emit {
                span: " Fine".to_string(),
                next_cursor: text.len(),
            }
        );

        assert_eq!(seg.next_step(text, text.len(), true), SegmenterStep::Complete);
    }

    #[test]
    fn short_clause_is_skipped_not_emitted() {
        let seg = segmenter(6);
        // "Hi." is below the minimum; the scan continues to the next boundary
        // and the whole prefix is emitted as one span.
        let text = "Hi. This is a longer sentence. tail";

        let step = seg.next_step(text, 0, false);
        assert_eq!(
            step,
            SegmenterStep::Emit {
                span: "Hi. This is a longer sentence.".to_string(),
                next_cursor: 30,
            }
        );
    }

    #[test]
    fn short_clauses_only_wait_until_done() {
        let seg = segmenter(10);
        let text = "Ok. Sure.";

        assert_eq!(seg.next_step(text, 0, false), SegmenterStep::Wait);

        let step = seg.next_step(text, 0, true);
        assert_eq!(
            step,
            SegmenterStep::Emit {
                span: "Ok. Sure.".to_string(),
                next_cursor: text.len(),
            }
        );
    }

    #[test]
    fn adjacent_terminators_collapse_into_one_boundary() {
        let seg = segmenter(5);
        let text = "Really?! Yes indeed.";

        let step = seg.next_step(text, 0, false);
        assert_eq!(
            step,
            SegmenterStep::Emit {
                span: "Really?!".to_string(),
                next_cursor: 8,
            }
        );
    }

    #[test]
    fn cjk_punctuation_and_text() {
        let seg = segmenter(2);
        let text = "你好世界。后续内容";

        let step = seg.next_step(text, 0, false);
        let SegmenterStep::Emit { span, next_cursor } = step else {
            panic!("expected emission");
        };
        assert_eq!(span, "你好世界。");
        // Cursor lands on a char boundary just past the full-width mark.
        assert!(text.is_char_boundary(next_cursor));
        assert_eq!(&text[next_cursor..], "后续内容");
    }

    #[test]
    fn cjk_adjacent_marks_collapse() {
        let seg = segmenter(2);
        let text = "什么？！真的吗";
        let step = seg.next_step(text, 0, false);
        let SegmenterStep::Emit { span, next_cursor } = step else {
            panic!("expected emission");
        };
        assert_eq!(span, "什么？！");
        assert_eq!(&text[next_cursor..], "真的吗");
    }

    #[test]
    fn exact_minimum_length_is_emitted() {
        let seg = segmenter(5);
        let text = "12345. rest";
        let step = seg.next_step(text, 0, false);
        assert_eq!(
            step,
            SegmenterStep::Emit {
                span: "12345.".to_string(),
                next_cursor: 6,
            }
        );
    }

    #[test]
    fn leading_boundary_mark_is_skipped_forward() {
        let seg = segmenter(3);
        let text = "。首先是这样。然后呢";
        let step = seg.next_step(text, 0, false);
        let SegmenterStep::Emit { span, .. } = step else {
            panic!("expected emission");
        };
        assert_eq!(span, "。首先是这样。");
    }

    #[test]
    fn empty_buffer_waits_or_completes() {
        let seg = segmenter(5);
        assert_eq!(seg.next_step("", 0, false), SegmenterStep::Wait);
        assert_eq!(seg.next_step("", 0, true), SegmenterStep::Complete);
    }

    #[test]
    fn cursor_never_regresses_and_never_overruns() {
        let seg = segmenter(4);
        let text = "One sentence. Two sentence! Three";
        let mut cursor = 0;
        loop {
            match seg.next_step(text, cursor, true) {
                SegmenterStep::Emit { next_cursor, .. } => {
                    assert!(next_cursor > cursor);
                    assert!(next_cursor <= text.len());
                    cursor = next_cursor;
                }
                SegmenterStep::Complete => break,
                SegmenterStep::Wait => panic!("done stream never waits"),
            }
        }
        assert_eq!(cursor, text.len());
    }
}

//! Text preprocessing for speech synthesis
//!
//! Strips markup that reads poorly aloud: code fences and inline code are
//! dropped, emphasis and heading syntax is reduced to plain words, links keep
//! their label, and whitespace runs collapse to single spaces.

/// Prepare one sentence span for speech synthesis
///
/// Returns an empty string when nothing speakable remains; the caller treats
/// that as a completed synthesis step with no audio.
#[must_use]
pub fn prepare_for_speech(text: &str) -> String {
    let without_fences = strip_code_fences(text);
    let without_inline = strip_inline_code(&without_fences);

    let mut out = String::with_capacity(without_inline.len());
    let mut chars = without_inline.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // Emphasis / heading / list markup reads as noise.
            '*' | '#' | '`' | '~' | '>' => {}
            '[' => {
                // Link label: keep the text, drop the target.
                let mut label = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    label.push(inner);
                }
                if closed && chars.peek() == Some(&'(') {
                    chars.next();
                    for inner in chars.by_ref() {
                        if inner == ')' {
                            break;
                        }
                    }
                }
                out.push_str(&label);
            }
            _ => out.push(c),
        }
    }

    collapse_whitespace(&out)
}

/// Drop fenced code blocks entirely
fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_fence = false;
    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence {
            out.push_str(line);
        }
    }
    // An unclosed fence swallows the rest of the span; spoken output prefers
    // silence over reading code aloud.
    out
}

/// Drop `inline code` spans, keeping surrounding prose
fn strip_inline_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_code = false;
    for c in text.chars() {
        if c == '`' {
            in_code = !in_code;
            continue;
        }
        if !in_code {
            out.push(c);
        }
    }
    out
}

/// Collapse whitespace runs to single spaces and trim the ends
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

// File: src/stream.rs
//! Progressive reveal of AI answers.
//!
//! An answer is trimmed once, then handed out as growing prefixes of
//! `chunk` characters. Every prefix is converted from scratch, so the
//! displayed markup is always a valid conversion of *some* prefix. Once the
//! text is exhausted the finished answer gets the full treatment: one last
//! conversion, math typesetting, and copy buttons on code blocks.
use crate::markup::{self, RichText};

pub const DEFAULT_CHUNK_CHARS: usize = 3;
pub const LOADING_ID_PREFIX: &str = "loading";
pub const ERROR_PREFIX: &str = "Error:";

/// Yields `ceil(len / chunk)` prefixes of the trimmed text, the last one
/// being the whole of it. Counts characters, not bytes.
#[derive(Debug, Clone)]
pub struct Reveal {
    source: String,
    chunk: usize,
    revealed: usize,
    total: usize,
}

impl Reveal {
    pub fn new(text: &str, chunk: usize) -> Self {
        let source = text.trim().to_string();
        let total = source.chars().count();
        Self {
            source,
            chunk: chunk.max(1),
            revealed: 0,
            total,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn total_ticks(&self) -> usize {
        self.total.div_ceil(self.chunk)
    }

    pub fn is_done(&self) -> bool {
        self.revealed >= self.total
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.source
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.source.len())
    }
}

impl Iterator for Reveal {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.is_done() {
            return None;
        }
        self.revealed = (self.revealed + self.chunk).min(self.total);
        let end = self.byte_offset(self.revealed);
        Some(self.source[..end].to_string())
    }
}

/// Conversion applied to a completely revealed answer.
pub fn finalize(source: &str) -> RichText {
    let mut rich = markup::convert(source);
    markup::typeset_math(&mut rich);
    markup::attach_copy_buttons(&mut rich);
    rich
}

/// Whether a reply skips conversion and reveal altogether.
pub fn is_plain_reply(text: &str, id: Option<&str>) -> bool {
    id.is_some_and(|id| id.starts_with(LOADING_ID_PREFIX)) || text.starts_with(ERROR_PREFIX)
}

#[derive(Debug, Clone)]
pub struct RevealState {
    reveal: Reveal,
    current: RichText,
    ticks: usize,
}

impl RevealState {
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn current(&self) -> &RichText {
        &self.current
    }
}

/// What a chat bubble shows right now.
#[derive(Debug, Clone)]
pub enum MessageContent {
    /// Shown verbatim: user input, the loading placeholder, error replies.
    Plain(String),
    Streaming(RevealState),
    Final(RichText),
}

impl MessageContent {
    pub fn plain(text: &str) -> Self {
        MessageContent::Plain(text.to_string())
    }

    /// Chooses between the verbatim fast path and a progressive reveal.
    pub fn for_reply(text: &str, id: Option<&str>, chunk: usize) -> Self {
        if is_plain_reply(text, id) {
            return MessageContent::Plain(text.to_string());
        }
        MessageContent::Streaming(RevealState {
            reveal: Reveal::new(text, chunk),
            current: RichText::default(),
            ticks: 0,
        })
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, MessageContent::Streaming(_))
    }

    /// One reveal tick. The tick after the last chunk swaps in the final
    /// rendering. Returns false when there was nothing left to do.
    pub fn advance(&mut self) -> bool {
        let MessageContent::Streaming(state) = self else {
            return false;
        };
        match state.reveal.next() {
            Some(prefix) => {
                state.current = markup::convert(&prefix);
                state.ticks += 1;
            }
            None => {
                let done = finalize(state.reveal.source());
                tracing::trace!(ticks = state.ticks, "reveal finished");
                *self = MessageContent::Final(done);
            }
        }
        true
    }

    /// Runs the reveal to completion.
    pub fn finish(&mut self) {
        while self.advance() {}
    }

    pub fn rich(&self) -> RichText {
        match self {
            MessageContent::Plain(text) => RichText::plain(text),
            MessageContent::Streaming(state) => state.current.clone(),
            MessageContent::Final(rich) => rich.clone(),
        }
    }

    /// Code blocks that have copy buttons. Only finished answers have any.
    pub fn code_blocks(&self) -> &[markup::CodeBlock] {
        match self {
            MessageContent::Final(rich) => &rich.code_blocks,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::LineKind;

    #[test]
    fn test_reveal_tick_count_and_prefixes() {
        let reveal = Reveal::new("  abcdefg \n", 3);
        assert_eq!(reveal.total_ticks(), 3);
        let prefixes: Vec<String> = reveal.collect();
        assert_eq!(prefixes, vec!["abc", "abcdef", "abcdefg"]);
    }

    #[test]
    fn test_reveal_counts_characters() {
        let prefixes: Vec<String> = Reveal::new("äöü€x", 2).collect();
        assert_eq!(prefixes, vec!["äö", "äöü€", "äöü€x"]);
    }

    #[test]
    fn test_reveal_of_empty_text() {
        let mut reveal = Reveal::new("   ", 3);
        assert_eq!(reveal.total_ticks(), 0);
        assert!(reveal.next().is_none());
    }

    #[test]
    fn test_streaming_ends_in_one_shot_conversion() {
        let text = "## Steps\n\n1. **Read** the brief\n2. Draft an outline\n";
        let mut content = MessageContent::for_reply(text, None, 3);
        let expected_ticks = text.trim().chars().count().div_ceil(3);

        let mut ticks = 0;
        let mut last_prefix_render = None;
        while content.is_streaming() {
            content.advance();
            if let MessageContent::Streaming(state) = &content {
                ticks = state.ticks();
                last_prefix_render = Some(state.current().clone());
            }
        }
        assert_eq!(ticks, expected_ticks);
        assert_eq!(last_prefix_render.unwrap(), markup::convert(text.trim()));

        let MessageContent::Final(rich) = &content else {
            panic!("reveal did not finish");
        };
        assert_eq!(*rich, markup::convert(text.trim()));
        assert!(!content.advance());
    }

    #[test]
    fn test_final_pass_typesets_and_adds_copy_buttons() {
        let mut content = MessageContent::for_reply("Use $x^2$:\n\n```\nx * x\n```", None, 4);
        content.finish();
        let rich = content.rich();
        assert!(rich.lines[0].text().contains("x²"));
        assert!(rich.lines.iter().any(|l| l.kind == LineKind::CopyButton(0)));
        assert_eq!(content.code_blocks()[0].content, "x * x");
    }

    #[test]
    fn test_loading_and_error_bypass_conversion() {
        let loading = MessageContent::for_reply("Thinking...", Some("loading-42"), 3);
        assert!(matches!(loading, MessageContent::Plain(ref t) if t == "Thinking..."));

        let error = MessageContent::for_reply("Error: **quota** exceeded", Some("msg-1"), 3);
        let MessageContent::Plain(text) = &error else {
            panic!("error reply was converted");
        };
        assert_eq!(text, "Error: **quota** exceeded");
        assert!(!error.rich().lines[0].spans[0].style.bold);

        // Only a leading marker counts.
        assert!(MessageContent::for_reply("No Error: here", None, 3).is_streaming());
    }
}

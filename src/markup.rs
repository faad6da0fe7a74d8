// File: src/markup.rs
//! Markdown to styled lines for the chat panel, plus the post-passes that
//! only run on a finished answer (math typesetting, copy buttons).
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub code: bool,
    pub link: bool,
    pub math: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichSpan {
    pub text: String,
    pub style: SpanStyle,
}

impl RichSpan {
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            style: SpanStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Text,
    Heading(u8),
    Code,
    Quote,
    Rule,
    /// Copy affordance for `code_blocks[n]`.
    CopyButton(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichLine {
    pub kind: LineKind,
    pub spans: Vec<RichSpan>,
}

impl RichLine {
    fn new(kind: LineKind, spans: Vec<RichSpan>) -> Self {
        Self { kind, spans }
    }

    fn blank() -> Self {
        Self::new(LineKind::Text, Vec::new())
    }

    pub fn is_blank(&self) -> bool {
        self.kind == LineKind::Text && self.spans.iter().all(|s| s.text.trim().is_empty())
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub content: String,
    /// Index of the block's last line in `RichText::lines`.
    last_line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub lines: Vec<RichLine>,
    pub code_blocks: Vec<CodeBlock>,
}

impl RichText {
    /// Verbatim text, one line per input line, no markup interpretation.
    pub fn plain(text: &str) -> Self {
        Self {
            lines: text
                .lines()
                .map(|l| RichLine::new(LineKind::Text, vec![RichSpan::plain(l)]))
                .collect(),
            code_blocks: Vec::new(),
        }
    }

    pub fn to_plain_string(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Default)]
struct Converter {
    out: RichText,
    current: Vec<RichSpan>,
    style: SpanStyle,
    bold: u32,
    italic: u32,
    strike: u32,
    heading: Option<u8>,
    quote_depth: u32,
    code: Option<(Option<String>, String)>,
    lists: Vec<Option<u64>>,
    item_prefix: Option<String>,
    links: Vec<String>,
}

impl Converter {
    fn refresh_style(&mut self) {
        self.style.bold = self.bold > 0 || self.heading.is_some();
        self.style.italic = self.italic > 0;
        self.style.strike = self.strike > 0;
        self.style.link = !self.links.is_empty();
    }

    fn push_span(&mut self, text: &str, style: SpanStyle) {
        if let Some(prefix) = self.item_prefix.take() {
            self.current.push(RichSpan::plain(&prefix));
        }
        if let Some(last) = self.current.last_mut()
            && last.style == style
        {
            last.text.push_str(text);
            return;
        }
        self.current.push(RichSpan {
            text: text.to_string(),
            style,
        });
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let kind = match (self.heading, self.quote_depth) {
            (Some(level), _) => LineKind::Heading(level),
            (None, 0) => LineKind::Text,
            (None, _) => LineKind::Quote,
        };
        let spans = std::mem::take(&mut self.current);
        self.out.lines.push(RichLine::new(kind, spans));
    }

    fn separate(&mut self) {
        self.flush();
        if self.out.lines.last().is_some_and(|l| !l.is_blank()) {
            self.out.lines.push(RichLine::blank());
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                self.heading = Some(level as u8);
            }
            Tag::BlockQuote { .. } => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|s| s.to_string())
                        .filter(|s| !s.is_empty()),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{}. ", n);
                        *n += 1;
                        m
                    }
                    _ => "• ".to_string(),
                };
                self.item_prefix = Some(format!("{}{}", indent, marker));
            }
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link { dest_url, .. } => self.links.push(dest_url.to_string()),
            _ => {}
        }
        self.refresh_style();
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.separate();
                } else {
                    self.flush();
                }
            }
            TagEnd::Heading(_) => {
                self.flush();
                self.heading = None;
                self.separate();
            }
            TagEnd::BlockQuote { .. } => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.separate();
            }
            TagEnd::CodeBlock => {
                if let Some((language, content)) = self.code.take() {
                    let content = content.trim_end_matches('\n').to_string();
                    for line in content.split('\n') {
                        self.out.lines.push(RichLine::new(
                            LineKind::Code,
                            vec![RichSpan {
                                text: line.to_string(),
                                style: SpanStyle {
                                    code: true,
                                    ..SpanStyle::default()
                                },
                            }],
                        ));
                    }
                    let last_line = self.out.lines.len() - 1;
                    self.out.code_blocks.push(CodeBlock {
                        language,
                        content,
                        last_line,
                    });
                }
                self.separate();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.separate();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::Link => {
                if let Some(url) = self.links.pop() {
                    let shown = self.current.last().map(|s| s.text.as_str()) == Some(url.as_str());
                    if !url.is_empty() && !shown {
                        self.refresh_style();
                        let style = self.style;
                        self.push_span(&format!(" ({})", url), style);
                    }
                }
            }
            _ => {}
        }
        self.refresh_style();
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, buf)) = self.code.as_mut() {
                    buf.push_str(&text);
                } else {
                    let style = self.style;
                    // Text inside a heading/paragraph never contains newlines,
                    // but raw HTML passthrough can.
                    for (i, part) in text.split('\n').enumerate() {
                        if i > 0 {
                            self.flush();
                        }
                        if !part.is_empty() {
                            self.push_span(part, style);
                        }
                    }
                }
            }
            Event::Code(code) => {
                let style = SpanStyle {
                    code: true,
                    ..self.style
                };
                self.push_span(&code, style);
            }
            Event::InlineMath(tex) => {
                let style = SpanStyle {
                    math: true,
                    ..self.style
                };
                self.push_span(&format!("${}$", tex), style);
            }
            Event::DisplayMath(tex) => {
                self.flush();
                let style = SpanStyle {
                    math: true,
                    ..SpanStyle::default()
                };
                self.push_span(&format!("$${}$$", tex), style);
                self.flush();
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = self.style;
                self.push_span(html.trim_end_matches('\n'), style);
            }
            Event::SoftBreak => {
                let style = self.style;
                self.push_span(" ", style);
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.out.lines.push(RichLine::new(LineKind::Rule, Vec::new()));
            }
            Event::TaskListMarker(done) => {
                let style = self.style;
                self.push_span(if done { "[x] " } else { "[ ] " }, style);
            }
            _ => {}
        }
    }

    fn finish(mut self) -> RichText {
        self.flush();
        while self.out.lines.last().is_some_and(|l| l.is_blank()) {
            self.out.lines.pop();
        }
        self.out
    }
}

/// Converts the whole `source` from scratch. Called with every revealed
/// prefix, so it must cope with unterminated markup.
pub fn convert(source: &str) -> RichText {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);

    let mut converter = Converter::default();
    for event in Parser::new_ext(source, options) {
        converter.event(event);
    }
    converter.finish()
}

/// Replaces TeX in math spans with a Unicode rendering.
pub fn typeset_math(rich: &mut RichText) {
    for line in &mut rich.lines {
        for span in &mut line.spans {
            if !span.style.math {
                continue;
            }
            let inner = span
                .text
                .strip_prefix("$$")
                .and_then(|s| s.strip_suffix("$$"))
                .or_else(|| {
                    span.text
                        .strip_prefix('$')
                        .and_then(|s| s.strip_suffix('$'))
                })
                .unwrap_or(&span.text)
                .to_string();
            span.text = tex_to_unicode(inner.trim());
        }
    }
}

pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";

/// Puts a copy button line under every code block.
pub fn attach_copy_buttons(rich: &mut RichText) {
    // Back to front so earlier indices stay valid.
    for (n, block) in rich.code_blocks.iter().enumerate().rev() {
        let at = (block.last_line + 1).min(rich.lines.len());
        rich.lines.insert(
            at,
            RichLine::new(
                LineKind::CopyButton(n),
                vec![RichSpan::plain(&format!("[{}]", COPY_LABEL))],
            ),
        );
    }
    let mut shift = 0;
    for block in rich.code_blocks.iter_mut() {
        block.last_line += shift;
        shift += 1;
    }
}

// --- TeX ---

fn symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" | "varepsilon" => "ε",
        "zeta" => "ζ",
        "eta" => "η",
        "theta" => "θ",
        "iota" => "ι",
        "kappa" => "κ",
        "lambda" => "λ",
        "mu" => "μ",
        "nu" => "ν",
        "xi" => "ξ",
        "pi" => "π",
        "rho" => "ρ",
        "sigma" => "σ",
        "tau" => "τ",
        "phi" | "varphi" => "φ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Theta" => "Θ",
        "Lambda" => "Λ",
        "Pi" => "Π",
        "Sigma" => "Σ",
        "Phi" => "Φ",
        "Psi" => "Ψ",
        "Omega" => "Ω",
        "times" => "×",
        "cdot" => "·",
        "div" => "÷",
        "pm" => "±",
        "mp" => "∓",
        "le" | "leq" => "≤",
        "ge" | "geq" => "≥",
        "ne" | "neq" => "≠",
        "approx" => "≈",
        "equiv" => "≡",
        "infty" => "∞",
        "sum" => "∑",
        "prod" => "∏",
        "int" => "∫",
        "partial" => "∂",
        "nabla" => "∇",
        "to" | "rightarrow" => "→",
        "leftarrow" => "←",
        "Rightarrow" | "implies" => "⇒",
        "Leftrightarrow" | "iff" => "⇔",
        "in" => "∈",
        "notin" => "∉",
        "subset" => "⊂",
        "subseteq" => "⊆",
        "cup" => "∪",
        "cap" => "∩",
        "emptyset" => "∅",
        "forall" => "∀",
        "exists" => "∃",
        "neg" | "lnot" => "¬",
        "land" | "wedge" => "∧",
        "lor" | "vee" => "∨",
        "ldots" | "dots" => "…",
        "cdots" => "⋯",
        "circ" => "∘",
        "degree" => "°",
        "sqrt" => "√",
        _ => return None,
    })
}

fn superscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        '+' => '⁺',
        '-' => '⁻',
        '=' => '⁼',
        '(' => '⁽',
        ')' => '⁾',
        'n' => 'ⁿ',
        'i' => 'ⁱ',
        _ => return None,
    })
}

fn subscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '₀',
        '1' => '₁',
        '2' => '₂',
        '3' => '₃',
        '4' => '₄',
        '5' => '₅',
        '6' => '₆',
        '7' => '₇',
        '8' => '₈',
        '9' => '₉',
        '+' => '₊',
        '-' => '₋',
        '=' => '₌',
        '(' => '₍',
        ')' => '₎',
        'a' => 'ₐ',
        'e' => 'ₑ',
        'i' => 'ᵢ',
        'j' => 'ⱼ',
        'k' => 'ₖ',
        'n' => 'ₙ',
        'o' => 'ₒ',
        'x' => 'ₓ',
        _ => return None,
    })
}

fn wrap_operand(s: String) -> String {
    if s.chars().count() <= 1 || s.chars().all(|c| c.is_alphanumeric() || c == '.') {
        s
    } else {
        format!("({})", s)
    }
}

struct TexReader {
    chars: Vec<char>,
    pos: usize,
}

impl TexReader {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn render_until(&mut self, stop: Option<char>) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if Some(c) == stop {
                break;
            }
            match c {
                '\\' => out.push_str(&self.command()),
                '{' => out.push_str(&self.render_until(Some('}'))),
                '^' => {
                    let arg = self.argument();
                    out.push_str(&Self::script(&arg, superscript, '^'));
                }
                '_' => {
                    let arg = self.argument();
                    out.push_str(&Self::script(&arg, subscript, '_'));
                }
                _ => out.push(c),
            }
        }
        out
    }

    fn argument(&mut self) -> String {
        while self.peek() == Some(' ') {
            self.pos += 1;
        }
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.render_until(Some('}'))
            }
            Some('\\') => {
                self.pos += 1;
                self.command()
            }
            Some(c) => {
                self.pos += 1;
                c.to_string()
            }
            None => String::new(),
        }
    }

    fn command(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos == start {
            // Single-character control symbol such as `\,` or `\{`.
            let Some(c) = self.peek() else {
                return "\\".to_string();
            };
            self.pos += 1;
            return match c {
                ',' | ';' | ':' | ' ' => " ".to_string(),
                '!' => String::new(),
                '\\' => " ".to_string(),
                other => other.to_string(),
            };
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.argument();
                let den = self.argument();
                format!("{}/{}", wrap_operand(num), wrap_operand(den))
            }
            "sqrt" => {
                let arg = self.argument();
                format!("√{}", wrap_operand(arg))
            }
            "text" | "mathrm" | "mathbf" | "mathit" | "textbf" | "operatorname" => self.argument(),
            "left" | "right" | "displaystyle" => String::new(),
            "quad" | "qquad" => " ".to_string(),
            other => symbol(other)
                .map(str::to_string)
                .unwrap_or_else(|| format!("\\{}", other)),
        }
    }

    fn script(arg: &str, map: fn(char) -> Option<char>, marker: char) -> String {
        if let Some(mapped) = arg.chars().map(map).collect::<Option<String>>()
            && !mapped.is_empty()
        {
            return mapped;
        }
        if arg.chars().count() == 1 {
            format!("{}{}", marker, arg)
        } else {
            format!("{}({})", marker, arg)
        }
    }
}

pub fn tex_to_unicode(tex: &str) -> String {
    let mut reader = TexReader {
        chars: tex.chars().collect(),
        pos: 0,
    };
    reader.render_until(None)
}

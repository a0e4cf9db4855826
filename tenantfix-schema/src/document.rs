use crate::error::ParseError;
use std::fmt;

/// A parsed schema file: opaque text interleaved with top-level blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub(crate) segments: Vec<Segment>,
    pub(crate) newline: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Text outside any block, kept verbatim.
    Text(String),
    Block(Block),
}

/// A `<keyword> <Name> { ... }` block.
///
/// The header and closing lines are stored raw; only the body is split into
/// classified [`Line`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub(crate) keyword: String,
    pub(crate) name: String,
    pub(crate) header: String,
    pub(crate) lines: Vec<Line>,
    pub(crate) closing: String,
    pub(crate) start_line: usize,
}

/// One body line. `text` excludes the terminator, `eol` holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub(crate) text: String,
    pub(crate) eol: String,
    pub(crate) kind: LineKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment,
    /// Block attribute such as `@@index([...])`.
    Attribute,
    Field(FieldDecl),
    Other,
}

/// `name Type ...` with the type token kept as written (`String?`, `Post[]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: String,
}

impl FieldDecl {
    pub fn is_list(&self) -> bool {
        self.ty.ends_with("[]")
    }

    /// Type name without `?` or `[]`.
    pub fn base_type(&self) -> &str {
        self.ty.trim_end_matches('?').trim_end_matches("[]")
    }
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        crate::parse::parse_document(text)
    }

    /// Line terminator used for inserted lines (`"\n"` or `"\r\n"`).
    pub fn newline(&self) -> &'static str {
        self.newline
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Block(b) => Some(b),
            Segment::Text(_) => None,
        })
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.segments.iter_mut().filter_map(|s| match s {
            Segment::Block(b) => Some(b),
            Segment::Text(_) => None,
        })
    }

    pub fn models_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Block> + 'a {
        self.blocks_mut().filter(move |b| b.is_model(name))
    }

    pub fn model(&self, name: &str) -> Option<&Block> {
        self.blocks().find(|b| b.is_model(name))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => f.write_str(text)?,
                Segment::Block(block) => write!(f, "{block}")?,
            }
        }
        Ok(())
    }
}

impl Block {
    /// 1-based line number of the header.
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn is_model(&self, name: &str) -> bool {
        self.keyword == "model" && self.name == name
    }

    pub fn fields(&self) -> impl Iterator<Item = (usize, &FieldDecl)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| line.field().map(|f| (i, f)))
    }

    pub fn find_field(&self, name: &str) -> Option<(usize, &FieldDecl)> {
        self.fields().find(|(_, f)| f.name == name)
    }

    /// Index of the first line at or after `from` matching `pred`.
    pub fn position_from<P>(&self, from: usize, pred: P) -> Option<usize>
    where
        P: Fn(&Line) -> bool,
    {
        self.lines
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, line)| pred(line))
            .map(|(i, _)| i)
    }

    /// Leading whitespace of line `idx`, or two spaces when out of range.
    pub fn indent_of(&self, idx: usize) -> &str {
        self.lines.get(idx).map(Line::indent).unwrap_or("  ")
    }

    /// Insert a body line before `idx` (`idx == len` appends before the
    /// closing brace).
    pub fn insert_line(&mut self, idx: usize, text: impl Into<String>, newline: &str) {
        let idx = idx.min(self.lines.len());
        self.lines.insert(idx, Line::new(text.into(), newline.to_string()));
    }

    pub fn push_line(&mut self, text: impl Into<String>, newline: &str) {
        let idx = self.lines.len();
        self.insert_line(idx, text, newline);
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;
        for line in &self.lines {
            f.write_str(&line.text)?;
            f.write_str(&line.eol)?;
        }
        f.write_str(&self.closing)
    }
}

impl Line {
    pub(crate) fn new(text: String, eol: String) -> Self {
        let kind = classify(&text);
        Self { text, eol, kind }
    }

    pub fn kind(&self) -> &LineKind {
        &self.kind
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.kind, LineKind::Blank)
    }

    pub fn field(&self) -> Option<&FieldDecl> {
        match &self.kind {
            LineKind::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn indent(&self) -> &str {
        let trimmed = self.text.trim_start();
        &self.text[..self.text.len() - trimmed.len()]
    }
}

fn classify(text: &str) -> LineKind {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with("//") {
        return LineKind::Comment;
    }
    if trimmed.starts_with("@@") {
        return LineKind::Attribute;
    }

    let mut tokens = trimmed.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(name), Some(ty))
            if is_ident(name) && ty.starts_with(|c: char| c.is_ascii_alphabetic()) =>
        {
            LineKind::Field(FieldDecl {
                name: name.to_string(),
                ty: ty.to_string(),
            })
        }
        _ => LineKind::Other,
    }
}

pub(crate) fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

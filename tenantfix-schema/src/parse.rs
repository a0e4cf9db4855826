use crate::document::{is_ident, Block, Document, Line, Segment};
use crate::error::ParseError;
use tracing::{debug, trace};

/// Keywords whose header line opens a top-level block.
const BLOCK_KEYWORDS: &[&str] = &["model", "enum", "view", "type", "generator", "datasource"];

struct OpenBlock {
    block: Block,
    depth: i64,
}

pub(crate) fn parse_document(text: &str) -> Result<Document, ParseError> {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };

    let mut segments = Vec::new();
    let mut pending = String::new();
    let mut open: Option<OpenBlock> = None;

    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let (body, eol) = split_eol(raw);
        let delta = brace_delta(body);

        match open.as_mut() {
            None => {
                if let Some((keyword, name)) = block_header(body) {
                    if delta == 1 {
                        trace!(keyword, name, line = line_no, "block opened");
                        if !pending.is_empty() {
                            segments.push(Segment::Text(std::mem::take(&mut pending)));
                        }
                        open = Some(OpenBlock {
                            block: Block {
                                keyword: keyword.to_string(),
                                name: name.to_string(),
                                header: raw.to_string(),
                                lines: Vec::new(),
                                closing: String::new(),
                                start_line: line_no,
                            },
                            depth: 1,
                        });
                        continue;
                    }
                    // `model A {}` on one line has no body to edit.
                    debug!(keyword, name, line = line_no, "single-line block kept as text");
                }
                if delta < 0 {
                    return Err(ParseError::UnexpectedClose { line: line_no });
                }
                pending.push_str(raw);
            }
            Some(current) => {
                if let Some((keyword, name)) = block_header(body) {
                    if BLOCK_KEYWORDS.contains(&keyword) {
                        return Err(ParseError::NestedBlock {
                            name: name.to_string(),
                            parent: current.block.name.clone(),
                            line: line_no,
                        });
                    }
                }

                current.depth += delta;
                if current.depth < 0 {
                    return Err(ParseError::UnexpectedClose { line: line_no });
                }
                if current.depth == 0 {
                    current.block.closing = raw.to_string();
                    if let Some(done) = open.take() {
                        segments.push(Segment::Block(done.block));
                    }
                } else {
                    current
                        .block
                        .lines
                        .push(Line::new(body.to_string(), eol.to_string()));
                }
            }
        }
    }

    if let Some(unclosed) = open {
        return Err(ParseError::UnclosedBlock {
            keyword: unclosed.block.keyword,
            name: unclosed.block.name,
            line: unclosed.block.start_line,
        });
    }
    if !pending.is_empty() {
        segments.push(Segment::Text(pending));
    }

    Ok(Document { segments, newline })
}

fn split_eol(raw: &str) -> (&str, &str) {
    if let Some(body) = raw.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = raw.strip_suffix('\n') {
        (body, "\n")
    } else {
        (raw, "")
    }
}

/// `<keyword> <Name> {` at the start of a line.
fn block_header(line: &str) -> Option<(&str, &str)> {
    let mut rest = line.trim_start();
    let keyword_end = rest.find(char::is_whitespace)?;
    let keyword = &rest[..keyword_end];
    rest = rest[keyword_end..].trim_start();

    let name_end = rest.find(|c: char| c.is_whitespace() || c == '{')?;
    let name = &rest[..name_end];
    rest = rest[name_end..].trim_start();

    (is_ident(keyword) && is_ident(name) && rest.starts_with('{')).then_some((keyword, name))
}

/// Net `{`/`}` count, ignoring braces in string literals and `//` comments.
fn brace_delta(line: &str) -> i64 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '/' if chars.peek() == Some(&'/') => break,
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn header_detection() {
        assert_eq!(block_header("model Segment {"), Some(("model", "Segment")));
        assert_eq!(block_header("  enum Status{"), Some(("enum", "Status")));
        assert_eq!(block_header("model Segment"), None);
        assert_eq!(block_header("  id String @id"), None);
        assert_eq!(block_header("// model Segment {"), None);
    }

    #[test]
    fn brace_delta_skips_strings_and_comments() {
        assert_eq!(brace_delta("model A {"), 1);
        assert_eq!(brace_delta("}"), -1);
        assert_eq!(brace_delta(r#"  meta Json @default("{}")"#), 0);
        assert_eq!(brace_delta(r#"  s String @default("\"{")"#), 0);
        assert_eq!(brace_delta("  id Int // }"), 0);
    }

    #[test]
    fn parses_blocks_and_text() {
        let text = "// head\nmodel A {\n  id Int\n}\n\nenum E {\n  X\n}\n";
        let doc = parse_document(text).expect("parse");
        assert_eq!(doc.blocks().count(), 2);
        assert_eq!(doc.to_string(), text);
        assert_eq!(doc.model("A").map(Block::start_line), Some(2));
        assert!(doc.model("E").is_none());
    }

    #[test]
    fn preserves_crlf_and_missing_trailing_newline() {
        let text = "model A {\r\n  id Int\r\n}";
        let doc = parse_document(text).expect("parse");
        assert_eq!(doc.newline(), "\r\n");
        assert_eq!(doc.to_string(), text);
    }

    #[test]
    fn braces_inside_defaults_do_not_close_block() {
        let text = "model A {\n  meta Json @default(\"{}\")\n  id Int\n}\n";
        let doc = parse_document(text).expect("parse");
        let block = doc.model("A").expect("model A");
        assert_eq!(block.lines().len(), 2);
    }

    #[test]
    fn single_line_block_is_text() {
        let doc = parse_document("model A {}\n").expect("parse");
        assert_eq!(doc.blocks().count(), 0);
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let err = parse_document("model A {\n  id Int\n").expect_err("unclosed");
        assert_eq!(
            err,
            ParseError::UnclosedBlock {
                keyword: "model".to_string(),
                name: "A".to_string(),
                line: 1,
            }
        );
    }

    #[test]
    fn nested_header_is_an_error() {
        let err = parse_document("model A {\n  id Int\n\nmodel B {\n  id Int\n}\n")
            .expect_err("nested");
        assert_eq!(
            err,
            ParseError::NestedBlock {
                name: "B".to_string(),
                parent: "A".to_string(),
                line: 4,
            }
        );
    }

    #[test]
    fn stray_close_is_an_error() {
        let err = parse_document("}\n").expect_err("stray");
        assert_eq!(err, ParseError::UnexpectedClose { line: 1 });
    }
}

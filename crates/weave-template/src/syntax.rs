//! Template tokenizer.
//!
//! Splits template text into literal runs, `#{expr}` placeholders and
//! `{{each path}} ... {{/each}}` blocks in a single left-to-right pass.
//!
//! # Invariants
//!
//! 1. **Single pass**: placeholder output is never re-scanned.
//! 2. **Flat blocks**: a block body contains only literals and placeholders.
//! 3. **Lossless literals**: text that is not a well-formed marker is kept
//!    verbatim (an unclosed `#{` or a `{{` that is not a block tag).

use core::fmt;

use crate::value::Value;

/// Name of the only block helper.
pub const EACH: &str = "each";

/// One piece of a tokenized template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Placeholder(Expr),
    Block(Block),
}

/// `{{name path}} body {{/name}}`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub path: Vec<String>,
    pub body: Vec<Segment>,
}

/// A placeholder expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Dotted lookup: `a.b.0.c`.
    Path(Vec<String>),
    /// Helper invocation: `name(arg, ...)`.
    Call { name: String, args: Vec<Expr> },
    /// String, number, boolean or null literal.
    Literal(Value),
}

/// Why a block tag sequence is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockFault {
    /// `{{each a}} ... {{/b}}`
    Mismatched { open: String, close: String },
    /// `{{each a}}` with no closing tag.
    Unclosed { open: String },
    /// `{{/each}}` with no opening tag.
    StrayClose { close: String },
    /// A block opened inside another block.
    Nested { outer: String, inner: String },
    /// A block helper other than `each`.
    UnknownHelper { name: String },
}

impl fmt::Display for BlockFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatched { open, close } => {
                write!(f, "block '{open}' closed by '{{{{/{close}}}}}'")
            }
            Self::Unclosed { open } => write!(f, "block '{open}' is never closed"),
            Self::StrayClose { close } => write!(f, "closing tag '{close}' has no opening tag"),
            Self::Nested { outer, inner } => {
                write!(f, "block '{inner}' nested inside block '{outer}'")
            }
            Self::UnknownHelper { name } => write!(f, "unknown block helper '{name}'"),
        }
    }
}

/// Tokenizer failures, with the byte offset of the offending marker.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    Block { fault: BlockFault, offset: usize },
    Expression { source: String, offset: usize },
}

struct OpenBlock {
    name: String,
    path: Vec<String>,
    offset: usize,
    outer: Vec<Segment>,
}

/// Tokenize template text.
pub fn tokenize(template: &str) -> Result<Vec<Segment>, SyntaxError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut open: Option<OpenBlock> = None;
    let mut pos = 0;

    while pos < template.len() {
        let rest = &template[pos..];
        let Some(next) = find_marker(rest) else {
            literal.push_str(rest);
            break;
        };
        literal.push_str(&rest[..next]);
        let start = pos + next;
        let marker = &template[start..];

        if marker.starts_with("#{") {
            let Some(close) = placeholder_end(marker).or_else(|| marker.find('}')) else {
                // Unclosed placeholder: emit as-is
                literal.push_str(marker);
                break;
            };
            let source = &marker[2..close];
            let expr = parse_expr(source).ok_or_else(|| SyntaxError::Expression {
                source: source.to_string(),
                offset: start,
            })?;
            flush(&mut literal, &mut segments);
            segments.push(Segment::Placeholder(expr));
            pos = start + close + 1;
            continue;
        }

        // `{{`
        let Some((tag, len)) = parse_block_tag(marker) else {
            literal.push_str("{{");
            pos = start + 2;
            continue;
        };
        pos = start + len;
        match tag {
            BlockTag::Open { name, path } => {
                if let Some(outer) = &open {
                    return Err(SyntaxError::Block {
                        fault: BlockFault::Nested {
                            outer: outer.name.clone(),
                            inner: name,
                        },
                        offset: start,
                    });
                }
                if name != EACH {
                    return Err(SyntaxError::Block {
                        fault: BlockFault::UnknownHelper { name },
                        offset: start,
                    });
                }
                flush(&mut literal, &mut segments);
                open = Some(OpenBlock {
                    name,
                    path,
                    offset: start,
                    outer: std::mem::take(&mut segments),
                });
            }
            BlockTag::Close { name } => {
                let Some(block) = open.take() else {
                    return Err(SyntaxError::Block {
                        fault: BlockFault::StrayClose { close: name },
                        offset: start,
                    });
                };
                if block.name != name {
                    return Err(SyntaxError::Block {
                        fault: BlockFault::Mismatched {
                            open: block.name,
                            close: name,
                        },
                        offset: start,
                    });
                }
                flush(&mut literal, &mut segments);
                let body = std::mem::replace(&mut segments, block.outer);
                segments.push(Segment::Block(Block {
                    name: block.name,
                    path: block.path,
                    body,
                }));
            }
        }
    }

    if let Some(block) = open {
        return Err(SyntaxError::Block {
            fault: BlockFault::Unclosed { open: block.name },
            offset: block.offset,
        });
    }
    flush(&mut literal, &mut segments);
    Ok(segments)
}

fn flush(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

/// Byte offset of the `}` closing the `#{` at the start of `marker`.
///
/// Braces inside quoted literals do not count. `None` if no brace closes it
/// or a quote is left open.
fn placeholder_end(marker: &str) -> Option<usize> {
    let bytes = marker.as_bytes();
    let mut quote = None;
    let mut i = 2;
    while i < bytes.len() {
        match (quote, bytes[i]) {
            (Some(_), b'\\') => i += 1,
            (Some(q), b) if b == q => quote = None,
            (None, b'\'' | b'"') => quote = Some(bytes[i]),
            (None, b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Byte offset of the next `#{` or `{{`.
fn find_marker(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len().saturating_sub(1))
        .find(|&i| bytes[i + 1] == b'{' && (bytes[i] == b'#' || bytes[i] == b'{'))
}

enum BlockTag {
    Open { name: String, path: Vec<String> },
    Close { name: String },
}

/// Parse `{{name path}}` or `{{/name}}` at the start of `text`, returning the
/// tag and its byte length.
fn parse_block_tag(text: &str) -> Option<(BlockTag, usize)> {
    let end = text.find("}}")?;
    let inner = text[2..end].trim();
    let len = end + 2;
    if let Some(name) = inner.strip_prefix('/') {
        let name = name.trim();
        return is_word(name).then(|| {
            (
                BlockTag::Close {
                    name: name.to_string(),
                },
                len,
            )
        });
    }
    let (name, arg) = inner.split_once(char::is_whitespace)?;
    let path = parse_path(arg.trim())?;
    is_word(name).then(|| {
        (
            BlockTag::Open {
                name: name.to_string(),
                path,
            },
            len,
        )
    })
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$' || c == '@'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// `segment ('.' segment)*` where a segment is an identifier or an index.
fn parse_path(text: &str) -> Option<Vec<String>> {
    let segments: Vec<String> = text.split('.').map(str::to_string).collect();
    let valid = segments.iter().enumerate().all(|(i, seg)| {
        let mut chars = seg.chars();
        match chars.next() {
            Some(c) if is_ident_start(c) => chars.all(is_ident_char),
            Some(c) if c.is_ascii_digit() && i > 0 => chars.all(|c| c.is_ascii_digit()),
            _ => false,
        }
    });
    valid.then_some(segments)
}

/// Parse the text between `#{` and `}`.
pub fn parse_expr(source: &str) -> Option<Expr> {
    let mut parser = ExprParser {
        src: source,
        pos: 0,
    };
    parser.skip_ws();
    let expr = parser.expr(true)?;
    parser.skip_ws();
    (parser.pos == source.len()).then_some(expr)
}

struct ExprParser<'a> {
    src: &'a str,
    pos: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expr(&mut self, allow_call: bool) -> Option<Expr> {
        match self.peek()? {
            '"' | '\'' => self.string().map(Expr::Literal),
            c if c.is_ascii_digit() || c == '-' => self.number().map(Expr::Literal),
            c if is_ident_start(c) => {
                let path = self.path()?;
                self.skip_ws();
                if self.peek() == Some('(') {
                    if !allow_call || path.len() != 1 {
                        return None;
                    }
                    let name = path.into_iter().next()?;
                    let args = self.args()?;
                    return Some(Expr::Call { name, args });
                }
                Some(match (path.len(), path[0].as_str()) {
                    (1, "true") => Expr::Literal(Value::Bool(true)),
                    (1, "false") => Expr::Literal(Value::Bool(false)),
                    (1, "null") => Expr::Literal(Value::Null),
                    _ => Expr::Path(path),
                })
            }
            _ => None,
        }
    }

    fn path(&mut self) -> Option<Vec<String>> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| is_ident_char(c) || c == '.' || c == '@')
        {
            self.bump();
        }
        parse_path(&self.src[start..self.pos])
    }

    fn args(&mut self) -> Option<Vec<Expr>> {
        self.bump(); // '('
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Some(args);
        }
        loop {
            self.skip_ws();
            args.push(self.expr(false)?);
            self.skip_ws();
            match self.bump()? {
                ',' => continue,
                ')' => return Some(args),
                _ => return None,
            }
        }
    }

    fn string(&mut self) -> Option<Value> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                c if c == quote => return Some(Value::Str(out)),
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    other => out.push(other),
                },
                c => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.bump();
        }
        let text = &self.src[start..self.pos];
        text.parse::<i64>()
            .map(Value::Int)
            .or_else(|_| text.parse::<f64>().map(Value::Float))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn path(p: &str) -> Expr {
        Expr::Path(p.split('.').map(str::to_string).collect())
    }

    #[test]
    fn literal_and_placeholders() {
        assert_eq!(
            tokenize("a #{x} b #{y.z}").unwrap(),
            vec![
                Segment::Literal("a ".into()),
                Segment::Placeholder(path("x")),
                Segment::Literal(" b ".into()),
                Segment::Placeholder(path("y.z")),
            ]
        );
    }

    #[test]
    fn block_is_extracted() {
        let segments = tokenize("<ul>{{each items}}<li>#{title}</li>{{/each}}</ul>").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("<ul>".into()),
                Segment::Block(Block {
                    name: "each".into(),
                    path: vec!["items".into()],
                    body: vec![
                        Segment::Literal("<li>".into()),
                        Segment::Placeholder(path("title")),
                        Segment::Literal("</li>".into()),
                    ],
                }),
                Segment::Literal("</ul>".into()),
            ]
        );
    }

    #[test]
    fn sequential_blocks() {
        let segments = tokenize("{{each a}}x{{/each}}-{{each b.c}}y{{/each}}").unwrap();
        assert_eq!(segments.len(), 3);
        assert!(matches!(&segments[2], Segment::Block(b) if b.path == ["b", "c"]));
    }

    #[test]
    fn block_faults() {
        let fault = |src: &str| match tokenize(src) {
            Err(SyntaxError::Block { fault, .. }) => fault,
            other => panic!("expected block fault for {src:?}, got {other:?}"),
        };
        assert_eq!(
            fault("{{each a}}x{{/b}}"),
            BlockFault::Mismatched {
                open: "each".into(),
                close: "b".into()
            }
        );
        assert_eq!(
            fault("{{each a}}x"),
            BlockFault::Unclosed { open: "each".into() }
        );
        assert_eq!(
            fault("x{{/each}}"),
            BlockFault::StrayClose {
                close: "each".into()
            }
        );
        assert_eq!(
            fault("{{each a}}{{each b}}{{/each}}{{/each}}"),
            BlockFault::Nested {
                outer: "each".into(),
                inner: "each".into()
            }
        );
        assert_eq!(
            fault("{{if a}}x{{/if}}"),
            BlockFault::UnknownHelper { name: "if".into() }
        );
    }

    #[test]
    fn fault_offsets_point_at_marker() {
        let Err(SyntaxError::Block { offset, .. }) = tokenize("abc{{each a}}x{{/b}}") else {
            panic!("expected a block fault");
        };
        assert_eq!(offset, 14);
    }

    #[test]
    fn non_markers_stay_literal() {
        assert_eq!(
            tokenize("a {{ not a tag }} #{unclosed").unwrap(),
            vec![Segment::Literal("a {{ not a tag }} #{unclosed".into())]
        );
        assert_eq!(
            tokenize("{x} and {{").unwrap(),
            vec![Segment::Literal("{x} and {{".into())]
        );
    }

    #[test]
    fn expressions() {
        assert_eq!(parse_expr(" a.b.0 "), Some(path("a.b.0")));
        assert_eq!(parse_expr("@index"), Some(path("@index")));
        assert_eq!(
            parse_expr("fmt(title, 'x', 3, -1.5, true)"),
            Some(Expr::Call {
                name: "fmt".into(),
                args: vec![
                    path("title"),
                    Expr::Literal(Value::from("x")),
                    Expr::Literal(Value::Int(3)),
                    Expr::Literal(Value::Float(-1.5)),
                    Expr::Literal(Value::Bool(true)),
                ],
            })
        );
        assert_eq!(
            parse_expr("f()"),
            Some(Expr::Call {
                name: "f".into(),
                args: vec![]
            })
        );
        assert_eq!(parse_expr(""), None);
        assert_eq!(parse_expr("a b"), None);
        assert_eq!(parse_expr("a..b"), None);
        assert_eq!(parse_expr("0.a"), None);
        assert_eq!(parse_expr("f(g(x))"), None);
        assert_eq!(parse_expr("a.b(x)"), None);
    }

    #[test]
    fn invalid_expression_is_reported() {
        assert_eq!(
            tokenize("ok #{a b}"),
            Err(SyntaxError::Expression {
                source: "a b".into(),
                offset: 3
            })
        );
    }

    #[test]
    fn braces_inside_quotes_do_not_close_placeholders() {
        assert_eq!(
            tokenize(r#"#{id('a}b')} #{id("}", 'x\'}')}"#).unwrap(),
            vec![
                Segment::Placeholder(Expr::Call {
                    name: "id".into(),
                    args: vec![Expr::Literal(Value::from("a}b"))],
                }),
                Segment::Literal(" ".into()),
                Segment::Placeholder(Expr::Call {
                    name: "id".into(),
                    args: vec![
                        Expr::Literal(Value::from("}")),
                        Expr::Literal(Value::from("x'}")),
                    ],
                }),
            ]
        );
    }

    #[test]
    fn open_quote_falls_back_to_first_brace() {
        assert_eq!(
            tokenize("#{id('a}"),
            Err(SyntaxError::Expression {
                source: "id('a".into(),
                offset: 0
            })
        );
    }

    proptest! {
        #[test]
        fn marker_free_text_is_one_literal(text in "[^#{]{1,64}") {
            prop_assert_eq!(tokenize(&text).unwrap(), vec![Segment::Literal(text.clone())]);
        }

        #[test]
        fn tokenize_never_panics(text in "\\PC{0,96}") {
            let _ = tokenize(&text);
        }
    }
}

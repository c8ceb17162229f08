//
// syntax/lexer.rs
//
// Tokenizer for SCSS source. Comments and whitespace are dropped; strings
// containing `#{}` interpolation are split into segments around the
// interpolated tokens so references inside them stay visible. Comment
// regions come from the concrete syntax tree; a `//` or `/*` it did not
// report (an unterminated block, say) is still skipped here.
//

use super::Comment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `foo`, `-foo`, `foo-bar`, `--custom`
    Ident,
    /// `$name`
    Variable,
    /// `%name`
    Placeholder,
    /// `@name`
    AtKeyword,
    /// Quoted string (or one segment of an interpolated string), quotes included
    String,
    /// Unquoted `url(...)` body
    Url,
    Number,
    /// `#abc`, `#fff`
    Hash,
    /// `#{`
    InterpStart,
    /// `}` closing an interpolation
    InterpEnd,
    Punct(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// Set on string segments that belong to a string containing interpolation
    pub interpolated: bool,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn is_punct(&self, ch: u8) -> bool {
        self.kind == TokenKind::Punct(ch)
    }

    /// Content of a string token without its quotes.
    pub fn unquoted<'a>(&self, source: &'a str) -> &'a str {
        let text = self.text(source);
        let text = text.strip_prefix(&['"', '\''][..]).unwrap_or(text);
        text.strip_suffix(&['"', '\''][..]).unwrap_or(text)
    }
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Brace,
    Interp,
    InterpInString(u8),
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80 || byte == b'\\'
}

fn is_ident_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' || byte >= 0x80 || byte == b'\\'
}

struct Lexer<'a> {
    bytes: &'a [u8],
    comments: &'a [Comment],
    next_comment: usize,
    pos: usize,
    tokens: Vec<Token>,
    frames: Vec<Frame>,
}

impl<'a> Lexer<'a> {
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    /// End of the known comment starting exactly at the current position.
    fn comment_here(&mut self) -> Option<usize> {
        while self
            .comments
            .get(self.next_comment)
            .is_some_and(|c| c.start < self.pos)
        {
            self.next_comment += 1;
        }
        self.comments
            .get(self.next_comment)
            .filter(|c| c.start == self.pos)
            .map(|c| c.end)
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            start,
            end,
            interpolated: false,
        });
    }

    fn eat_ident_chars(&mut self) {
        while let Some(byte) = self.peek(0) {
            if byte == b'\\' {
                self.pos = (self.pos + 2).min(self.bytes.len());
            } else if is_ident_char(byte) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn starts_ident(&self, ahead: usize) -> bool {
        match self.peek(ahead) {
            Some(b'-') => matches!(self.peek(ahead + 1), Some(b) if is_ident_start(b) || b == b'-'),
            Some(b) => is_ident_start(b),
            None => false,
        }
    }

    /// Scan string content from the current position until the closing quote,
    /// an interpolation opener, or the end of the line.
    fn scan_string(&mut self, quote: u8, segment_start: usize, continued: bool) {
        while let Some(byte) = self.peek(0) {
            match byte {
                b'\\' => self.pos = (self.pos + 2).min(self.bytes.len()),
                b'\n' => break,
                b'#' if self.peek(1) == Some(b'{') => {
                    self.tokens.push(Token {
                        kind: TokenKind::String,
                        start: segment_start,
                        end: self.pos,
                        interpolated: true,
                    });
                    let start = self.pos;
                    self.pos += 2;
                    self.push(TokenKind::InterpStart, start, self.pos);
                    self.frames.push(Frame::InterpInString(quote));
                    return;
                }
                b if b == quote => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::String,
            start: segment_start,
            end: self.pos,
            interpolated: continued,
        });
    }

    fn scan_url_body(&mut self) {
        let start = self.pos;
        while let Some(byte) = self.peek(0) {
            if byte == b')' || byte == b'\n' {
                break;
            }
            self.pos += 1;
        }
        self.push(TokenKind::Url, start, self.pos);
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(byte) = self.peek(0) {
            let start = self.pos;
            if let Some(end) = self.comment_here() {
                self.pos = end.max(start + 1);
                continue;
            }
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => {
                    while let Some(b) = self.peek(0) {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.pos += 2;
                    while self.pos < self.bytes.len() {
                        if self.peek(0) == Some(b'*') && self.peek(1) == Some(b'/') {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                b'"' | b'\'' => {
                    self.pos += 1;
                    self.scan_string(byte, start, false);
                }
                b'$' if self.starts_ident(1) => {
                    self.pos += 1;
                    self.eat_ident_chars();
                    self.push(TokenKind::Variable, start, self.pos);
                }
                b'%' if self.starts_ident(1) => {
                    self.pos += 1;
                    self.eat_ident_chars();
                    self.push(TokenKind::Placeholder, start, self.pos);
                }
                b'@' if self.starts_ident(1) => {
                    self.pos += 1;
                    self.eat_ident_chars();
                    self.push(TokenKind::AtKeyword, start, self.pos);
                }
                b'#' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.push(TokenKind::InterpStart, start, self.pos);
                    self.frames.push(Frame::Interp);
                }
                b'#' if matches!(self.peek(1), Some(b) if is_ident_char(b)) => {
                    self.pos += 1;
                    self.eat_ident_chars();
                    self.push(TokenKind::Hash, start, self.pos);
                }
                b'{' => {
                    self.pos += 1;
                    self.frames.push(Frame::Brace);
                    self.push(TokenKind::Punct(b'{'), start, self.pos);
                }
                b'}' => {
                    self.pos += 1;
                    match self.frames.pop() {
                        Some(Frame::Interp) => self.push(TokenKind::InterpEnd, start, self.pos),
                        Some(Frame::InterpInString(quote)) => {
                            self.push(TokenKind::InterpEnd, start, self.pos);
                            let segment_start = self.pos;
                            self.scan_string(quote, segment_start, true);
                        }
                        Some(Frame::Brace) | None => {
                            self.push(TokenKind::Punct(b'}'), start, self.pos)
                        }
                    }
                }
                b'0'..=b'9' => self.scan_number(),
                b'.' if matches!(self.peek(1), Some(b'0'..=b'9')) => self.scan_number(),
                _ if self.starts_ident(0) => {
                    self.eat_ident_chars();
                    self.push(TokenKind::Ident, start, self.pos);
                    let is_url = self.bytes[start..self.pos].eq_ignore_ascii_case(b"url");
                    if is_url && self.peek(0) == Some(b'(') {
                        let paren = self.pos;
                        self.pos += 1;
                        self.push(TokenKind::Punct(b'('), paren, self.pos);
                        let mut ahead = 0;
                        while matches!(self.peek(ahead), Some(b' ' | b'\t')) {
                            ahead += 1;
                        }
                        if !matches!(self.peek(ahead), Some(b'"' | b'\'')) {
                            self.scan_url_body();
                        }
                    }
                }
                _ => {
                    // Consume a whole UTF-8 sequence for stray non-ASCII bytes
                    self.pos += 1;
                    while matches!(self.peek(0), Some(b) if (b & 0xC0) == 0x80) {
                        self.pos += 1;
                    }
                    if byte.is_ascii() {
                        self.push(TokenKind::Punct(byte), start, self.pos);
                    }
                }
            }
        }
        self.tokens
    }

    fn scan_number(&mut self) {
        let start = self.pos;
        while matches!(self.peek(0), Some(b'0'..=b'9' | b'.')) {
            self.pos += 1;
        }
        if self.peek(0) == Some(b'%') {
            self.pos += 1;
        } else {
            self.eat_ident_chars();
        }
        self.push(TokenKind::Number, start, self.pos);
    }
}

/// Tokenize SCSS source text, skipping `comments` (sorted by start).
pub fn tokenize(source: &str, comments: &[Comment]) -> Vec<Token> {
    Lexer {
        bytes: source.as_bytes(),
        comments,
        next_comment: 0,
        pos: 0,
        tokens: Vec::new(),
        frames: Vec::new(),
    }
    .run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::with_parser;
    use crate::syntax::collect_comments;

    fn tokenize(source: &str) -> Vec<Token> {
        let tree = with_parser(|parser| parser.parse(source, None)).unwrap();
        super::tokenize(source, &collect_comments(&tree))
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_variable_declaration_tokens() {
        assert_eq!(
            kinds("$primary-color: #fff;"),
            vec![
                TokenKind::Variable,
                TokenKind::Punct(b':'),
                TokenKind::Hash,
                TokenKind::Punct(b';'),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "// $a: 1;\n/* $b */ $c: 2;";
        let tokens = tokenize(source);
        assert_eq!(tokens[0].kind, TokenKind::Variable);
        assert_eq!(tokens[0].text(source), "$c");
    }

    #[test]
    fn test_known_comment_regions_are_skipped() {
        let source = "$a $b";
        let comments = [Comment { start: 0, end: 2, line: false }];
        let tokens = super::tokenize(source, &comments);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text(source), "$b");
    }

    #[test]
    fn test_unterminated_block_comment_falls_back() {
        let source = "$a: 1; /* open $b";
        let tokens = super::tokenize(source, &[]);
        let texts: Vec<_> = tokens.iter().map(|t| t.text(source)).collect();
        assert_eq!(texts, vec!["$a", ":", "1", ";"]);
    }

    #[test]
    fn test_namespaced_reference_is_adjacent() {
        let source = "a: math.$pi;";
        let tokens = tokenize(source);
        let texts: Vec<_> = tokens.iter().map(|t| t.text(source)).collect();
        assert_eq!(texts, vec!["a", ":", "math", ".", "$pi", ";"]);
        assert_eq!(tokens[2].end, tokens[3].start);
        assert_eq!(tokens[3].end, tokens[4].start);
    }

    #[test]
    fn test_interpolated_string_segments() {
        let source = r#"content: "a #{$b} c";"#;
        let tokens = tokenize(source);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::Punct(b':'),
                TokenKind::String,
                TokenKind::InterpStart,
                TokenKind::Variable,
                TokenKind::InterpEnd,
                TokenKind::String,
                TokenKind::Punct(b';'),
            ]
        );
        assert!(tokens[2].interpolated);
        assert!(tokens[6].interpolated);
    }

    #[test]
    fn test_selector_interpolation_does_not_open_block() {
        let source = ".icon-#{$name} { }";
        let kinds = kinds(source);
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Punct(b'{')).count(), 1);
        assert!(kinds.contains(&TokenKind::InterpEnd));
    }

    #[test]
    fn test_unquoted_url_is_single_token() {
        let source = "background: url(http://example.com/a.png);";
        let tokens = tokenize(source);
        assert!(tokens
            .iter()
            .any(|t| t.kind == TokenKind::Url && t.text(source) == "http://example.com/a.png"));
    }

    #[test]
    fn test_placeholder_and_percentage() {
        assert_eq!(
            kinds("%button width: 100%"),
            vec![
                TokenKind::Placeholder,
                TokenKind::Ident,
                TokenKind::Punct(b':'),
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn test_non_ascii_identifiers() {
        let source = "$café: 1;";
        let tokens = tokenize(source);
        assert_eq!(tokens[0].text(source), "$café");
    }

    #[test]
    fn test_unquoted_strips_quotes() {
        let source = "@use 'sass:math';";
        let tokens = tokenize(source);
        assert_eq!(tokens[1].unquoted(source), "sass:math");
    }
}

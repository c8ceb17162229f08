//
// completion_context.rs
//
// Classifies the cursor position for completion: comment, module path,
// namespace member, mixin include, placeholder extend or declaration, or
// a generic value context. Pure text heuristics on the current line, with
// a forward scan of the text before the cursor for comment state.
//

use std::sync::OnceLock;

use regex::Regex;

/// What completion should offer at the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionContext {
    pub in_comment: bool,
    pub in_sassdoc: bool,
    /// Inside the quoted target of `@use`, `@forward`, or `@import`
    pub is_module_path: bool,
    /// Text before the first `.` of the current word, when it names a module
    pub namespace: Option<String>,
    pub wants_variable: bool,
    pub wants_mixin: bool,
    pub wants_function: bool,
    pub wants_placeholder: bool,
    pub wants_placeholder_declaration: bool,
}

impl CompletionContext {
    pub fn wants_anything(&self) -> bool {
        self.wants_variable
            || self.wants_mixin
            || self.wants_function
            || self.wants_placeholder
            || self.wants_placeholder_declaration
    }
}

struct ContextPatterns {
    module_link: Regex,
    include: Regex,
    extend: Regex,
    placeholder_declaration: Regex,
    value: Regex,
    control: Regex,
}

fn patterns() -> &'static ContextPatterns {
    static PATTERNS: OnceLock<ContextPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ContextPatterns {
        module_link: Regex::new(r"^\s*@(?:use|forward|import)\s").unwrap(),
        include: Regex::new(r"@include\s+[\w.-]*$").unwrap(),
        extend: Regex::new(r"@extend\s+%?[\w-]*$").unwrap(),
        placeholder_declaration: Regex::new(r"^\s*%[\w-]*$").unwrap(),
        // `prop: ...` or `$var: ...` since the last `{` or `;`
        value: Regex::new(
            r"(?:^|[{;])\s*(?:\$?[\w-]+|[\w-]*#\{[^}]*\}[\w-]*)\s*:(?:[^;{}]|#\{[^}]*\}?)*$",
        )
        .unwrap(),
        control: Regex::new(r"@(?:if|else\s+if|each|for|while|return|debug|warn|error)\s|@include\s+[\w.-]+\(")
            .unwrap(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    Str(u8),
    LineComment,
    BlockComment,
}

/// State at the end of `before`. A `//` directly after `:` is a URL scheme.
fn scan_state(before: &str) -> ScanState {
    let bytes = before.as_bytes();
    let mut state = ScanState::Code;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            ScanState::Code => match b {
                b'"' | b'\'' => state = ScanState::Str(b),
                b'/' if next == Some(b'/') && (i == 0 || bytes[i - 1] != b':') => {
                    state = ScanState::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = ScanState::BlockComment;
                    i += 1;
                }
                _ => {}
            },
            ScanState::Str(quote) => match b {
                b'\\' => i += 1,
                b'\n' => state = ScanState::Code,
                _ if b == quote => state = ScanState::Code,
                _ => {}
            },
            ScanState::LineComment => {
                if b == b'\n' {
                    state = ScanState::Code;
                }
            }
            ScanState::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    state = ScanState::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }
    state
}

/// Token immediately before the cursor.
fn current_word(line: &str) -> &str {
    let start = line
        .rfind(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | '[' | ']' | ','))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    &line[start..]
}

/// Namespace token of `word` with any `#{` opener and leading operators removed.
fn namespace_of(word: &str) -> Option<(String, &str)> {
    let word = match word.rfind("#{") {
        Some(idx) => &word[idx + 2..],
        None => word,
    };
    let word = word.trim_start_matches(&['+', '*', '/', '=', '!'][..]);
    let (namespace, member) = word.split_once('.')?;
    let first = namespace.chars().next()?;
    if !(first.is_alphabetic() || first == '_' || first == '-') {
        return None;
    }
    if !namespace
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    Some((namespace.to_string(), member))
}

/// Whether the cursor sits in a quoted string on `line` that is not inside
/// an interpolation.
fn in_plain_string(line: &str) -> bool {
    let mut open: Option<(u8, usize)> = None;
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match open {
            None if b == b'"' || b == b'\'' => open = Some((b, i)),
            Some((quote, _)) if b == quote => open = None,
            Some(_) if b == b'\\' => i += 1,
            _ => {}
        }
        i += 1;
    }
    match open {
        Some((_, start)) => {
            let inside = &line[start + 1..];
            // `"#{$a` keeps value completion inside the interpolation
            match inside.rfind("#{") {
                Some(idx) => inside[idx..].contains('}'),
                None => true,
            }
        }
        None => false,
    }
}

fn is_embedded_host(extension: Option<&str>) -> bool {
    matches!(extension, Some("vue" | "svelte" | "astro"))
}

/// Classify the completion context at byte `offset` of `text`. `extension`
/// is the file's own extension, used for embedded stylesheets.
pub fn classify_context(text: &str, offset: usize, extension: Option<&str>) -> CompletionContext {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let line = &before[line_start..];
    let mut ctx = CompletionContext::default();

    // Markup lines of a component file are never stylesheet code
    if is_embedded_host(extension) && line.trim_start().starts_with('<') {
        return ctx;
    }

    match scan_state(before) {
        ScanState::LineComment => {
            ctx.in_comment = true;
            ctx.in_sassdoc = line.trim_start().starts_with("///");
            return ctx;
        }
        ScanState::BlockComment => {
            ctx.in_comment = true;
            return ctx;
        }
        _ => {}
    }

    let patterns = patterns();
    if patterns.module_link.is_match(line) {
        let quotes = line.bytes().filter(|b| *b == b'"' || *b == b'\'').count();
        if quotes % 2 == 1 {
            ctx.is_module_path = true;
            return ctx;
        }
    }

    let word = current_word(line);
    if let Some((namespace, member)) = namespace_of(word) {
        ctx.namespace = Some(namespace);
        if patterns.include.is_match(line) {
            ctx.wants_mixin = true;
        } else if member.starts_with('$') {
            ctx.wants_variable = true;
        } else {
            ctx.wants_variable = true;
            ctx.wants_function = true;
        }
        return ctx;
    }

    if patterns.include.is_match(line) {
        ctx.wants_mixin = true;
        return ctx;
    }
    if patterns.extend.is_match(line) {
        ctx.wants_placeholder = true;
        return ctx;
    }
    if patterns.placeholder_declaration.is_match(line) {
        ctx.wants_placeholder_declaration = true;
        return ctx;
    }

    if in_plain_string(line) {
        return ctx;
    }
    let bare_word = match word.rfind("#{") {
        Some(idx) => &word[idx + 2..],
        None => word,
    };
    let in_value = patterns.value.is_match(line) || patterns.control.is_match(line);
    if in_value {
        ctx.wants_variable = true;
        ctx.wants_function = !bare_word.starts_with('$');
    } else if bare_word.starts_with('$') {
        ctx.wants_variable = true;
    }
    ctx
}

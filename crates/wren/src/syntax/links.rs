//
// syntax/links.rs
//
// Extraction of `@use`, `@forward`, and `@import` targets and their clauses.
// Targets are left unresolved here; `cross_file::path_resolve` turns them
// into document identities.
//

use super::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Use,
    Forward,
    Import,
}

impl LinkKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "use" => Some(LinkKind::Use),
            "forward" => Some(LinkKind::Forward),
            "import" => Some(LinkKind::Import),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    pub kind: LinkKind,
    /// Target as written, without quotes
    pub raw_target: String,
    /// Byte span of the target string, quotes included
    pub range: (usize, usize),
    /// `@use` namespace: the `as` alias, `*`, or the default derived from the target
    pub namespace: Option<String>,
    pub is_aliased: bool,
    /// `@forward ... as prefix-*`
    pub prefix: Option<String>,
    pub hide: Vec<String>,
    pub show: Vec<String>,
    /// Target contains interpolation and cannot be followed statically
    pub dynamic: bool,
    /// Plain CSS import, left to the browser
    pub is_css: bool,
}

impl LinkCandidate {
    fn new(kind: LinkKind, raw_target: String, range: (usize, usize)) -> Self {
        Self {
            kind,
            raw_target,
            range,
            namespace: None,
            is_aliased: false,
            prefix: None,
            hide: Vec::new(),
            show: Vec::new(),
            dynamic: false,
            is_css: false,
        }
    }
}

/// Namespace a `@use` gets without an `as` clause: the last path segment
/// with its extension and partial underscore removed (`sass:math` -> `math`).
pub fn default_namespace(target: &str) -> String {
    if let Some(module) = target.strip_prefix("sass:") {
        return module.to_string();
    }
    let segment = target.rsplit('/').next().unwrap_or(target);
    let stem = segment.split('.').next().unwrap_or(segment);
    stem.strip_prefix('_').unwrap_or(stem).to_string()
}

fn is_css_target(target: &str) -> bool {
    target.ends_with(".css")
        || target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("//")
}

/// Index of the last token belonging to the string starting at `first`.
/// Interpolated strings span several segments.
fn string_extent(source: &str, tokens: &[Token], first: usize) -> usize {
    if !tokens[first].interpolated {
        return first;
    }
    let quote = source.as_bytes()[tokens[first].start];
    let mut depth = 0usize;
    let mut last = first;
    for (idx, tok) in tokens.iter().enumerate().skip(first + 1) {
        last = idx;
        match tok.kind {
            TokenKind::InterpStart => depth += 1,
            TokenKind::InterpEnd => depth = depth.saturating_sub(1),
            TokenKind::String if depth == 0 && tok.interpolated => {
                if tok.text(source).as_bytes().last() == Some(&quote) {
                    return idx;
                }
            }
            _ => {}
        }
    }
    last
}

fn strip_quotes(text: &str) -> &str {
    let text = text.strip_prefix(&['"', '\''][..]).unwrap_or(text);
    text.strip_suffix(&['"', '\''][..]).unwrap_or(text)
}

/// Parse the tokens following a link at-keyword.
pub(crate) fn parse_link(source: &str, kind: LinkKind, tokens: &[Token]) -> Vec<LinkCandidate> {
    match kind {
        LinkKind::Import => parse_import(source, tokens),
        LinkKind::Use | LinkKind::Forward => parse_module_rule(source, kind, tokens)
            .into_iter()
            .collect(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Clause {
    None,
    Hide,
    Show,
}

fn parse_module_rule(source: &str, kind: LinkKind, tokens: &[Token]) -> Option<LinkCandidate> {
    let first = tokens.first()?;
    if first.kind != TokenKind::String || first.interpolated {
        log::trace!("Skipping @{:?} with non-literal target", kind);
        return None;
    }
    let raw_target = first.unquoted(source).to_string();
    let mut link = LinkCandidate::new(kind, raw_target, (first.start, first.end));

    let mut clause = Clause::None;
    let mut idx = 1;
    while idx < tokens.len() {
        let tok = &tokens[idx];
        let text = tok.text(source);
        match tok.kind {
            TokenKind::Ident if text == "as" => {
                clause = Clause::None;
                match tokens.get(idx + 1) {
                    Some(next) if next.is_punct(b'*') && kind == LinkKind::Use => {
                        link.namespace = Some("*".to_string());
                        link.is_aliased = true;
                        idx += 2;
                    }
                    Some(next) if next.kind == TokenKind::Ident => {
                        let name = next.text(source).to_string();
                        if kind == LinkKind::Forward {
                            link.prefix = Some(name);
                        } else {
                            link.namespace = Some(name);
                            link.is_aliased = true;
                        }
                        idx += 2;
                        if matches!(tokens.get(idx), Some(star) if star.is_punct(b'*')) {
                            idx += 1;
                        }
                    }
                    _ => idx += 1,
                }
                continue;
            }
            TokenKind::Ident if text == "hide" => clause = Clause::Hide,
            TokenKind::Ident if text == "show" => clause = Clause::Show,
            // Configuration map follows; nothing after it names members
            TokenKind::Ident if text == "with" => break,
            TokenKind::Ident | TokenKind::Variable => match clause {
                Clause::Hide => link.hide.push(text.to_string()),
                Clause::Show => link.show.push(text.to_string()),
                Clause::None => {}
            },
            _ => {}
        }
        idx += 1;
    }

    if kind == LinkKind::Use && link.namespace.is_none() {
        link.namespace = Some(default_namespace(&link.raw_target));
    }
    Some(link)
}

fn parse_import(source: &str, tokens: &[Token]) -> Vec<LinkCandidate> {
    let mut links = Vec::new();
    let mut segment_start = 0;
    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate() {
        match tok.kind {
            TokenKind::Punct(b'(') | TokenKind::InterpStart => depth += 1,
            TokenKind::Punct(b')') | TokenKind::InterpEnd => depth = depth.saturating_sub(1),
            TokenKind::Punct(b',') if depth == 0 => {
                links.extend(import_target(source, &tokens[segment_start..idx]));
                segment_start = idx + 1;
            }
            _ => {}
        }
    }
    if segment_start < tokens.len() {
        links.extend(import_target(source, &tokens[segment_start..]));
    }
    links
}

fn import_target(source: &str, tokens: &[Token]) -> Option<LinkCandidate> {
    let first = tokens.first()?;
    match first.kind {
        TokenKind::String => {
            let last = string_extent(source, tokens, 0);
            let end = tokens[last].end;
            let dynamic = first.interpolated;
            let raw_target = if dynamic {
                strip_quotes(&source[first.start..end]).to_string()
            } else {
                first.unquoted(source).to_string()
            };
            let mut link = LinkCandidate::new(LinkKind::Import, raw_target, (first.start, end));
            link.dynamic = dynamic;
            // Anything after the target is a media query, which makes it plain CSS
            link.is_css = is_css_target(&link.raw_target) || last + 1 < tokens.len();
            Some(link)
        }
        TokenKind::Ident if first.text(source).eq_ignore_ascii_case("url") => {
            let inner = tokens
                .iter()
                .skip(1)
                .find(|t| matches!(t.kind, TokenKind::Url | TokenKind::String))?;
            let raw_target = strip_quotes(inner.text(source).trim()).to_string();
            let mut link = LinkCandidate::new(LinkKind::Import, raw_target, (inner.start, inner.end));
            link.is_css = true;
            Some(link)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_stylesheet;

    fn links(source: &str) -> Vec<LinkCandidate> {
        parse_stylesheet(source).links().to_vec()
    }

    #[test]
    fn test_default_namespace() {
        assert_eq!(default_namespace("sass:math"), "math");
        assert_eq!(default_namespace("src/_corners.scss"), "corners");
        assert_eq!(default_namespace("theme/colors"), "colors");
        assert_eq!(default_namespace("~bootstrap/scss/variables"), "variables");
    }

    #[test]
    fn test_use_with_alias_and_wildcard() {
        let found = links("@use \"b\" as bee;\n@use 'c' as *;\n@use \"sass:math\";");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].namespace.as_deref(), Some("bee"));
        assert!(found[0].is_aliased);
        assert_eq!(found[1].namespace.as_deref(), Some("*"));
        assert_eq!(found[2].namespace.as_deref(), Some("math"));
        assert!(!found[2].is_aliased);
        assert_eq!(found[2].raw_target, "sass:math");
    }

    #[test]
    fn test_use_range_covers_quoted_target() {
        let source = "@use \"theme\";";
        let found = links(source);
        let (start, end) = found[0].range;
        assert_eq!(&source[start..end], "\"theme\"");
    }

    #[test]
    fn test_forward_prefix_and_filters() {
        let found = links("@forward \"b\" as fwd-* hide $y, square;\n@forward 'c' show $x;");
        assert_eq!(found[0].kind, LinkKind::Forward);
        assert_eq!(found[0].prefix.as_deref(), Some("fwd-"));
        assert_eq!(found[0].hide, vec!["$y", "square"]);
        assert!(found[0].show.is_empty());
        assert_eq!(found[0].namespace, None);
        assert_eq!(found[1].show, vec!["$x"]);
    }

    #[test]
    fn test_forward_with_configuration_stops_clause_parsing() {
        let found = links("@forward 'lib' show $a with ($b: 1);");
        assert_eq!(found[0].show, vec!["$a"]);
    }

    #[test]
    fn test_import_list_and_css_detection() {
        let found = links(
            "@import 'a', \"b.css\", url(theme.css), 'http://x.com/y', 'print' screen;",
        );
        assert_eq!(found.len(), 5);
        assert!(!found[0].is_css);
        assert_eq!(found[0].raw_target, "a");
        assert!(found[1].is_css);
        assert!(found[2].is_css);
        assert_eq!(found[2].raw_target, "theme.css");
        assert!(found[3].is_css);
        assert!(found[4].is_css);
    }

    #[test]
    fn test_interpolated_import_is_dynamic() {
        let found = links("@import \"themes/#{$theme}\";");
        assert_eq!(found.len(), 1);
        assert!(found[0].dynamic);
        assert_eq!(found[0].raw_target, "themes/#{$theme}");
    }
}

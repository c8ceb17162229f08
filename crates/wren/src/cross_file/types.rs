//
// cross_file/types.rs
//
// Symbol and module-link records shared by the document model, scanner,
// and resolver.
//

use tower_lsp::lsp_types::{Position, Range, Url};

use crate::sassdoc::SassDoc;
use crate::syntax::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Mixin,
    Function,
    Placeholder,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 4] = [
        SymbolKind::Variable,
        SymbolKind::Mixin,
        SymbolKind::Function,
        SymbolKind::Placeholder,
    ];

    /// Kind declared or referenced by a syntax node.
    pub fn of_node(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::VariableDeclaration | NodeKind::Parameter | NodeKind::VariableReference => {
                Some(SymbolKind::Variable)
            }
            NodeKind::MixinDeclaration | NodeKind::MixinReference => Some(SymbolKind::Mixin),
            NodeKind::FunctionDeclaration | NodeKind::FunctionReference => {
                Some(SymbolKind::Function)
            }
            NodeKind::PlaceholderDeclaration | NodeKind::PlaceholderReference => {
                Some(SymbolKind::Placeholder)
            }
            NodeKind::ModuleLink => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Mixin => "mixin",
            SymbolKind::Function => "function",
            SymbolKind::Placeholder => "placeholder",
        }
    }
}

/// Variable name without its `$` sigil; other names pass through.
pub fn dollarless(name: &str) -> &str {
    name.strip_prefix('$').unwrap_or(name)
}

/// Names starting with `-` or `_` (after any sigil) are private to their
/// declaring document.
pub fn is_private_name(name: &str) -> bool {
    let bare = name.trim_start_matches(&['$', '%'][..]);
    bare.starts_with('-') || bare.starts_with('_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// `$name` for variables, `%name` for placeholders, bare otherwise
    pub name: String,
    pub kind: SymbolKind,
    /// Span of the declared name
    pub range: Range,
    pub position: Position,
    pub offset: usize,
    pub sassdoc: Option<SassDoc>,
    /// Raw right-hand side of a variable, or a parameter's default
    pub value: Option<String>,
    /// Mixin or function whose parameter this is
    pub owner: Option<String>,
    /// Declared inside a block without `!global`
    pub local: bool,
    /// Byte range a parameter or block-local variable is visible in
    pub scope: Option<(usize, usize)>,
    pub parameters: Vec<Parameter>,
}

impl Symbol {
    pub fn dollarless_name(&self) -> &str {
        dollarless(&self.name)
    }

    pub fn is_private(&self) -> bool {
        is_private_name(&self.name)
    }

    /// Module-level declaration: neither a parameter nor block-local.
    pub fn is_module_level(&self) -> bool {
        self.owner.is_none() && !self.local
    }

    /// Visible to other documents through `@use`, `@forward`, or `@import`.
    pub fn is_exported(&self) -> bool {
        self.is_module_level() && !self.is_private()
    }

    pub fn visible_at(&self, offset: usize) -> bool {
        match self.scope {
            Some((start, end)) => start <= offset && offset <= end,
            None => true,
        }
    }

    pub fn deprecation(&self) -> Option<&str> {
        self.sassdoc.as_ref()?.deprecated.as_deref()
    }
}

/// A name to resolve: what it is, how it was qualified, and where it was
/// written in the starting document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub kind: SymbolKind,
    pub namespace: Option<String>,
    /// Byte offset of the name in the starting document
    pub offset: Option<usize>,
}

impl Identifier {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            namespace: None,
            offset: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

// ============================================================================
// Module links
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseLink {
    /// Resolved target: a document URI or `sass:<module>`
    pub target: Url,
    pub raw_target: String,
    /// Alias, default namespace, or `*` for a wildcard use
    pub namespace: String,
    pub is_aliased: bool,
    pub range: Range,
}

impl UseLink {
    pub fn is_wildcard(&self) -> bool {
        self.namespace == "*"
    }

    /// Whether `token` selects this use. An alias written with a leading
    /// underscore also answers to the bare token.
    pub fn answers_to(&self, token: &str) -> bool {
        self.namespace == token
            || self
                .namespace
                .strip_prefix('_')
                .is_some_and(|bare| bare == token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardLink {
    pub target: Url,
    pub raw_target: String,
    pub prefix: Option<String>,
    pub hide: Vec<String>,
    pub show: Vec<String>,
    pub range: Range,
}

impl ForwardLink {
    /// Apply this link's `show` then `hide` filter to a member exposed under
    /// `exposed_name` (sigil included, prefix applied). A bare name in a
    /// filter covers both the mixin and the function.
    pub fn exposes(&self, exposed_name: &str, kind: SymbolKind) -> bool {
        let matches = |entry: &String| match kind {
            SymbolKind::Variable => entry == exposed_name,
            _ => !entry.starts_with('$') && entry == exposed_name,
        };
        if !self.show.is_empty() && !self.show.iter().any(matches) {
            return false;
        }
        !self.hide.iter().any(matches)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLink {
    pub target: Url,
    pub raw_target: String,
    pub dynamic: bool,
    pub is_css: bool,
    pub range: Range,
}

/// One link of any kind, borrowed from a document's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link<'a> {
    Use(&'a UseLink),
    Forward(&'a ForwardLink),
    Import(&'a ImportLink),
}

impl<'a> Link<'a> {
    pub fn target(&self) -> &'a Url {
        match self {
            Link::Use(link) => &link.target,
            Link::Forward(link) => &link.target,
            Link::Import(link) => &link.target,
        }
    }

    pub fn range(&self) -> Range {
        match self {
            Link::Use(link) => link.range,
            Link::Forward(link) => link.range,
            Link::Import(link) => link.range,
        }
    }

    /// Whether the scanner should follow this link to discover its target.
    pub fn is_followable(&self) -> bool {
        match self {
            Link::Use(link) => !is_builtin_target(&link.target),
            Link::Forward(link) => !is_builtin_target(&link.target),
            Link::Import(link) => !link.is_css && !link.dynamic,
        }
    }
}

/// Which link tables `ScssDocument::get_links` includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkFilter {
    pub uses: bool,
    pub forwards: bool,
    pub imports: bool,
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl LinkFilter {
    pub const ALL: LinkFilter = LinkFilter {
        uses: true,
        forwards: true,
        imports: true,
    };
    pub const FORWARDS: LinkFilter = LinkFilter {
        uses: false,
        forwards: true,
        imports: false,
    };
}

/// Synthetic identities such as `sass:math` name built-in modules.
pub fn is_builtin_target(target: &Url) -> bool {
    target.scheme() == "sass"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward(hide: &[&str], show: &[&str]) -> ForwardLink {
        ForwardLink {
            target: Url::parse("file:///b.scss").unwrap(),
            raw_target: "b".to_string(),
            prefix: None,
            hide: hide.iter().map(|s| s.to_string()).collect(),
            show: show.iter().map(|s| s.to_string()).collect(),
            range: Range::default(),
        }
    }

    #[test]
    fn test_privacy() {
        assert!(is_private_name("$_secret"));
        assert!(is_private_name("-helper"));
        assert!(is_private_name("%_base"));
        assert!(!is_private_name("$public-name"));
    }

    #[test]
    fn test_hide_and_show() {
        let hide = forward(&["$y", "square"], &[]);
        assert!(hide.exposes("$x", SymbolKind::Variable));
        assert!(!hide.exposes("$y", SymbolKind::Variable));
        assert!(!hide.exposes("square", SymbolKind::Mixin));
        assert!(!hide.exposes("square", SymbolKind::Function));

        let show = forward(&[], &["$x"]);
        assert!(show.exposes("$x", SymbolKind::Variable));
        assert!(!show.exposes("$z", SymbolKind::Variable));
        // A variable entry does not cover a mixin of the same bare name
        assert!(!show.exposes("x", SymbolKind::Mixin));
    }

    #[test]
    fn test_show_applies_before_hide() {
        let both = forward(&["$x"], &["$x", "$y"]);
        assert!(!both.exposes("$x", SymbolKind::Variable));
        assert!(both.exposes("$y", SymbolKind::Variable));
        assert!(!both.exposes("$z", SymbolKind::Variable));
    }

    #[test]
    fn test_use_answers_to_underscored_alias() {
        let link = UseLink {
            target: Url::parse("file:///b.scss").unwrap(),
            raw_target: "b".to_string(),
            namespace: "_b".to_string(),
            is_aliased: true,
            range: Range::default(),
        };
        assert!(link.answers_to("b"));
        assert!(link.answers_to("_b"));
        assert!(!link.answers_to("c"));
    }

    #[test]
    fn test_builtin_target() {
        assert!(is_builtin_target(&Url::parse("sass:math").unwrap()));
        assert!(!is_builtin_target(&Url::parse("file:///a.scss").unwrap()));
    }
}

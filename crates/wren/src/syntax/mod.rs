//
// syntax/mod.rs
//
// Stylesheet syntax tree: the declaration, reference, and module-link nodes
// the symbol layer needs, with byte ranges for position queries. Built on top
// of the tree-sitter concrete syntax tree, which supplies comment regions.
//

pub mod lexer;
pub mod links;
mod parser;

pub use links::{LinkCandidate, LinkKind};
pub use parser::parse_stylesheet;

/// A `/* */` or `//` comment reported by the concrete syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub start: usize,
    pub end: usize,
    /// `//` comment running to the end of its line
    pub line: bool,
}

/// Comments in document order. Comments are extras in the grammar, so they
/// show up anywhere in the tree, including inside error nodes.
pub fn collect_comments(tree: &tree_sitter::Tree) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut cursor = tree.walk();
    loop {
        let node = cursor.node();
        let line = match node.kind() {
            "comment" => Some(false),
            "js_comment" => Some(true),
            _ => None,
        };
        if let Some(line) = line {
            comments.push(Comment {
                start: node.start_byte(),
                end: node.end_byte(),
                line,
            });
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return comments;
            }
        }
    }
}

fn line_start(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .rfind('\n')
        .map(|idx| idx + 1)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    VariableDeclaration,
    /// Parameter of a `@mixin` or `@function`
    Parameter,
    VariableReference,
    MixinDeclaration,
    MixinReference,
    FunctionDeclaration,
    FunctionReference,
    PlaceholderDeclaration,
    PlaceholderReference,
    /// Target string of a `@use`, `@forward`, or `@import`
    ModuleLink,
}

impl NodeKind {
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::VariableDeclaration
                | NodeKind::Parameter
                | NodeKind::MixinDeclaration
                | NodeKind::FunctionDeclaration
                | NodeKind::PlaceholderDeclaration
        )
    }

    pub fn is_reference(self) -> bool {
        matches!(
            self,
            NodeKind::VariableReference
                | NodeKind::MixinReference
                | NodeKind::FunctionReference
                | NodeKind::PlaceholderReference
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Full span, including a `ns.` qualifier when present
    pub start: usize,
    pub end: usize,
    /// Start of the bare name (after any qualifier)
    pub name_start: usize,
    /// Name as written, sigil included (`$x`, `%x`)
    pub name: String,
    pub namespace: Option<String>,
    pub parent: Option<NodeId>,
    /// Raw right-hand side of a variable declaration, or a parameter's default
    pub value: Option<String>,
    /// Parameters of a mixin or function declaration
    pub parameters: Vec<NodeId>,
    /// Byte range of a mixin or function body, braces included
    pub body: Option<(usize, usize)>,
    /// Variable declared inside a block without `!global`
    pub local: bool,
    /// Byte range a local declaration is visible in
    pub scope: Option<(usize, usize)>,
    /// Index into `SyntaxTree::links` for `ModuleLink` nodes
    pub link: Option<usize>,
}

impl Node {
    pub fn new(kind: NodeKind, start: usize, end: usize, name: impl Into<String>) -> Self {
        Self {
            kind,
            start,
            end,
            name_start: start,
            name: name.into(),
            namespace: None,
            parent: None,
            value: None,
            parameters: Vec::new(),
            body: None,
            local: false,
            scope: None,
            link: None,
        }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Parsed stylesheet. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<LinkCandidate>,
    pub(crate) comments: Vec<Comment>,
    /// `None` only when tree-sitter gave up on the input
    pub(crate) cst: Option<tree_sitter::Tree>,
}

impl SyntaxTree {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(idx, node)| (NodeId(idx), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn links(&self) -> &[LinkCandidate] {
        &self.links
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn cst(&self) -> Option<&tree_sitter::Tree> {
        self.cst.as_ref()
    }

    /// Contents of the `///` lines directly above the line holding `offset`,
    /// top to bottom, with the marker and one following space removed. Each
    /// line must hold nothing but its comment.
    pub fn doc_comment_lines<'a>(&self, source: &'a str, offset: usize) -> Vec<&'a str> {
        let mut boundary = line_start(source, offset);
        let mut lines = Vec::new();
        let start = boundary;
        for comment in self.comments.iter().rev().skip_while(move |c| c.start >= start) {
            let gap = &source[comment.end..boundary];
            if !comment.line || gap.matches('\n').count() != 1 || !gap.trim().is_empty() {
                break;
            }
            let owner_line = line_start(source, comment.start);
            if !source[owner_line..comment.start].trim().is_empty() {
                break;
            }
            let Some(content) = source[comment.start..comment.end].strip_prefix("///") else {
                break;
            };
            let content = content.trim_end_matches('\r');
            lines.push(content.strip_prefix(' ').unwrap_or(content));
            boundary = owner_line;
        }
        lines.reverse();
        lines
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn parameter_list(&self, id: NodeId) -> Vec<&Node> {
        self.get(id)
            .map(|node| node.parameters.iter().map(|p| self.node(*p)).collect())
            .unwrap_or_default()
    }

    /// Innermost node whose span contains `offset`. A cursor sitting right
    /// after a name still counts as on it.
    pub fn node_at(&self, offset: usize) -> Option<NodeId> {
        let mut best: Option<(NodeId, &Node)> = None;
        for (id, node) in self.nodes() {
            if !node.contains(offset) {
                continue;
            }
            best = match best {
                None => Some((id, node)),
                Some((best_id, best_node)) => {
                    let span = node.end - node.start;
                    let best_span = best_node.end - best_node.start;
                    // Between two adjacent nodes, prefer the one starting at the cursor
                    let better = span < best_span
                        || (span == best_span && node.start > best_node.start)
                        || (best_node.end == offset && node.start == offset);
                    if better {
                        Some((id, node))
                    } else {
                        Some((best_id, best_node))
                    }
                }
            };
        }
        best.map(|(id, _)| id)
    }

    /// The mixin or function declaration whose body contains `offset`.
    pub fn enclosing_callable(&self, offset: usize) -> Option<NodeId> {
        self.nodes()
            .filter(|(_, node)| {
                matches!(
                    node.kind,
                    NodeKind::MixinDeclaration | NodeKind::FunctionDeclaration
                ) && node
                    .body
                    .map(|(start, end)| start <= offset && offset <= end)
                    .unwrap_or(false)
            })
            .min_by_key(|(_, node)| node.body.map(|(s, e)| e - s).unwrap_or(usize::MAX))
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_at_prefers_innermost() {
        let source = "@mixin box($size: 1px) { width: $size; }";
        let tree = parse_stylesheet(source);
        let offset = source.rfind("$size").unwrap() + 2;
        let id = tree.node_at(offset).unwrap();
        let node = tree.node(id);
        assert_eq!(node.kind, NodeKind::VariableReference);
        assert_eq!(node.name, "$size");
    }

    #[test]
    fn test_node_at_cursor_after_name() {
        let source = "$a: 1;\n.b { c: $a; }";
        let tree = parse_stylesheet(source);
        let offset = source.rfind("$a").unwrap() + 2;
        let node = tree.node(tree.node_at(offset).unwrap());
        assert_eq!(node.kind, NodeKind::VariableReference);
    }

    #[test]
    fn test_parameter_parent_is_callable() {
        let source = "@function double($n) { @return $n * 2; }";
        let tree = parse_stylesheet(source);
        let (decl_id, decl) = tree
            .nodes()
            .find(|(_, n)| n.kind == NodeKind::FunctionDeclaration)
            .unwrap();
        let params = tree.parameter_list(decl_id);
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "$n");
        assert_eq!(tree.parent(decl.parameters[0]), Some(decl_id));
    }

    #[test]
    fn test_comments_come_from_concrete_tree() {
        let source = "/* a */\n// b\n.x { c: d; }";
        let tree = parse_stylesheet(source);
        assert_eq!(tree.cst().map(|t| t.root_node().kind()), Some("stylesheet"));
        let comments = tree.comments();
        assert_eq!(comments.len(), 2);
        assert_eq!(&source[comments[0].start..comments[0].end], "/* a */");
        assert!(!comments[0].line);
        assert_eq!(&source[comments[1].start..comments[1].end], "// b");
        assert!(comments[1].line);
    }

    #[test]
    fn test_doc_comment_lines_stop_at_gaps() {
        let source = "/// stray\n\n/// first\n///   second\n$a: 1;\n// plain\n$b: 2;";
        let tree = parse_stylesheet(source);
        let a = source.find("$a").unwrap();
        assert_eq!(tree.doc_comment_lines(source, a), vec!["first", "  second"]);
        let b = source.find("$b").unwrap();
        assert!(tree.doc_comment_lines(source, b).is_empty());
    }

    #[test]
    fn test_doc_comment_must_own_its_line() {
        let source = "$x: 1; /// trailing\n$y: 2;";
        let tree = parse_stylesheet(source);
        let y = source.find("$y").unwrap();
        assert!(tree.doc_comment_lines(source, y).is_empty());
    }

    #[test]
    fn test_enclosing_callable() {
        let source = "@mixin a { x: 1; }\n@mixin b { y: 2; }";
        let tree = parse_stylesheet(source);
        let offset = source.find("y:").unwrap();
        let id = tree.enclosing_callable(offset).unwrap();
        assert_eq!(tree.node(id).name, "b");
        assert!(tree.enclosing_callable(0).is_none());
    }
}

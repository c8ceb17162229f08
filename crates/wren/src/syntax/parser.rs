//
// syntax/parser.rs
//
// Statement-level parse of SCSS into declaration, reference, and link nodes.
// Statements end at `;`, `{`, or `}`; a block stack tracks nesting so that
// block-scoped variables and callable bodies are recorded.
//

use super::lexer::{tokenize, Token, TokenKind};
use super::links::{parse_link, LinkKind};
use super::{collect_comments, Node, NodeId, NodeKind, SyntaxTree};
use crate::parser_pool::with_parser;

struct Block {
    callable: Option<NodeId>,
    open: usize,
    locals: Vec<NodeId>,
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    tree: SyntaxTree,
    blocks: Vec<Block>,
    /// Header declarations (parameters, loop variables) scoped to the next block
    pending: Vec<NodeId>,
}

fn adjacent(left: &Token, right: &Token) -> bool {
    left.end == right.start
}

/// Index of the namespace token qualifying `tokens[idx]` (`ns.name`), if any.
fn qualifier(tokens: &[Token], idx: usize) -> Option<usize> {
    if idx < 2 {
        return None;
    }
    let dot = &tokens[idx - 1];
    let ns = &tokens[idx - 2];
    (dot.is_punct(b'.')
        && ns.kind == TokenKind::Ident
        && adjacent(ns, dot)
        && adjacent(dot, &tokens[idx]))
    .then_some(idx - 2)
}

fn calls(tokens: &[Token], idx: usize) -> bool {
    matches!(tokens.get(idx + 1), Some(next) if next.is_punct(b'(') && adjacent(&tokens[idx], next))
}

impl<'a> Parser<'a> {
    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.tree.nodes.len());
        self.tree.nodes.push(node);
        id
    }

    fn declaration(&mut self, kind: NodeKind, tok: &Token, local: bool) -> NodeId {
        let mut node = Node::new(kind, tok.start, tok.end, tok.text(self.source));
        node.local = local;
        let id = self.push(node);
        if local {
            if let Some(block) = self.blocks.last_mut() {
                block.locals.push(id);
            }
        }
        id
    }

    fn close_block(&mut self, end: usize) {
        if let Some(block) = self.blocks.pop() {
            if let Some(id) = block.callable {
                self.tree.nodes[id.0].body = Some((block.open, end));
            }
            for id in block.locals {
                self.tree.nodes[id.0].scope = Some((block.open, end));
            }
        }
    }

    fn reference(&mut self, kind: NodeKind, tokens: &[Token], idx: usize) -> NodeId {
        let tok = &tokens[idx];
        let mut node = Node::new(kind, tok.start, tok.end, tok.text(self.source));
        if let Some(ns) = qualifier(tokens, idx) {
            node.start = tokens[ns].start;
            node.namespace = Some(tokens[ns].text(self.source).to_string());
        }
        self.push(node)
    }

    /// Record variable and function references in an expression. In selectors
    /// only interpolated segments can call functions.
    fn scan_values(&mut self, tokens: &[Token], selector: bool) {
        let mut interp = 0usize;
        for (idx, tok) in tokens.iter().enumerate() {
            match tok.kind {
                TokenKind::InterpStart => interp += 1,
                TokenKind::InterpEnd => interp = interp.saturating_sub(1),
                TokenKind::Variable => {
                    self.reference(NodeKind::VariableReference, tokens, idx);
                }
                TokenKind::Ident if (!selector || interp > 0) && calls(tokens, idx) => {
                    if !tok.text(self.source).eq_ignore_ascii_case("url") {
                        self.reference(NodeKind::FunctionReference, tokens, idx);
                    }
                }
                _ => {}
            }
        }
    }

    fn run(mut self) -> SyntaxTree {
        let tokens = self.tokens;
        let mut stmt_start = 0;
        for (idx, tok) in tokens.iter().enumerate() {
            match tok.kind {
                TokenKind::Punct(b';') => {
                    self.statement(&tokens[stmt_start..idx], false);
                    self.pending.clear();
                    stmt_start = idx + 1;
                }
                TokenKind::Punct(b'{') => {
                    let callable = self.statement(&tokens[stmt_start..idx], true);
                    let locals = std::mem::take(&mut self.pending);
                    self.blocks.push(Block {
                        callable,
                        open: tok.start,
                        locals,
                    });
                    stmt_start = idx + 1;
                }
                TokenKind::Punct(b'}') => {
                    self.statement(&tokens[stmt_start..idx], false);
                    self.pending.clear();
                    self.close_block(tok.end);
                    stmt_start = idx + 1;
                }
                _ => {}
            }
        }
        self.statement(&tokens[stmt_start..], false);

        // Unclosed blocks extend to the end of the file
        let len = self.source.len();
        while !self.blocks.is_empty() {
            self.close_block(len);
        }
        self.tree
    }

    /// Handle one statement. Returns the callable declared by a block header.
    fn statement(&mut self, tokens: &[Token], header: bool) -> Option<NodeId> {
        let first = tokens.first()?;
        match first.kind {
            TokenKind::AtKeyword => self.at_rule(tokens, header),
            TokenKind::Variable if !header && tokens.get(1).is_some_and(|t| t.is_punct(b':')) => {
                self.variable_declaration(tokens);
                None
            }
            _ if header => {
                for tok in tokens.iter().filter(|t| t.kind == TokenKind::Placeholder) {
                    self.declaration(NodeKind::PlaceholderDeclaration, tok, false);
                }
                self.scan_values(tokens, true);
                None
            }
            _ => {
                self.scan_values(tokens, false);
                None
            }
        }
    }

    fn variable_declaration(&mut self, tokens: &[Token]) {
        let name = &tokens[0];
        let rest = &tokens[2..];

        let mut global = false;
        let mut value_end = None;
        for (idx, tok) in rest.iter().enumerate() {
            if !tok.is_punct(b'!') {
                continue;
            }
            let flag = rest.get(idx + 1).map(|t| t.text(self.source));
            if matches!(flag, Some("default" | "global")) {
                global |= flag == Some("global");
                value_end.get_or_insert(tok.start);
            }
        }

        let value = rest.first().map(|first| {
            let end = value_end.unwrap_or_else(|| rest[rest.len() - 1].end);
            self.source[first.start..end.max(first.start)].trim().to_string()
        });

        let local = !self.blocks.is_empty() && !global;
        let id = self.declaration(NodeKind::VariableDeclaration, name, local);
        self.tree.nodes[id.0].value = value.filter(|v| !v.is_empty());
        self.scan_values(rest, false);
    }

    fn at_rule(&mut self, tokens: &[Token], header: bool) -> Option<NodeId> {
        let keyword = tokens[0].text(self.source)[1..].to_ascii_lowercase();
        let rest = &tokens[1..];

        if let Some(kind) = LinkKind::from_keyword(&keyword) {
            for link in parse_link(self.source, kind, rest) {
                let (start, end) = link.range;
                let mut node = Node::new(NodeKind::ModuleLink, start, end, link.raw_target.clone());
                node.link = Some(self.tree.links.len());
                self.tree.links.push(link);
                self.push(node);
            }
            return None;
        }

        match keyword.as_str() {
            "mixin" | "function" => {
                let name = rest.first().filter(|t| t.kind == TokenKind::Ident)?;
                let kind = if keyword == "mixin" {
                    NodeKind::MixinDeclaration
                } else {
                    NodeKind::FunctionDeclaration
                };
                let id = self.declaration(kind, name, false);
                self.parameters(id, &rest[1..]);
                header.then_some(id)
            }
            "include" => {
                let mut name_idx = 0;
                if rest.len() > 2 && qualifier(rest, 2).is_some() && rest[2].kind == TokenKind::Ident {
                    name_idx = 2;
                }
                if rest.get(name_idx).map(|t| t.kind) == Some(TokenKind::Ident) {
                    self.reference(NodeKind::MixinReference, rest, name_idx);
                    self.scan_values(&rest[name_idx + 1..], false);
                }
                None
            }
            "extend" => {
                for (idx, tok) in rest.iter().enumerate() {
                    if tok.kind == TokenKind::Placeholder {
                        self.reference(NodeKind::PlaceholderReference, rest, idx);
                    }
                }
                None
            }
            "each" => {
                let split = rest
                    .iter()
                    .position(|t| t.kind == TokenKind::Ident && t.text(self.source) == "in")
                    .unwrap_or(rest.len());
                for tok in rest[..split].iter().filter(|t| t.kind == TokenKind::Variable) {
                    self.loop_variable(tok);
                }
                self.scan_values(&rest[split..], false);
                None
            }
            "for" => {
                match rest.first() {
                    Some(var) if var.kind == TokenKind::Variable => {
                        self.loop_variable(var);
                        self.scan_values(&rest[1..], false);
                    }
                    _ => self.scan_values(rest, false),
                }
                None
            }
            _ => {
                self.scan_values(rest, false);
                None
            }
        }
    }

    fn loop_variable(&mut self, tok: &Token) {
        let mut node = Node::new(NodeKind::VariableDeclaration, tok.start, tok.end, tok.text(self.source));
        node.local = true;
        let id = self.push(node);
        self.pending.push(id);
    }

    /// Parse `($a, $b: default, $rest...)` after a mixin or function name.
    fn parameters(&mut self, owner: NodeId, tokens: &[Token]) {
        if !tokens.first().is_some_and(|t| t.is_punct(b'(')) {
            return;
        }
        let mut depth = 0usize;
        let mut expect_param = false;
        let mut current: Option<NodeId> = None;
        let mut default_start: Option<usize> = None;

        for (idx, tok) in tokens.iter().enumerate() {
            match tok.kind {
                TokenKind::Punct(b'(') => {
                    depth += 1;
                    expect_param = depth == 1;
                    continue;
                }
                TokenKind::Punct(b')') if depth == 1 => {
                    self.finish_default(current.take(), default_start.take(), tok.start);
                    break;
                }
                TokenKind::Punct(b')') => depth -= 1,
                TokenKind::Punct(b',') if depth == 1 => {
                    self.finish_default(current.take(), default_start.take(), tok.start);
                    expect_param = true;
                    continue;
                }
                TokenKind::Punct(b':') if depth == 1 && current.is_some() && default_start.is_none() => {
                    default_start = Some(tok.end);
                    continue;
                }
                TokenKind::Variable if depth == 1 && expect_param => {
                    let mut node = Node::new(NodeKind::Parameter, tok.start, tok.end, tok.text(self.source));
                    node.parent = Some(owner);
                    node.local = true;
                    let id = self.push(node);
                    self.tree.nodes[owner.0].parameters.push(id);
                    self.pending.push(id);
                    current = Some(id);
                    expect_param = false;
                    continue;
                }
                TokenKind::Variable => {
                    self.reference(NodeKind::VariableReference, tokens, idx);
                }
                TokenKind::Ident if calls(tokens, idx) => {
                    self.reference(NodeKind::FunctionReference, tokens, idx);
                }
                _ => {}
            }
            expect_param = false;
        }
    }

    fn finish_default(&mut self, param: Option<NodeId>, start: Option<usize>, end: usize) {
        if let (Some(id), Some(start)) = (param, start) {
            let value = self.source[start..end.max(start)].trim();
            if !value.is_empty() {
                self.tree.nodes[id.0].value = Some(value.to_string());
            }
        }
    }
}

/// Parse stylesheet text. Never fails; unrecognised input yields no nodes.
pub fn parse_stylesheet(source: &str) -> SyntaxTree {
    let cst = with_parser(|parser| parser.parse(source, None));
    if cst.is_none() {
        log::warn!("tree-sitter returned no tree; scanning comments directly");
    }
    let comments = cst.as_ref().map(collect_comments).unwrap_or_default();
    let tokens = tokenize(source, &comments);
    let mut tree = Parser {
        source,
        tokens: &tokens,
        tree: SyntaxTree::default(),
        blocks: Vec::new(),
        pending: Vec::new(),
    }
    .run();
    tree.comments = comments;
    tree.cst = cst;
    tree
}

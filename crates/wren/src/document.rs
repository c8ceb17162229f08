//
// document.rs
//
// One parsed stylesheet: its text, syntax tree, symbol tables, and resolved
// module-link tables. Built once and never mutated; a re-parse produces a
// new document that replaces the old one in the store.
//

use indexmap::IndexMap;
use tower_lsp::lsp_types::{Range, Url};

use crate::cross_file::types::{
    is_builtin_target, ForwardLink, ImportLink, Link, LinkFilter, Parameter, Symbol, SymbolKind,
    UseLink,
};
use crate::sassdoc::extract_sassdoc;
use crate::syntax::{parse_stylesheet, LinkCandidate, LinkKind, Node, NodeId, SyntaxTree};
use crate::utf16::LineIndex;

#[derive(Debug)]
pub struct ScssDocument {
    pub uri: Url,
    pub file_name: String,
    pub text: String,
    pub tree: SyntaxTree,
    pub line_index: LineIndex,
    pub variables: IndexMap<String, Symbol>,
    pub mixins: IndexMap<String, Symbol>,
    pub functions: IndexMap<String, Symbol>,
    pub placeholders: IndexMap<String, Symbol>,
    /// Parameters and block-local variables
    pub locals: Vec<Symbol>,
    pub uses: IndexMap<Url, UseLink>,
    pub forwards: IndexMap<Url, ForwardLink>,
    pub imports: IndexMap<Url, ImportLink>,
}

/// Last path segment of a URI.
pub fn file_name_of(uri: &Url) -> String {
    uri.path_segments()
        .and_then(|mut segments| segments.next_back().map(str::to_string))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| uri.as_str().to_string())
}

impl ScssDocument {
    /// Parse `text` and resolve its links with `resolve`.
    pub fn parse(uri: Url, text: String, resolve: impl Fn(&LinkCandidate) -> Option<Url>) -> Self {
        let tree = parse_stylesheet(&text);
        let targets: Vec<Option<Url>> = tree.links().iter().map(resolve).collect();
        Self::new(uri, text, tree, &targets)
    }

    /// Build from an already-parsed tree. `targets[i]` is the resolved
    /// identity of `tree.links()[i]`; unresolved links are left out.
    pub fn new(uri: Url, text: String, tree: SyntaxTree, targets: &[Option<Url>]) -> Self {
        let line_index = LineIndex::new(&text);
        let mut doc = Self {
            file_name: file_name_of(&uri),
            uri,
            text,
            tree,
            line_index,
            variables: IndexMap::new(),
            mixins: IndexMap::new(),
            functions: IndexMap::new(),
            placeholders: IndexMap::new(),
            locals: Vec::new(),
            uses: IndexMap::new(),
            forwards: IndexMap::new(),
            imports: IndexMap::new(),
        };
        doc.collect_symbols();
        doc.collect_links(targets);
        log::trace!(
            "Built document {}: {} variables, {} mixins, {} functions, {} placeholders, {} links",
            doc.uri,
            doc.variables.len(),
            doc.mixins.len(),
            doc.functions.len(),
            doc.placeholders.len(),
            doc.uses.len() + doc.forwards.len() + doc.imports.len()
        );
        doc
    }

    fn symbol_for(&self, id: NodeId, node: &Node, kind: SymbolKind) -> Symbol {
        let range = self.node_range(node);
        let module_level = !node.local && node.parent.is_none();
        let sassdoc = if module_level {
            extract_sassdoc(&self.tree, &self.text, node.start)
        } else {
            None
        };
        let owner = node
            .parent
            .and_then(|parent| self.tree.get(parent))
            .map(|parent| parent.name.clone());
        let parameters = self
            .tree
            .parameter_list(id)
            .into_iter()
            .map(|p| Parameter {
                name: p.name.clone(),
                default_value: p.value.clone(),
            })
            .collect();
        Symbol {
            name: node.name.clone(),
            kind,
            range,
            position: range.start,
            offset: node.name_start,
            sassdoc,
            value: node.value.clone(),
            owner,
            local: node.local,
            scope: node.scope,
            parameters,
        }
    }

    fn collect_symbols(&mut self) {
        let mut variables = IndexMap::new();
        let mut mixins = IndexMap::new();
        let mut functions = IndexMap::new();
        let mut placeholders = IndexMap::new();
        let mut locals = Vec::new();

        for (id, node) in self.tree.nodes() {
            if !node.kind.is_declaration() {
                continue;
            }
            let Some(kind) = SymbolKind::of_node(node.kind) else {
                continue;
            };
            let symbol = self.symbol_for(id, node, kind);
            if !symbol.is_module_level() {
                locals.push(symbol);
                continue;
            }
            let table = match kind {
                SymbolKind::Variable => &mut variables,
                SymbolKind::Mixin => &mut mixins,
                SymbolKind::Function => &mut functions,
                SymbolKind::Placeholder => &mut placeholders,
            };
            // First declaration wins; later assignments only rebind the value
            table.entry(symbol.name.clone()).or_insert(symbol);
        }

        self.variables = variables;
        self.mixins = mixins;
        self.functions = functions;
        self.placeholders = placeholders;
        self.locals = locals;
    }

    fn collect_links(&mut self, targets: &[Option<Url>]) {
        for (idx, candidate) in self.tree.links().iter().enumerate() {
            let Some(target) = targets.get(idx).cloned().flatten() else {
                log::trace!(
                    "Omitting unresolved @{:?} '{}' in {}",
                    candidate.kind,
                    candidate.raw_target,
                    self.uri
                );
                continue;
            };
            let range = self
                .line_index
                .range_of(&self.text, candidate.range.0, candidate.range.1);
            let raw_target = candidate.raw_target.clone();
            match candidate.kind {
                LinkKind::Use => {
                    let namespace = candidate.namespace.clone().unwrap_or_default();
                    self.uses.insert(
                        target.clone(),
                        UseLink {
                            target,
                            raw_target,
                            namespace,
                            is_aliased: candidate.is_aliased,
                            range,
                        },
                    );
                }
                LinkKind::Forward => {
                    self.forwards.insert(
                        target.clone(),
                        ForwardLink {
                            target,
                            raw_target,
                            prefix: candidate.prefix.clone(),
                            hide: candidate.hide.clone(),
                            show: candidate.show.clone(),
                            range,
                        },
                    );
                }
                LinkKind::Import => {
                    self.imports.insert(
                        target.clone(),
                        ImportLink {
                            target,
                            raw_target,
                            dynamic: candidate.dynamic,
                            is_css: candidate.is_css,
                            range,
                        },
                    );
                }
            }
        }
    }

    pub fn table(&self, kind: SymbolKind) -> &IndexMap<String, Symbol> {
        match kind {
            SymbolKind::Variable => &self.variables,
            SymbolKind::Mixin => &self.mixins,
            SymbolKind::Function => &self.functions,
            SymbolKind::Placeholder => &self.placeholders,
        }
    }

    /// Every declaration in the document, module-level tables first.
    pub fn get_symbols(&self) -> Vec<&Symbol> {
        self.variables
            .values()
            .chain(self.mixins.values())
            .chain(self.functions.values())
            .chain(self.placeholders.values())
            .chain(self.locals.iter())
            .collect()
    }

    /// Module-level symbol of `kind` named `name` (sigil included).
    pub fn symbol(&self, name: &str, kind: SymbolKind) -> Option<&Symbol> {
        self.table(kind).get(name)
    }

    /// Innermost parameter or local of `kind` named `name` visible at `offset`.
    pub fn local_at(&self, name: &str, kind: SymbolKind, offset: usize) -> Option<&Symbol> {
        self.locals
            .iter()
            .filter(|s| s.kind == kind && s.name == name && s.visible_at(offset))
            .filter(|s| s.owner.is_some() || s.offset <= offset)
            .min_by_key(|s| s.scope.map(|(start, end)| end - start).unwrap_or(usize::MAX))
    }

    pub fn get_links(&self, filter: LinkFilter) -> Vec<Link<'_>> {
        let mut links = Vec::new();
        if filter.uses {
            links.extend(self.uses.values().map(Link::Use));
        }
        if filter.forwards {
            links.extend(self.forwards.values().map(Link::Forward));
        }
        if filter.imports {
            links.extend(self.imports.values().map(Link::Import));
        }
        links
    }

    /// Built-in modules this document `@use`s, with their namespaces.
    pub fn builtin_uses(&self) -> impl Iterator<Item = &UseLink> {
        self.uses.values().filter(|u| is_builtin_target(&u.target))
    }

    pub fn node_at(&self, offset: usize) -> Option<&Node> {
        self.tree.node_at(offset).map(|id| self.tree.node(id))
    }

    pub fn node_range(&self, node: &Node) -> Range {
        self.line_index.range_of(&self.text, node.start, node.end)
    }

    pub fn range_of(&self, start: usize, end: usize) -> Range {
        self.line_index.range_of(&self.text, start, end)
    }

    /// Nodes that reference a symbol of `kind`.
    pub fn references(&self, kind: SymbolKind) -> impl Iterator<Item = &Node> {
        self.tree.nodes().map(|(_, node)| node).filter(move |node| {
            node.kind.is_reference() && SymbolKind::of_node(node.kind) == Some(kind)
        })
    }

    pub fn declaration_nodes(&self) -> impl Iterator<Item = &Node> {
        self.tree
            .nodes()
            .map(|(_, node)| node)
            .filter(|node| node.kind.is_declaration())
    }

    /// Whether a node at `offset` declares the symbol rather than using it.
    pub fn is_declaration_at(&self, offset: usize) -> bool {
        self.node_at(offset)
            .map(|node| node.kind.is_declaration())
            .unwrap_or(false)
    }

    pub fn is_partial(&self) -> bool {
        self.file_name.starts_with('_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file:///project/{}", path)).unwrap()
    }

    fn doc(text: &str) -> ScssDocument {
        ScssDocument::parse(uri("main.scss"), text.to_string(), |candidate| {
            if candidate.raw_target.starts_with("sass:") {
                Url::parse(&candidate.raw_target).ok()
            } else if candidate.raw_target == "missing" {
                None
            } else {
                Some(uri(&format!("{}.scss", candidate.raw_target)))
            }
        })
    }

    #[test]
    fn test_symbol_tables() {
        let doc = doc("/// Brand colour\n$brand: #f00;\n@mixin box($size: 1px) { $pad: 2px; }\n@function half($n) { @return $n / 2; }\n%plain { x: 1; }");
        assert_eq!(doc.file_name, "main.scss");
        let brand = doc.symbol("$brand", SymbolKind::Variable).unwrap();
        assert_eq!(brand.value.as_deref(), Some("#f00"));
        assert_eq!(brand.position.line, 1);
        assert_eq!(
            brand.sassdoc.as_ref().unwrap().description.as_deref(),
            Some("Brand colour")
        );

        let mixin = doc.symbol("box", SymbolKind::Mixin).unwrap();
        assert_eq!(
            mixin.parameters,
            vec![Parameter {
                name: "$size".to_string(),
                default_value: Some("1px".to_string())
            }]
        );
        assert!(doc.symbol("half", SymbolKind::Function).is_some());
        assert!(doc.symbol("%plain", SymbolKind::Placeholder).is_some());

        // Parameters and block locals stay out of the module tables
        assert!(doc.symbol("$size", SymbolKind::Variable).is_none());
        assert!(doc.symbol("$pad", SymbolKind::Variable).is_none());
        let size = doc.locals.iter().find(|s| s.name == "$size").unwrap();
        assert_eq!(size.owner.as_deref(), Some("box"));
        assert!(!size.is_exported());

        assert_eq!(doc.get_symbols().len(), 7);
    }

    #[test]
    fn test_first_declaration_wins() {
        let doc = doc("$a: 1 !default;\n$a: 2;");
        assert_eq!(doc.variables.len(), 1);
        assert_eq!(doc.variables["$a"].value.as_deref(), Some("1"));
    }

    #[test]
    fn test_link_tables_keyed_by_resolved_target() {
        let doc = doc("@use 'b' as bee;\n@use 'sass:math';\n@forward 'c' as c-*;\n@import 'd', 'missing';");
        assert_eq!(doc.uses.len(), 2);
        let b = &doc.uses[&uri("b.scss")];
        assert_eq!(b.namespace, "bee");
        assert!(b.is_aliased);
        assert_eq!(doc.builtin_uses().count(), 1);
        assert_eq!(doc.forwards[&uri("c.scss")].prefix.as_deref(), Some("c-"));
        assert_eq!(doc.imports.len(), 1);

        assert_eq!(doc.get_links(LinkFilter::ALL).len(), 4);
        assert_eq!(doc.get_links(LinkFilter::FORWARDS).len(), 1);
    }

    #[test]
    fn test_local_lookup_respects_scope() {
        let text = "$x: 0;\n@mixin m($x) { a: $x; }\n.b { c: $x; }";
        let doc = doc(text);
        let inside = text.find("a: $x").unwrap() + 3;
        let local = doc.local_at("$x", SymbolKind::Variable, inside).unwrap();
        assert_eq!(local.owner.as_deref(), Some("m"));
        let outside = text.rfind("$x").unwrap();
        assert!(doc.local_at("$x", SymbolKind::Variable, outside).is_none());
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of(&uri("dir/_partial.scss")), "_partial.scss");
        assert_eq!(file_name_of(&Url::parse("sass:math").unwrap()), "sass:math");
    }
}

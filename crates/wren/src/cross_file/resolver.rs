//
// cross_file/resolver.rs
//
// Cross-document name resolution over the module graph.
//
// `resolve` finds the declaration an identifier refers to, trying in order:
//   1. the starting document itself (innermost visible parameter or local,
//      then module-level declarations)
//   2. for `ns.name`, the `@use` answering to `ns`, then that module's
//      `@forward` chain (document modules before built-in ones)
//   3. for bare names, the starting document's `@forward` chain, then the
//      chain of every `@use` target (wildcard uses first)
//   4. built-in modules the starting document `@use`s
//   5. the `@import` graph, then every stored document the module graph
//      does not already reach
//
// `list_reachable_symbols` enumerates instead of resolving and applies each
// forward link's `show` and `hide` lists along the way.
//

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Url;

use super::types::{dollarless, is_builtin_target, ForwardLink, Identifier, Symbol, SymbolKind, UseLink};
use crate::builtins::{self, BuiltinExport, BuiltinModule};
use crate::document::ScssDocument;
use crate::document_store::DocumentStore;
use crate::sassdoc::SassDoc;

/// Where a resolved symbol lives
#[derive(Debug, Clone)]
pub enum SymbolOwner {
    Document(Arc<ScssDocument>),
    Builtin(&'static BuiltinModule),
}

impl SymbolOwner {
    pub fn document(&self) -> Option<&Arc<ScssDocument>> {
        match self {
            SymbolOwner::Document(doc) => Some(doc),
            SymbolOwner::Builtin(_) => None,
        }
    }

    pub fn uri(&self) -> Option<&Url> {
        self.document().map(|doc| &doc.uri)
    }

    /// File name of the owning document, or `sass:<module>`.
    pub fn label(&self) -> String {
        match self {
            SymbolOwner::Document(doc) => doc.file_name.clone(),
            SymbolOwner::Builtin(module) => module.identity(),
        }
    }

    fn key(&self) -> String {
        match self {
            SymbolOwner::Document(doc) => doc.uri.to_string(),
            SymbolOwner::Builtin(module) => module.identity(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedSymbol {
    pub symbol: Symbol,
    pub owner: SymbolOwner,
    /// Name as seen from the starting document, forward prefixes applied
    pub effective_name: String,
    /// Export record when the owner is a built-in module
    pub builtin: Option<&'static BuiltinExport>,
}

impl ResolvedSymbol {
    fn in_document(doc: &Arc<ScssDocument>, symbol: &Symbol, effective_name: String) -> Self {
        Self {
            symbol: symbol.clone(),
            owner: SymbolOwner::Document(Arc::clone(doc)),
            effective_name,
            builtin: None,
        }
    }

    fn in_builtin(module: &'static BuiltinModule, export: &'static BuiltinExport, effective_name: String) -> Self {
        Self {
            symbol: builtin_symbol(export),
            owner: SymbolOwner::Builtin(module),
            effective_name,
            builtin: Some(export),
        }
    }
}

/// A symbol offered from a starting document
#[derive(Debug, Clone)]
pub struct ReachableSymbol {
    pub symbol: Symbol,
    pub owner: SymbolOwner,
    /// Name to write after any namespace, prefixes applied
    pub name: String,
    /// Namespace the name must be qualified with, if any
    pub namespace: Option<String>,
    pub builtin: Option<&'static BuiltinExport>,
}

/// What `list_reachable_symbols_with` includes for unqualified listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Members of namespaced `@use`s, tagged with their namespace
    pub include_namespaced: bool,
    /// The `@import` graph and every other stored document
    pub include_legacy: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_namespaced: true,
            include_legacy: true,
        }
    }
}

fn builtin_symbol(export: &BuiltinExport) -> Symbol {
    Symbol {
        name: export.name.to_string(),
        kind: export.kind,
        range: Default::default(),
        position: Default::default(),
        offset: 0,
        sassdoc: Some(SassDoc {
            description: Some(export.description.to_string()),
            ..SassDoc::default()
        }),
        value: None,
        owner: None,
        local: false,
        scope: None,
        parameters: Vec::new(),
    }
}

/// Key a name is stored under in a document's table of `kind`.
fn table_key(name: &str, kind: SymbolKind) -> String {
    match kind {
        SymbolKind::Variable => format!("${}", dollarless(name)),
        _ => name.to_string(),
    }
}

/// Name a member gets at the root of a forward chain, or `None` when a
/// `show`/`hide` list along `path` filters it out. Each path entry holds the
/// length of the prefix accumulated before that link.
fn exposed_name(name: &str, kind: SymbolKind, prefix: &str, path: &[(usize, ForwardLink)]) -> Option<String> {
    if kind == SymbolKind::Placeholder {
        return Some(name.to_string());
    }
    let sigil = if kind == SymbolKind::Variable { "$" } else { "" };
    let root_bare = format!("{}{}", prefix, dollarless(name));
    for (before, link) in path {
        let at_link = format!("{}{}", sigil, &root_bare[*before..]);
        if !link.exposes(&at_link, kind) {
            return None;
        }
    }
    Some(format!("{}{}", sigil, root_bare))
}

/// Longest `@forward` chain followed when listing members.
const MAX_FORWARD_DEPTH: usize = 32;

struct Frame {
    doc: Arc<ScssDocument>,
    prefix: String,
    path: Vec<(usize, ForwardLink)>,
}

/// Resolver over one store snapshot
pub struct Resolver<'a> {
    store: &'a DocumentStore,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store, cancel: None }
    }

    /// A cancelled resolver reports "not found" and empty listings.
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.map(|t| t.is_cancelled()).unwrap_or(false)
    }

    pub fn resolve(&self, doc: &Arc<ScssDocument>, ident: &Identifier) -> Option<ResolvedSymbol> {
        if self.cancelled() {
            return None;
        }
        let kind = ident.kind;
        let key = table_key(&ident.name, kind);

        match ident.namespace.as_deref() {
            None => {
                let own = ident
                    .offset
                    .and_then(|offset| doc.local_at(&key, kind, offset))
                    .or_else(|| doc.symbol(&key, kind));
                if let Some(symbol) = own {
                    // A declaration does not resolve to itself
                    if ident.offset == Some(symbol.offset) {
                        return None;
                    }
                    return Some(ResolvedSymbol::in_document(doc, symbol, ident.name.clone()));
                }

                if let Some(found) = self.forward_chain(doc, ident, &doc.uri) {
                    return Some(found);
                }
                let document_uses = doc.uses.values().filter(|u| !is_builtin_target(&u.target));
                let (wildcards, named): (Vec<&UseLink>, Vec<&UseLink>) =
                    document_uses.partition(|u| u.is_wildcard());
                for link in wildcards.into_iter().chain(named) {
                    if let Some(found) = self.resolve_in_use(link, ident, &doc.uri) {
                        return Some(found);
                    }
                }
                for link in doc.builtin_uses() {
                    if let Some(found) = self.resolve_in_use(link, ident, &doc.uri) {
                        return Some(found);
                    }
                }
            }
            Some(namespace) => {
                let uses: Vec<&UseLink> = doc
                    .uses
                    .values()
                    .filter(|u| !u.is_wildcard() && u.answers_to(namespace))
                    .collect();
                // A local module shadows a built-in one under the same namespace
                let ordered = uses
                    .iter()
                    .filter(|u| !is_builtin_target(&u.target))
                    .chain(uses.iter().filter(|u| is_builtin_target(&u.target)));
                for link in ordered {
                    if let Some(found) = self.resolve_in_use(link, ident, &doc.uri) {
                        return Some(found);
                    }
                }
                if !uses.is_empty() {
                    log::trace!("'{}.{}' not exported by its module", namespace, ident.name);
                    return None;
                }
            }
        }

        self.resolve_legacy(doc, ident)
    }

    fn resolve_in_use(&self, link: &UseLink, ident: &Identifier, origin: &Url) -> Option<ResolvedSymbol> {
        if let Some(module) = builtins::module_for_target(&link.target) {
            let export = module.find(&table_key(&ident.name, ident.kind), ident.kind)?;
            return Some(ResolvedSymbol::in_builtin(module, export, ident.name.clone()));
        }
        let target = self.store.get(&link.target)?;
        self.forward_chain(&target, ident, origin)
    }

    /// Walk `root` and its `@forward` chain for a member whose prefixed
    /// name equals the identifier. A document is visited once per
    /// accumulated prefix, and only while that prefix still leads the name.
    fn forward_chain(&self, root: &Arc<ScssDocument>, ident: &Identifier, origin: &Url) -> Option<ResolvedSymbol> {
        let kind = ident.kind;
        let bare = dollarless(&ident.name);
        let mut stack = vec![(Arc::clone(root), String::new())];
        let mut visited: HashSet<(Url, String)> = HashSet::new();

        while let Some((doc, prefix)) = stack.pop() {
            if self.cancelled() {
                return None;
            }
            // Placeholders ignore prefixes
            let prefix = if kind == SymbolKind::Placeholder { String::new() } else { prefix };
            if !bare.starts_with(prefix.as_str()) {
                continue;
            }
            if !visited.insert((doc.uri.clone(), prefix.clone())) {
                continue;
            }

            let name = if kind == SymbolKind::Placeholder {
                Some(ident.name.clone())
            } else {
                bare.strip_prefix(prefix.as_str()).map(|rest| table_key(rest, kind))
            };
            if let Some(symbol) = name.and_then(|name| doc.symbol(&name, kind)) {
                if doc.uri == *origin || !symbol.is_private() {
                    return Some(ResolvedSymbol::in_document(&doc, symbol, ident.name.clone()));
                }
            }

            for link in doc.forwards.values().rev() {
                if link.target == doc.uri {
                    continue;
                }
                let child_prefix = format!("{}{}", prefix, link.prefix.as_deref().unwrap_or(""));
                if let Some(module) = builtins::module_for_target(&link.target) {
                    let export = bare
                        .strip_prefix(child_prefix.as_str())
                        .and_then(|rest| module.find(&table_key(rest, kind), kind));
                    if let Some(export) = export {
                        return Some(ResolvedSymbol::in_builtin(module, export, ident.name.clone()));
                    }
                    continue;
                }
                if let Some(child) = self.store.get(&link.target) {
                    stack.push((child, child_prefix));
                }
            }
        }
        None
    }

    /// Documents reached from `doc` through `@use` targets and `@forward`
    /// chains, excluding `doc` itself.
    fn module_reachable(&self, doc: &ScssDocument) -> HashSet<Url> {
        let mut reached = HashSet::new();
        let mut queue: VecDeque<Url> = doc
            .uses
            .keys()
            .chain(doc.forwards.keys())
            .filter(|target| !is_builtin_target(target))
            .cloned()
            .collect();
        while let Some(uri) = queue.pop_front() {
            if uri == doc.uri || !reached.insert(uri.clone()) {
                continue;
            }
            if let Some(module) = self.store.get(&uri) {
                queue.extend(module.forwards.keys().filter(|t| !is_builtin_target(t)).cloned());
            }
        }
        reached
    }

    /// Legacy fallback: the transitive `@import` graph, then every stored
    /// document in URI order. The query's own declaration is skipped.
    fn resolve_legacy(&self, doc: &Arc<ScssDocument>, ident: &Identifier) -> Option<ResolvedSymbol> {
        let kind = ident.kind;
        let key = table_key(&ident.name, kind);

        let mut visited = HashSet::from([doc.uri.clone()]);
        let mut queue: VecDeque<Url> = doc.imports.keys().cloned().collect();
        while let Some(uri) = queue.pop_front() {
            if self.cancelled() {
                return None;
            }
            if !visited.insert(uri.clone()) {
                continue;
            }
            let Some(imported) = self.store.get(&uri) else {
                continue;
            };
            if let Some(symbol) = imported.symbol(&key, kind).filter(|s| !s.is_private()) {
                return Some(ResolvedSymbol::in_document(&imported, symbol, ident.name.clone()));
            }
            queue.extend(imported.imports.keys().cloned());
        }

        // Names under module control are only visible the way the module graph exposes them
        let governed = self.module_reachable(doc);
        let mut docs = self.store.values();
        docs.sort_by(|a, b| a.uri.as_str().cmp(b.uri.as_str()));
        for candidate in docs {
            if self.cancelled() {
                return None;
            }
            if governed.contains(&candidate.uri) {
                continue;
            }
            let Some(symbol) = candidate.symbol(&key, kind) else {
                continue;
            };
            let own = candidate.uri == doc.uri;
            if own && ident.offset == Some(symbol.offset) {
                continue;
            }
            if !own && symbol.is_private() {
                continue;
            }
            return Some(ResolvedSymbol::in_document(&candidate, symbol, ident.name.clone()));
        }
        None
    }

    pub fn list_reachable_symbols(
        &self,
        doc: &Arc<ScssDocument>,
        kind: SymbolKind,
        namespace: Option<&str>,
    ) -> Vec<ReachableSymbol> {
        self.list_reachable_symbols_with(doc, kind, namespace, ListOptions::default())
    }

    /// Enumerate symbols of `kind` visible from `doc`. With a namespace, only
    /// that module's members; placeholders are never namespaced.
    pub fn list_reachable_symbols_with(
        &self,
        doc: &Arc<ScssDocument>,
        kind: SymbolKind,
        namespace: Option<&str>,
        options: ListOptions,
    ) -> Vec<ReachableSymbol> {
        let mut out = Vec::new();

        if let Some(namespace) = namespace {
            if kind != SymbolKind::Placeholder {
                for link in doc
                    .uses
                    .values()
                    .filter(|u| !u.is_wildcard() && u.answers_to(namespace))
                {
                    self.list_use(link, kind, Some(namespace), &doc.uri, &mut HashSet::new(), &mut out);
                }
            }
            return dedup(out);
        }

        for symbol in doc.table(kind).values() {
            out.push(ReachableSymbol {
                symbol: symbol.clone(),
                owner: SymbolOwner::Document(Arc::clone(doc)),
                name: symbol.name.clone(),
                namespace: None,
                builtin: None,
            });
        }

        // Documents reached through modules are left out of the legacy pass
        let mut visited = HashSet::from([doc.uri.clone()]);
        let seeds = self.forward_frames(doc, "", &[], kind, None, &mut out);
        self.collect_chain(seeds, kind, None, &doc.uri, &mut visited, &mut out);
        for link in doc.uses.values().filter(|u| u.is_wildcard()) {
            self.list_use(link, kind, None, &doc.uri, &mut visited, &mut out);
        }

        if options.include_namespaced && kind != SymbolKind::Placeholder {
            for link in doc.uses.values().filter(|u| !u.is_wildcard()) {
                let namespace = link.namespace.clone();
                self.list_use(link, kind, Some(namespace.as_str()), &doc.uri, &mut HashSet::new(), &mut out);
            }
        }

        if options.include_legacy {
            self.list_legacy(doc, kind, &mut visited, &mut out);
        }

        dedup(out)
    }

    fn list_use(
        &self,
        link: &UseLink,
        kind: SymbolKind,
        namespace: Option<&str>,
        origin: &Url,
        visited: &mut HashSet<Url>,
        out: &mut Vec<ReachableSymbol>,
    ) {
        if let Some(module) = builtins::module_for_target(&link.target) {
            for export in module.exports_of(kind) {
                out.push(ReachableSymbol {
                    symbol: builtin_symbol(export),
                    owner: SymbolOwner::Builtin(module),
                    name: export.name.to_string(),
                    namespace: namespace.map(str::to_string),
                    builtin: Some(export),
                });
            }
            return;
        }
        if let Some(target) = self.store.get(&link.target) {
            let root = Frame {
                doc: target,
                prefix: String::new(),
                path: Vec::new(),
            };
            self.collect_chain(vec![root], kind, namespace, origin, visited, out);
        }
    }

    /// Frames for the forward links of `doc`. Built-in targets are listed
    /// immediately since they have no document to descend into.
    fn forward_frames(
        &self,
        doc: &ScssDocument,
        prefix: &str,
        path: &[(usize, ForwardLink)],
        kind: SymbolKind,
        namespace: Option<&str>,
        out: &mut Vec<ReachableSymbol>,
    ) -> Vec<Frame> {
        let mut frames = Vec::new();
        for link in doc.forwards.values() {
            if link.target == doc.uri {
                continue;
            }
            let child_prefix = format!("{}{}", prefix, link.prefix.as_deref().unwrap_or(""));
            let mut child_path = path.to_vec();
            child_path.push((prefix.len(), link.clone()));

            if let Some(module) = builtins::module_for_target(&link.target) {
                for export in module.exports_of(kind) {
                    if let Some(name) = exposed_name(export.name, kind, &child_prefix, &child_path) {
                        out.push(ReachableSymbol {
                            symbol: builtin_symbol(export),
                            owner: SymbolOwner::Builtin(module),
                            name,
                            namespace: namespace.map(str::to_string),
                            builtin: Some(export),
                        });
                    }
                }
                continue;
            }
            if let Some(child) = self.store.get(&link.target) {
                frames.push(Frame {
                    doc: child,
                    prefix: child_prefix,
                    path: child_path,
                });
            }
        }
        frames
    }

    fn collect_chain(
        &self,
        seeds: Vec<Frame>,
        kind: SymbolKind,
        namespace: Option<&str>,
        origin: &Url,
        visited: &mut HashSet<Url>,
        out: &mut Vec<ReachableSymbol>,
    ) {
        let mut stack: Vec<Frame> = seeds.into_iter().rev().collect();
        let mut seen: HashSet<(Url, String)> = HashSet::new();
        while let Some(frame) = stack.pop() {
            if self.cancelled() {
                out.clear();
                return;
            }
            if frame.doc.uri == *origin || frame.path.len() > MAX_FORWARD_DEPTH {
                continue;
            }
            let prefix_key = if kind == SymbolKind::Placeholder { String::new() } else { frame.prefix.clone() };
            if !seen.insert((frame.doc.uri.clone(), prefix_key)) {
                continue;
            }
            visited.insert(frame.doc.uri.clone());

            for symbol in frame.doc.table(kind).values() {
                if frame.doc.uri != *origin && symbol.is_private() {
                    continue;
                }
                if let Some(name) = exposed_name(&symbol.name, kind, &frame.prefix, &frame.path) {
                    out.push(ReachableSymbol {
                        symbol: symbol.clone(),
                        owner: SymbolOwner::Document(Arc::clone(&frame.doc)),
                        name,
                        namespace: namespace.map(str::to_string),
                        builtin: None,
                    });
                }
            }

            let children = self.forward_frames(&frame.doc, &frame.prefix, &frame.path, kind, namespace, out);
            stack.extend(children.into_iter().rev());
        }
    }

    fn list_legacy(
        &self,
        doc: &Arc<ScssDocument>,
        kind: SymbolKind,
        visited: &mut HashSet<Url>,
        out: &mut Vec<ReachableSymbol>,
    ) {
        let mut ordered: Vec<Arc<ScssDocument>> = Vec::new();
        let mut queue: VecDeque<Url> = doc.imports.keys().cloned().collect();
        let mut seen = HashSet::new();
        while let Some(uri) = queue.pop_front() {
            if !seen.insert(uri.clone()) {
                continue;
            }
            if let Some(imported) = self.store.get(&uri) {
                queue.extend(imported.imports.keys().cloned());
                ordered.push(imported);
            }
        }
        let governed = self.module_reachable(doc);
        let mut rest = self.store.values();
        rest.retain(|other| !governed.contains(&other.uri));
        rest.sort_by(|a, b| a.uri.as_str().cmp(b.uri.as_str()));
        ordered.extend(rest);

        for other in ordered {
            if self.cancelled() {
                out.clear();
                return;
            }
            if !visited.insert(other.uri.clone()) {
                continue;
            }
            for symbol in other.table(kind).values().filter(|s| !s.is_private()) {
                out.push(ReachableSymbol {
                    symbol: symbol.clone(),
                    owner: SymbolOwner::Document(Arc::clone(&other)),
                    name: symbol.name.clone(),
                    namespace: None,
                    builtin: None,
                });
            }
        }
    }
}

fn dedup(items: Vec<ReachableSymbol>) -> Vec<ReachableSymbol> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.owner.key(), item.name.clone(), item.namespace.clone())))
        .collect()
}

/// Resolve `ident` from `doc` against the store.
pub fn resolve(store: &DocumentStore, doc: &Arc<ScssDocument>, ident: &Identifier) -> Option<ResolvedSymbol> {
    Resolver::new(store).resolve(doc, ident)
}

/// List symbols of `kind` reachable from `doc`, optionally restricted to one namespace.
pub fn list_reachable_symbols(
    store: &DocumentStore,
    doc: &Arc<ScssDocument>,
    kind: SymbolKind,
    namespace: Option<&str>,
) -> Vec<ReachableSymbol> {
    Resolver::new(store).list_reachable_symbols(doc, kind, namespace)
}

/// The identifier written at `offset`, if a declaration or reference sits there.
pub fn identifier_at(doc: &ScssDocument, offset: usize) -> Option<Identifier> {
    let node = doc.node_at(offset)?;
    let kind = SymbolKind::of_node(node.kind)?;
    let mut ident = Identifier::new(node.name.clone(), kind).at(node.name_start);
    ident.namespace = node.namespace.clone();
    Some(ident)
}
